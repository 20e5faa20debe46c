// lib.rs — 360° 等矩形全景重投影引擎
//
// 两部分：
// - 投影采样（projection / sampler / raster）：屏幕像素 -> 球面经纬 -> 源图颜色
// - 视角控制（controller / input / clock / viewer）：输入事件 -> 目标状态 -> 平滑后的帧 uniform

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod input;
pub mod math;
pub mod panorama;
pub mod prefs;
pub mod projection;
pub mod raster;
pub mod sampler;
pub mod state;
pub mod viewer;

pub use clock::{Clock, FrameClock, ManualClock, MonotonicClock};
pub use config::ViewerConfig;
pub use controller::ViewController;
pub use error::{Result, ViewerError};
pub use input::KeyAction;
pub use panorama::Panorama;
pub use prefs::Preferences;
pub use projection::ProjectionMode;
pub use state::{FrameUniforms, TargetState, ViewState};
pub use viewer::Viewer;
