// state.rs — 视角状态与每帧提交给采样器的 uniform

use crate::math::wrap_radians_from_degrees;
use crate::projection::ProjectionMode;

/// 相机朝向与缩放，单位均为度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// 不做归一化存储；采样前再取模
    pub longitude: f32,
    pub latitude: f32,
    pub field_of_view: f32,
    /// 自动旋转方向，最近一次水平拖动的符号（-1 / +1）
    pub azimuth_sign: f32,
}

/// 输入事件写入的目标状态，形状与 ViewState 相同
pub type TargetState = ViewState;

impl ViewState {
    pub fn new(longitude: f32, latitude: f32, field_of_view: f32) -> Self {
        Self {
            longitude,
            latitude,
            field_of_view,
            azimuth_sign: 1.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && self.field_of_view.is_finite()
            && self.azimuth_sign.is_finite()
    }
}

/// 渲染器每帧唯一需要读取的值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    /// [0, 2π)
    pub lon_radians: f32,
    pub lat_radians: f32,
    pub fov_degrees: f32,
    pub aspect: f32,
    pub projection_mode: ProjectionMode,
}

impl FrameUniforms {
    pub fn from_state(state: &ViewState, aspect: f32, projection_mode: ProjectionMode) -> Self {
        Self {
            lon_radians: wrap_radians_from_degrees(state.longitude),
            lat_radians: state.latitude.to_radians(),
            fov_degrees: state.field_of_view,
            aspect,
            projection_mode,
        }
    }
}
