// input.rs — 输入映射与交互会话（拖动 / 捏合 / 按键连发）

use glam::Vec2;

use crate::math::pinch_distance;

/// 键盘动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    PanLeft,
    PanRight,
    PanUp,
    PanDown,
    ZoomIn,
    ZoomOut,
    Reset,
}

impl KeyAction {
    /// 按 DOM `KeyboardEvent.key` 的命名映射
    pub fn from_key_name(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" | "a" | "A" => Some(KeyAction::PanLeft),
            "ArrowRight" | "d" | "D" => Some(KeyAction::PanRight),
            "ArrowUp" | "w" | "W" => Some(KeyAction::PanUp),
            "ArrowDown" | "s" | "S" => Some(KeyAction::PanDown),
            "+" | "=" => Some(KeyAction::ZoomIn),
            "-" | "_" => Some(KeyAction::ZoomOut),
            "r" | "R" => Some(KeyAction::Reset),
            _ => None,
        }
    }

    pub fn is_pan(self) -> bool {
        matches!(
            self,
            KeyAction::PanLeft | KeyAction::PanRight | KeyAction::PanUp | KeyAction::PanDown
        )
    }

    pub fn is_zoom(self) -> bool {
        matches!(self, KeyAction::ZoomIn | KeyAction::ZoomOut)
    }
}

/// 当前按住的平移 / 缩放键
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys {
    pub pan_left: bool,
    pub pan_right: bool,
    pub pan_up: bool,
    pub pan_down: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,
}

impl HeldKeys {
    /// 返回该动作是否是一个持续键（Reset 不是）
    pub fn set(&mut self, action: KeyAction, held: bool) -> bool {
        let slot = match action {
            KeyAction::PanLeft => &mut self.pan_left,
            KeyAction::PanRight => &mut self.pan_right,
            KeyAction::PanUp => &mut self.pan_up,
            KeyAction::PanDown => &mut self.pan_down,
            KeyAction::ZoomIn => &mut self.zoom_in,
            KeyAction::ZoomOut => &mut self.zoom_out,
            KeyAction::Reset => return false,
        };
        *slot = held;
        true
    }

    pub fn any_pan(&self) -> bool {
        self.pan_left || self.pan_right || self.pan_up || self.pan_down
    }

    pub fn any_zoom(&self) -> bool {
        self.zoom_in || self.zoom_out
    }

    /// 水平 / 垂直平移方向，各分量 -1、0 或 1
    pub fn pan_direction(&self) -> Vec2 {
        let x = (self.pan_right as i32 - self.pan_left as i32) as f32;
        let y = (self.pan_up as i32 - self.pan_down as i32) as f32;
        Vec2::new(x, y)
    }

    /// -1 放大（FOV 减小），+1 缩小
    pub fn zoom_direction(&self) -> f32 {
        (self.zoom_out as i32 - self.zoom_in as i32) as f32
    }
}

/// 单指 / 鼠标拖动会话
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub anchor_screen: Vec2,
    pub anchor_longitude: f32,
    pub anchor_latitude: f32,
    pub last_screen: Vec2,
}

impl DragSession {
    pub fn begin(screen: Vec2, longitude: f32, latitude: f32) -> Self {
        Self {
            anchor_screen: screen,
            anchor_longitude: longitude,
            anchor_latitude: latitude,
            last_screen: screen,
        }
    }

    /// 相对锚点的线性映射：向右拖经度减小，向下拖纬度增大。返回 (lon, lat)。
    pub fn angles_at(&self, screen: Vec2, sensitivity: f32) -> (f32, f32) {
        let lon = (self.anchor_screen.x - screen.x) * sensitivity + self.anchor_longitude;
        let lat = (screen.y - self.anchor_screen.y) * sensitivity + self.anchor_latitude;
        (lon, lat)
    }

    /// 记录新位置，返回相对上一次的水平位移
    pub fn advance(&mut self, screen: Vec2) -> f32 {
        let dx = screen.x - self.last_screen.x;
        self.last_screen = screen;
        dx
    }
}

/// 双指捏合会话，每次 move 后重新取基线
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchSession {
    pub initial_distance: f32,
    pub baseline_fov: f32,
}

impl PinchSession {
    pub fn begin(a: Vec2, b: Vec2, fov: f32) -> Self {
        Self {
            initial_distance: pinch_distance(a, b),
            baseline_fov: fov,
        }
    }

    /// 距离比的 `sensitivity` 次幂作用于基线 FOV。两指张开 -> 比值 < 1 -> 放大。
    /// 比值连乘可交换，来回捏合不会累积漂移。
    pub fn fov_at(&self, current_distance: f32, sensitivity: f32) -> f32 {
        if !(self.initial_distance > f32::EPSILON && current_distance > f32::EPSILON) {
            return self.baseline_fov;
        }
        let ratio = self.initial_distance / current_distance;
        self.baseline_fov * ratio.powf(sensitivity)
    }

    pub fn rebase(&mut self, distance: f32, fov: f32) {
        self.initial_distance = distance;
        self.baseline_fov = fov;
    }
}

/// 单次推进最多补发的 tick 数
pub const MAX_CATCH_UP_TICKS: u32 = 4;

/// 固定间隔的连发计时器，由每帧的 dt 推进（代替 setInterval）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepeatTimer {
    interval: f32,
    accumulated: f32,
    running: bool,
}

impl RepeatTimer {
    pub fn new(interval_seconds: f32) -> Self {
        Self {
            interval: interval_seconds.max(1e-3),
            accumulated: 0.0,
            running: false,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(ms as f32 / 1000.0)
    }

    /// 已在运行时不重置相位
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.accumulated = 0.0;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.accumulated = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 推进 dt 秒，返回这段时间内触发的 tick 数。
    /// 卡顿后最多补 MAX_CATCH_UP_TICKS 个，多出的时间直接丢弃。
    pub fn advance(&mut self, delta_seconds: f32) -> u32 {
        if !self.running || !delta_seconds.is_finite() || delta_seconds <= 0.0 {
            return 0;
        }
        self.accumulated += delta_seconds;
        let ticks = (self.accumulated / self.interval).floor();
        if ticks > MAX_CATCH_UP_TICKS as f32 {
            self.accumulated = 0.0;
            return MAX_CATCH_UP_TICKS;
        }
        self.accumulated -= ticks * self.interval;
        ticks as u32
    }
}
