// controller.rs — 视角状态机：输入写 target，每帧把 state 平滑地推向 target
//
// 两种互斥的更新方式：
// - 鼠标 / 滚轮 / 键盘：只改 target，由 update() 做指数平滑（有惯性）
// - 单指拖动 / 双指捏合：state 与 target 同步直接赋值（1:1 跟手），当帧跳过平滑

use glam::Vec2;

use crate::config::{FovConfig, ViewerConfig};
use crate::input::{DragSession, HeldKeys, KeyAction, PinchSession, RepeatTimer};
use crate::math::{approach, azimuth_sign, clamp_latitude, pinch_distance, safe_delta, smoothing_divisor};
use crate::projection::ProjectionMode;
use crate::state::{FrameUniforms, TargetState, ViewState};

/// 全画幅对角线 (mm)，用于等效焦距显示
const FULL_FRAME_DIAGONAL_MM: f32 = 43.266_615;

pub struct ViewController {
    config: ViewerConfig,
    projection_mode: ProjectionMode,
    aspect: f32,

    state: ViewState,
    target: TargetState,

    pointer: Option<DragSession>,
    touch_drag: Option<DragSession>,
    pinch: Option<PinchSession>,

    held_keys: HeldKeys,
    pan_timer: RepeatTimer,
    zoom_timer: RepeatTimer,
}

impl ViewController {
    /// 配置先做一次规整，代码里直接构造的坏配置同样回退到默认值
    pub fn new(mut config: ViewerConfig) -> Self {
        config.sanitize();
        let projection_mode = config.projection;
        let repeat_ms = config.interaction.key_repeat_ms;
        let (state, target) = initial_states(&config, projection_mode);
        Self {
            config,
            projection_mode,
            aspect: 1.0,
            state,
            target,
            pointer: None,
            touch_drag: None,
            pinch: None,
            held_keys: HeldKeys::default(),
            pan_timer: RepeatTimer::from_millis(repeat_ms),
            zoom_timer: RepeatTimer::from_millis(repeat_ms),
        }
    }

    /// 换一套配置，回到该配置的初始视角（保留画面宽高比）
    pub fn configure(&mut self, config: ViewerConfig) {
        let aspect = self.aspect;
        *self = Self::new(config);
        self.aspect = aspect;
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn target(&self) -> &TargetState {
        &self.target
    }

    pub fn projection_mode(&self) -> ProjectionMode {
        self.projection_mode
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// 任一交互通道（鼠标、单指、捏合）仍在进行
    pub fn is_user_interacting(&self) -> bool {
        self.pointer.is_some() || self.touch_drag.is_some() || self.pinch.is_some()
    }

    /// 当前处于直接操控（跳过平滑）
    pub fn is_direct_manipulation(&self) -> bool {
        self.touch_drag.is_some() || self.pinch.is_some()
    }

    pub fn active_fov_config(&self) -> &FovConfig {
        self.config.fov_config(self.projection_mode)
    }

    pub fn clamp_fov(&self, fov: f32) -> f32 {
        self.active_fov_config().clamp(fov)
    }

    /// 切换投影并立即重新夹取 state 和 target 的 FOV
    pub fn set_projection_mode(&mut self, mode: ProjectionMode) {
        self.projection_mode = mode;
        self.target.field_of_view = self.clamp_fov(self.target.field_of_view);
        self.state.field_of_view = self.clamp_fov(self.state.field_of_view);
        log::info!(
            "Projection switched to {} (fov {:.1}, equivalent focal {:.1}mm)",
            mode.name(),
            self.state.field_of_view,
            self.equivalent_focal_length()
        );
    }

    /// 目标回到初始方位与初始目标 FOV，由平滑过渡过去
    pub fn reset_view(&mut self) {
        let rotation = self.config.view_rotation;
        self.target.longitude = rotation.init_azimuth;
        self.target.latitude = rotation.init_altitude;
        self.target.field_of_view = self.clamp_fov(self.active_fov_config().init_target);
    }

    pub fn on_resize(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    // ------------------------------------------------------------------
    // 鼠标
    // ------------------------------------------------------------------

    pub fn on_pointer_down(&mut self, position: Vec2) {
        self.pointer = Some(DragSession::begin(
            position,
            self.target.longitude,
            self.target.latitude,
        ));
    }

    pub fn on_pointer_move(&mut self, position: Vec2) {
        let sensitivity = self.config.interaction.pointer_sensitivity * self.fov_scale();
        let Some(session) = self.pointer.as_mut() else {
            return;
        };

        let dx = session.advance(position);
        let (lon, lat) = session.angles_at(position, sensitivity);
        self.target.longitude = lon;
        self.target.latitude = lat;
        self.set_azimuth_sign(azimuth_sign(dx));
    }

    pub fn on_pointer_up(&mut self) {
        self.pointer = None;
    }

    /// 乘法缩放，只在光标位于渲染表面上时生效。返回是否处理了该事件。
    /// delta_y < 0 放大，其余（含 0）缩小。
    pub fn on_wheel(&mut self, delta_y: f32, is_over_surface: bool) -> bool {
        if !is_over_surface || !delta_y.is_finite() {
            return false;
        }
        let zoom = self.config.zoom;
        let factor = if delta_y < 0.0 { zoom.wheel_zoom_in } else { zoom.wheel_zoom_out };
        self.target.field_of_view = self.clamp_fov(self.target.field_of_view * factor);
        true
    }

    // ------------------------------------------------------------------
    // 触摸
    // ------------------------------------------------------------------

    pub fn on_touch_start(&mut self, touches: &[Vec2]) {
        match touches {
            [a, b, ..] => {
                self.touch_drag = None;
                self.pinch = Some(PinchSession::begin(*a, *b, self.state.field_of_view));
            }
            [a] => self.begin_touch_drag(*a),
            [] => {}
        }
    }

    pub fn on_touch_move(&mut self, touches: &[Vec2]) {
        match touches {
            [a, b, ..] => self.pinch_to(pinch_distance(*a, *b)),
            [a] => self.touch_drag_to(*a),
            [] => {}
        }
    }

    /// `remaining` 为抬起后仍在屏幕上的触点
    pub fn on_touch_end(&mut self, remaining: &[Vec2]) {
        let was_pinching = self.pinch.is_some();
        if remaining.len() < 2 {
            self.pinch = None;
        }
        match remaining {
            [] => self.touch_drag = None,
            // 捏合结束还剩一指：在该指上重新锚定拖动
            [a] if was_pinching => self.begin_touch_drag(*a),
            _ => {}
        }
    }

    fn begin_touch_drag(&mut self, position: Vec2) {
        // 直接操控以 state 为锚点，而不是 target
        self.touch_drag = Some(DragSession::begin(
            position,
            self.state.longitude,
            self.state.latitude,
        ));
    }

    fn touch_drag_to(&mut self, position: Vec2) {
        let sensitivity = self.config.interaction.touch_sensitivity * self.fov_scale();
        let limit = self.config.interaction.direct_latitude_limit;
        let Some(session) = self.touch_drag.as_mut() else {
            return;
        };

        let dx = session.advance(position);
        let (lon, lat) = session.angles_at(position, sensitivity);
        let lat = clamp_latitude(lat, limit);

        // state 与 target 同步写入，松手后不会回弹
        self.state.longitude = lon;
        self.state.latitude = lat;
        self.target.longitude = lon;
        self.target.latitude = lat;
        self.set_azimuth_sign(azimuth_sign(dx));
    }

    fn pinch_to(&mut self, distance: f32) {
        let sensitivity = self.config.interaction.pinch_sensitivity;
        let Some(pinch) = self.pinch else {
            return;
        };

        let fov = self.clamp_fov(pinch.fov_at(distance, sensitivity));
        self.state.field_of_view = fov;
        self.target.field_of_view = fov;

        if let Some(pinch) = self.pinch.as_mut() {
            pinch.rebase(distance, fov);
        }
    }

    // ------------------------------------------------------------------
    // 键盘
    // ------------------------------------------------------------------

    pub fn on_key_down(&mut self, action: KeyAction) {
        if action == KeyAction::Reset {
            self.reset_view();
            return;
        }
        self.held_keys.set(action, true);
        if action.is_pan() {
            self.pan_timer.start();
        }
        if action.is_zoom() {
            self.zoom_timer.start();
        }
    }

    pub fn on_key_up(&mut self, action: KeyAction) {
        if !self.held_keys.set(action, false) {
            return;
        }
        if !self.held_keys.any_pan() {
            self.pan_timer.stop();
        }
        if !self.held_keys.any_zoom() {
            self.zoom_timer.stop();
        }
    }

    pub fn held_keys(&self) -> &HeldKeys {
        &self.held_keys
    }

    fn key_pan_tick(&mut self) {
        let step = self.config.interaction.key_pan_step;
        let limit = self.config.interaction.direct_latitude_limit;
        let dir = self.held_keys.pan_direction();

        self.target.longitude += dir.x * step;
        if dir.y != 0.0 {
            self.target.latitude = clamp_latitude(self.target.latitude + dir.y * step, limit);
        }
    }

    fn key_zoom_tick(&mut self) {
        let delta = self.held_keys.zoom_direction() * self.config.zoom.increment_per_tick;
        self.target.field_of_view = self.clamp_fov(self.target.field_of_view + delta);
    }

    // ------------------------------------------------------------------
    // 每帧积分
    // ------------------------------------------------------------------

    /// 推进一帧并返回本帧的 uniform
    pub fn update(&mut self, delta_seconds: f32) -> FrameUniforms {
        // 按键连发以真实 dt 推进
        for _ in 0..self.pan_timer.advance(delta_seconds) {
            self.key_pan_tick();
        }
        for _ in 0..self.zoom_timer.advance(delta_seconds) {
            self.key_zoom_tick();
        }

        let dt = safe_delta(delta_seconds);
        let rotation = self.config.view_rotation;

        if rotation.auto_rotate && !self.is_user_interacting() {
            self.target.longitude -= rotation.auto_rotation_rate * self.state.azimuth_sign * dt;
        }

        self.target.latitude = clamp_latitude(self.target.latitude, 90.0);

        if !self.is_direct_manipulation() {
            let rotation_divisor = smoothing_divisor(rotation.smoothness_constant, dt);
            let zoom_divisor = smoothing_divisor(self.config.zoom.smoothing_constant, dt);

            self.state.longitude = approach(self.state.longitude, self.target.longitude, rotation_divisor);
            self.state.latitude = approach(self.state.latitude, self.target.latitude, rotation_divisor);
            self.state.field_of_view =
                approach(self.state.field_of_view, self.target.field_of_view, zoom_divisor);
        }

        self.state.latitude = clamp_latitude(self.state.latitude, 90.0);
        self.state.field_of_view = self.clamp_fov(self.state.field_of_view);

        if !self.state.is_finite() || !self.target.is_finite() {
            log::warn!("Non-finite view state detected ({:?}), resetting view", self.state);
            self.reset_to_initial();
        }

        self.frame_uniforms()
    }

    pub fn frame_uniforms(&self) -> FrameUniforms {
        FrameUniforms::from_state(&self.state, self.aspect, self.projection_mode)
    }

    /// state 和 target 都回到构造时的初值
    pub fn reset_to_initial(&mut self) {
        let (state, target) = initial_states(&self.config, self.projection_mode);
        self.state = state;
        self.target = target;
    }

    /// 结束所有交互通道并停止按键连发
    pub fn end_all_interaction(&mut self) {
        self.pointer = None;
        self.touch_drag = None;
        self.pinch = None;
        self.held_keys = HeldKeys::default();
        self.pan_timer.stop();
        self.zoom_timer.stop();
    }

    /// 当前 FOV 对应的全画幅等效焦距 (mm)
    pub fn equivalent_focal_length(&self) -> f32 {
        let fov = self.state.field_of_view.clamp(0.01, 179.9).to_radians();
        FULL_FRAME_DIAGONAL_MM / (2.0 * (fov * 0.5).tan())
    }

    fn fov_scale(&self) -> f32 {
        if self.config.interaction.scale_with_fov {
            self.state.field_of_view / self.active_fov_config().init_target
        } else {
            1.0
        }
    }

    fn set_azimuth_sign(&mut self, sign: f32) {
        self.state.azimuth_sign = sign;
        self.target.azimuth_sign = sign;
    }
}

fn initial_states(config: &ViewerConfig, mode: ProjectionMode) -> (ViewState, TargetState) {
    let rotation = config.view_rotation;
    let fov = config.fov_config(mode);
    let state = ViewState::new(rotation.init_azimuth, rotation.init_altitude, fov.clamp(fov.init));
    let target = ViewState::new(
        rotation.init_azimuth,
        rotation.init_altitude,
        fov.clamp(fov.init_target),
    );
    (state, target)
}
