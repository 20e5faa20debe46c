// viewer.rs — 对宿主暴露的查看器：输入入口、每帧 tick、可见性与生命周期
//
// 宿主（winit 事件循环或测试）只和这一层打交道：
// - 输入事件直接转发给 ViewController
// - 每帧调用 tick()，由内部的 FrameClock 计算 dt
// - 隐藏 / 失焦时 tick() 返回 None，恢复时重置时钟避免巨大的 dt

use std::path::Path;

use glam::Vec2;
use image::RgbaImage;

use crate::clock::{Clock, FrameClock, MonotonicClock};
use crate::config::ViewerConfig;
use crate::controller::ViewController;
use crate::error::Result;
use crate::input::KeyAction;
use crate::panorama::{decode_file, Panorama};
use crate::prefs::Preferences;
use crate::projection::ProjectionMode;
use crate::raster::render_frame;
use crate::state::{FrameUniforms, TargetState, ViewState};

/// 未指定时的纹理尺寸上限（常见 GPU 的 max_texture_dimension_2d）
pub const DEFAULT_MAX_TEXTURE_DIMENSION: u32 = 8192;

pub struct Viewer<C: Clock = MonotonicClock> {
    controller: ViewController,
    frame_clock: FrameClock<C>,
    visible: bool,
    focused: bool,
    destroyed: bool,
    panorama: Option<Panorama>,
    preferences: Option<Preferences>,
    max_texture_dimension: u32,
}

impl Viewer<MonotonicClock> {
    pub fn new(config: ViewerConfig) -> Self {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl<C: Clock> Viewer<C> {
    pub fn with_clock(config: ViewerConfig, clock: C) -> Self {
        Self {
            controller: ViewController::new(config),
            frame_clock: FrameClock::new(clock),
            visible: true,
            focused: true,
            destroyed: false,
            panorama: None,
            preferences: None,
            max_texture_dimension: DEFAULT_MAX_TEXTURE_DIMENSION,
        }
    }

    /// 挂上偏好文件；文件里记录的投影优先于配置中的初始投影
    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        match preferences.load_projection() {
            Ok(Some(mode)) => {
                log::info!("Restoring projection preference: {}", mode.name());
                self.controller.set_projection_mode(mode);
                self.controller.reset_to_initial();
            }
            Ok(None) => {}
            Err(e) => log::warn!("Ignoring projection preference: {e}"),
        }
        self.preferences = Some(preferences);
        self
    }

    /// 后端纹理上限，之后绑定的全景会按此缩放
    pub fn set_max_texture_dimension(&mut self, max_dimension: u32) {
        self.max_texture_dimension = max_dimension;
    }

    pub fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    // ------------------------------------------------------------------
    // 配置与投影
    // ------------------------------------------------------------------

    pub fn configure(&mut self, config: ViewerConfig) {
        if self.destroyed {
            return;
        }
        self.controller.configure(config);
    }

    pub fn config(&self) -> &ViewerConfig {
        self.controller.config()
    }

    pub fn set_projection_mode(&mut self, mode: ProjectionMode) {
        if self.destroyed {
            return;
        }
        self.controller.set_projection_mode(mode);
        if let Some(prefs) = &self.preferences {
            if let Err(e) = prefs.save_projection(mode) {
                log::warn!("Failed to save projection preference: {e}");
            }
        }
    }

    pub fn toggle_projection_mode(&mut self) {
        let next = self.controller.projection_mode().toggled();
        self.set_projection_mode(next);
    }

    pub fn projection_mode(&self) -> ProjectionMode {
        self.controller.projection_mode()
    }

    pub fn reset_view(&mut self) {
        if !self.destroyed {
            self.controller.reset_view();
        }
    }

    // ------------------------------------------------------------------
    // 每帧
    // ------------------------------------------------------------------

    pub fn get_frame_uniforms(&self) -> FrameUniforms {
        self.controller.frame_uniforms()
    }

    /// 用内部时钟推进一帧；暂停或已销毁时不推进
    pub fn tick(&mut self) -> Option<FrameUniforms> {
        if !self.is_running() {
            return None;
        }
        let dt = self.frame_clock.delta_seconds();
        Some(self.controller.update(dt))
    }

    /// 用外部给定的 dt 推进一帧
    pub fn tick_with(&mut self, delta_seconds: f32) -> Option<FrameUniforms> {
        if !self.is_running() {
            return None;
        }
        Some(self.controller.update(delta_seconds))
    }

    pub fn is_running(&self) -> bool {
        !self.destroyed && self.visible && self.focused
    }

    pub fn state(&self) -> &ViewState {
        self.controller.state()
    }

    pub fn target(&self) -> &TargetState {
        self.controller.target()
    }

    pub fn controller(&self) -> &ViewController {
        &self.controller
    }

    pub fn is_user_interacting(&self) -> bool {
        self.controller.is_user_interacting()
    }

    pub fn equivalent_focal_length(&self) -> f32 {
        self.controller.equivalent_focal_length()
    }

    // ------------------------------------------------------------------
    // 输入入口
    // ------------------------------------------------------------------

    pub fn on_pointer_down(&mut self, x: f32, y: f32) {
        if !self.destroyed {
            self.controller.on_pointer_down(Vec2::new(x, y));
        }
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32) {
        if !self.destroyed {
            self.controller.on_pointer_move(Vec2::new(x, y));
        }
    }

    pub fn on_pointer_up(&mut self) {
        if !self.destroyed {
            self.controller.on_pointer_up();
        }
    }

    pub fn on_wheel(&mut self, delta_y: f32, is_over_surface: bool) -> bool {
        !self.destroyed && self.controller.on_wheel(delta_y, is_over_surface)
    }

    pub fn on_touch_start(&mut self, touches: &[Vec2]) {
        if !self.destroyed {
            self.controller.on_touch_start(touches);
        }
    }

    pub fn on_touch_move(&mut self, touches: &[Vec2]) {
        if !self.destroyed {
            self.controller.on_touch_move(touches);
        }
    }

    pub fn on_touch_end(&mut self, remaining: &[Vec2]) {
        if !self.destroyed {
            self.controller.on_touch_end(remaining);
        }
    }

    /// 按键名（DOM 命名）；未识别的键返回 false
    pub fn on_key_down(&mut self, key: &str) -> bool {
        match KeyAction::from_key_name(key) {
            Some(action) => {
                self.on_key_action_down(action);
                true
            }
            None => false,
        }
    }

    pub fn on_key_up(&mut self, key: &str) -> bool {
        match KeyAction::from_key_name(key) {
            Some(action) => {
                self.on_key_action_up(action);
                true
            }
            None => false,
        }
    }

    pub fn on_key_action_down(&mut self, action: KeyAction) {
        if !self.destroyed {
            self.controller.on_key_down(action);
        }
    }

    pub fn on_key_action_up(&mut self, action: KeyAction) {
        if !self.destroyed {
            self.controller.on_key_up(action);
        }
    }

    // ------------------------------------------------------------------
    // 可见性 / 焦点 / 尺寸
    // ------------------------------------------------------------------

    pub fn on_visibility_change(&mut self, is_visible: bool) {
        if self.destroyed || self.visible == is_visible {
            return;
        }
        let was_running = self.is_running();
        self.visible = is_visible;
        self.after_pause_change(was_running);
    }

    pub fn on_focus(&mut self) {
        self.set_focused(true);
    }

    pub fn on_blur(&mut self) {
        self.set_focused(false);
    }

    fn set_focused(&mut self, focused: bool) {
        if self.destroyed || self.focused == focused {
            return;
        }
        let was_running = self.is_running();
        self.focused = focused;
        self.after_pause_change(was_running);
    }

    fn after_pause_change(&mut self, was_running: bool) {
        match (was_running, self.is_running()) {
            (true, false) => log::debug!("Viewer paused"),
            (false, true) => {
                // 恢复后的第一帧从现在开始计时
                self.frame_clock.reset();
                log::debug!("Viewer resumed");
            }
            _ => {}
        }
    }

    pub fn on_resize(&mut self, aspect: f32) {
        if !self.destroyed {
            self.controller.on_resize(aspect);
        }
    }

    pub fn on_resize_pixels(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.on_resize(width as f32 / height as f32);
        }
    }

    // ------------------------------------------------------------------
    // 全景图
    // ------------------------------------------------------------------

    pub fn bind_panorama(&mut self, image: RgbaImage) {
        if self.destroyed {
            return;
        }
        let panorama = Panorama::new(image, self.max_texture_dimension);
        self.set_panorama(panorama);
    }

    /// 绑定已规整过的全景（例如后台线程里准备好的）
    pub fn set_panorama(&mut self, panorama: Panorama) {
        if self.destroyed {
            return;
        }
        log::info!("Panorama bound ({}x{})", panorama.width(), panorama.height());
        self.panorama = Some(panorama);
    }

    pub fn load_panorama(&mut self, path: &Path) -> Result<()> {
        let image = decode_file(path)?;
        self.bind_panorama(image);
        Ok(())
    }

    pub fn unbind_panorama(&mut self) -> Option<Panorama> {
        self.panorama.take()
    }

    pub fn panorama(&self) -> Option<&Panorama> {
        self.panorama.as_ref()
    }

    /// 用 CPU 光栅按当前 uniform 渲染一帧；未绑定图像时为黑屏
    pub fn render_cpu(&self, width: u32, height: u32) -> RgbaImage {
        render_frame(self.panorama.as_ref(), &self.get_frame_uniforms(), width, height)
    }

    // ------------------------------------------------------------------
    // 销毁
    // ------------------------------------------------------------------

    /// 停止连发计时器、结束所有交互、释放图像；之后的输入与 tick 都被忽略
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.controller.end_all_interaction();
        self.panorama = None;
        self.destroyed = true;
        log::debug!("Viewer destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn clock(&self) -> &C {
        self.frame_clock.clock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use image::Rgba;

    fn viewer() -> (Viewer<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (Viewer::with_clock(ViewerConfig::default(), clock.clone()), clock)
    }

    #[test]
    fn test_tick_uses_clock_delta() {
        let (mut v, clock) = viewer();
        v.on_key_down("ArrowRight");
        clock.advance_secs(0.040);
        v.tick().unwrap();
        assert!((v.target().longitude - 94.0).abs() < 1e-4);
    }

    #[test]
    fn test_blur_pauses_and_focus_resumes() {
        let (mut v, clock) = viewer();
        v.on_blur();
        assert!(v.tick().is_none());
        clock.advance_secs(100.0);
        v.on_focus();
        // 恢复后 dt 从 0 开始
        v.on_key_down("d");
        clock.advance_secs(0.020);
        v.tick().unwrap();
        assert!((v.target().longitude - 92.0).abs() < 1e-4);
    }

    #[test]
    fn test_hidden_and_blurred_need_both_restored() {
        let (mut v, _clock) = viewer();
        v.on_visibility_change(false);
        v.on_blur();
        v.on_visibility_change(true);
        assert!(!v.is_running());
        v.on_focus();
        assert!(v.is_running());
    }

    #[test]
    fn test_unknown_key_ignored() {
        let (mut v, _clock) = viewer();
        assert!(!v.on_key_down("F13"));
        assert!(v.on_key_down("+"));
        assert!(v.on_key_up("+"));
    }

    #[test]
    fn test_bind_and_render() {
        let (mut v, _clock) = viewer();
        assert!(v.render_cpu(4, 4).pixels().all(|p| p.0 == [0, 0, 0, 255]));
        v.bind_panorama(RgbaImage::from_pixel(16, 8, Rgba([30, 60, 90, 255])));
        assert!(v.render_cpu(4, 4).pixels().all(|p| p.0 == [30, 60, 90, 255]));
        assert!(v.unbind_panorama().is_some());
        assert!(v.panorama().is_none());
    }

    #[test]
    fn test_bind_respects_texture_limit() {
        let (mut v, _clock) = viewer();
        v.set_max_texture_dimension(32);
        v.bind_panorama(RgbaImage::new(128, 64));
        let pano = v.panorama().unwrap();
        assert_eq!((pano.width(), pano.height()), (32, 16));
    }

    #[test]
    fn test_projection_preference_saved_and_restored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut v = Viewer::with_clock(ViewerConfig::default(), ManualClock::new())
            .with_preferences(Preferences::new(&path));
        v.set_projection_mode(ProjectionMode::Gnomonic);

        let v = Viewer::with_clock(ViewerConfig::default(), ManualClock::new())
            .with_preferences(Preferences::new(&path));
        assert_eq!(v.projection_mode(), ProjectionMode::Gnomonic);
        assert_eq!(v.state().field_of_view, 100.0);
    }

    #[test]
    fn test_corrupt_preference_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "not json").unwrap();
        let v = Viewer::with_clock(ViewerConfig::default(), ManualClock::new())
            .with_preferences(Preferences::new(&path));
        assert_eq!(v.projection_mode(), ProjectionMode::Stereographic);
    }

    #[test]
    fn test_resize_pixels() {
        let (mut v, _clock) = viewer();
        v.on_resize_pixels(1920, 1080);
        assert!((v.get_frame_uniforms().aspect - 16.0 / 9.0).abs() < 1e-5);
        v.on_resize_pixels(0, 1080);
        assert!((v.get_frame_uniforms().aspect - 16.0 / 9.0).abs() < 1e-5);
    }
}
