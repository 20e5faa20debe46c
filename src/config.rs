// config.rs — 查看器配置（JSON），缺省键回落默认值，未知键忽略
//
// 加载方式与原先的 deep merge 一致：先把默认配置序列化成 JSON，
// 再把用户配置逐层合并上去，最后反序列化并做一次数值清洗。

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ViewerError};
use crate::projection::ProjectionMode;

/// 单个投影模式的 FOV 范围（度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FovConfig {
    pub min: f32,
    pub max: f32,
    /// 构造时 state 的 FOV
    pub init: f32,
    /// 构造 / 复位时 target 的 FOV
    pub init_target: f32,
}

impl FovConfig {
    pub const GNOMONIC: FovConfig = FovConfig {
        min: 45.0,
        max: 130.0,
        init: 100.0,
        init_target: 60.0,
    };

    pub const STEREOGRAPHIC: FovConfig = FovConfig {
        min: 45.0,
        max: 330.0,
        init: 100.0,
        init_target: 60.0,
    };

    /// 区间无效（min > max 或含 NaN）时原样返回，不 panic
    pub fn clamp(&self, fov: f32) -> f32 {
        if self.min <= self.max {
            fov.clamp(self.min, self.max)
        } else {
            fov
        }
    }

    fn sanitize(&mut self, defaults: &FovConfig) {
        self.min = finite_or(self.min, defaults.min);
        self.max = finite_or(self.max, defaults.max);
        if self.min > self.max {
            std::mem::swap(&mut self.min, &mut self.max);
        }
        if self.min <= 0.0 {
            self.min = defaults.min.min(self.max);
        }
        self.init = self.clamp(finite_or(self.init, defaults.init));
        self.init_target = self.clamp(finite_or(self.init_target, defaults.init_target));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomConfig {
    /// 按住缩放键时每个 tick 的 FOV 增量
    pub increment_per_tick: f32,
    pub smoothing_constant: f32,
    /// 滚轮向上时的乘数
    pub wheel_zoom_in: f32,
    pub wheel_zoom_out: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            increment_per_tick: 2.0,
            smoothing_constant: 6000.0,
            wheel_zoom_in: 0.95,
            wheel_zoom_out: 1.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRotationConfig {
    pub init_altitude: f32,
    pub init_azimuth: f32,
    pub auto_rotate: bool,
    /// 度 / 秒
    pub auto_rotation_rate: f32,
    pub smoothness_constant: f32,
}

impl Default for ViewRotationConfig {
    fn default() -> Self {
        Self {
            init_altitude: 0.0,
            init_azimuth: 90.0,
            auto_rotate: false,
            auto_rotation_rate: 0.0,
            smoothness_constant: 8000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionConfig {
    /// 鼠标拖动：度 / 像素
    pub pointer_sensitivity: f32,
    /// 单指拖动：度 / 像素
    pub touch_sensitivity: f32,
    /// 捏合灵敏度，作用为指数：fov = baseline * (d0 / d) ^ pinch_sensitivity。
    /// 1.0 时缩放与手指间距严格成反比，2.0 时按距离比的平方缩放。
    pub pinch_sensitivity: f32,
    /// 拖动灵敏度是否乘以 fov / initTarget（放大后拖动变慢）
    pub scale_with_fov: bool,
    pub key_pan_step: f32,
    pub key_repeat_ms: u64,
    pub direct_latitude_limit: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            pointer_sensitivity: 0.1,
            touch_sensitivity: 0.3,
            pinch_sensitivity: 1.0,
            scale_with_fov: false,
            key_pan_step: 2.0,
            key_repeat_ms: 16,
            direct_latitude_limit: crate::math::DIRECT_LATITUDE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
    pub fov_gnomonic: FovConfig,
    pub fov_stereographic: FovConfig,
    pub zoom: ZoomConfig,
    pub view_rotation: ViewRotationConfig,
    pub interaction: InteractionConfig,
    pub projection: ProjectionMode,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fov_gnomonic: FovConfig::GNOMONIC,
            fov_stereographic: FovConfig::STEREOGRAPHIC,
            zoom: ZoomConfig::default(),
            view_rotation: ViewRotationConfig::default(),
            interaction: InteractionConfig::default(),
            projection: ProjectionMode::default(),
        }
    }
}

/// 旧版配置键名 -> 当前键名，按所在的节分组（None 为顶层）
const LEGACY_KEYS: &[(Option<&str>, &str, &str)] = &[
    (None, "fov_gnomonic", "fovGnomonic"),
    (None, "fov_stereographic", "fovStereographic"),
    (Some("zoom"), "increment", "incrementPerTick"),
    (Some("zoom"), "smoothing", "smoothingConstant"),
    (Some("viewRotation"), "smoothness", "smoothnessConstant"),
];

impl ViewerConfig {
    pub fn fov_config(&self, mode: ProjectionMode) -> &FovConfig {
        match mode {
            ProjectionMode::Gnomonic => &self.fov_gnomonic,
            ProjectionMode::Stereographic => &self.fov_stereographic,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let overlay: Value = serde_json::from_str(text).map_err(|source| ViewerError::Parse {
            what: "viewer config",
            source,
        })?;
        Self::from_json_value(overlay)
    }

    pub fn from_json_value(mut overlay: Value) -> Result<Self> {
        normalize_legacy_keys(&mut overlay);

        let mut merged = serde_json::to_value(ViewerConfig::default()).map_err(|source| {
            ViewerError::Parse {
                what: "default config",
                source,
            }
        })?;
        deep_merge(&mut merged, overlay);

        let mut config: ViewerConfig =
            serde_json::from_value(merged).map_err(|source| ViewerError::Parse {
                what: "viewer config",
                source,
            })?;
        config.sanitize();
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ViewerError::io(path, e))?;
        Self::from_json_str(&text)
    }

    /// 读取失败或格式错误时记录警告并使用默认配置
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded viewer config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}; falling back to default viewer config");
                Self::default()
            }
        }
    }

    /// 非有限值回落默认，min/max 颠倒时交换，初值夹入范围
    pub fn sanitize(&mut self) {
        let defaults = ViewerConfig::default();
        self.fov_gnomonic.sanitize(&defaults.fov_gnomonic);
        self.fov_stereographic.sanitize(&defaults.fov_stereographic);

        let z = &mut self.zoom;
        let dz = defaults.zoom;
        z.increment_per_tick = finite_or(z.increment_per_tick, dz.increment_per_tick);
        z.smoothing_constant = non_negative_or(z.smoothing_constant, dz.smoothing_constant);
        z.wheel_zoom_in = positive_or(z.wheel_zoom_in, dz.wheel_zoom_in);
        z.wheel_zoom_out = positive_or(z.wheel_zoom_out, dz.wheel_zoom_out);

        let r = &mut self.view_rotation;
        let dr = defaults.view_rotation;
        r.init_altitude = finite_or(r.init_altitude, dr.init_altitude).clamp(-90.0, 90.0);
        r.init_azimuth = finite_or(r.init_azimuth, dr.init_azimuth);
        r.auto_rotation_rate = finite_or(r.auto_rotation_rate, dr.auto_rotation_rate);
        r.smoothness_constant = non_negative_or(r.smoothness_constant, dr.smoothness_constant);

        let i = &mut self.interaction;
        let di = defaults.interaction;
        i.pointer_sensitivity = finite_or(i.pointer_sensitivity, di.pointer_sensitivity);
        i.touch_sensitivity = finite_or(i.touch_sensitivity, di.touch_sensitivity);
        i.pinch_sensitivity = finite_or(i.pinch_sensitivity, di.pinch_sensitivity);
        i.key_pan_step = finite_or(i.key_pan_step, di.key_pan_step);
        i.key_repeat_ms = i.key_repeat_ms.max(1);
        if !(i.direct_latitude_limit > 0.0 && i.direct_latitude_limit <= 90.0) {
            i.direct_latitude_limit = di.direct_latitude_limit;
        }
    }
}

fn finite_or(value: f32, default: f32) -> f32 {
    if value.is_finite() { value } else { default }
}

fn non_negative_or(value: f32, default: f32) -> f32 {
    if value.is_finite() && value >= 0.0 { value } else { default }
}

fn positive_or(value: f32, default: f32) -> f32 {
    if value.is_finite() && value > 0.0 { value } else { default }
}

fn normalize_legacy_keys(value: &mut Value) {
    let Some(root) = value.as_object_mut() else {
        return;
    };
    for (section, old, new) in LEGACY_KEYS {
        let target = match section {
            None => Some(&mut *root),
            Some(name) => root.get_mut(*name).and_then(Value::as_object_mut),
        };
        if let Some(obj) = target {
            if let Some(v) = obj.remove(*old) {
                // 新键名优先
                obj.entry(new.to_string()).or_insert(v);
            }
        }
    }
}

/// 对象逐键递归合并，其余类型直接覆盖
fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
