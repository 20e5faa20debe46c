// projection.rs — 屏幕坐标到等矩形纹理坐标的投影（Gnomonic / Stereographic）
//
// 坐标约定：
// - screen_uv: 全屏四边形上的 [0,1]²，(0,0) 左下，y 向上
// - central_point: (经度 / 2π, (纬度 + π/2) / π)
// - 返回值 sphere_uv: x 为经度 [0,1)，y 为纬度 [0,1]（1 = 北极，对应图像顶行）

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::math::wrap_unit;

/// 除零保护：ρ→0（屏幕中心）时用下限代替分支，避免中心出现接缝
const MIN_RHO: f32 = 1e-6;

/// Gnomonic 在 |lat| 超过该值时经度强制取中心经度
const GNOMONIC_POLE_LAT: f32 = 0.499 * PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    Gnomonic,      // 0. 直线透视，FOV 远小于 180°
    #[default]
    Stereographic, // 1. 立体/小行星，支持很大的 FOV
}

impl ProjectionMode {
    pub const ALL: [ProjectionMode; 2] = [ProjectionMode::Gnomonic, ProjectionMode::Stereographic];

    /// uniform / 偏好文件里使用的编号
    pub fn index(self) -> u32 {
        match self {
            ProjectionMode::Gnomonic => 0,
            ProjectionMode::Stereographic => 1,
        }
    }

    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(ProjectionMode::Gnomonic),
            1 => Some(ProjectionMode::Stereographic),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ProjectionMode::Gnomonic => ProjectionMode::Stereographic,
            ProjectionMode::Stereographic => ProjectionMode::Gnomonic,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProjectionMode::Gnomonic => "gnomonic",
            ProjectionMode::Stereographic => "stereographic",
        }
    }

    pub fn project(self, screen_uv: Vec2, central_point: Vec2, fov_radians: f32, aspect: f32) -> Vec2 {
        match self {
            ProjectionMode::Gnomonic => Gnomonic.project(screen_uv, central_point, fov_radians, aspect),
            ProjectionMode::Stereographic => {
                Stereographic.project(screen_uv, central_point, fov_radians, aspect)
            }
        }
    }
}

impl std::str::FromStr for ProjectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gnomonic" | "rectilinear" | "0" => Ok(ProjectionMode::Gnomonic),
            "stereographic" | "stereo" | "1" => Ok(ProjectionMode::Stereographic),
            other => Err(format!("unknown projection mode: {other}")),
        }
    }
}

/// 单一投影策略：屏幕点 -> 球面纹理坐标
pub trait Projector {
    fn project(&self, screen_uv: Vec2, central_point: Vec2, fov_radians: f32, aspect: f32) -> Vec2;
}

/// 切平面（针孔相机）投影
#[derive(Debug, Clone, Copy, Default)]
pub struct Gnomonic;

/// 立体投影，FOV 按四分之一角缩放：FOV 越大视野越广
#[derive(Debug, Clone, Copy, Default)]
pub struct Stereographic;

impl Projector for Gnomonic {
    fn project(&self, screen_uv: Vec2, central_point: Vec2, fov_radians: f32, aspect: f32) -> Vec2 {
        let cp = central_angles(central_point);
        let tan_half_fov = (fov_radians * 0.5).tan();
        let sp = (screen_uv * 2.0 - Vec2::ONE) * Vec2::new(aspect * tan_half_fov, tan_half_fov);

        let rho = sp.length();
        let c = rho.atan();
        let (lat, lon) = inverse_azimuthal(sp, rho, c, cp);

        // 极点附近经度数值爆炸，直接取中心经度
        let lon = if lat.abs() > GNOMONIC_POLE_LAT { cp.x } else { lon };
        to_sphere_uv(lon, lat)
    }
}

impl Projector for Stereographic {
    fn project(&self, screen_uv: Vec2, central_point: Vec2, fov_radians: f32, aspect: f32) -> Vec2 {
        let cp = central_angles(central_point);
        let scale = (fov_radians * 0.25).tan();
        let sp = (screen_uv - Vec2::splat(0.5)) * 2.0 * Vec2::new(aspect, 1.0) * scale;

        let rho = sp.length();
        let c = 2.0 * rho.atan();
        let (lat, lon) = inverse_azimuthal(sp, rho, c, cp);
        to_sphere_uv(lon, lat)
    }
}

/// 视角中心 -> 着色器使用的中心点
pub fn central_point(lon_radians: f32, lat_radians: f32) -> Vec2 {
    Vec2::new(lon_radians / TAU, (lat_radians + FRAC_PI_2) / PI)
}

pub fn project_screen_to_sphere(
    screen_uv: Vec2,
    central_point: Vec2,
    fov_radians: f32,
    aspect: f32,
    mode: ProjectionMode,
) -> Vec2 {
    mode.project(screen_uv, central_point, fov_radians, aspect)
}

fn central_angles(central_point: Vec2) -> Vec2 {
    Vec2::new(central_point.x * TAU, central_point.y * PI - FRAC_PI_2)
}

/// 方位投影的反变换，c 为到中心的角距离。返回 (lat, lon)，弧度。
fn inverse_azimuthal(sp: Vec2, rho: f32, c: f32, cp: Vec2) -> (f32, f32) {
    let (sin_c, cos_c) = c.sin_cos();
    let (sin_cy, cos_cy) = cp.y.sin_cos();

    let sin_lat = cos_c * sin_cy + (sp.y * sin_c * cos_cy) / rho.max(MIN_RHO);
    let lat = sin_lat.clamp(-1.0, 1.0).asin();
    let lon = cp.x + (sp.x * sin_c).atan2(rho * cos_cy * cos_c - sp.y * sin_cy * sin_c);
    (lat, lon)
}

fn to_sphere_uv(lon: f32, lat: f32) -> Vec2 {
    Vec2::new(wrap_unit(lon / TAU), (lat / PI + 0.5).clamp(0.0, 1.0))
}
