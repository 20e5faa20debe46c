// sampler.rs — 等矩形纹理采样：显式双线性、4×4 超采样抗锯齿、极点接缝混合
//
// 与 shader_equirect.wgsl 保持同一套公式，CPU 路径用于离屏渲染和测试。

use glam::{Vec2, Vec4};
use image::RgbaImage;

use crate::math::{smoothstep, wrap_unit};
use crate::projection::{central_point, ProjectionMode};
use crate::state::FrameUniforms;

/// 超采样步长（纹理坐标单位），4×4 个采样点
pub const AA_SCALE: f32 = 0.5 / 2048.0;
pub const AA_GRID: usize = 4;

/// 极点混合阈值：smoothstep(POLE_EDGE0, POLE_EDGE1, |2v - 1|)
pub const POLE_EDGE0: f32 = 0.99;
pub const POLE_EDGE1: f32 = 1.0;

const POLE_ROW_NORTH: f32 = 0.9999;
const POLE_ROW_SOUTH: f32 = 0.0001;

/// 等矩形源图。v = 1 对应第 0 行（北极）。
pub trait EquirectTexture {
    fn dimensions(&self) -> (u32, u32);

    /// 颜色分量归一化到 [0,1]
    fn texel(&self, x: u32, y: u32) -> Vec4;
}

impl EquirectTexture for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn texel(&self, x: u32, y: u32) -> Vec4 {
        let p = self.get_pixel(x, y).0;
        Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / 255.0
    }
}

/// 双线性采样：x 方向按纹理宽度取模环绕（经度接缝），y 方向夹取到 [0, h-1]（极点边缘）
pub fn sample_bilinear<T: EquirectTexture + ?Sized>(texture: &T, sphere_uv: Vec2) -> Vec4 {
    let (w, h) = texture.dimensions();
    if w == 0 || h == 0 {
        return Vec4::ZERO;
    }

    let u = wrap_unit(sphere_uv.x);
    let v = sphere_uv.y.clamp(0.0, 1.0);

    let texel = Vec2::new(u * w as f32, (1.0 - v) * h as f32) - Vec2::splat(0.5);
    let base = texel.floor();
    let t = texel - base;

    let wi = w as i64;
    let x0 = (base.x as i64).rem_euclid(wi);
    let x1 = (x0 + 1) % wi;
    let y0 = (base.y as i64).clamp(0, h as i64 - 1);
    let y1 = (base.y as i64 + 1).clamp(0, h as i64 - 1);

    let tx0y0 = texture.texel(x0 as u32, y0 as u32);
    let tx1y0 = texture.texel(x1 as u32, y0 as u32);
    let tx0y1 = texture.texel(x0 as u32, y1 as u32);
    let tx1y1 = texture.texel(x1 as u32, y1 as u32);

    let row0 = tx0y0.lerp(tx1y0, t.x);
    let row1 = tx0y1.lerp(tx1y1, t.x);
    row0.lerp(row1, t.y)
}

/// 4×4 子像素偏移各做一次投影+采样后取平均
pub fn sample_anti_aliased<T: EquirectTexture + ?Sized>(
    texture: &T,
    screen_uv: Vec2,
    central_point: Vec2,
    fov_radians: f32,
    aspect: f32,
    mode: ProjectionMode,
) -> Vec4 {
    let mut color = Vec4::ZERO;
    for i in 0..AA_GRID {
        for j in 0..AA_GRID {
            let offset = Vec2::new(i as f32, j as f32) * AA_SCALE;
            let coord = mode.project(screen_uv + offset, central_point, fov_radians, aspect);
            color += sample_bilinear(texture, coord);
        }
    }
    color / (AA_GRID * AA_GRID) as f32
}

/// 纹理上下边缘附近向极点行的颜色过渡，遮住楔形接缝
pub fn blend_pole_seam<T: EquirectTexture + ?Sized>(texture: &T, color: Vec4, sphere_uv: Vec2) -> Vec4 {
    let transition = pole_transition(sphere_uv.y);
    if transition <= 0.0 {
        return color;
    }

    let pole_v = if sphere_uv.y > 0.5 { POLE_ROW_NORTH } else { POLE_ROW_SOUTH };
    let pole_color = sample_bilinear(texture, Vec2::new(sphere_uv.x, pole_v));
    color.lerp(pole_color, transition)
}

pub fn pole_transition(v: f32) -> f32 {
    smoothstep(POLE_EDGE0, POLE_EDGE1, (2.0 * v - 1.0).abs())
}

/// 单个像素的完整管线：投影 -> 超采样 -> 极点混合
pub fn shade_pixel<T: EquirectTexture + ?Sized>(texture: &T, screen_uv: Vec2, uniforms: &FrameUniforms) -> Vec4 {
    let cp = central_point(uniforms.lon_radians, uniforms.lat_radians);
    let fov_radians = uniforms.fov_degrees.to_radians();
    let mode = uniforms.projection_mode;

    let coord = mode.project(screen_uv, cp, fov_radians, uniforms.aspect);
    let color = sample_anti_aliased(texture, screen_uv, cp, fov_radians, uniforms.aspect, mode);
    blend_pole_seam(texture, color, coord)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn approx(a: Vec4, b: Vec4) -> bool {
        (a - b).abs().max_element() < 1e-4
    }

    fn gray(level: u8) -> Vec4 {
        Vec4::new(level as f32, level as f32, level as f32, 255.0) / 255.0
    }

    /// 4×2：第 0 行 0,40,80,120；第 1 行 200,210,220,230
    fn stripes() -> RgbaImage {
        let rows = [[0u8, 40, 80, 120], [200, 210, 220, 230]];
        RgbaImage::from_fn(4, 2, |x, y| {
            let l = rows[y as usize][x as usize];
            Rgba([l, l, l, 255])
        })
    }

    #[test]
    fn test_bilinear_hits_texel_centers() {
        let tex = stripes();
        // 第 0 行在 v 的上半部分
        let uv = Vec2::new(1.5 / 4.0, 1.0 - 0.5 / 2.0);
        assert!(approx(sample_bilinear(&tex, uv), gray(40)));
        let uv = Vec2::new(3.5 / 4.0, 0.5 / 2.0);
        assert!(approx(sample_bilinear(&tex, uv), gray(230)));
    }

    #[test]
    fn test_bilinear_wraps_horizontally() {
        let tex = stripes();
        // u = 0 恰好落在最后一列与第一列之间
        let c = sample_bilinear(&tex, Vec2::new(0.0, 0.75));
        assert!(approx(c, gray(60)), "{c:?}");
        let wrapped = sample_bilinear(&tex, Vec2::new(1.0, 0.75));
        assert!(approx(c, wrapped));
    }

    #[test]
    fn test_bilinear_clamps_vertically() {
        let tex = stripes();
        let top = sample_bilinear(&tex, Vec2::new(1.5 / 4.0, 1.0));
        assert!(approx(top, gray(40)), "{top:?}");
        let bottom = sample_bilinear(&tex, Vec2::new(1.5 / 4.0, 0.0));
        assert!(approx(bottom, gray(210)), "{bottom:?}");
        let beyond = sample_bilinear(&tex, Vec2::new(1.5 / 4.0, -3.0));
        assert!(approx(beyond, bottom));
    }

    #[test]
    fn test_empty_texture_is_blank() {
        let tex = RgbaImage::new(0, 0);
        assert_eq!(sample_bilinear(&tex, Vec2::splat(0.5)), Vec4::ZERO);
    }

    #[test]
    fn test_anti_aliased_on_flat_texture() {
        let tex = RgbaImage::from_pixel(64, 32, Rgba([10, 20, 30, 255]));
        let cp = central_point(1.0, 0.3);
        for mode in ProjectionMode::ALL {
            let c = sample_anti_aliased(&tex, Vec2::new(0.3, 0.6), cp, 1.6, 1.3, mode);
            let expected = Vec4::new(10.0, 20.0, 30.0, 255.0) / 255.0;
            assert!(approx(c, expected), "{mode:?}: {c:?}");
        }
    }

    #[test]
    fn test_pole_blend_threshold() {
        let tex = stripes();
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        // 远离极点不变
        assert_eq!(blend_pole_seam(&tex, red, Vec2::new(0.2, 0.5)), red);
        assert_eq!(blend_pole_seam(&tex, red, Vec2::new(0.2, 0.99)), red);
        // 到达边缘时完全取极点行颜色
        let north = blend_pole_seam(&tex, red, Vec2::new(1.5 / 4.0, 1.0));
        assert!(approx(north, sample_bilinear(&tex, Vec2::new(1.5 / 4.0, POLE_ROW_NORTH))));
        let south = blend_pole_seam(&tex, red, Vec2::new(1.5 / 4.0, 0.0));
        assert!(approx(south, sample_bilinear(&tex, Vec2::new(1.5 / 4.0, POLE_ROW_SOUTH))));
    }

    #[test]
    fn test_shade_pixel_center_matches_source() {
        // 8×4，每列不同颜色；视角中心对准第 2 列中心、赤道
        let tex = RgbaImage::from_fn(8, 4, |x, _| Rgba([(x * 30) as u8, 0, 0, 255]));
        let lon = (2.5 / 8.0) * std::f32::consts::TAU;
        let uniforms = FrameUniforms {
            lon_radians: lon,
            lat_radians: 0.0,
            fov_degrees: 1.0,
            aspect: 1.0,
            projection_mode: ProjectionMode::Gnomonic,
        };
        let c = shade_pixel(&tex, Vec2::splat(0.5), &uniforms);
        assert!((c.x - 60.0 / 255.0).abs() < 0.02, "{c:?}");
    }
}
