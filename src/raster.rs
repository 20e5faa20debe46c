// raster.rs — CPU 离屏渲染：按行分块并行调用 shade_pixel
//
// 屏幕坐标原点在左下角，y 向上；输出图像第 0 行是屏幕顶部。

use glam::{Vec2, Vec4};
use image::{Rgba, RgbaImage};

use crate::sampler::{shade_pixel, EquirectTexture};
use crate::state::FrameUniforms;

/// 尚未绑定图像时输出的颜色
pub const BLANK_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// 渲染一帧。`texture` 为 None 时返回纯黑画面。
pub fn render_frame<T>(texture: Option<&T>, uniforms: &FrameUniforms, width: u32, height: u32) -> RgbaImage
where
    T: EquirectTexture + Sync + ?Sized,
{
    let Some(texture) = texture else {
        return RgbaImage::from_pixel(width, height, BLANK_COLOR);
    };
    if width == 0 || height == 0 {
        return RgbaImage::new(width, height);
    }

    let mut frame = RgbaImage::new(width, height);
    let row_bytes = width as usize * 4;
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(height as usize);
    let rows_per_band = (height as usize).div_ceil(workers);

    std::thread::scope(|scope| {
        for (band, chunk) in frame.chunks_mut(rows_per_band * row_bytes).enumerate() {
            let first_row = band * rows_per_band;
            scope.spawn(move || {
                for (i, row) in chunk.chunks_mut(row_bytes).enumerate() {
                    shade_row(texture, uniforms, row, (first_row + i) as u32, width, height);
                }
            });
        }
    });

    frame
}

fn shade_row<T>(texture: &T, uniforms: &FrameUniforms, row: &mut [u8], y: u32, width: u32, height: u32)
where
    T: EquirectTexture + ?Sized,
{
    let v = 1.0 - (y as f32 + 0.5) / height as f32;
    for (x, px) in row.chunks_exact_mut(4).enumerate() {
        let u = (x as f32 + 0.5) / width as f32;
        let color = shade_pixel(texture, Vec2::new(u, v), uniforms);
        px.copy_from_slice(&to_rgba8(color));
    }
}

fn to_rgba8(color: Vec4) -> [u8; 4] {
    let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
}
