// panorama.rs — 全景源图的解码与规整（超限缩放、非 2:1 补齐）

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use glam::Vec4;
use image::io::Reader as ImageReader;
use image::{GenericImage, GenericImageView, Rgba, RgbaImage};

use crate::error::{Result, ViewerError};
use crate::sampler::EquirectTexture;

/// 绑定到查看器上的等矩形图像
#[derive(Debug, Clone)]
pub struct Panorama {
    image: RgbaImage,
}

impl Panorama {
    /// 按纹理尺寸上限规整后绑定
    pub fn new(image: RgbaImage, max_dimension: u32) -> Self {
        Self {
            image: prepare_equirect(image, max_dimension),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl EquirectTexture for Panorama {
    fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    fn texel(&self, x: u32, y: u32) -> Vec4 {
        self.image.texel(x, y)
    }
}

/// 解码任意格式的图片文件（不限制尺寸）
pub fn decode_file(path: &Path) -> Result<RgbaImage> {
    let file = File::open(path).map_err(|e| ViewerError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut reader = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(|e| ViewerError::io(path, e))?;
    reader.no_limits();
    let img = reader.decode()?;

    let (w, h) = img.dimensions();
    log::info!("Decoded {} ({w}x{h})", path.display());
    Ok(img.to_rgba8())
}

/// 超过 GPU 纹理上限时等比缩小；高度不足宽度一半时在顶部补黑，原图贴底
pub fn prepare_equirect(img: RgbaImage, max_dimension: u32) -> RgbaImage {
    let (src_w, src_h) = img.dimensions();

    let img = if max_dimension > 0 && (src_w > max_dimension || src_h > max_dimension) {
        let scale = (max_dimension as f32 / src_w.max(src_h) as f32).min(1.0);
        let new_w = ((src_w as f32 * scale) as u32).max(1);
        let new_h = ((src_h as f32 * scale) as u32).max(1);
        log::info!(
            "Panorama {src_w}x{src_h} exceeds texture limit {max_dimension}, scaling to {new_w}x{new_h}"
        );
        image::DynamicImage::ImageRgba8(img)
            .resize_exact(new_w, new_h, image::imageops::FilterType::Lanczos3)
            .to_rgba8()
    } else {
        img
    };

    let (w, h) = img.dimensions();
    let target_h = w / 2;
    if target_h > 0 && h < target_h {
        log::info!("Panorama {w}x{h} is not 2:1, padding top to {w}x{target_h}");
        let mut canvas = RgbaImage::from_pixel(w, target_h, Rgba([0, 0, 0, 255]));
        let y_offset = target_h - h;
        // y_offset 保证不会越界
        if let Err(e) = canvas.copy_from(&img, 0, y_offset) {
            log::warn!("Failed to pad panorama: {e}");
            return img;
        }
        canvas
    } else {
        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_to_one_untouched() {
        let img = RgbaImage::from_pixel(8, 4, Rgba([1, 2, 3, 255]));
        let out = prepare_equirect(img.clone(), 4096);
        assert_eq!(out, img);
    }

    #[test]
    fn test_short_image_padded_on_top() {
        let img = RgbaImage::from_pixel(8, 2, Rgba([200, 200, 200, 255]));
        let out = prepare_equirect(img, 4096);
        assert_eq!(out.dimensions(), (8, 4));
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(0, 1).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(7, 3).0, [200, 200, 200, 255]);
    }

    #[test]
    fn test_oversized_image_scaled() {
        let img = RgbaImage::from_pixel(64, 32, Rgba([9, 9, 9, 255]));
        let out = prepare_equirect(img, 16);
        assert_eq!(out.dimensions(), (16, 8));
    }

    #[test]
    fn test_decode_missing_file_is_io_error() {
        let err = decode_file(Path::new("/definitely/not/here.jpg")).unwrap_err();
        assert!(matches!(err, ViewerError::Io { .. }));
    }

    #[test]
    fn test_decode_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pano.png");
        let img = RgbaImage::from_pixel(4, 2, Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();
        let decoded = decode_file(&path).unwrap();
        assert_eq!(decoded, img);
    }
}
