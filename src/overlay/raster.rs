use std::path::Path;

use font_kit::font::Font;
use image::{DynamicImage, GenericImageView};
use raqote::{
    BlendMode, DrawOptions, DrawTarget, LineJoin, PathBuilder, Point, Source, StrokeStyle,
};

use crate::error::{OverlayError, Result};
use crate::overlay::canvas::{Canvas, Rect};
use crate::overlay::palette::Color;

/// 基于raqote的位图画布
///
/// 没有加载字体时只画标签底色，不画文字。
pub struct RasterCanvas {
    target: DrawTarget,
    font: Option<Font>,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            target: DrawTarget::new(width as i32, height as i32),
            font: None,
        }
    }

    /// 从TrueType/OpenType文件加载标签字体
    pub fn with_font(mut self, path: &Path) -> Result<Self> {
        let font = Font::from_path(path, 0).map_err(|e| {
            OverlayError::Config(format!("无法加载字体 {}: {:?}", path.display(), e))
        })?;
        self.font = Some(font);
        Ok(self)
    }

    pub fn width(&self) -> u32 {
        self.target.width() as u32
    }

    pub fn height(&self) -> u32 {
        self.target.height() as u32
    }

    /// 某个像素的颜色（预乘后的ARGB）
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        self.target
            .get_data()
            .get((y * self.width() + x) as usize)
            .copied()
    }

    /// 只导出叠加层本身（带透明通道）
    pub fn to_image(&self) -> DynamicImage {
        let pixels = argb_to_rgba(self.target.get_data());
        match image::RgbaImage::from_raw(self.width(), self.height(), pixels) {
            Some(buffer) => DynamicImage::ImageRgba8(buffer),
            None => DynamicImage::new_rgba8(self.width(), self.height()),
        }
    }

    /// 把叠加层合成到画面上
    ///
    /// 画面尺寸与画布不一致时返回错误，因为检测框坐标基于画面原始尺寸。
    pub fn compose_over(&self, frame: &DynamicImage) -> Result<DynamicImage> {
        let (width, height) = frame.dimensions();
        if (width, height) != (self.width(), self.height()) {
            return Err(OverlayError::InvalidParameter(format!(
                "画面尺寸 {}x{} 与画布尺寸 {}x{} 不一致",
                width,
                height,
                self.width(),
                self.height()
            )));
        }

        let mut dt = DrawTarget::new(width as i32, height as i32);
        let frame_data = rgba_to_argb(&frame.to_rgba8());
        dt.draw_image_at(
            0.0,
            0.0,
            &raqote::Image {
                width: width as i32,
                height: height as i32,
                data: &frame_data,
            },
            &DrawOptions::new(),
        );
        dt.draw_image_at(
            0.0,
            0.0,
            &raqote::Image {
                width: width as i32,
                height: height as i32,
                data: self.target.get_data(),
            },
            &DrawOptions::new(),
        );

        let pixels = argb_to_rgba(dt.get_data());
        image::RgbaImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| OverlayError::DetectionFailed("无法从渲染数据创建图像".to_string()))
    }
}

impl Canvas for RasterCanvas {
    fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width(), self.height()) {
            self.target = DrawTarget::new(width as i32, height as i32);
        }
    }

    fn clear(&mut self, rect: Rect) {
        let full = Rect::new(0.0, 0.0, self.width() as f32, self.height() as f32);
        if rect == full {
            self.target.clear(Color::TRANSPARENT.to_source());
            return;
        }
        self.target.fill_rect(
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            &Source::Solid(Color::TRANSPARENT.to_source()),
            &DrawOptions {
                blend_mode: BlendMode::Src,
                ..DrawOptions::new()
            },
        );
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32) {
        let mut pb = PathBuilder::new();
        pb.rect(rect.x, rect.y, rect.width, rect.height);
        let path = pb.finish();

        self.target.stroke(
            &path,
            &Source::Solid(color.to_source()),
            &StrokeStyle {
                join: LineJoin::Round,
                width: line_width,
                ..StrokeStyle::default()
            },
            &DrawOptions::new(),
        );
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.target.fill_rect(
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            &Source::Solid(color.to_source()),
            &DrawOptions::new(),
        );
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Color, font_size: f32) {
        let Some(font) = &self.font else {
            return;
        };
        self.target.draw_text(
            font,
            font_size,
            text,
            Point::new(x, y),
            &Source::Solid(color.to_source()),
            &DrawOptions::new(),
        );
    }
}

fn rgba_to_argb(rgba: &[u8]) -> Vec<u32> {
    rgba.chunks_exact(4)
        .map(|p| u32::from_le_bytes([p[2], p[1], p[0], p[3]]))
        .collect()
}

fn argb_to_rgba(argb: &[u32]) -> Vec<u8> {
    argb.iter()
        .flat_map(|&pixel| {
            let [b, g, r, a] = pixel.to_le_bytes();
            [r, g, b, a]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::canvas::DrawList;

    #[test]
    fn test_stroke_then_clear() {
        let mut canvas = RasterCanvas::new(20, 20);
        canvas.stroke_rect(Rect::new(5.0, 5.0, 10.0, 10.0), Color::rgb(0xFF, 0, 0), 2.0);
        assert_ne!(canvas.pixel(5, 10), Some(0));
        assert_eq!(canvas.pixel(10, 10), Some(0));

        canvas.clear(Rect::new(0.0, 0.0, 20.0, 20.0));
        assert_eq!(canvas.pixel(5, 10), Some(0));
    }

    #[test]
    fn test_resize_replaces_surface() {
        let mut canvas = RasterCanvas::new(4, 4);
        canvas.resize(8, 6);
        assert_eq!((canvas.width(), canvas.height()), (8, 6));
        assert_eq!(canvas.pixel(8, 0), None);
    }

    #[test]
    fn test_text_without_font_is_skipped() {
        let mut canvas = RasterCanvas::new(8, 8);
        canvas.fill_text("cat 90%", 0.0, 6.0, Color::WHITE, 6.0);
        assert!(canvas.target.get_data().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_compose_over_frame() {
        let mut list = DrawList::new();
        list.resize(10, 10);
        list.fill_rect(Rect::new(0.0, 0.0, 5.0, 10.0), Color::rgb(0, 0, 0xFF));

        let mut canvas = RasterCanvas::new(1, 1);
        list.replay(&mut canvas);

        let frame = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            10,
            10,
            image::Rgba([0, 255, 0, 255]),
        ));
        let composed = canvas.compose_over(&frame).unwrap().to_rgba8();
        assert_eq!(composed.get_pixel(2, 2).0, [0, 0, 255, 255]);
        assert_eq!(composed.get_pixel(7, 2).0, [0, 255, 0, 255]);
    }

    #[test]
    fn test_compose_rejects_size_mismatch() {
        let canvas = RasterCanvas::new(4, 4);
        assert!(canvas.compose_over(&DynamicImage::new_rgba8(5, 4)).is_err());
    }
}
