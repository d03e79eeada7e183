use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD};
use png::{BitDepth, ColorType, Encoder};

use crate::{
    error::{AppError, Result},
    types::Color,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn square(x: u32, y: u32, side: u32) -> Self {
        Self::new(x, y, side, side)
    }
}

/// Opaque RGB raster, row-major, 3 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        let data = background
            .channels()
            .repeat(width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let offset = self.offset(x, y)?;
        let [r, g, b] = [self.data[offset], self.data[offset + 1], self.data[offset + 2]];
        Some(Color::rgb(r, g, b))
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| (y as usize * self.width as usize + x as usize) * 3)
    }

    /// Blends `color` over the pixel at `alpha` (0.0 keeps, 1.0 replaces).
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Color, alpha: f32) {
        let Some(offset) = self.offset(x, y) else {
            return;
        };
        let alpha = alpha.clamp(0.0, 1.0);
        for (channel, value) in color.channels().into_iter().enumerate() {
            let under = self.data[offset + channel] as f32;
            self.data[offset + channel] = (value as f32 * alpha + under * (1.0 - alpha)).round() as u8;
        }
    }

    /// Fills the rectangle, clipped to the surface.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let x_end = rect.x.saturating_add(rect.width).min(self.width);
        let y_end = rect.y.saturating_add(rect.height).min(self.height);
        let channels = color.channels();
        for row in rect.y..y_end {
            for col in rect.x..x_end {
                if let Some(offset) = self.offset(col, row) {
                    self.data[offset..offset + 3].copy_from_slice(&channels);
                }
            }
        }
    }

    /// Draws a `line_width` border on the inside edge of the rectangle.
    pub fn stroke_rect(&mut self, rect: Rect, color: Color, alpha: f32, line_width: u32) {
        let Rect {
            x,
            y,
            width,
            height,
        } = rect;
        if width == 0 || height == 0 || line_width == 0 {
            return;
        }
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        let (right, bottom) = (
            x.saturating_add(width).saturating_sub(line_width),
            y.saturating_add(height).saturating_sub(line_width),
        );
        for row in y..y_end {
            for col in x..x_end {
                let on_edge = col < x + line_width
                    || row < y + line_width
                    || col >= right
                    || row >= bottom;
                if on_edge {
                    self.blend_pixel(col, row, color, alpha);
                }
            }
        }
    }

    pub fn horizontal_line(&mut self, y: u32, color: Color) {
        self.fill_rect(Rect::new(0, y, self.width, 1), color);
    }

    pub fn vertical_line(&mut self, x: u32, color: Color) {
        self.fill_rect(Rect::new(x, 0, 1, self.height), color);
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut png_data = Vec::new();
        {
            let mut encoder = Encoder::new(Cursor::new(&mut png_data), self.width, self.height);
            encoder.set_color(ColorType::Rgb);
            encoder.set_depth(BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| AppError::PngError(format!("PNG header error: {e}")))?;
            writer
                .write_image_data(&self.data)
                .map_err(|e| AppError::PngError(format!("PNG write error: {e}")))?;
        }
        Ok(png_data)
    }

    pub fn to_data_url(&self) -> Result<String> {
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(self.encode_png()?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_is_clipped_to_surface() {
        let mut surface = Surface::new(4, 4, Color::WHITE);
        surface.fill_rect(Rect::square(2, 2, 10), Color::rgb(1, 2, 3));
        assert_eq!(surface.pixel(3, 3), Some(Color::rgb(1, 2, 3)));
        assert_eq!(surface.pixel(1, 1), Some(Color::WHITE));
        assert_eq!(surface.pixel(4, 0), None);
    }

    #[test]
    fn translucent_stroke_blends_border_only() {
        let mut surface = Surface::new(10, 10, Color::WHITE);
        surface.stroke_rect(Rect::square(0, 0, 10), Color::rgb(0, 0, 0), 0.2, 1);
        assert_eq!(surface.pixel(0, 5), Some(Color::rgb(204, 204, 204)));
        assert_eq!(surface.pixel(9, 9), Some(Color::rgb(204, 204, 204)));
        assert_eq!(surface.pixel(5, 5), Some(Color::WHITE));
    }

    #[test]
    fn png_has_signature_and_data_url_prefix() {
        let surface = Surface::new(3, 2, Color::WHITE);
        let png = surface.encode_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        assert!(surface.to_data_url().unwrap().starts_with("data:image/png;base64,iVBOR"));
    }
}
