use crate::palette::Rgb;
use image::{ImageFormat, Rgba, RgbaImage};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum SurfaceError {
    #[error("nothing has been drawn on the canvas yet")]
    NothingDrawn,
    #[error("failed to write image: {0}")]
    Encode(#[from] image::ImageError),
}

/// A drawable canvas in logical pixels.
pub(crate) trait Surface {
    fn size(&self) -> (u32, u32);
    fn resize(&mut self, width: u32, height: u32);
    fn clear(&mut self, color: Rgb);
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb);
    fn export(&self, path: &Path) -> Result<(), SurfaceError>;
}

/// RGBA canvas backed by an image buffer. Every logical pixel covers
/// `density × density` physical pixels; the factor is fixed at creation.
pub(crate) struct PixelSurface {
    w: u32,
    h: u32,
    density: u32,
    px: RgbaImage,
    drawn: bool,
}

impl PixelSurface {
    pub(crate) fn new(w: u32, h: u32, density: u32) -> Self {
        let density = density.max(1);
        Self {
            w,
            h,
            density,
            px: RgbaImage::new(w * density, h * density),
            drawn: false,
        }
    }

    pub(crate) fn density(&self) -> u32 {
        self.density
    }

    pub(crate) fn physical_size(&self) -> (u32, u32) {
        self.px.dimensions()
    }

    /// Color at the center of a logical pixel.
    pub(crate) fn sample(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.w || y >= self.h {
            return None;
        }
        let half = self.density / 2;
        let p = self
            .px
            .get_pixel(x * self.density + half, y * self.density + half);
        Some(Rgb::new(p[0], p[1], p[2]))
    }

    fn edge(&self, v: f32, limit: u32) -> u32 {
        ((v * self.density as f32).round().max(0.0) as u32).min(limit)
    }
}

impl Surface for PixelSurface {
    fn size(&self) -> (u32, u32) {
        (self.w, self.h)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.w = width;
        self.h = height;
        self.px = RgbaImage::new(width * self.density, height * self.density);
        self.drawn = false;
    }

    fn clear(&mut self, color: Rgb) {
        let fill = Rgba([color.r, color.g, color.b, 255]);
        for p in self.px.pixels_mut() {
            *p = fill;
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        let (pw, ph) = self.px.dimensions();
        // Rounding both edges keeps neighbouring cells seamless.
        let x0 = self.edge(x, pw);
        let x1 = self.edge(x + w, pw);
        let y0 = self.edge(y, ph);
        let y1 = self.edge(y + h, ph);
        let fill = Rgba([color.r, color.g, color.b, 255]);
        for py in y0..y1 {
            for px in x0..x1 {
                self.px.put_pixel(px, py, fill);
            }
        }
        self.drawn = true;
    }

    fn export(&self, path: &Path) -> Result<(), SurfaceError> {
        if !self.drawn {
            return Err(SurfaceError::NothingDrawn);
        }
        self.px.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}
