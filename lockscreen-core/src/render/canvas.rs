//! `embedded-graphics` draw target over an RGBA image buffer.

use std::convert::Infallible;

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use image::{Rgba, RgbaImage};

/// Draws into an [`RgbaImage`].
///
/// Logical pixels are moved by `offset`, enlarged to `scale` x `scale`
/// blocks and mixed over the existing pixel at `opacity`. Anything outside
/// the clip rectangle is dropped.
pub struct Canvas<'a> {
    image: &'a mut RgbaImage,
    offset: Point,
    scale: u32,
    opacity: f32,
    clip: Rectangle,
}

impl<'a> Canvas<'a> {
    pub fn new(image: &'a mut RgbaImage) -> Self {
        let clip = Rectangle::new(Point::zero(), Size::new(image.width(), image.height()));
        Canvas {
            image,
            offset: Point::zero(),
            scale: 1,
            opacity: 1.0,
            clip,
        }
    }

    /// Restrict drawing to `clip`, in image coordinates.
    pub fn with_clip(mut self, clip: Rectangle) -> Self {
        self.clip = self.clip.intersection(&clip);
        self
    }

    pub fn with_offset(mut self, offset: Point) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.max(1);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    fn in_clip(&self, x: i32, y: i32) -> bool {
        let left = self.clip.top_left.x;
        let top = self.clip.top_left.y;
        let right = i64::from(left) + i64::from(self.clip.size.width);
        let bottom = i64::from(top) + i64::from(self.clip.size.height);
        x >= left && y >= top && i64::from(x) < right && i64::from(y) < bottom
    }

    fn blend(&mut self, x: i32, y: i32, color: Rgb888) {
        if !self.in_clip(x, y) {
            return;
        }

        let alpha = self.opacity;
        let mix =
            |under: u8, over: u8| (f32::from(under) * (1.0 - alpha) + f32::from(over) * alpha).round() as u8;

        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        *pixel = Rgba([
            mix(pixel[0], color.r()),
            mix(pixel[1], color.g()),
            mix(pixel[2], color.b()),
            255,
        ]);
    }
}

impl OriginDimensions for Canvas<'_> {
    fn size(&self) -> Size {
        Size::new(
            self.image.width() / self.scale,
            self.image.height() / self.scale,
        )
    }
}

impl DrawTarget for Canvas<'_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let scale = i32::try_from(self.scale).unwrap_or(i32::MAX);

        for Pixel(point, color) in pixels {
            let x0 = self.offset.x.saturating_add(point.x.saturating_mul(scale));
            let y0 = self.offset.y.saturating_add(point.y.saturating_mul(scale));

            for dy in 0..scale {
                for dx in 0..scale {
                    self.blend(x0.saturating_add(dx), y0.saturating_add(dy), color);
                }
            }
        }

        Ok(())
    }
}
