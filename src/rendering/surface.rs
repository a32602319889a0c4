//! Boundary traits between the tile pipeline and whatever actually draws.

use crate::core::geo::ViewportSize;
use crate::Result;

/// Opaque handle to a texture owned by a [`RenderSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Sampling mode picked when a texture is uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    /// Power-of-two image: mipmaps are generated.
    Mipmap,
    /// Any other size: clamp to edge, linear minification.
    LinearClamp,
}

impl TextureFilter {
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        if is_power_of_two(width) && is_power_of_two(height) {
            TextureFilter::Mipmap
        } else {
            TextureFilter::LinearClamp
        }
    }
}

fn is_power_of_two(v: u32) -> bool {
    v != 0 && (v & (v - 1)) == 0
}

/// A decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Single-colour image, handy for placeholders.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::new(width, height, pixels)
    }
}

/// The graphics binding: texture upload and textured-rectangle drawing.
///
/// Only ever touched from the control thread.
pub trait RenderSurface {
    /// Called once when a renderer takes ownership of the surface. A surface that
    /// cannot render at all reports it here.
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn viewport_size(&self) -> ViewportSize;

    fn clear(&mut self);

    fn create_texture(&mut self, image: &DecodedImage, filter: TextureFilter) -> Result<TextureHandle>;

    /// Replaces the contents of an existing texture.
    fn update_texture(
        &mut self,
        handle: TextureHandle,
        image: &DecodedImage,
        filter: TextureFilter,
    ) -> Result<()>;

    /// Draws `handle` stretched over the square at `(x, y)` with side `extent`.
    fn draw_texture(&mut self, handle: TextureHandle, x: i32, y: i32, extent: i32);

    /// Releases a texture whose entry left the cache.
    fn delete_texture(&mut self, _handle: TextureHandle) {}
}

/// "Run the frame callback once before the next paint."
///
/// Requests are single-shot; the renderer re-arms one whenever it needs another frame.
pub trait FrameScheduler {
    fn request_frame(&self);
}

impl<F: Fn()> FrameScheduler for F {
    fn request_frame(&self) {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_choice() {
        assert_eq!(TextureFilter::for_dimensions(256, 256), TextureFilter::Mipmap);
        assert_eq!(TextureFilter::for_dimensions(512, 128), TextureFilter::Mipmap);
        assert_eq!(TextureFilter::for_dimensions(300, 256), TextureFilter::LinearClamp);
        assert_eq!(TextureFilter::for_dimensions(0, 256), TextureFilter::LinearClamp);
    }

    #[test]
    fn test_solid_image() {
        let image = DecodedImage::solid(2, 3, [1, 2, 3, 4]);
        assert_eq!(image.pixels.len(), 24);
        assert_eq!(&image.pixels[20..24], &[1, 2, 3, 4]);
    }
}
