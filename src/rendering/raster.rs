//! CPU compositor for headless rendering and snapshots.

use crate::core::geo::ViewportSize;
use crate::prelude::HashMap;
use crate::rendering::surface::{DecodedImage, RenderSurface, TextureFilter, TextureHandle};
use crate::{MapError, Result};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::path::Path;

struct RasterTexture {
    image: RgbaImage,
    filter: TextureFilter,
}

/// Composites tiles into an in-memory RGBA canvas.
pub struct RasterSurface {
    canvas: RgbaImage,
    background: Rgba<u8>,
    textures: HashMap<TextureHandle, RasterTexture>,
    next_texture: u64,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
            background: Rgba([255, 255, 255, 255]),
            textures: HashMap::default(),
            next_texture: 1,
        }
    }

    pub fn with_background(mut self, rgba: [u8; 4]) -> Self {
        self.background = Rgba(rgba);
        self.canvas = RgbaImage::from_pixel(self.canvas.width(), self.canvas.height(), self.background);
        self
    }

    /// Resizes the canvas. Contents are reset to the background colour.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.canvas = RgbaImage::from_pixel(width, height, self.background);
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x < self.canvas.width() && y < self.canvas.height() {
            Some(self.canvas.get_pixel(x, y).0)
        } else {
            None
        }
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.canvas
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| MapError::Render(format!("failed to save canvas: {}", e)))
    }

    fn to_rgba(image: &DecodedImage) -> Result<RgbaImage> {
        RgbaImage::from_raw(image.width, image.height, image.pixels.clone()).ok_or_else(|| {
            MapError::Render(format!(
                "pixel buffer of {} bytes does not match {}x{}",
                image.pixels.len(),
                image.width,
                image.height
            ))
        })
    }
}

impl RenderSurface for RasterSurface {
    fn initialize(&mut self) -> Result<()> {
        if self.canvas.width() == 0 || self.canvas.height() == 0 {
            return Err(MapError::RenderUnavailable("raster canvas has no area".into()));
        }
        Ok(())
    }

    fn viewport_size(&self) -> ViewportSize {
        ViewportSize::new(self.canvas.width() as i32, self.canvas.height() as i32)
    }

    fn clear(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = self.background;
        }
    }

    fn create_texture(&mut self, image: &DecodedImage, filter: TextureFilter) -> Result<TextureHandle> {
        let image = Self::to_rgba(image)?;
        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(handle, RasterTexture { image, filter });
        Ok(handle)
    }

    fn update_texture(
        &mut self,
        handle: TextureHandle,
        image: &DecodedImage,
        filter: TextureFilter,
    ) -> Result<()> {
        let image = Self::to_rgba(image)?;
        let texture = self
            .textures
            .get_mut(&handle)
            .ok_or_else(|| MapError::Render(format!("unknown texture {:?}", handle)))?;
        texture.image = image;
        texture.filter = filter;
        Ok(())
    }

    fn delete_texture(&mut self, handle: TextureHandle) {
        self.textures.remove(&handle);
    }

    fn draw_texture(&mut self, handle: TextureHandle, x: i32, y: i32, extent: i32) {
        let Some(texture) = self.textures.get(&handle) else {
            log::warn!("draw of unknown texture {:?}", handle);
            return;
        };
        if extent <= 0 {
            return;
        }
        let side = extent as u32;
        if texture.image.width() == side && texture.image.height() == side {
            imageops::overlay(&mut self.canvas, &texture.image, x as i64, y as i64);
        } else {
            let filter = match texture.filter {
                TextureFilter::Mipmap => FilterType::CatmullRom,
                TextureFilter::LinearClamp => FilterType::Triangle,
            };
            let scaled = imageops::resize(&texture.image, side, side, filter);
            imageops::overlay(&mut self.canvas, &scaled, x as i64, y as i64);
        }
    }
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width", &self.canvas.width())
            .field("height", &self.canvas.height())
            .field("textures", &self.textures.len())
            .finish()
    }
}
