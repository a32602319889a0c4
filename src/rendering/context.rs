use crate::core::geo::ViewportSize;
use crate::prelude::HashMap;
use crate::rendering::surface::{DecodedImage, RenderSurface, TextureFilter, TextureHandle};
use crate::{MapError, Result};

/// Commands that can be issued to the recording surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    Clear,
    Tile {
        texture: TextureHandle,
        x: i32,
        y: i32,
        extent: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRecord {
    pub width: u32,
    pub height: u32,
    pub filter: TextureFilter,
    pub uploads: u32,
}

/// Surface that keeps textures as metadata and queues draw commands instead of
/// rasterizing them. Useful for headless hosts that forward the queue to their
/// own backend, and for inspecting what a frame would draw.
#[derive(Debug)]
pub struct RecordingSurface {
    pub width: i32,
    pub height: i32,
    /// Commands issued since the last clear
    pub drawing_queue: Vec<DrawCommand>,
    textures: HashMap<TextureHandle, TextureRecord>,
    next_texture: u64,
    upload_count: usize,
    culled: usize,
    available: bool,
}

impl RecordingSurface {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            drawing_queue: Vec::new(),
            textures: HashMap::default(),
            next_texture: 1,
            upload_count: 0,
            culled: 0,
            available: true,
        }
    }

    /// A surface that refuses to initialize, as a context-less environment would.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(0, 0)
        }
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        self.width = width;
        self.height = height;
    }

    /// Get the current drawing queue
    pub fn get_drawing_queue(&self) -> &[DrawCommand] {
        &self.drawing_queue
    }

    /// Textures drawn since the last clear, in draw order.
    pub fn drawn_textures(&self) -> Vec<TextureHandle> {
        self.drawing_queue
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::Tile { texture, .. } => Some(*texture),
                DrawCommand::Clear => None,
            })
            .collect()
    }

    pub fn has_texture(&self, handle: TextureHandle) -> bool {
        self.textures.contains_key(&handle)
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&TextureRecord> {
        self.textures.get(&handle)
    }

    pub fn last_filter(&self, handle: TextureHandle) -> Option<TextureFilter> {
        self.textures.get(&handle).map(|t| t.filter)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Image uploads into existing textures (placeholder creation not counted).
    pub fn upload_count(&self) -> usize {
        self.upload_count
    }

    /// Draws skipped because they fell entirely outside the viewport.
    pub fn culled_count(&self) -> usize {
        self.culled
    }

    fn intersects_viewport(&self, x: i32, y: i32, extent: i32) -> bool {
        x < self.width && y < self.height && x + extent > 0 && y + extent > 0
    }
}

impl RenderSurface for RecordingSurface {
    fn initialize(&mut self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(MapError::RenderUnavailable(
                "recording surface marked unavailable".into(),
            ))
        }
    }

    fn viewport_size(&self) -> ViewportSize {
        ViewportSize::new(self.width, self.height)
    }

    fn clear(&mut self) {
        self.drawing_queue.clear();
        self.drawing_queue.push(DrawCommand::Clear);
    }

    fn create_texture(&mut self, image: &DecodedImage, filter: TextureFilter) -> Result<TextureHandle> {
        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(
            handle,
            TextureRecord {
                width: image.width,
                height: image.height,
                filter,
                uploads: 0,
            },
        );
        Ok(handle)
    }

    fn update_texture(
        &mut self,
        handle: TextureHandle,
        image: &DecodedImage,
        filter: TextureFilter,
    ) -> Result<()> {
        let record = self
            .textures
            .get_mut(&handle)
            .ok_or_else(|| MapError::Render(format!("unknown texture {:?}", handle)))?;
        record.width = image.width;
        record.height = image.height;
        record.filter = filter;
        record.uploads += 1;
        self.upload_count += 1;
        Ok(())
    }

    fn delete_texture(&mut self, handle: TextureHandle) {
        self.textures.remove(&handle);
    }

    fn draw_texture(&mut self, texture: TextureHandle, x: i32, y: i32, extent: i32) {
        if !self.intersects_viewport(x, y, extent) {
            self.culled += 1;
            return;
        }
        self.drawing_queue.push(DrawCommand::Tile {
            texture,
            x,
            y,
            extent,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_resets_on_clear() {
        let mut surface = RecordingSurface::new(100, 100);
        let tex = surface
            .create_texture(&DecodedImage::solid(1, 1, [0; 4]), TextureFilter::Mipmap)
            .unwrap();
        surface.draw_texture(tex, 0, 0, 50);
        surface.clear();
        surface.draw_texture(tex, 10, 10, 50);
        assert_eq!(
            surface.get_drawing_queue(),
            &[
                DrawCommand::Clear,
                DrawCommand::Tile {
                    texture: tex,
                    x: 10,
                    y: 10,
                    extent: 50
                }
            ]
        );
    }

    #[test]
    fn test_offscreen_draws_are_culled() {
        let mut surface = RecordingSurface::new(100, 100);
        let tex = surface
            .create_texture(&DecodedImage::solid(1, 1, [0; 4]), TextureFilter::Mipmap)
            .unwrap();
        surface.clear();
        surface.draw_texture(tex, -50, -50, 50);
        surface.draw_texture(tex, 100, 0, 50);
        surface.draw_texture(tex, -49, -49, 50);
        assert_eq!(surface.drawn_textures().len(), 1);
        assert_eq!(surface.culled_count(), 2);
    }

    #[test]
    fn test_update_unknown_texture_fails() {
        let mut surface = RecordingSurface::new(100, 100);
        let result = surface.update_texture(
            TextureHandle(42),
            &DecodedImage::solid(1, 1, [0; 4]),
            TextureFilter::Mipmap,
        );
        assert!(matches!(result, Err(MapError::Render(_))));
    }

    #[test]
    fn test_unavailable_surface_fails_initialize() {
        let mut surface = RecordingSurface::unavailable();
        assert!(matches!(
            surface.initialize(),
            Err(MapError::RenderUnavailable(_))
        ));
    }
}
