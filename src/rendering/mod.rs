pub mod context;
pub mod raster;
pub mod renderer;
pub mod surface;

// Re-export main types
pub use context::{DrawCommand, RecordingSurface};
pub use raster::RasterSurface;
pub use renderer::{MapRenderer, RedrawState, TileRenderer};
pub use surface::{DecodedImage, FrameScheduler, RenderSurface, TextureFilter, TextureHandle};
