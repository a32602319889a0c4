pub mod events;

// Re-export the essential types
pub use events::{touch_event, InputEvent, KeyCode, TouchPhase, TouchPoint};
