use serde::{Deserialize, Serialize};

/// Input events the map controller understands. Hosts translate their
/// windowing system's events into these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Mouse button or single finger down
    PointerDown { x: f64, y: f64 },
    /// Pointer move; pans only while a drag is active
    PointerMove { x: f64, y: f64 },
    PointerUp,
    /// Scroll wheel; negative `delta_y` zooms in
    Wheel { delta_y: f64 },
    KeyDown { key: KeyCode },
    KeyUp { key: KeyCode },
    /// Two fingers down, `distance` apart in pixels
    PinchStart { distance: f64 },
    PinchMove { distance: f64 },
    PinchEnd,
    /// The viewport changed size. Surfaces are resized by the host beforehand.
    Resize { width: i32, height: i32 },
}

/// Keyboard key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Other(u32),
}

impl KeyCode {
    /// Maps a DOM `keyCode` value.
    pub fn from_dom(code: u32) -> Self {
        match code {
            37 => KeyCode::ArrowLeft,
            38 => KeyCode::ArrowUp,
            39 => KeyCode::ArrowRight,
            40 => KeyCode::ArrowDown,
            other => KeyCode::Other(other),
        }
    }

    pub fn is_arrow(&self) -> bool {
        !matches!(self, KeyCode::Other(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchPhase {
    Start,
    Move,
    End,
}

/// Individual touch point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

impl TouchPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &TouchPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Folds a raw touch event into pointer or pinch events. One finger drags and two
/// fingers pinch. Lifting any finger ends both gestures.
pub fn touch_event(phase: TouchPhase, touches: &[TouchPoint]) -> Option<InputEvent> {
    match (phase, touches) {
        (TouchPhase::End, _) => Some(InputEvent::PointerUp),
        (TouchPhase::Start, [t]) => Some(InputEvent::PointerDown { x: t.x, y: t.y }),
        (TouchPhase::Move, [t]) => Some(InputEvent::PointerMove { x: t.x, y: t.y }),
        (TouchPhase::Start, [a, b]) => Some(InputEvent::PinchStart {
            distance: a.distance_to(b),
        }),
        (TouchPhase::Move, [a, b]) => Some(InputEvent::PinchMove {
            distance: a.distance_to(b),
        }),
        _ => None,
    }
}
