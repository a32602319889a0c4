use crate::{
    core::{
        config::{AnimationConfig, InteractionConfig, MapConfig},
        geo::Position,
        projection::pan_by_pixels_scaled,
    },
    input::{InputEvent, KeyCode},
    rendering::renderer::TileRenderer,
    tiles::{
        source::{OpenStreetMapSource, TemplateSource, TileSource},
        tile_set::{TileSetCalculator, Zooming},
    },
    MapError, Result,
};
use instant::Instant;
use std::sync::Arc;

/// Callback receiving the new value of a changed coordinate.
pub type ChangeCallback = Box<dyn FnMut(f64)>;

/// Position-change notifications. Each fires only when its value actually changed.
#[derive(Default)]
pub struct MapEvents {
    pub on_lat_changed: Option<ChangeCallback>,
    pub on_lon_changed: Option<ChangeCallback>,
    pub on_zoom_changed: Option<ChangeCallback>,
}

impl MapEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_lat_changed(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.on_lat_changed = Some(Box::new(f));
        self
    }

    pub fn on_lon_changed(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.on_lon_changed = Some(Box::new(f));
        self
    }

    pub fn on_zoom_changed(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.on_zoom_changed = Some(Box::new(f));
        self
    }

    fn fire(callback: &mut Option<ChangeCallback>, value: f64) {
        if let Some(f) = callback.as_mut() {
            f(value);
        }
    }
}

impl std::fmt::Debug for MapEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapEvents")
            .field("on_lat_changed", &self.on_lat_changed.is_some())
            .field("on_lon_changed", &self.on_lon_changed.is_some())
            .field("on_zoom_changed", &self.on_zoom_changed.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    start_x: f64,
    start_y: f64,
    start: Position,
}

#[derive(Debug, Clone, Copy)]
struct PinchState {
    start_zoom: f64,
    start_distance: f64,
}

/// Step animation toward a target centre. One chain per controller; retargeting
/// moves the goal without restarting the chain.
#[derive(Debug, Clone, Copy, Default)]
struct AnimationState {
    target_lat: f64,
    target_lon: f64,
    active: bool,
    next_step_at: Option<Instant>,
}

/// The single authority over the view: owns the position, applies input, and
/// pushes tile sets to every renderer.
pub struct MapController {
    position: Position,
    min_zoom: f64,
    max_zoom: f64,
    events: MapEvents,
    renderers: Vec<Box<dyn TileRenderer>>,
    calculator: TileSetCalculator,
    animation_config: AnimationConfig,
    interaction: InteractionConfig,
    animation: AnimationState,
    drag: Option<DragState>,
    pinch: Option<PinchState>,
    arrow_down: bool,
}

impl MapController {
    /// Controller with default bounds, animation and interaction settings.
    pub fn new(position: Position, calculator: TileSetCalculator, events: MapEvents) -> Self {
        let defaults = MapConfig::default();
        let calculator = calculator.with_zoom_limits(defaults.min_zoom, defaults.max_zoom);
        Self {
            position,
            min_zoom: defaults.min_zoom,
            max_zoom: defaults.max_zoom,
            events,
            renderers: Vec::new(),
            calculator,
            animation_config: defaults.animation,
            interaction: defaults.interaction,
            animation: AnimationState {
                target_lat: position.lat,
                target_lon: position.lon,
                ..Default::default()
            },
            drag: None,
            pinch: None,
            arrow_down: false,
        }
    }

    /// Builds a controller, and its tile source and calculator, from a validated config.
    pub fn from_config(config: &MapConfig, events: MapEvents) -> Result<Self> {
        config.validate()?;
        let source: Arc<dyn TileSource> = match &config.tile_url_template {
            Some(template) => Arc::new(TemplateSource::new(template.clone())),
            None => Arc::new(OpenStreetMapSource::default()),
        };
        let calculator = TileSetCalculator::new(source, config.tiles.tile_size)
            .with_margin(config.tiles.margin)
            .with_scale_mode(config.tiles.scale_mode);

        let mut controller = Self::new(config.initial_position, calculator, events);
        controller.set_zoom_limits(config.min_zoom, config.max_zoom)?;
        controller.animation_config = config.animation.clone();
        controller.interaction = config.interaction.clone();
        Ok(controller)
    }

    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) -> Result<()> {
        if !(min_zoom >= 0.0 && min_zoom <= max_zoom) {
            return Err(MapError::Config(format!(
                "invalid zoom limits [{}, {}]",
                min_zoom, max_zoom
            )));
        }
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.calculator = self.calculator.clone().with_zoom_limits(min_zoom, max_zoom);
        Ok(())
    }

    pub fn add_renderer<R: TileRenderer + 'static>(&mut self, renderer: R) {
        self.renderers.push(Box::new(renderer));
    }

    pub fn renderer_count(&self) -> usize {
        self.renderers.len()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn zoom(&self) -> f64 {
        self.position.zoom
    }

    pub fn lat(&self) -> f64 {
        self.position.lat
    }

    pub fn lon(&self) -> f64 {
        self.position.lon
    }

    pub fn zoom_limits(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }

    pub fn calculator(&self) -> &TileSetCalculator {
        &self.calculator
    }

    pub fn is_animating(&self) -> bool {
        self.animation.active
    }

    pub fn animation_target(&self) -> (f64, f64) {
        (self.animation.target_lat, self.animation.target_lon)
    }

    /// Moves the view. Returns `false` without changing anything when `zoom` is
    /// outside the limits or the position is unchanged.
    pub fn set_position(&mut self, zoom: f64, lat: f64, lon: f64) -> bool {
        if !(zoom >= self.min_zoom && zoom <= self.max_zoom) {
            log::debug!(
                "rejecting zoom {} outside [{}, {}]",
                zoom,
                self.min_zoom,
                self.max_zoom
            );
            return false;
        }
        let current = self.position;
        if zoom == current.zoom && lat == current.lat && lon == current.lon {
            return false;
        }

        let zooming = Zooming::between(current.zoom, zoom);
        self.position = Position::new(zoom, lat, lon);
        if zoom != current.zoom {
            MapEvents::fire(&mut self.events.on_zoom_changed, zoom);
        }
        if lat != current.lat {
            MapEvents::fire(&mut self.events.on_lat_changed, lat);
        }
        if lon != current.lon {
            MapEvents::fire(&mut self.events.on_lon_changed, lon);
        }

        self.update(zooming);
        true
    }

    /// Shifts the centre by a screen-space delta at the current zoom.
    pub fn pan_by_pixels(&mut self, dx: f64, dy: f64) -> bool {
        let Position { zoom, lat, lon } = self.position;
        let (lat, lon) = pan_by_pixels_scaled(
            zoom,
            lat,
            lon,
            dx,
            dy,
            self.calculator.tile_size(),
            self.calculator.scale_mode(),
        );
        self.set_position(zoom, lat, lon)
    }

    /// Starts (or retargets) a step animation toward `(lat, lon)`. The first step
    /// runs on the next [`tick`](Self::tick).
    pub fn animate_to(&mut self, lat: f64, lon: f64) {
        self.animation.target_lat = lat;
        self.animation.target_lon = lon;
        if !self.animation.active {
            self.animation.active = true;
            self.animation.next_step_at = None;
        }
    }

    pub fn stop_animation(&mut self) {
        self.animation.active = false;
        self.animation.next_step_at = None;
    }

    /// Moves one step toward the animation target on each axis, snapping to the
    /// target once within a step. Returns whether the animation continues.
    pub fn step_animation(&mut self) -> bool {
        if !self.animation.active {
            return false;
        }
        let (target_lat, target_lon) = self.animation_target();
        let Position { zoom, lat, lon } = self.position;
        if lat == target_lat && lon == target_lon {
            self.stop_animation();
            return false;
        }

        let step = self.animation_config.step;
        let new_lat = step_toward(lat, target_lat, step);
        let new_lon = step_toward(lon, target_lon, step);
        self.set_position(zoom, new_lat, new_lon);

        if new_lat == target_lat && new_lon == target_lon {
            self.stop_animation();
            return false;
        }
        true
    }

    /// Drives the animation from the host's clock: steps when the interval has
    /// elapsed. Returns whether the animation is still running.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.animation.active {
            return false;
        }
        if let Some(due) = self.animation.next_step_at {
            if now < due {
                return true;
            }
        }
        let running = self.step_animation();
        self.animation.next_step_at = running.then(|| now + self.animation_config.interval());
        running
    }

    /// Recomputes the tile set for every renderer's viewport and hands it over.
    pub fn update(&mut self, zooming: Zooming) {
        let position = self.position;
        for renderer in self.renderers.iter_mut() {
            let viewport = renderer.viewport_size();
            let tiles = self
                .calculator
                .tiles_for_transition(&position, viewport, zooming);
            log::debug!(
                "rendering {} tiles at zoom {:.2} ({:?})",
                tiles.len(),
                position.zoom,
                zooming
            );
            renderer.render_tiles(&tiles);
        }
    }

    /// Applies one input event. Returns `true` when it moved the view or started
    /// an animation.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::PointerDown { x, y } => {
                self.drag = Some(DragState {
                    start_x: x,
                    start_y: y,
                    start: self.position,
                });
                false
            }
            InputEvent::PointerMove { x, y } => {
                let Some(drag) = self.drag else {
                    return false;
                };
                // relative to where the drag began, so rounding never accumulates
                let (lat, lon) = pan_by_pixels_scaled(
                    self.position.zoom,
                    drag.start.lat,
                    drag.start.lon,
                    drag.start_x - x,
                    drag.start_y - y,
                    self.calculator.tile_size(),
                    self.calculator.scale_mode(),
                );
                self.set_position(self.position.zoom, lat, lon)
            }
            InputEvent::PointerUp => {
                self.drag = None;
                self.pinch = None;
                false
            }
            InputEvent::Wheel { delta_y } => {
                let step = self.interaction.zoom_step;
                let delta = if delta_y < 0.0 {
                    step
                } else if delta_y > 0.0 {
                    -step
                } else {
                    return false;
                };
                let Position { zoom, lat, lon } = self.position;
                self.set_position(zoom + delta, lat, lon)
            }
            InputEvent::KeyDown { key } => self.key_down(key),
            InputEvent::KeyUp { .. } => {
                self.arrow_down = false;
                false
            }
            InputEvent::PinchStart { distance } => {
                self.pinch = Some(PinchState {
                    start_zoom: self.position.zoom,
                    start_distance: distance,
                });
                false
            }
            InputEvent::PinchMove { distance } => {
                let Some(pinch) = self.pinch else {
                    return false;
                };
                let delta = (pinch.start_distance - distance) / self.interaction.pinch_pixels_per_zoom;
                let Position { lat, lon, .. } = self.position;
                self.set_position(pinch.start_zoom - delta, lat, lon)
            }
            InputEvent::PinchEnd => {
                self.drag = None;
                self.pinch = None;
                false
            }
            InputEvent::Resize { width, height } => {
                log::debug!("viewport resized to {}x{}", width, height);
                self.update(Zooming::Flat);
                true
            }
        }
    }

    fn key_down(&mut self, key: KeyCode) -> bool {
        let delta = self.interaction.key_pan_delta;
        // a fresh press starts from where the map is; held keys keep accumulating
        let (mut lat, mut lon) = if self.arrow_down {
            self.animation_target()
        } else {
            (self.position.lat, self.position.lon)
        };
        match key {
            KeyCode::ArrowUp => lat += delta,
            KeyCode::ArrowDown => lat -= delta,
            KeyCode::ArrowLeft => lon -= delta,
            KeyCode::ArrowRight => lon += delta,
            KeyCode::Other(_) => return false,
        }
        self.arrow_down = true;
        self.animate_to(lat, lon);
        true
    }
}

fn step_toward(current: f64, target: f64, step: f64) -> f64 {
    if target > current {
        (current + step).min(target)
    } else {
        (current - step).max(target)
    }
}

impl std::fmt::Debug for MapController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapController")
            .field("position", &self.position)
            .field("min_zoom", &self.min_zoom)
            .field("max_zoom", &self.max_zoom)
            .field("renderers", &self.renderers.len())
            .field("animation", &self.animation)
            .field("events", &self.events)
            .finish()
    }
}
