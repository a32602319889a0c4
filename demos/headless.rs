//! Renders one view of OpenStreetMap into `map.png` without a window.
//!
//! ```sh
//! cargo run --example headless -- 49.8951 -97.1384 15
//! ```

use anyhow::Context;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tileview::prelude::*;

fn main() -> anyhow::Result<()> {
    tileview::init_logging();

    let mut args = std::env::args().skip(1);
    let lat: f64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(49.8951);
    let lon: f64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(-97.1384);
    let zoom: f64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(15.0);

    let mut config = MapConfig::default();
    config.initial_position = Position::new(zoom, lat, lon);
    config.validate().context("invalid view")?;

    let spawner = Arc::new(TokioSpawner::current().context("no tokio runtime")?);
    let (wake_tx, wake_rx) = crossbeam_channel::unbounded();
    let loader = TileLoader::new(Arc::new(HttpFetcher::from_config(&config.tiles)?), spawner)
        .with_tile_size(config.tiles.tile_size)
        .with_wake(move || {
            let _ = wake_tx.send(());
        });

    let renderer = MapRenderer::new(
        RasterSurface::new(800, 600),
        loader,
        TileCache::new(config.tiles.cache_capacity),
        || {},
    )?;
    let renderer = Rc::new(RefCell::new(renderer));

    let mut map = MapController::from_config(&config, MapEvents::new())?;
    map.add_renderer(renderer.clone());
    map.update(Zooming::Flat);

    let wanted = renderer.borrow().current_tiles().len();
    let mut finished = 0;
    while finished < wanted {
        if wake_rx.recv_timeout(Duration::from_secs(15)).is_err() {
            log::warn!("timed out with {} of {} tiles", finished, wanted);
            break;
        }
        finished += 1;
        renderer.borrow_mut().process_completions();
    }

    let mut renderer = renderer.borrow_mut();
    renderer.on_frame();
    renderer.surface().save_png("map.png")?;
    println!("wrote map.png ({} of {} tiles arrived)", finished, wanted);
    Ok(())
}
