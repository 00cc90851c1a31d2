//! Archer Arena entry point
//!
//! On the web this mounts the canvas, draws on `requestAnimationFrame` and
//! steps physics on `setInterval`. Natively it runs a headless soak: two
//! scripted archers fight while physics and frames tick at different rates,
//! then the diagnostics are printed as JSON.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Id of the locally controlled archer
#[cfg(target_arch = "wasm32")]
const LOCAL_PLAYER: &str = "player";

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;

    use archer_arena::game::InputHandler;
    use archer_arena::platform::web::{
        CanvasSurface, ImageCache, ImageTextureLoader, InputListeners, RafScheduler,
    };
    use archer_arena::{ArcherGame, Settings};

    use super::LOCAL_PLAYER;

    fn js_error(e: impl std::fmt::Display) -> JsValue {
        JsValue::from_str(&e.to_string())
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).map_err(js_error)?;

        log::info!("Archer Arena starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let container = document
            .get_element_by_id("game-container")
            .ok_or("no #game-container element")?;

        let settings = Settings::load_stored();
        let (width, height) = (settings.arena.width, settings.arena.height);

        let images = ImageCache::default();
        let surface = CanvasSurface::new(
            &document,
            &container,
            width as u32,
            height as u32,
            Rc::clone(&images),
        )?;
        let canvas = surface.canvas().clone();
        let scheduler = RafScheduler::new(window.clone());

        let mut game = ArcherGame::new(settings, Box::new(scheduler.clone()));
        let report = game
            .initialize(Box::new(surface), &ImageTextureLoader::new(images))
            .await;
        if !report.substituted.is_empty() {
            log::warn!("Missing images replaced: {:?}", report.substituted);
        }

        game.create_player(LOCAL_PLAYER, Vec2::new(width * 0.25, height / 2.0))
            .map_err(js_error)?;
        game.create_player("rival", Vec2::new(width * 0.75, height / 2.0))
            .map_err(js_error)?;
        game.create_obstacle("wall-1", Vec2::new(width / 2.0, height * 0.3), 40.0, 120.0)
            .map_err(js_error)?;
        game.create_obstacle("wall-2", Vec2::new(width / 2.0, height * 0.7), 40.0, 120.0)
            .map_err(js_error)?;
        game.create_powerup("health-1", Vec2::new(width / 2.0, height / 2.0), "health")
            .map_err(js_error)?;

        let listeners = InputListeners::attach(
            &window,
            &canvas,
            InputHandler::new(LOCAL_PLAYER, game.state()),
        )?;

        let game = Rc::new(RefCell::new(game));
        let tick_game = Rc::clone(&game);
        scheduler.set_tick_callback(move |now: f64| {
            if let Ok(mut g) = tick_game.try_borrow_mut() {
                g.physics_tick(now);
            }
        });
        let frame_game = Rc::clone(&game);
        scheduler.set_callback(move |time: f64| {
            // listeners live as long as the loop
            let _ = &listeners;
            if let Ok(mut g) = frame_game.try_borrow_mut() {
                g.frame(time);
            }
        });

        game.borrow_mut().start();
        log::info!("Archer Arena running!");
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    if let Err(e) = wasm_game::run().await {
        log::error!("Archer Arena failed to start: {e:?}");
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => archer_arena::Settings::load(path)?,
        None => archer_arena::Settings::default(),
    };
    let frames = match args.next() {
        Some(n) => n.parse()?,
        None => 3600,
    };
    let assets_root = args.next();

    log::info!("Archer Arena (native) soak: {frames} frames");
    let diagnostics = soak::run(settings, frames, assets_root)?;
    println!("{diagnostics}");
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
mod soak {
    use glam::Vec2;

    use archer_arena::game::{Control, GameStateHandle, assets};
    use archer_arena::platform::{ManualFrameScheduler, due_ticks, fire_pending};
    use archer_arena::renderer::{FsTextureLoader, HeadlessSurface};
    use archer_arena::{ArcherGame, EntityError, Settings};

    /// Display refresh the soak pretends to run at
    const DISPLAY_HZ: f64 = 144.0;
    /// Frames a scripted archer holds the bow before releasing
    const DRAW_FRAMES: u32 = 90;
    /// Frames the special is held, past the volley's minimum charge
    const SPECIAL_FRAMES: u32 = 90;
    const ARCHERS: [&str; 2] = ["north", "south"];

    /// Images are read from `assets_root` when given, otherwise every
    /// manifest entry resolves to a blank image of the right size
    pub fn run(
        settings: Settings,
        frames: u32,
        assets_root: Option<String>,
    ) -> Result<String, EntityError> {
        let (width, height) = (settings.arena.width, settings.arena.height);
        let scheduler = ManualFrameScheduler::new();
        let pending = scheduler.pending();
        let tickers = scheduler.tickers();
        let mut game = ArcherGame::new(settings, Box::new(scheduler));
        let surface = Box::new(HeadlessSurface::new(width as u32, height as u32));
        let report = match assets_root {
            Some(root) => pollster::block_on(game.initialize(surface, &FsTextureLoader::new(root))),
            None => pollster::block_on(game.initialize(surface, &assets::static_loader())),
        };
        if !report.substituted.is_empty() {
            log::warn!("Procedural stand-ins used for {:?}", report.substituted);
        }

        game.create_player(ARCHERS[0], Vec2::new(width / 2.0, height * 0.2))?;
        game.create_player(ARCHERS[1], Vec2::new(width / 2.0, height * 0.8))?;
        game.create_obstacle("pillar", Vec2::new(width / 2.0, height / 2.0), 60.0, 60.0)?;
        game.create_powerup("health", Vec2::new(width * 0.2, height / 2.0), "health")?;

        let state = game.state();
        let frame_ms = 1000.0 / DISPLAY_HZ;
        game.start();

        for frame in 0..frames {
            let now = f64::from(frame) * frame_ms;
            for (i, id) in ARCHERS.iter().enumerate() {
                script_archer(&state, id, ARCHERS[1 - i], frame + i as u32 * DRAW_FRAMES / 2);
            }
            for tick in due_ticks(&tickers, now) {
                game.physics_tick(tick);
            }
            for _ in fire_pending(&pending) {
                game.frame(now);
            }
            if game.player_count() < ARCHERS.len() {
                log::info!("Soak ended early at frame {frame}: an archer fell");
                break;
            }
        }

        game.stop();
        let summary = game
            .diagnostics()
            .export_json()
            .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
        game.destroy();
        Ok(summary)
    }

    /// Strafe toward the opponent's column, aim at it and fire on a rhythm
    fn script_archer(state: &GameStateHandle, id: &str, target: &str, frame: u32) {
        let (Some(me), Some(them)) = (state.player(id), state.player(target)) else {
            return;
        };
        let dx = them.position.x - me.position.x;
        state.set_control(id, Control::Right, dx > 10.0);
        state.set_control(id, Control::Left, dx < -10.0);
        state.set_control(id, Control::Dash, frame % 240 == 0);
        state.aim_at(id, them.position);
        state.set_control(id, Control::Shoot, frame % DRAW_FRAMES != 0);
        state.set_control(id, Control::Special, frame % 600 < SPECIAL_FRAMES);
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_soak_scripts_reach_the_volley() {
            let summary = run(Settings::default(), 2 * SPECIAL_FRAMES, None).unwrap();
            assert!(summary.contains("loosed a volley"), "{summary}");
            assert!(summary.contains("\"physics_steps\""));
        }
    }
}
