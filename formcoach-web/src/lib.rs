//! FormCoach Web - exercise templates, rep counting and form scoring
//!
//! Entry point for WASM module. Only contains:
//! - Module declarations
//! - wasm_bindgen entry points that delegate to submodules
//!
//! Pipeline: landmarks -> angles -> smoothed angles -> (batch) template,
//! or (live) state label + rep events -> error reports.

pub mod bridge;
pub mod classifier;
pub mod config;
pub mod error;
pub mod physics;
pub mod recording;
pub mod reps;
pub mod scoring;
pub mod session;


use wasm_bindgen::prelude::*;

pub use bridge::{TemplateRecorder, TrackerSession};
pub use classifier::{ExerciseTemplate, TemplateLearner};
pub use config::ExerciseConfig;
pub use session::{ExerciseSession, FrameOutput};

// ============================================================================
// WASM ENTRY POINTS
// ============================================================================

/// Called automatically when WASM module loads
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Route `log` output to the browser console.
/// Level: "trace", "debug", "info", "warn" or "error" (default "info").
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: &str) {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => log::Level::Trace,
        "debug" => log::Level::Debug,
        "warn" => log::Level::Warn,
        "error" => log::Level::Error,
        _ => log::Level::Info,
    };
    wasm_logger::init(wasm_logger::Config::new(log_level));
    log::info!("formcoach-web {} logging at {}", env!("CARGO_PKG_VERSION"), log_level);
}

#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
