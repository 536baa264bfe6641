//! Live tracking session exposed to JavaScript
//!
//! Each `TrackerSession` owns its own pipeline state, so several can run
//! side by side (e.g. two performers on one page).

use std::sync::Arc;

use wasm_bindgen::prelude::*;

use super::convert::{js_error, timestamp_seconds, to_js};
use super::landmarks::parse_or_warn;
use crate::classifier::ExerciseTemplate;
use crate::config::ExerciseConfig;
use crate::session::ExerciseSession;

#[wasm_bindgen]
pub struct TrackerSession {
    inner: ExerciseSession,
}

impl TrackerSession {
    fn from_config(config: ExerciseConfig) -> Result<TrackerSession, JsValue> {
        let inner = ExerciseSession::new(config).map_err(js_error)?;
        Ok(TrackerSession { inner })
    }
}

#[wasm_bindgen]
impl TrackerSession {
    /// Create from an exercise config JSON document
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<TrackerSession, JsValue> {
        let config = ExerciseConfig::from_json(config_json).map_err(js_error)?;
        Self::from_config(config)
    }

    /// Create from a built-in preset ("knee_extension", "squat", "bicep_curl")
    #[wasm_bindgen(js_name = fromPreset)]
    pub fn from_preset(exercise_type: &str) -> Result<TrackerSession, JsValue> {
        let config = ExerciseConfig::preset(exercise_type)
            .ok_or_else(|| JsValue::from_str(&format!("unknown exercise type '{exercise_type}'")))?;
        Self::from_config(config)
    }

    /// Run one frame of landmarks (Float32Array of 132 or 99 values).
    /// Returns the frame output object, or `undefined` for a malformed frame.
    #[wasm_bindgen(js_name = processFrame)]
    pub fn process_frame(&mut self, data: &[f32], timestamp_ms: Option<f64>) -> Result<JsValue, JsValue> {
        let Some(frame) = parse_or_warn(data, timestamp_seconds(timestamp_ms)) else {
            return Ok(JsValue::UNDEFINED);
        };
        to_js(&self.inner.process_frame(&frame))
    }

    /// Load a persisted template; rejected if invalid or for another exercise
    #[wasm_bindgen(js_name = loadTemplate)]
    pub fn load_template(&mut self, template_json: &str) -> Result<(), JsValue> {
        let template = ExerciseTemplate::from_json(template_json).map_err(js_error)?;
        self.inner.set_template(Arc::new(template)).map_err(js_error)
    }

    #[wasm_bindgen(js_name = clearTemplate)]
    pub fn clear_template(&mut self) {
        self.inner.clear_template();
    }

    #[wasm_bindgen(js_name = hasTemplate)]
    pub fn has_template(&self) -> bool {
        self.inner.template().is_some()
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    #[wasm_bindgen(getter, js_name = repCount)]
    pub fn rep_count(&self) -> u32 {
        self.inner.rep_count()
    }

    #[wasm_bindgen(getter, js_name = exerciseType)]
    pub fn exercise_type(&self) -> String {
        self.inner.config().exercise_type.clone()
    }

    /// All rep errors so far
    #[wasm_bindgen(js_name = repErrors)]
    pub fn rep_errors(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.rep_errors())
    }

    /// Session summary, or `null` before the first scored rep
    pub fn summary(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.summary())
    }
}
