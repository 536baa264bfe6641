//! Reference capture and template learning exposed to JavaScript

use rand::rngs::StdRng;
use rand::SeedableRng;
use wasm_bindgen::prelude::*;

use super::convert::{js_error, timestamp_seconds, to_js};
use super::landmarks::parse_or_warn;
use crate::classifier::TemplateLearner;
use crate::config::ExerciseConfig;
use crate::recording::ReferenceRecorder;

#[wasm_bindgen]
pub struct TemplateRecorder {
    recorder: ReferenceRecorder,
    learner: TemplateLearner,
}

impl TemplateRecorder {
    fn from_config(config: ExerciseConfig) -> Result<TemplateRecorder, JsValue> {
        config.validate().map_err(js_error)?;
        Ok(TemplateRecorder {
            recorder: ReferenceRecorder::new(&config),
            learner: TemplateLearner::new(config.learner.clone()),
        })
    }
}

#[wasm_bindgen]
impl TemplateRecorder {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<TemplateRecorder, JsValue> {
        let config = ExerciseConfig::from_json(config_json).map_err(js_error)?;
        Self::from_config(config)
    }

    #[wasm_bindgen(js_name = fromPreset)]
    pub fn from_preset(exercise_type: &str) -> Result<TemplateRecorder, JsValue> {
        let config = ExerciseConfig::preset(exercise_type)
            .ok_or_else(|| JsValue::from_str(&format!("unknown exercise type '{exercise_type}'")))?;
        Self::from_config(config)
    }

    /// Append one reference frame. Returns false if the frame was malformed.
    #[wasm_bindgen(js_name = pushFrame)]
    pub fn push_frame(&mut self, data: &[f32], timestamp_ms: Option<f64>) -> bool {
        match parse_or_warn(data, timestamp_seconds(timestamp_ms)) {
            Some(frame) => {
                self.recorder.push_frame(&frame);
                true
            }
            None => false,
        }
    }

    #[wasm_bindgen(getter, js_name = frameCount)]
    pub fn frame_count(&self) -> usize {
        self.recorder.frame_count()
    }

    /// Learn a template from everything recorded so far.
    /// Returns the template as a JSON string ready for storage.
    #[wasm_bindgen(js_name = learnTemplate)]
    pub fn learn_template(&self, seed: u32) -> Result<String, JsValue> {
        let mut rng = StdRng::seed_from_u64(u64::from(seed));
        let outcome = self
            .learner
            .learn(&self.recorder.recording(), &mut rng)
            .map_err(js_error)?;
        for warning in &outcome.warnings {
            web_sys::console::warn_1(&warning.to_string().into());
        }
        outcome.template.to_json().map_err(js_error)
    }

    /// Human-readable movement summaries, e.g. "right_knee: 92° → 168° (+76°) over 0.84s"
    #[wasm_bindgen(js_name = segmentSummary)]
    pub fn segment_summary(&self) -> Result<JsValue, JsValue> {
        let lines: Vec<String> = self
            .recorder
            .segment_summaries()
            .iter()
            .map(|s| s.describe())
            .collect();
        to_js(&lines)
    }

    /// Raw segment records
    pub fn segments(&self) -> Result<JsValue, JsValue> {
        to_js(&self.recorder.segment_summaries())
    }

    pub fn clear(&mut self) {
        self.recorder.clear();
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_learning_without_frames_fails() {
        let r = TemplateRecorder::from_preset("knee_extension").unwrap();
        assert_eq!(r.frame_count(), 0);
        assert!(r.learn_template(1).is_err());
    }

    #[wasm_bindgen_test]
    fn test_malformed_frame_rejected() {
        let mut r = TemplateRecorder::from_preset("bicep_curl").unwrap();
        assert!(!r.push_frame(&[1.0; 5], Some(0.0)));
        assert!(r.push_frame(&vec![0.5f32; 99], Some(0.0)));
        assert_eq!(r.frame_count(), 1);
    }
}
