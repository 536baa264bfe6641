//! Bridge module - JS ↔ Rust communication
//!
//! All #[wasm_bindgen] classes live here.
//! Re-exports only in mod.rs, logic in submodules.

mod convert;
mod landmarks;
mod session;
mod recorder;

pub use landmarks::{parse_landmarks, XYZV_LEN, XYZ_LEN};
pub use session::TrackerSession;
pub use recorder::TemplateRecorder;
