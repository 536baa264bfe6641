//! Rust values to JS values

use std::fmt::Display;

use serde::Serialize;
use wasm_bindgen::JsValue;

/// Plain JS objects (not `Map`s) so results can go straight to JSON.stringify
pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

pub(crate) fn js_error<E: Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// JS passes milliseconds; `None` means "now"
pub(crate) fn timestamp_seconds(timestamp_ms: Option<f64>) -> f64 {
    timestamp_ms.unwrap_or_else(js_sys::Date::now) / 1000.0
}
