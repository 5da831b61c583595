//! WASM bindings for blackout-gate.
//!
//! Exposes blocking-window evaluation to JavaScript via `wasm-bindgen`. Complex
//! types cross the boundary as JSON strings. The reference instant is always
//! passed in explicitly: `wasm32-unknown-unknown` has no clock of its own.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p blackout-gate-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target nodejs --out-dir packages/blackout-gate-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/blackout_gate_wasm.wasm
//! ```

use blackout_gate::{
    evaluate_detailed, parse_calendar, parse_instant, EvaluationRequest, EventCollection,
    Selection, DEFAULT_ADVANCE_MARGIN_SECONDS,
};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Plain-Rust entry points (errors as strings), shared by the exports below
// ---------------------------------------------------------------------------

/// Evaluate a JSON object of uid → record at `now`.
///
/// `margin_seconds` defaults to 3600 and `selection` to `"earliest-start"`.
pub fn evaluate_events_json(
    events_json: &str,
    now: &str,
    margin_seconds: Option<i32>,
    selection: Option<String>,
) -> Result<String, String> {
    let events: EventCollection =
        serde_json::from_str(events_json).map_err(|e| format!("Invalid events JSON: {}", e))?;
    evaluate_collection(&events, now, margin_seconds, selection.as_deref())
}

/// Evaluate an iCalendar document at `now`.
pub fn evaluate_ics_text(
    ics: &str,
    now: &str,
    margin_seconds: Option<i32>,
    selection: Option<String>,
) -> Result<String, String> {
    let events = parse_calendar(ics).map_err(|e| e.to_string())?;
    evaluate_collection(&events, now, margin_seconds, selection.as_deref())
}

/// Parse an iCalendar document into the JSON record collection.
pub fn parse_ics_text(ics: &str) -> Result<String, String> {
    let events = parse_calendar(ics).map_err(|e| e.to_string())?;
    serde_json::to_string(&events).map_err(|e| format!("Serialization error: {}", e))
}

fn evaluate_collection(
    events: &EventCollection,
    now: &str,
    margin_seconds: Option<i32>,
    selection: Option<&str>,
) -> Result<String, String> {
    let now = parse_instant(now).map_err(|e| e.to_string())?;
    let request = EvaluationRequest::at(now)
        .with_margin(margin_seconds.map_or(DEFAULT_ADVANCE_MARGIN_SECONDS, i64::from))
        .with_selection(parse_selection(selection)?);

    let evaluation = evaluate_detailed(events, &request).map_err(|e| e.to_string())?;
    serde_json::to_string(&evaluation).map_err(|e| format!("Serialization error: {}", e))
}

fn parse_selection(selection: Option<&str>) -> Result<Selection, String> {
    match selection {
        None | Some("earliest-start") => Ok(Selection::EarliestStart),
        Some("first-found") => Ok(Selection::FirstFound),
        Some(other) => Err(format!(
            "Unknown selection '{}'. Expected 'earliest-start' or 'first-found'",
            other
        )),
    }
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Evaluate a calendar given as a JSON object of uid → `{summary, start, end, kind}`.
///
/// Returns a JSON string `{blocked, uid?, event?, now, buffered_now, margin_seconds}`.
///
/// # Arguments
/// - `events_json` -- JSON object keyed by uid
/// - `now` -- Reference instant (RFC 3339)
/// - `margin_seconds` -- Advance margin, default 3600; negative values are rejected
/// - `selection` -- `"earliest-start"` (default) or `"first-found"`
#[wasm_bindgen(js_name = "evaluate")]
pub fn evaluate(
    events_json: &str,
    now: &str,
    margin_seconds: Option<i32>,
    selection: Option<String>,
) -> Result<String, JsValue> {
    evaluate_events_json(events_json, now, margin_seconds, selection)
        .map_err(|e| JsValue::from_str(&e))
}

/// Evaluate a raw iCalendar document. Same output as [`evaluate`].
#[wasm_bindgen(js_name = "evaluateIcs")]
pub fn evaluate_ics(
    ics: &str,
    now: &str,
    margin_seconds: Option<i32>,
    selection: Option<String>,
) -> Result<String, JsValue> {
    evaluate_ics_text(ics, now, margin_seconds, selection).map_err(|e| JsValue::from_str(&e))
}

/// Parse a raw iCalendar document into a JSON object of uid → record.
#[wasm_bindgen(js_name = "parseIcs")]
pub fn parse_ics(ics: &str) -> Result<String, JsValue> {
    parse_ics_text(ics).map_err(|e| JsValue::from_str(&e))
}
