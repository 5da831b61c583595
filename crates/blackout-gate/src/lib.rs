//! # blackout-gate
//!
//! Deployment blocking-window gate.
//!
//! Given a calendar of blocked windows and a reference instant, decide whether
//! an automated deployment pipeline must suspend promotions right now. A
//! forward-only advance margin makes the gate close *before* a blocked window
//! opens, so no promotion starts that the window would interrupt.
//!
//! The gate only decides. Applying the decision (disabling stage transitions,
//! pausing a release train) is the caller's job.
//!
//! ## Modules
//!
//! - [`event`] — calendar records and the uid-keyed collection
//! - [`window`] — closed blocking windows and the lookahead conflict test
//! - [`evaluator`] — the gate decision: collection + instant + margin → verdict
//! - [`ics`] — iCalendar documents → record collection
//! - [`instant`] — reference-instant parsing
//! - [`error`] — Error types

pub mod error;
pub mod evaluator;
pub mod event;
pub mod ics;
pub mod instant;
pub mod window;

pub use error::GateError;
pub use evaluator::{
    evaluate, evaluate_detailed, evaluate_now, evaluate_request, find_blocking_events, lookahead,
    Evaluation, EvaluationRequest, Selection, Verdict, DEFAULT_ADVANCE_MARGIN_SECONDS,
};
pub use event::{CalendarEvent, EventCollection, RecordKind};
pub use ics::{parse_calendar, parse_calendar_bytes};
pub use instant::parse_instant;
pub use window::BlockWindow;
