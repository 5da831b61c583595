//! Decide whether promotions must be suspended at a given instant.
//!
//! The lookahead searched for conflicts is `[now, now + margin]`. The margin
//! only extends forward, so promotions stop `margin` seconds before a blocking
//! window opens and stay stopped until it closes.
//!
//! Evaluation is pure: it borrows the collection, reads no clock (except in
//! [`evaluate_now`]), and performs no I/O.

use chrono::{DateTime, TimeDelta, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{GateError, Result};
use crate::event::{CalendarEvent, EventCollection};

/// Lead time applied when the caller gives none: one hour.
pub const DEFAULT_ADVANCE_MARGIN_SECONDS: i64 = 3600;

/// Which conflicting record to report when several conflict at once.
///
/// The blocked/clear outcome is identical under every policy; only the
/// evidence differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Selection {
    /// The conflicting record with the earliest start, then earliest end, then
    /// lowest uid.
    #[default]
    EarliestStart,
    /// The first conflicting record in collection order.
    FirstFound,
}

/// Parameters of a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationRequest {
    pub now: DateTime<Utc>,
    pub advance_margin_seconds: i64,
    pub selection: Selection,
}

impl EvaluationRequest {
    /// A request at `now` with the default margin and selection.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            advance_margin_seconds: DEFAULT_ADVANCE_MARGIN_SECONDS,
            selection: Selection::default(),
        }
    }

    pub fn with_margin(mut self, advance_margin_seconds: i64) -> Self {
        self.advance_margin_seconds = advance_margin_seconds;
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// The validated lookahead `[now, now + margin]`.
    pub fn lookahead(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        lookahead(self.now, self.advance_margin_seconds)
    }
}

/// The outcome of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict<'a> {
    /// Promotions must be suspended; `event` is the evidence.
    Blocked {
        uid: &'a str,
        event: &'a CalendarEvent,
    },
    Clear,
}

impl<'a> Verdict<'a> {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Blocked { .. })
    }

    pub fn event(&self) -> Option<&'a CalendarEvent> {
        match *self {
            Verdict::Blocked { event, .. } => Some(event),
            Verdict::Clear => None,
        }
    }

    pub fn uid(&self) -> Option<&'a str> {
        match *self {
            Verdict::Blocked { uid, .. } => Some(uid),
            Verdict::Clear => None,
        }
    }
}

impl Serialize for Verdict<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Verdict::Blocked { uid, event } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("blocked", &true)?;
                map.serialize_entry("uid", uid)?;
                map.serialize_entry("event", event)?;
                map.end()
            }
            Verdict::Clear => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("blocked", &false)?;
                map.end()
            }
        }
    }
}

/// A verdict together with the lookahead it was reached over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation<'a> {
    #[serde(flatten)]
    pub verdict: Verdict<'a>,
    pub now: DateTime<Utc>,
    pub buffered_now: DateTime<Utc>,
    pub margin_seconds: i64,
}

impl Evaluation<'_> {
    pub fn is_blocked(&self) -> bool {
        self.verdict.is_blocked()
    }
}

/// Validate the margin and compute the lookahead `[now, now + margin]`.
///
/// # Errors
/// Returns `GateError::NegativeMargin` for a negative margin, before any
/// arithmetic. Returns `GateError::MarginOverflow` if `now + margin` is not a
/// representable instant.
pub fn lookahead(
    now: DateTime<Utc>,
    advance_margin_seconds: i64,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    if advance_margin_seconds < 0 {
        return Err(GateError::NegativeMargin(advance_margin_seconds));
    }

    let buffered_now = TimeDelta::try_seconds(advance_margin_seconds)
        .and_then(|margin| now.checked_add_signed(margin))
        .ok_or(GateError::MarginOverflow(advance_margin_seconds))?;

    Ok((now, buffered_now))
}

/// Return the blocking record at `now`, if any, looking `advance_margin_seconds`
/// ahead.
///
/// Uses [`Selection::EarliestStart`] when several records conflict.
///
/// # Errors
/// Returns `GateError::NegativeMargin` if `advance_margin_seconds < 0`.
pub fn evaluate(
    events: &EventCollection,
    now: DateTime<Utc>,
    advance_margin_seconds: i64,
) -> Result<Option<&CalendarEvent>> {
    let request = EvaluationRequest::at(now).with_margin(advance_margin_seconds);
    Ok(evaluate_request(events, &request)?.event())
}

/// [`evaluate`] at the current wall-clock time with the default margin.
pub fn evaluate_now(events: &EventCollection) -> Result<Option<&CalendarEvent>> {
    evaluate(events, Utc::now(), DEFAULT_ADVANCE_MARGIN_SECONDS)
}

/// Evaluate a fully specified request.
///
/// Non-event records and events missing a bound are skipped. Among the
/// remaining records, those whose window conflicts with the lookahead are
/// candidates; `request.selection` picks the one reported.
pub fn evaluate_request<'a>(
    events: &'a EventCollection,
    request: &EvaluationRequest,
) -> Result<Verdict<'a>> {
    Ok(evaluate_detailed(events, request)?.verdict)
}

/// [`evaluate_request`], also returning the lookahead bounds that were
/// searched.
///
/// # Errors
/// Returns `GateError::NegativeMargin` or `GateError::MarginOverflow` when the
/// margin does not give a valid lookahead.
pub fn evaluate_detailed<'a>(
    events: &'a EventCollection,
    request: &EvaluationRequest,
) -> Result<Evaluation<'a>> {
    let (from, to) = request.lookahead()?;

    let mut candidates = blocking_candidates(events, from, to);
    let chosen = match request.selection {
        Selection::FirstFound => candidates.next(),
        Selection::EarliestStart => candidates.min_by(|a, b| {
            let (a_uid, a_event) = a;
            let (b_uid, b_event) = b;
            (a_event.start, a_event.end, a_uid).cmp(&(b_event.start, b_event.end, b_uid))
        }),
    };

    let verdict = match chosen {
        Some((uid, event)) => Verdict::Blocked { uid, event },
        None => Verdict::Clear,
    };

    tracing::debug!(
        now = %from,
        buffered_now = %to,
        blocked = verdict.is_blocked(),
        uid = verdict.uid(),
        "evaluated blocking windows"
    );

    Ok(Evaluation {
        verdict,
        now: from,
        buffered_now: to,
        margin_seconds: request.advance_margin_seconds,
    })
}

/// Every record in conflict with the lookahead, in collection order.
///
/// # Errors
/// Returns `GateError::NegativeMargin` if the request margin is negative.
pub fn find_blocking_events<'a>(
    events: &'a EventCollection,
    request: &EvaluationRequest,
) -> Result<Vec<(&'a str, &'a CalendarEvent)>> {
    let (from, to) = request.lookahead()?;
    Ok(blocking_candidates(events, from, to).collect())
}

fn blocking_candidates<'a>(
    events: &'a EventCollection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> impl Iterator<Item = (&'a str, &'a CalendarEvent)> {
    events.iter().filter_map(move |(uid, event)| {
        let Some(window) = event.window() else {
            if event.kind.is_event() {
                tracing::debug!(uid, "skipping event without start or end");
            }
            return None;
        };
        window.happens_between(from, to).then_some((uid, event))
    })
}
