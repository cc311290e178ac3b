//! Harvest intention annotation and classification.
//!
//! An intention is a scheduled wrapper around zero-or-one [`Attempt`],
//! carrying retry and timing metadata. [`annotate`] turns the raw backend
//! record into an [`AnnotatedIntention`] with all derived flags and the
//! classified state, resolving `duplicate_of` chains first: a duplicate
//! reports the derived fields of its ultimate non-duplicate target.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::attempt::{classify_attempt, Attempt, AttemptState, StateIcon, ERROR_CODE_NOT_READY};

/// Depth cap for `duplicate_of` chains. The backend is expected to keep
/// them acyclic and shallow; the cap stops a malformed cyclic payload from
/// looping forever.
pub const MAX_DUPLICATE_DEPTH: usize = 32;

/// A backend harvest intention record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Intention {
    #[serde(default)]
    pub data_not_ready_retry: bool,
    #[serde(default)]
    pub service_not_available_retry: bool,
    #[serde(default)]
    pub service_busy_retry: bool,

    #[serde(default)]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub when_processed: Option<DateTime<Utc>>,
    /// End of the covered period.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    #[serde(default)]
    pub fetching_data: bool,
    #[serde(default)]
    pub canceled: bool,
    #[serde(default)]
    pub broken_credentials: bool,

    #[serde(default)]
    pub attempt: Option<Attempt>,
    #[serde(default)]
    pub duplicate_of: Option<Box<Intention>>,
    #[serde(default)]
    pub previous_intention: Option<Box<Intention>>,
}

impl Intention {
    /// Whether any of the retry-reason flags is set.
    pub fn is_retry(&self) -> bool {
        self.data_not_ready_retry || self.service_not_available_retry || self.service_busy_retry
    }
}

/// Classified state of an intention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentionState {
    Running,
    Broken,
    Deleted,
    Waiting,
    Queued,
    Canceled,
    /// Fallthrough to the wrapped attempt's state.
    Attempt(AttemptState),
}

impl IntentionState {
    /// Wire/state name used in the UI layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentionState::Running => "running",
            IntentionState::Broken => "broken_sushi",
            IntentionState::Deleted => "deleted",
            IntentionState::Waiting => "waiting",
            IntentionState::Queued => "queued",
            IntentionState::Canceled => "canceled",
            IntentionState::Attempt(state) => state.as_str(),
        }
    }

    /// Display icon for this state. Attempt-wrapped states use the attempt
    /// icon table.
    pub fn icon(&self) -> StateIcon {
        match self {
            IntentionState::Running => StateIcon {
                icon: "fa-spinner fa-spin",
                color: "blue",
            },
            IntentionState::Deleted => StateIcon {
                icon: "fa-trash",
                color: "secondary",
            },
            IntentionState::Broken => StateIcon {
                icon: "fa-bug",
                color: "error",
            },
            IntentionState::Queued => StateIcon {
                icon: "far fa-pause-circle",
                color: "secondary",
            },
            IntentionState::Waiting => StateIcon {
                icon: "far fa-clock",
                color: "secondary",
            },
            IntentionState::Canceled => StateIcon {
                icon: "fas fa-ban",
                color: "error",
            },
            IntentionState::Attempt(state) => state.icon(),
        }
    }
}

/// An intention with all derived fields resolved.
///
/// Where the source record is a duplicate, the attempt-related fields come
/// from the final target of the `duplicate_of` chain; the retry flags, the
/// cancel flag, and the end date stay those of the record itself.
#[derive(Debug, Clone)]
pub struct AnnotatedIntention {
    pub is_retry: bool,
    pub is_duplicate: bool,
    pub has_attempt: bool,
    pub attempt: Option<Attempt>,
    /// The attempt of the previous intention, exposed when this one has
    /// none of its own.
    pub previous_attempt: Option<Attempt>,
    pub attempt_deleted: bool,
    pub fetching_data: bool,
    pub importing: bool,
    pub is_finished: bool,
    pub broken_credentials: bool,
    pub not_before: Option<DateTime<Utc>>,
    pub when_processed: Option<DateTime<Utc>>,
    pub end_date: Option<NaiveDate>,
    pub state: IntentionState,
    pub is_force_run_possible: bool,
    pub is_cancel_possible: bool,
    pub is_canceled: bool,
}

/// Follow the `duplicate_of` chain to the final non-duplicate intention.
///
/// Bounded by [`MAX_DUPLICATE_DEPTH`]; if the cap is hit the last node
/// reached is treated as the target.
fn resolve_duplicate(intention: &Intention) -> &Intention {
    let mut current = intention;
    let mut depth = 0;
    while let Some(target) = &current.duplicate_of {
        if depth >= MAX_DUPLICATE_DEPTH {
            break;
        }
        current = target;
        depth += 1;
    }
    current
}

/// Derive all flags and the classified state for an intention.
///
/// `now` anchors the force-run window check (an intention can be force-run
/// only when it is still planned for the future while covering a period
/// that has already ended).
pub fn annotate(intention: &Intention, now: DateTime<Utc>) -> AnnotatedIntention {
    let is_duplicate = intention.duplicate_of.is_some();
    // Attempt-related fields come from the final duplicate target.
    let target = resolve_duplicate(intention);

    let has_attempt = target.attempt.is_some();
    let attempt_deleted = target.when_processed.is_some() && target.attempt.is_none();
    let importing = target
        .attempt
        .as_ref()
        .map(|a| classify_attempt(a) == AttemptState::AwaitingImport)
        .unwrap_or(false);
    let is_finished = (has_attempt || target.when_processed.is_some()) && !importing;

    let previous_attempt = if has_attempt {
        None
    } else {
        intention
            .previous_intention
            .as_deref()
            .and_then(|prev| prev.attempt.clone())
    };

    let state = classify(
        target.fetching_data,
        target.broken_credentials,
        target.attempt.as_ref(),
        intention.canceled,
        attempt_deleted,
        intention.is_retry(),
    );

    let waiting_like =
        matches!(state, IntentionState::Waiting | IntentionState::Queued);
    let is_force_run_possible = waiting_like
        && target.not_before.map(|t| t > now).unwrap_or(false)
        && intention
            .end_date
            .map(|d| d < now.date_naive())
            .unwrap_or(false);

    AnnotatedIntention {
        is_retry: intention.is_retry(),
        is_duplicate,
        has_attempt,
        attempt: target.attempt.clone(),
        previous_attempt,
        attempt_deleted,
        fetching_data: target.fetching_data,
        importing,
        is_finished,
        broken_credentials: target.broken_credentials,
        not_before: target.not_before,
        when_processed: target.when_processed,
        end_date: intention.end_date,
        state,
        is_force_run_possible,
        is_cancel_possible: waiting_like,
        is_canceled: state == IntentionState::Canceled,
    }
}

/// The intention state priority chain.
///
/// An attempt error with the "not ready" SUSHI code (3031) means the
/// harvester will retry, so it reports as waiting rather than failed.
fn classify(
    fetching_data: bool,
    broken_credentials: bool,
    attempt: Option<&Attempt>,
    canceled: bool,
    attempt_deleted: bool,
    is_retry: bool,
) -> IntentionState {
    if fetching_data {
        return IntentionState::Running;
    }
    if broken_credentials {
        return IntentionState::Broken;
    }
    if let Some(attempt) = attempt {
        let state = classify_attempt(attempt);
        if state == AttemptState::Error
            && attempt.error_code.as_deref() == Some(ERROR_CODE_NOT_READY)
        {
            return IntentionState::Waiting;
        }
        return IntentionState::Attempt(state);
    }
    if canceled {
        return IntentionState::Canceled;
    }
    if attempt_deleted {
        return IntentionState::Deleted;
    }
    if is_retry {
        return IntentionState::Queued;
    }
    IntentionState::Waiting
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn intention(value: serde_json::Value) -> Intention {
        serde_json::from_value(value).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 15, 12, 0, 0).unwrap()
    }

    // -- state chain --

    #[test]
    fn fetching_data_is_running() {
        let a = annotate(&intention(json!({"fetching_data": true})), now());
        assert_eq!(a.state, IntentionState::Running);
    }

    #[test]
    fn broken_credentials_beat_attempt() {
        let a = annotate(
            &intention(json!({
                "broken_credentials": true,
                "attempt": {"import_batch": {"pk": 1}},
            })),
            now(),
        );
        assert_eq!(a.state, IntentionState::Broken);
    }

    #[test]
    fn attempt_state_falls_through() {
        let a = annotate(
            &intention(json!({"attempt": {"import_batch": {"pk": 1}}})),
            now(),
        );
        assert_eq!(a.state, IntentionState::Attempt(AttemptState::Success));
    }

    #[test]
    fn not_ready_error_reports_as_waiting() {
        let a = annotate(
            &intention(json!({"attempt": {"error_code": "3031"}})),
            now(),
        );
        assert_eq!(a.state, IntentionState::Waiting);
    }

    #[test]
    fn hard_error_stays_error() {
        let a = annotate(
            &intention(json!({"attempt": {"error_code": "3000"}})),
            now(),
        );
        assert_eq!(a.state, IntentionState::Attempt(AttemptState::Error));
    }

    #[test]
    fn canceled_flag_wins_without_attempt() {
        let a = annotate(&intention(json!({"canceled": true})), now());
        assert_eq!(a.state, IntentionState::Canceled);
        assert!(a.is_canceled);
    }

    #[test]
    fn processed_without_attempt_is_deleted() {
        let a = annotate(
            &intention(json!({"when_processed": "2021-05-02T10:00:00Z"})),
            now(),
        );
        assert!(a.attempt_deleted);
        assert_eq!(a.state, IntentionState::Deleted);
    }

    #[test]
    fn retry_flags_mean_queued() {
        for flag in [
            "data_not_ready_retry",
            "service_not_available_retry",
            "service_busy_retry",
        ] {
            let a = annotate(&intention(json!({flag: true})), now());
            assert!(a.is_retry);
            assert_eq!(a.state, IntentionState::Queued);
        }
    }

    #[test]
    fn empty_intention_is_waiting() {
        let a = annotate(&intention(json!({})), now());
        assert_eq!(a.state, IntentionState::Waiting);
        assert!(!a.is_finished);
    }

    // -- derived flags --

    #[test]
    fn importing_attempt_is_not_finished() {
        let a = annotate(
            &intention(json!({
                "attempt": {"status": "importing"},
                "when_processed": "2021-05-02T10:00:00Z",
            })),
            now(),
        );
        assert!(a.importing);
        assert!(!a.is_finished);
        assert_eq!(a.state, IntentionState::Attempt(AttemptState::AwaitingImport));
    }

    #[test]
    fn finished_with_attempt() {
        let a = annotate(
            &intention(json!({"attempt": {"import_batch": {"pk": 2}}})),
            now(),
        );
        assert!(a.is_finished);
    }

    #[test]
    fn previous_attempt_exposed_only_without_own_attempt() {
        let raw = intention(json!({
            "previous_intention": {"attempt": {"error_code": "3001"}},
        }));
        let a = annotate(&raw, now());
        assert!(a.previous_attempt.is_some());

        let raw = intention(json!({
            "attempt": {"import_batch": {"pk": 1}},
            "previous_intention": {"attempt": {"error_code": "3001"}},
        }));
        let a = annotate(&raw, now());
        assert!(a.previous_attempt.is_none());
    }

    // -- force run / cancel windows --

    #[test]
    fn force_run_needs_future_plan_and_past_period() {
        let a = annotate(
            &intention(json!({
                "not_before": "2021-07-01T00:00:00Z",
                "end_date": "2021-05-31",
            })),
            now(),
        );
        assert_eq!(a.state, IntentionState::Waiting);
        assert!(a.is_force_run_possible);
        assert!(a.is_cancel_possible);
    }

    #[test]
    fn force_run_blocked_for_future_period() {
        let a = annotate(
            &intention(json!({
                "not_before": "2021-07-01T00:00:00Z",
                "end_date": "2021-07-31",
            })),
            now(),
        );
        assert!(!a.is_force_run_possible);
    }

    #[test]
    fn cancel_impossible_once_finished() {
        let a = annotate(
            &intention(json!({"attempt": {"import_batch": {"pk": 1}}})),
            now(),
        );
        assert!(!a.is_cancel_possible);
    }

    // -- duplicate resolution --

    #[test]
    fn duplicate_copies_derived_fields_from_target() {
        let target = json!({
            "attempt": {"import_batch": {"pk": 9}},
            "when_processed": "2021-05-02T10:00:00Z",
            "not_before": "2021-05-01T00:00:00Z",
        });
        let duplicate = intention(json!({"duplicate_of": target.clone()}));
        let direct = annotate(&intention(target), now());
        let via_duplicate = annotate(&duplicate, now());

        assert!(via_duplicate.is_duplicate);
        assert_eq!(via_duplicate.state, direct.state);
        assert_eq!(via_duplicate.attempt, direct.attempt);
        assert_eq!(via_duplicate.when_processed, direct.when_processed);
        assert_eq!(via_duplicate.has_attempt, direct.has_attempt);
        assert_eq!(via_duplicate.is_finished, direct.is_finished);
    }

    #[test]
    fn duplicate_chain_resolves_transitively() {
        let raw = intention(json!({
            "duplicate_of": {
                "duplicate_of": {
                    "attempt": {"error_code": "3001"},
                    "broken_credentials": true,
                },
            },
        }));
        let a = annotate(&raw, now());
        assert_eq!(a.state, IntentionState::Broken);
        assert!(a.broken_credentials);
    }

    #[test]
    fn own_cancel_flag_survives_duplicate_resolution() {
        // `canceled` is a property of this record, not of the target.
        let raw = intention(json!({
            "canceled": true,
            "duplicate_of": {},
        }));
        let a = annotate(&raw, now());
        assert_eq!(a.state, IntentionState::Canceled);
    }

    // -- icons / names --

    #[test]
    fn intention_icons_and_attempt_delegation() {
        assert_eq!(IntentionState::Running.icon().icon, "fa-spinner fa-spin");
        assert_eq!(IntentionState::Broken.icon().color, "error");
        assert_eq!(
            IntentionState::Attempt(AttemptState::Success).icon(),
            AttemptState::Success.icon()
        );
    }

    #[test]
    fn wire_names() {
        assert_eq!(IntentionState::Broken.as_str(), "broken_sushi");
        assert_eq!(
            IntentionState::Attempt(AttemptState::PartialData).as_str(),
            "partial_data"
        );
    }
}
