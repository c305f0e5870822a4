//! Punch sequencing rules.
//!
//! A working day is a prefix of `check_in -> (break_out -> break_in)? -> check_out`.
//! Rules are checked in order and the first one that fails decides the rejection:
//! known type, daily cap, first punch must be a check-in, cooldown, transition table.
//! The cooldown needs a previous punch, so checking it after the empty-day case
//! gives the same answers as checking it first.

use chrono::{Duration, NaiveDateTime};
use std::fmt;

use crate::model::punch::PunchType;

pub const DAILY_PUNCH_LIMIT: usize = 4;
pub const COOLDOWN_SECS: i64 = 120;

/// A punch already recorded today, as seen by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PunchEvent {
    pub punch_type: PunchType,
    pub punched_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PunchRejection {
    InvalidType,
    DailyLimitReached,
    CooldownActive,
    MustStartWithCheckIn,
    IllegalTransition { from: PunchType, to: PunchType },
    ShiftAlreadyClosed,
}

impl fmt::Display for PunchRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            PunchRejection::InvalidType => "invalid punch type",
            PunchRejection::DailyLimitReached => "daily punch limit reached",
            PunchRejection::CooldownActive => "must wait between punches",
            PunchRejection::MustStartWithCheckIn => "must clock in first",
            PunchRejection::IllegalTransition { from, .. } => match from {
                PunchType::CheckIn => "after check-in only break-out or check-out",
                PunchType::BreakOut => "must return from break",
                PunchType::BreakIn => "after returning from break only check-out",
                PunchType::CheckOut => "shift already closed",
            },
            PunchRejection::ShiftAlreadyClosed => "shift already closed",
        };
        f.write_str(reason)
    }
}

impl std::error::Error for PunchRejection {}

/// Types allowed to follow `last`. `None` means nothing was punched today.
pub fn next_after(last: Option<PunchType>) -> &'static [PunchType] {
    match last {
        None => &[PunchType::CheckIn],
        Some(PunchType::CheckIn) => &[PunchType::BreakOut, PunchType::CheckOut],
        Some(PunchType::BreakOut) => &[PunchType::BreakIn],
        Some(PunchType::BreakIn) => &[PunchType::CheckOut],
        Some(PunchType::CheckOut) => &[],
    }
}

/// What the employee may punch next, ignoring the cooldown.
pub fn allowed_next(todays_punches: &[PunchEvent]) -> Vec<PunchType> {
    if todays_punches.len() >= DAILY_PUNCH_LIMIT {
        return Vec::new();
    }
    next_after(todays_punches.last().map(|p| p.punch_type)).to_vec()
}

/// Decides whether `proposed` may be recorded at `now`.
///
/// `todays_punches` must hold only punches from the calendar day of `now`,
/// ascending by time. Returns the parsed punch type on acceptance.
pub fn validate(
    todays_punches: &[PunchEvent],
    proposed: &str,
    now: NaiveDateTime,
) -> Result<PunchType, PunchRejection> {
    let proposed: PunchType = proposed
        .trim()
        .parse()
        .map_err(|_| PunchRejection::InvalidType)?;

    if todays_punches.len() >= DAILY_PUNCH_LIMIT {
        return Err(PunchRejection::DailyLimitReached);
    }

    let Some(last) = todays_punches.last() else {
        return if proposed == PunchType::CheckIn {
            Ok(proposed)
        } else {
            Err(PunchRejection::MustStartWithCheckIn)
        };
    };

    if now.signed_duration_since(last.punched_at) < Duration::seconds(COOLDOWN_SECS) {
        return Err(PunchRejection::CooldownActive);
    }

    if last.punch_type == PunchType::CheckOut {
        return Err(PunchRejection::ShiftAlreadyClosed);
    }

    if next_after(Some(last.punch_type)).contains(&proposed) {
        Ok(proposed)
    } else {
        Err(PunchRejection::IllegalTransition {
            from: last.punch_type,
            to: proposed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use strum::IntoEnumIterator;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn day(types: &[PunchType]) -> Vec<PunchEvent> {
        types
            .iter()
            .enumerate()
            .map(|(i, t)| PunchEvent {
                punch_type: *t,
                punched_at: at(8 + i as u32, 0, 0),
            })
            .collect()
    }

    fn noon() -> NaiveDateTime {
        at(15, 0, 0)
    }

    use PunchType::*;

    #[test]
    fn test_empty_day_accepts_check_in() {
        assert_eq!(validate(&[], "check_in", noon()), Ok(CheckIn));
    }

    #[test]
    fn test_empty_day_rejects_anything_else() {
        assert_eq!(
            validate(&[], "break_out", noon()),
            Err(PunchRejection::MustStartWithCheckIn)
        );
        assert_eq!(
            validate(&[], "check_out", noon()),
            Err(PunchRejection::MustStartWithCheckIn)
        );
    }

    #[test]
    fn test_invalid_type_checked_first() {
        let full = day(&[CheckIn, BreakOut, BreakIn, CheckOut]);
        assert_eq!(validate(&full, "lunch", noon()), Err(PunchRejection::InvalidType));
        assert_eq!(validate(&[], "", noon()), Err(PunchRejection::InvalidType));
        assert_eq!(validate(&[], "   ", noon()), Err(PunchRejection::InvalidType));
    }

    #[test]
    fn test_spanish_label_accepted() {
        assert_eq!(validate(&[], " Entrada ", noon()), Ok(CheckIn));
    }

    #[test]
    fn test_fifth_punch_hits_daily_limit() {
        let full = day(&[CheckIn, BreakOut, BreakIn, CheckOut]);
        for t in PunchType::iter() {
            assert_eq!(
                validate(&full, t.as_ref(), noon()),
                Err(PunchRejection::DailyLimitReached)
            );
        }
    }

    #[test]
    fn test_daily_limit_wins_over_cooldown() {
        let mut full = day(&[CheckIn, BreakOut, BreakIn, CheckOut]);
        full[3].punched_at = noon();
        assert_eq!(
            validate(&full, "check_in", noon()),
            Err(PunchRejection::DailyLimitReached)
        );
    }

    #[test]
    fn test_cooldown_blocks_legal_transition() {
        let history = vec![PunchEvent {
            punch_type: CheckIn,
            punched_at: at(9, 0, 0),
        }];
        assert_eq!(
            validate(&history, "break_out", at(9, 1, 59)),
            Err(PunchRejection::CooldownActive)
        );
        assert_eq!(validate(&history, "break_out", at(9, 2, 0)), Ok(BreakOut));
    }

    #[test]
    fn test_cooldown_checked_before_transition_table() {
        let history = vec![PunchEvent {
            punch_type: CheckOut,
            punched_at: at(9, 0, 0),
        }];
        assert_eq!(
            validate(&history, "check_in", at(9, 0, 30)),
            Err(PunchRejection::CooldownActive)
        );
    }

    #[test]
    fn test_future_dated_last_punch_keeps_cooldown() {
        let history = vec![PunchEvent {
            punch_type: CheckIn,
            punched_at: at(18, 0, 0),
        }];
        assert_eq!(
            validate(&history, "check_out", noon()),
            Err(PunchRejection::CooldownActive)
        );
    }

    #[test]
    fn test_after_check_in() {
        let h = day(&[CheckIn]);
        assert_eq!(validate(&h, "break_out", noon()), Ok(BreakOut));
        assert_eq!(validate(&h, "check_out", noon()), Ok(CheckOut));
        let err = validate(&h, "break_in", noon()).unwrap_err();
        assert_eq!(
            err,
            PunchRejection::IllegalTransition {
                from: CheckIn,
                to: BreakIn
            }
        );
        assert_eq!(err.to_string(), "after check-in only break-out or check-out");
        assert!(validate(&h, "check_in", noon()).is_err());
    }

    #[test]
    fn test_after_break_out() {
        let h = day(&[CheckIn, BreakOut]);
        assert_eq!(validate(&h, "break_in", noon()), Ok(BreakIn));
        let err = validate(&h, "check_out", noon()).unwrap_err();
        assert_eq!(err.to_string(), "must return from break");
    }

    #[test]
    fn test_after_break_in() {
        let h = day(&[CheckIn, BreakOut, BreakIn]);
        assert_eq!(validate(&h, "check_out", noon()), Ok(CheckOut));
        let err = validate(&h, "break_out", noon()).unwrap_err();
        assert_eq!(err.to_string(), "after returning from break only check-out");
    }

    #[test]
    fn test_closed_shift_without_break() {
        let h = day(&[CheckIn, CheckOut]);
        for t in PunchType::iter() {
            assert_eq!(
                validate(&h, t.as_ref(), noon()),
                Err(PunchRejection::ShiftAlreadyClosed)
            );
        }
    }

    #[test]
    fn test_accepted_types_follow_transition_table() {
        let histories = [
            vec![],
            vec![CheckIn],
            vec![CheckIn, BreakOut],
            vec![CheckIn, BreakOut, BreakIn],
            vec![CheckIn, CheckOut],
            vec![CheckIn, BreakOut, BreakIn, CheckOut],
        ];
        for types in histories {
            let h = day(&types);
            for t in PunchType::iter() {
                let allowed = allowed_next(&h).contains(&t);
                assert_eq!(
                    validate(&h, t.as_ref(), noon()).is_ok(),
                    allowed,
                    "history {types:?} proposed {t:?}"
                );
            }
        }
    }

    #[test]
    fn test_allowed_next() {
        assert_eq!(allowed_next(&[]), vec![CheckIn]);
        assert_eq!(allowed_next(&day(&[CheckIn])), vec![BreakOut, CheckOut]);
        assert!(allowed_next(&day(&[CheckIn, CheckOut])).is_empty());
    }

    #[test]
    fn test_validate_is_idempotent() {
        let h = day(&[CheckIn, BreakOut]);
        let first = validate(&h, "break_in", noon());
        let second = validate(&h, "break_in", noon());
        assert_eq!(first, second);
        assert_eq!(h, day(&[CheckIn, BreakOut]));
    }
}
