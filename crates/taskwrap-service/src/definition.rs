//! Job definition drafts and the value objects a scheduling service accepts.

use std::ops::BitOr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Bitmask of months a monthly trigger fires in.
///
/// Bit 0 is January, bit 11 is December. Constructors pass masks through
/// uninterpreted; range checks happen in [`JobDefinition::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Months(u16);

impl Months {
    pub const JANUARY: Months = Months(1 << 0);
    pub const FEBRUARY: Months = Months(1 << 1);
    pub const MARCH: Months = Months(1 << 2);
    pub const APRIL: Months = Months(1 << 3);
    pub const MAY: Months = Months(1 << 4);
    pub const JUNE: Months = Months(1 << 5);
    pub const JULY: Months = Months(1 << 6);
    pub const AUGUST: Months = Months(1 << 7);
    pub const SEPTEMBER: Months = Months(1 << 8);
    pub const OCTOBER: Months = Months(1 << 9);
    pub const NOVEMBER: Months = Months(1 << 10);
    pub const DECEMBER: Months = Months(1 << 11);

    /// Every month of the year.
    pub const ALL: Months = Months(0x0fff);

    /// Build a mask from raw bits, uninterpreted.
    pub fn from_bits(bits: u16) -> Months {
        Months(bits)
    }

    /// The raw bit representation.
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Whether every month in `other` is also set in `self`.
    pub fn contains(self, other: Months) -> bool {
        self.0 & other.0 == other.0
    }

    /// Non-empty and confined to the twelve defined bits.
    pub fn is_valid(self) -> bool {
        self.0 != 0 && self.0 & !Self::ALL.0 == 0
    }
}

impl Default for Months {
    fn default() -> Self {
        Months::ALL
    }
}

impl BitOr for Months {
    type Output = Months;

    fn bitor(self, rhs: Months) -> Months {
        Months(self.0 | rhs.0)
    }
}

/// An action a job performs when it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Launch an executable.
    Exec {
        /// Path to the executable.
        path: String,
        /// Command-line arguments, if any.
        arguments: Option<String>,
        /// Working directory for the process, if any.
        working_directory: Option<String>,
    },
}

impl Action {
    /// Create an executable action.
    pub fn exec(
        path: impl Into<String>,
        arguments: Option<&str>,
        working_directory: Option<&str>,
    ) -> Action {
        Action::Exec {
            path: path.into(),
            arguments: arguments.map(str::to_string),
            working_directory: working_directory.map(str::to_string),
        }
    }
}

/// When a job fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fire once at a specific instant.
    Time { at: DateTime<Utc> },
    /// Fire every `days_interval` days.
    Daily { days_interval: u16 },
    /// Fire on the given days of the month, in the given months.
    Monthly {
        days_of_month: Vec<u8>,
        months: Months,
    },
}

impl Trigger {
    /// One-shot trigger at a specific instant.
    pub fn at(instant: DateTime<Utc>) -> Trigger {
        Trigger::Time { at: instant }
    }

    /// Recurring daily trigger, firing every `days_interval` days.
    pub fn daily(days_interval: u16) -> Trigger {
        Trigger::Daily { days_interval }
    }

    /// Monthly trigger on a single day of the month.
    ///
    /// Day and mask are passed through uninterpreted; validation happens
    /// at registration.
    pub fn monthly(day_of_month: u8, months: Months) -> Trigger {
        Trigger::Monthly {
            days_of_month: vec![day_of_month],
            months,
        }
    }

    /// Monthly trigger on an explicit set of days.
    ///
    /// An empty day set means "unspecified" and defaults to `{1}`.
    pub fn monthly_days(days_of_month: &[u8], months: Months) -> Trigger {
        let days_of_month = if days_of_month.is_empty() {
            vec![1]
        } else {
            days_of_month.to_vec()
        };
        Trigger::Monthly {
            days_of_month,
            months,
        }
    }
}

/// Immediate run state of a started job.
///
/// Callers typically care about [`RunState::Running`] and
/// [`RunState::Queued`]; the remaining states are reported as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Unknown,
    Disabled,
    Queued,
    Ready,
    Running,
}

/// A mutable, not-yet-registered description of a job.
///
/// Holds an optional description plus ordered action and trigger lists.
/// Appends preserve order and are never deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    /// Free-form description text.
    pub description: Option<String>,
    /// What the job does, in order.
    pub actions: Vec<Action>,
    /// When the job fires, in order.
    pub triggers: Vec<Trigger>,
}

impl JobDefinition {
    /// Create an empty draft.
    pub fn new() -> JobDefinition {
        JobDefinition::default()
    }

    /// Structural validation, as the service applies at registration.
    ///
    /// The non-strict check requires at least one action with a non-empty
    /// executable path. The strict check additionally enforces trigger
    /// ranges: daily interval at least 1, monthly days within 1..=31, and
    /// a non-empty month mask confined to the twelve defined bits.
    pub fn validate(&self, strict: bool) -> Result<(), ServiceError> {
        if self.actions.is_empty() {
            return Err(ServiceError::InvalidDefinition(
                "definition has no actions".to_string(),
            ));
        }
        for action in &self.actions {
            let Action::Exec { path, .. } = action;
            if path.is_empty() {
                return Err(ServiceError::InvalidDefinition(
                    "exec action has an empty path".to_string(),
                ));
            }
        }

        if !strict {
            return Ok(());
        }

        for trigger in &self.triggers {
            match trigger {
                Trigger::Time { .. } => {}
                Trigger::Daily { days_interval } => {
                    if *days_interval == 0 {
                        return Err(ServiceError::InvalidDefinition(
                            "daily trigger interval must be at least 1".to_string(),
                        ));
                    }
                }
                Trigger::Monthly {
                    days_of_month,
                    months,
                } => {
                    if days_of_month.is_empty() {
                        return Err(ServiceError::InvalidDefinition(
                            "monthly trigger has no days".to_string(),
                        ));
                    }
                    if let Some(day) = days_of_month.iter().find(|d| !(1..=31).contains(*d)) {
                        return Err(ServiceError::InvalidDefinition(format!(
                            "day of month out of range: {day}"
                        )));
                    }
                    if !months.is_valid() {
                        return Err(ServiceError::InvalidDefinition(format!(
                            "invalid month mask: {:#06x}",
                            months.bits()
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_definition() -> JobDefinition {
        JobDefinition {
            description: Some("test".to_string()),
            actions: vec![Action::exec("backup.exe", None, None)],
            triggers: vec![Trigger::daily(1)],
        }
    }

    #[test]
    fn test_empty_definition_fails_validation() {
        let def = JobDefinition::new();
        assert!(def.validate(false).is_err());
        assert!(def.validate(true).is_err());
    }

    #[test]
    fn test_valid_definition_passes_strict() {
        assert!(valid_definition().validate(true).is_ok());
    }

    #[test]
    fn test_empty_exec_path_fails() {
        let mut def = valid_definition();
        def.actions = vec![Action::exec("", None, None)];
        assert!(def.validate(false).is_err());
    }

    #[test]
    fn test_triggerless_definition_is_valid() {
        // On-demand jobs have actions but no triggers.
        let mut def = valid_definition();
        def.triggers.clear();
        assert!(def.validate(true).is_ok());
    }

    #[test]
    fn test_zero_daily_interval_fails_strict_only() {
        let mut def = valid_definition();
        def.triggers = vec![Trigger::daily(0)];
        assert!(def.validate(false).is_ok());
        assert!(def.validate(true).is_err());
    }

    #[test]
    fn test_monthly_day_out_of_range_fails_strict() {
        let mut def = valid_definition();
        def.triggers = vec![Trigger::monthly(32, Months::ALL)];
        assert!(def.validate(true).is_err());

        def.triggers = vec![Trigger::monthly(0, Months::ALL)];
        assert!(def.validate(true).is_err());
    }

    #[test]
    fn test_empty_month_mask_fails_strict() {
        let mut def = valid_definition();
        def.triggers = vec![Trigger::monthly(1, Months::from_bits(0))];
        assert!(def.validate(true).is_err());
    }

    #[test]
    fn test_month_mask_outside_defined_bits_fails_strict() {
        let mut def = valid_definition();
        def.triggers = vec![Trigger::monthly(1, Months::from_bits(0x1fff))];
        assert!(def.validate(true).is_err());
    }

    #[test]
    fn test_monthly_days_defaults_to_first() {
        let trigger = Trigger::monthly_days(&[], Months::ALL);
        assert_eq!(
            trigger,
            Trigger::Monthly {
                days_of_month: vec![1],
                months: Months::ALL,
            }
        );
    }

    #[test]
    fn test_months_bitor_and_contains() {
        let mask = Months::JANUARY | Months::JUNE;
        assert!(mask.contains(Months::JANUARY));
        assert!(mask.contains(Months::JUNE));
        assert!(!mask.contains(Months::JULY));
        assert!(Months::ALL.contains(mask));
    }

    #[test]
    fn test_months_default_is_all() {
        assert_eq!(Months::default(), Months::ALL);
    }

    proptest! {
        // Appended triggers keep their order and are not deduplicated.
        #[test]
        fn trigger_append_preserves_order(intervals in prop::collection::vec(1u16..365, 1..20)) {
            let mut def = valid_definition();
            def.triggers.clear();
            for interval in &intervals {
                def.triggers.push(Trigger::daily(*interval));
            }

            prop_assert_eq!(def.triggers.len(), intervals.len());
            for (trigger, interval) in def.triggers.iter().zip(&intervals) {
                prop_assert_eq!(trigger, &Trigger::daily(*interval));
            }
        }

        // Any in-range monthly trigger passes strict validation.
        #[test]
        fn monthly_in_range_is_strictly_valid(
            days in prop::collection::vec(1u8..=31, 1..10),
            bits in 1u16..=0x0fff,
        ) {
            let mut def = valid_definition();
            def.triggers = vec![Trigger::monthly_days(&days, Months::from_bits(bits))];
            prop_assert!(def.validate(true).is_ok());
        }

        // Serialized form round-trips.
        #[test]
        fn definition_roundtrip(
            description in proptest::option::of(".{0,60}"),
            interval in 1u16..365,
        ) {
            let def = JobDefinition {
                description: description.clone(),
                actions: vec![Action::exec("job.exe", Some("--flag"), None)],
                triggers: vec![Trigger::daily(interval)],
            };

            let json = serde_json::to_string(&def).unwrap();
            let decoded: JobDefinition = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(decoded, def);
        }
    }
}
