//! Ordering of step profiles by a named metric.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::{ProfilerError, ProfilerResult, TaskStepProfile};

type FieldKey = fn(&TaskStepProfile) -> f64;

/// Sortable fields other than percentiles. Adding a field is a new row here.
const FIXED_FIELDS: &[(&str, SortField, FieldKey)] = &[
    ("number", SortField::Number, |p| p.number as f64),
    ("min", SortField::Min, |p| p.min),
    ("max", SortField::Max, |p| p.max),
    ("mean", SortField::Mean, |p| p.mean),
    ("median", SortField::Median, |p| p.median),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortField {
    Number,
    Min,
    Max,
    Mean,
    Median,
    Percentile(u8),
}

impl SortField {
    /// Names accepted for the given percentile ladder.
    pub fn available_names(ladder: &[u8]) -> Vec<String> {
        FIXED_FIELDS
            .iter()
            .map(|(name, _, _)| (*name).to_string())
            .chain(ladder.iter().map(|p| format!("p{p}")))
            .collect()
    }

    /// Rejects percentile fields the ladder does not compute.
    pub fn validate(self, ladder: &[u8]) -> ProfilerResult<Self> {
        match self {
            Self::Percentile(p) if !ladder.contains(&p) => {
                Err(ProfilerError::InvalidSortField(format!(
                    "p{p} is not in the percentile ladder; available: {}",
                    Self::available_names(ladder).join(", ")
                )))
            }
            _ => Ok(self),
        }
    }

    fn key(self, profile: &TaskStepProfile) -> f64 {
        if let Self::Percentile(p) = self {
            return profile.percentile(p).unwrap_or(f64::NAN);
        }
        FIXED_FIELDS
            .iter()
            .find(|(_, field, _)| *field == self)
            .map_or(f64::NAN, |(_, _, key)| key(profile))
    }
}

impl FromStr for SortField {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((_, field, _)) = FIXED_FIELDS.iter().find(|(name, _, _)| *name == s) {
            return Ok(*field);
        }
        s.strip_prefix('p')
            .filter(|digits| is_canonical_number(digits))
            .and_then(|digits| digits.parse::<u8>().ok())
            .filter(|p| *p <= 100)
            .map(Self::Percentile)
            .ok_or_else(|| {
                ProfilerError::InvalidSortField(format!(
                    "{s:?}; available: {}, pNN",
                    Self::available_names(&[]).join(", ")
                ))
            })
    }
}

/// ASCII digits without a leading zero, so the parsed value displays the same.
fn is_canonical_number(digits: &str) -> bool {
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Self::Percentile(p) = self {
            return write!(f, "p{p}");
        }
        let name = FIXED_FIELDS
            .iter()
            .find(|(_, field, _)| field == self)
            .map_or("unknown", |(name, _, _)| *name);
        f.write_str(name)
    }
}

impl TryFrom<String> for SortField {
    type Error = ProfilerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SortField> for String {
    fn from(value: SortField) -> Self {
        value.to_string()
    }
}

/// Sorts ascending by `field`. With `reverse`, the ascending result is
/// reversed, so ties keep their ascending relative order mirrored.
pub fn sort_profiles(profiles: &mut [TaskStepProfile], field: SortField, reverse: bool) {
    profiles.sort_by(|a, b| field.key(a).total_cmp(&field.key(b)));
    if reverse {
        profiles.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn profile(number: i64, min: f64) -> TaskStepProfile {
        TaskStepProfile {
            name: format!("step {number}"),
            number,
            count: 1,
            min,
            max: min * 2.0,
            median: min,
            mean: min,
            percentiles: BTreeMap::from([(95, min + 0.5)]),
        }
    }

    fn mins(profiles: &[TaskStepProfile]) -> Vec<f64> {
        profiles.iter().map(|p| p.min).collect()
    }

    #[test]
    fn sorts_by_min_ascending_and_reversed() {
        let mut profiles = vec![profile(1, 3.0), profile(2, 1.0), profile(3, 2.0)];
        sort_profiles(&mut profiles, SortField::Min, false);
        assert_eq!(mins(&profiles), vec![1.0, 2.0, 3.0]);
        sort_profiles(&mut profiles, SortField::Min, true);
        assert_eq!(mins(&profiles), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn reverse_mirrors_ties() {
        let mut profiles = vec![profile(1, 1.0), profile(2, 1.0), profile(3, 0.5)];
        sort_profiles(&mut profiles, SortField::Min, true);
        let numbers: Vec<i64> = profiles.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![2, 1, 3]);
    }

    #[test]
    fn sorts_by_percentile() {
        let mut profiles = vec![profile(1, 9.0), profile(2, 4.0)];
        sort_profiles(&mut profiles, "p95".parse().expect("field"), false);
        assert_eq!(profiles[0].number, 2);
    }

    #[test]
    fn parses_known_names() {
        assert_eq!("number".parse::<SortField>().expect("field"), SortField::Number);
        assert_eq!("median".parse::<SortField>().expect("field"), SortField::Median);
        assert_eq!("p99".parse::<SortField>().expect("field"), SortField::Percentile(99));
        assert_eq!(SortField::Percentile(90).to_string(), "p90");
        assert_eq!(SortField::Mean.to_string(), "mean");
    }

    #[test]
    fn unknown_field_is_rejected() {
        for name in ["duration", "p", "p101", "P95", "", "p+50", "p050", "p00", "p 5"] {
            let err = name.parse::<SortField>().expect_err("must fail");
            assert!(matches!(err, ProfilerError::InvalidSortField(_)), "{name}");
        }
        assert_eq!("p0".parse::<SortField>().expect("field"), SortField::Percentile(0));
    }

    #[test]
    fn rejection_lists_available_fields() {
        let err = "duration".parse::<SortField>().expect_err("must fail");
        assert!(
            err.to_string().contains("available: number, min, max, mean, median, pNN"),
            "{err}"
        );
        let err = SortField::Percentile(75).validate(&[50, 95]).expect_err("must fail");
        assert!(err.to_string().ends_with("available: number, min, max, mean, median, p50, p95"), "{err}");
    }

    #[test]
    fn percentile_outside_ladder_fails_validation() {
        assert!(SortField::Percentile(75).validate(&[50, 95]).is_err());
        assert!(SortField::Percentile(95).validate(&[50, 95]).is_ok());
        assert!(SortField::Max.validate(&[]).is_ok());
    }

    #[test]
    fn available_names_include_ladder() {
        let names = SortField::available_names(&[50, 99]);
        assert_eq!(names, vec!["number", "min", "max", "mean", "median", "p50", "p99"]);
    }
}
