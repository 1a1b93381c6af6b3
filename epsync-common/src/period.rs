//! Time-period value model for role assignments.
//!
//! Every role assignment (group membership, committee role, delegation
//! role, organization role, country mandate) is valid over a bounded or
//! open-ended interval. An assignment that is still running stores the
//! [`FAR_FUTURE`] sentinel as its end date. A missing end date means the
//! end is unknown: the record belongs to neither the current nor the
//! historical partition.

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel end date for assignments that are still running.
pub static FAR_FUTURE: Lazy<NaiveDate> =
    Lazy::new(|| NaiveDate::from_ymd_opt(9999, 12, 31).expect("sentinel date is valid"));

/// A bounded or open-ended interval of validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub begin: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Rejected period with `begin` after `end`.
#[derive(Debug, Error)]
#[error("period begins {begin} after it ends {end}")]
pub struct InvalidPeriod {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

impl TimePeriod {
    /// Build a period, rejecting `begin > end`.
    pub fn new(begin: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, InvalidPeriod> {
        if let (Some(b), Some(e)) = (begin, end) {
            if b > e {
                return Err(InvalidPeriod { begin: b, end: e });
            }
        }
        Ok(Self { begin, end })
    }

    /// Period of an assignment that is still running.
    pub fn open_ended(begin: Option<NaiveDate>) -> Self {
        Self {
            begin,
            end: Some(*FAR_FUTURE),
        }
    }

    /// True iff the end date is the far-future sentinel.
    pub fn is_current(&self) -> bool {
        self.end == Some(*FAR_FUTURE)
    }

    /// True iff the period ended strictly before today.
    pub fn is_past(&self) -> bool {
        self.is_past_on(Utc::now().date_naive())
    }

    /// True iff the period ended strictly before `today`. The sentinel
    /// never counts as past; an unknown end is neither current nor past.
    pub fn is_past_on(&self, today: NaiveDate) -> bool {
        match self.end {
            Some(end) => end != *FAR_FUTURE && end < today,
            None => false,
        }
    }

    /// True iff `date` falls strictly inside the period. An unknown bound
    /// excludes the period from any date query.
    pub fn contains(&self, date: NaiveDate) -> bool {
        matches!((self.begin, self.end), (Some(b), Some(e)) if b < date && date < e)
    }
}

/// Records carrying a validity period.
pub trait Timed {
    fn period(&self) -> TimePeriod;
}

/// Records whose assignment is still running.
pub fn only_current<T: Timed>(items: &[T]) -> Vec<&T> {
    items.iter().filter(|i| i.period().is_current()).collect()
}

/// Records with a finite end date. Unknown ends are excluded.
pub fn only_old<T: Timed>(items: &[T]) -> Vec<&T> {
    items
        .iter()
        .filter(|i| matches!(i.period().end, Some(e) if e < *FAR_FUTURE))
        .collect()
}

/// Records whose period contains `date` (begin < date < end).
pub fn at_date<T: Timed>(items: &[T], date: NaiveDate) -> Vec<&T> {
    items.iter().filter(|i| i.period().contains(date)).collect()
}

/// Order records most recently ended first, ties broken by most recently
/// begun. Unknown dates sort last.
pub fn newer_first<T: Timed>(items: &mut [T]) {
    items.sort_by_key(|i| {
        let p = i.period();
        std::cmp::Reverse((
            p.end.unwrap_or(NaiveDate::MIN),
            p.begin.unwrap_or(NaiveDate::MIN),
        ))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Role(TimePeriod);

    impl Timed for Role {
        fn period(&self) -> TimePeriod {
            self.0
        }
    }

    #[test]
    fn sentinel_end_is_current_not_past() {
        let period = TimePeriod::open_ended(Some(date(2019, 7, 2)));
        assert!(period.is_current());
        assert!(!period.is_past_on(date(2024, 1, 1)));
    }

    #[test]
    fn finite_end_before_today_is_past() {
        let period = TimePeriod::new(Some(date(2009, 7, 14)), Some(date(2014, 6, 30))).unwrap();
        assert!(!period.is_current());
        assert!(period.is_past_on(date(2014, 7, 1)));
        assert!(!period.is_past_on(date(2014, 6, 30)));
    }

    #[test]
    fn unknown_end_is_neither_current_nor_past() {
        let period = TimePeriod::new(Some(date(2009, 7, 14)), None).unwrap();
        assert!(!period.is_current());
        assert!(!period.is_past_on(date(2024, 1, 1)));
    }

    #[test]
    fn inverted_period_is_rejected() {
        assert!(TimePeriod::new(Some(date(2014, 1, 1)), Some(date(2009, 1, 1))).is_err());
    }

    #[test]
    fn contains_is_strict() {
        let period = TimePeriod::new(Some(date(2009, 7, 14)), Some(date(2014, 6, 30))).unwrap();
        assert!(period.contains(date(2010, 1, 1)));
        assert!(!period.contains(date(2009, 7, 14)));
        assert!(!period.contains(date(2014, 6, 30)));
    }

    #[test]
    fn partitions_exclude_unknown_ends() {
        let roles = vec![
            Role(TimePeriod::open_ended(Some(date(2019, 7, 2)))),
            Role(TimePeriod::new(Some(date(2009, 7, 14)), Some(date(2014, 6, 30))).unwrap()),
            Role(TimePeriod::new(Some(date(2004, 7, 20)), None).unwrap()),
        ];

        assert_eq!(only_current(&roles).len(), 1);
        assert_eq!(only_old(&roles).len(), 1);
        assert_eq!(at_date(&roles, date(2010, 1, 1)).len(), 1);
    }

    #[test]
    fn newer_first_orders_by_end_then_begin() {
        let mut roles = vec![
            Role(TimePeriod::new(Some(date(2004, 7, 20)), Some(date(2009, 7, 13))).unwrap()),
            Role(TimePeriod::open_ended(Some(date(2019, 7, 2)))),
            Role(TimePeriod::new(Some(date(2009, 7, 14)), Some(date(2014, 6, 30))).unwrap()),
        ];

        newer_first(&mut roles);

        assert!(roles[0].period().is_current());
        assert_eq!(roles[1].period().end, Some(date(2014, 6, 30)));
        assert_eq!(roles[2].period().end, Some(date(2009, 7, 13)));
    }
}
