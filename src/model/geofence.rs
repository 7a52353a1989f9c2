use chrono::{Duration, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Fence lifecycle states. `inactive` is terminal: a fence never leaves it,
/// whether it got there by expiry or by manual deactivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FenceStatus {
    Scheduled,
    Active,
    Inactive,
}

/// Rejected creation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum WindowError {
    #[display(fmt = "Invalid duration for geofence. Please adjust duration and try again.")]
    StartNotBeforeEnd,
    #[display(fmt = "End time cannot be in the past.")]
    EndInPast,
}

/// A circular attendance fence. `start_time` and `end_time` hold UTC wall
/// clock values (DATETIME columns); `radius` is meters.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Geofence {
    pub id: u64,
    pub fence_code: String,
    pub name: String,
    pub creator_matric: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub fence_type: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: String,
    pub time_created: NaiveDateTime,
}

impl Geofence {
    /// Current state of the fence. The stored column only matters as the
    /// manual-deactivation override; everything else is recomputed from the
    /// window, so a stale `scheduled` or `active` row never misleads a read.
    pub fn derived_status(&self, now: NaiveDateTime) -> FenceStatus {
        let deactivated = FenceStatus::from_str(&self.status) == Ok(FenceStatus::Inactive);
        derive_status(self.start_time, self.end_time, deactivated, now)
    }
}

/// Pure state derivation: (window, override flag, now) -> status.
/// Both window edges are inclusive.
pub fn derive_status(
    start: NaiveDateTime,
    end: NaiveDateTime,
    deactivated: bool,
    now: NaiveDateTime,
) -> FenceStatus {
    if deactivated {
        FenceStatus::Inactive
    } else if now < start {
        FenceStatus::Scheduled
    } else if now <= end {
        FenceStatus::Active
    } else {
        FenceStatus::Inactive
    }
}

/// Status a fence is born with, or why the window is unusable. A window that
/// already ended is refused outright rather than stored dead.
pub fn initial_status(
    start: NaiveDateTime,
    end: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<FenceStatus, WindowError> {
    if start >= end {
        return Err(WindowError::StartNotBeforeEnd);
    }
    if end < now {
        return Err(WindowError::EndInPast);
    }
    Ok(derive_status(start, end, false, now))
}

/// Shift an organization-local civil time to the stored UTC convention.
/// `None` when the shifted instant leaves the representable datetime range.
pub fn civil_to_utc(local: NaiveDateTime, zone: FixedOffset) -> Option<NaiveDateTime> {
    local.checked_sub_signed(Duration::seconds(zone.local_minus_utc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn fence(status: &str, start: NaiveDateTime, end: NaiveDateTime) -> Geofence {
        Geofence {
            id: 1,
            fence_code: "a1b2c3d4".into(),
            name: "CSC101".into(),
            creator_matric: "STF/01/0001".into(),
            latitude: 6.5244,
            longitude: 3.3792,
            radius: 100.0,
            fence_type: "lecture".into(),
            start_time: start,
            end_time: end,
            status: status.into(),
            time_created: start,
        }
    }

    #[test]
    fn created_inside_window_is_active() {
        assert_eq!(
            initial_status(dt(10, 0), dt(11, 0), dt(10, 30)),
            Ok(FenceStatus::Active)
        );
    }

    #[test]
    fn created_before_window_is_scheduled() {
        assert_eq!(
            initial_status(dt(10, 0), dt(11, 0), dt(9, 0)),
            Ok(FenceStatus::Scheduled)
        );
    }

    #[test]
    fn elapsed_window_is_refused() {
        assert_eq!(
            initial_status(dt(7, 0), dt(8, 0), dt(9, 0)),
            Err(WindowError::EndInPast)
        );
    }

    #[test]
    fn inverted_or_empty_window_is_refused() {
        assert_eq!(
            initial_status(dt(11, 0), dt(10, 0), dt(9, 0)),
            Err(WindowError::StartNotBeforeEnd)
        );
        assert_eq!(
            initial_status(dt(10, 0), dt(10, 0), dt(9, 0)),
            Err(WindowError::StartNotBeforeEnd)
        );
    }

    #[test]
    fn window_edges_are_inclusive() {
        assert_eq!(
            derive_status(dt(10, 0), dt(11, 0), false, dt(10, 0)),
            FenceStatus::Active
        );
        assert_eq!(
            derive_status(dt(10, 0), dt(11, 0), false, dt(11, 0)),
            FenceStatus::Active
        );
        assert_eq!(
            derive_status(dt(10, 0), dt(11, 0), false, dt(11, 1)),
            FenceStatus::Inactive
        );
    }

    #[test]
    fn manual_override_wins_inside_window() {
        assert_eq!(
            derive_status(dt(10, 0), dt(11, 0), true, dt(10, 30)),
            FenceStatus::Inactive
        );
    }

    #[test]
    fn stored_active_is_not_trusted_after_expiry() {
        let f = fence("active", dt(10, 0), dt(11, 0));
        assert_eq!(f.derived_status(dt(12, 0)), FenceStatus::Inactive);
    }

    #[test]
    fn stored_scheduled_activates_lazily() {
        let f = fence("scheduled", dt(10, 0), dt(11, 0));
        assert_eq!(f.derived_status(dt(10, 30)), FenceStatus::Active);
    }

    #[test]
    fn stored_inactive_is_terminal() {
        let f = fence("inactive", dt(10, 0), dt(11, 0));
        assert_eq!(f.derived_status(dt(10, 30)), FenceStatus::Inactive);
    }

    #[test]
    fn derivation_is_repeatable() {
        let f = fence("scheduled", dt(10, 0), dt(11, 0));
        assert_eq!(f.derived_status(dt(10, 30)), f.derived_status(dt(10, 30)));
    }

    #[test]
    fn civil_time_shifts_by_configured_offset() {
        let lagos = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(civil_to_utc(dt(10, 0), lagos), Some(dt(9, 0)));
    }

    #[test]
    fn civil_shift_past_datetime_range_is_refused() {
        let east = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(civil_to_utc(NaiveDateTime::MIN, east), None);

        let west = FixedOffset::west_opt(3600).unwrap();
        assert_eq!(civil_to_utc(NaiveDateTime::MAX, west), None);
    }

    #[test]
    fn status_words_round_trip() {
        assert_eq!(FenceStatus::Active.to_string(), "active");
        assert_eq!(FenceStatus::from_str("scheduled"), Ok(FenceStatus::Scheduled));
        assert!(FenceStatus::from_str("bogus").is_err());
    }
}
