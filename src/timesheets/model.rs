use chrono::{DateTime, Days, NaiveDate, Utc};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use timesheet_portal_api::{
    TimesheetEntryResponse, TimesheetResponse, TimesheetStatusDto, TimesheetSummaryResponse,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimesheetStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl TimesheetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TimesheetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimesheetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown timesheet status {other:?}")),
        }
    }
}

impl From<TimesheetStatus> for TimesheetStatusDto {
    fn from(status: TimesheetStatus) -> Self {
        match status {
            TimesheetStatus::Draft => Self::Draft,
            TimesheetStatus::Submitted => Self::Submitted,
            TimesheetStatus::Approved => Self::Approved,
            TimesheetStatus::Rejected => Self::Rejected,
        }
    }
}

/// Worked time in hundredths of an hour, so weekly and daily bounds compare exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Hours(i32);

impl Hours {
    pub const ZERO: Hours = Hours(0);
    pub const MAX_PER_ENTRY: Hours = Hours(24 * 100);
    pub const MAX_PER_WEEK: Hours = Hours(100 * 100);

    pub fn from_centi(centi: i32) -> Self {
        Self(centi)
    }

    #[cfg(test)]
    pub fn whole(hours: i32) -> Self {
        Self(hours * 100)
    }

    /// Rounds to two decimals. `None` for NaN, infinities and values outside `i32` range.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f64(hours: f64) -> Option<Self> {
        let centi = (hours * 100.0).round();
        if !centi.is_finite() || centi < f64::from(i32::MIN) || centi > f64::from(i32::MAX) {
            return None;
        }
        Some(Self(centi as i32))
    }

    pub fn centi(self) -> i32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl Add for Hours {
    type Output = Hours;

    fn add(self, rhs: Hours) -> Hours {
        Hours(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Hours {
    fn sum<I: Iterator<Item = Hours>>(iter: I) -> Hours {
        iter.fold(Hours::ZERO, Add::add)
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimesheetEntry {
    pub project: String,
    pub task: String,
    pub date: NaiveDate,
    pub hours: Hours,
}

#[derive(Debug, Clone)]
pub struct Timesheet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub week_start: NaiveDate,
    pub status: TimesheetStatus,
    pub entries: Vec<TimesheetEntry>,
    pub approver_id: Option<Uuid>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_reason: Option<String>,
    /// Bumped by the store on every successful write.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Timesheet {
    pub fn new_draft(
        owner_id: Uuid,
        week_start: NaiveDate,
        entries: Vec<TimesheetEntry>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            week_start,
            status: TimesheetStatus::Draft,
            entries,
            approver_id: None,
            submitted_at: None,
            decided_by: None,
            decided_at: None,
            decision_reason: None,
            version: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn week_end(&self) -> NaiveDate {
        week_end(self.week_start)
    }

    pub fn total_hours(&self) -> Hours {
        self.entries.iter().map(|e| e.hours).sum()
    }

    pub fn summary(&self) -> TimesheetSummaryResponse {
        TimesheetSummaryResponse {
            id: self.id,
            owner_id: self.owner_id,
            week_start: self.week_start,
            week_end: self.week_end(),
            status: self.status.into(),
            total_hours: self.total_hours().as_f64(),
            submitted_at: self.submitted_at,
        }
    }
}

/// Sunday closing the week that starts on `week_start`.
pub fn week_end(week_start: NaiveDate) -> NaiveDate {
    week_start
        .checked_add_days(Days::new(6))
        .unwrap_or(NaiveDate::MAX)
}

impl From<&TimesheetEntry> for TimesheetEntryResponse {
    fn from(entry: &TimesheetEntry) -> Self {
        Self {
            project: entry.project.clone(),
            task: entry.task.clone(),
            date: entry.date,
            hours: entry.hours.as_f64(),
        }
    }
}

impl From<Timesheet> for TimesheetResponse {
    fn from(sheet: Timesheet) -> Self {
        Self {
            id: sheet.id,
            owner_id: sheet.owner_id,
            week_start: sheet.week_start,
            week_end: sheet.week_end(),
            status: sheet.status.into(),
            total_hours: sheet.total_hours().as_f64(),
            entries: sheet.entries.iter().map(Into::into).collect(),
            approver_id: sheet.approver_id,
            submitted_at: sheet.submitted_at,
            decided_by: sheet.decided_by,
            decided_at: sheet.decided_at,
            decision_reason: sheet.decision_reason,
            created_at: sheet.created_at,
            updated_at: sheet.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_round_to_hundredths() {
        assert_eq!(Hours::from_f64(7.5), Some(Hours::from_centi(750)));
        assert_eq!(Hours::from_f64(0.333), Some(Hours::from_centi(33)));
        assert_eq!(Hours::from_f64(f64::NAN), None);
        assert_eq!(Hours::from_f64(f64::INFINITY), None);
    }

    #[test]
    fn tenths_sum_exactly_to_weekly_cap() {
        // 0.1 does not add up exactly in binary floating point
        let total: Hours = std::iter::repeat_n(Hours::from_f64(0.1).unwrap(), 1000).sum();
        assert_eq!(total, Hours::MAX_PER_WEEK);
    }

    #[test]
    fn hours_display_two_decimals() {
        assert_eq!(Hours::from_centi(1005).to_string(), "10.05");
        assert_eq!(Hours::from_centi(-50).to_string(), "-0.50");
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            TimesheetStatus::Draft,
            TimesheetStatus::Submitted,
            TimesheetStatus::Approved,
            TimesheetStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<TimesheetStatus>(), Ok(status));
        }
        assert!("archived".parse::<TimesheetStatus>().is_err());
    }

    #[test]
    fn week_end_is_six_days_after_start() {
        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(week_end(monday), NaiveDate::from_ymd_opt(2025, 1, 12).unwrap());
    }
}
