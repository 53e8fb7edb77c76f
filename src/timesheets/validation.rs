use chrono::{Datelike, NaiveDate, Weekday};
use timesheet_portal_api::{FieldError, TimesheetEntryRequest};

use super::model::{Hours, Timesheet, TimesheetEntry, week_end};

const MAX_PROJECT_LEN: usize = 100;
const MAX_TASK_LEN: usize = 500;
pub const MAX_REASON_LEN: usize = 1000;

/// Field-level validation failures, reported to the client all at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

pub fn check_week_start(week_start: NaiveDate) -> Result<(), ValidationErrors> {
    if week_start.weekday() == Weekday::Mon {
        Ok(())
    } else {
        Err(ValidationErrors::single(
            "week_start",
            "Week start date must be a Monday",
        ))
    }
}

/// Parses and checks a draft save request. Entries come back in request order.
pub fn parse_draft(
    week_start: NaiveDate,
    entries: &[TimesheetEntryRequest],
) -> Result<Vec<TimesheetEntry>, ValidationErrors> {
    let mut errors = check_week_start(week_start).err().unwrap_or_default();
    let last_day = week_end(week_start);

    let mut parsed = Vec::with_capacity(entries.len());
    for (i, raw) in entries.iter().enumerate() {
        let project = raw.project.trim();
        if project.is_empty() {
            errors.push(&format!("entries[{i}].project"), "Project is required");
        } else if project.chars().count() > MAX_PROJECT_LEN {
            errors.push(
                &format!("entries[{i}].project"),
                format!("Project must not exceed {MAX_PROJECT_LEN} characters"),
            );
        }

        let task = raw.task.trim();
        if task.chars().count() > MAX_TASK_LEN {
            errors.push(
                &format!("entries[{i}].task"),
                format!("Task must not exceed {MAX_TASK_LEN} characters"),
            );
        }

        if raw.date < week_start || raw.date > last_day {
            errors.push(
                &format!("entries[{i}].date"),
                format!("Date {} is not within the week {week_start} to {last_day}", raw.date),
            );
        }

        let hours = match Hours::from_f64(raw.hours) {
            Some(h) if h >= Hours::ZERO && h <= Hours::MAX_PER_ENTRY => h,
            _ => {
                errors.push(
                    &format!("entries[{i}].hours"),
                    format!("Hours must be between 0 and 24, got {}", raw.hours),
                );
                continue;
            }
        };

        parsed.push(TimesheetEntry {
            project: project.to_string(),
            task: task.to_string(),
            date: raw.date,
            hours,
        });
    }

    let total: Hours = parsed.iter().map(|e| e.hours).sum();
    if total > Hours::MAX_PER_WEEK {
        errors.push(
            "entries",
            format!("Total weekly hours ({total}) must not exceed 100"),
        );
    }

    errors.into_result(parsed)
}

/// Submission needs at least one entry and a total in (0, 100].
pub fn check_submittable(sheet: &Timesheet) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if sheet.entries.is_empty() {
        errors.push("entries", "Cannot submit an empty timesheet");
        return Err(errors);
    }

    let total = sheet.total_hours();
    if total <= Hours::ZERO {
        errors.push("entries", "Cannot submit a timesheet with zero hours");
    } else if total > Hours::MAX_PER_WEEK {
        errors.push(
            "entries",
            format!("Total weekly hours ({total}) must not exceed 100"),
        );
    }

    errors.into_result(())
}

pub fn check_reason(reason: &str) -> Result<String, ValidationErrors> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ValidationErrors::single("reason", "Rejection reason is required"));
    }
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(ValidationErrors::single(
            "reason",
            format!("Rejection reason must not exceed {MAX_REASON_LEN} characters"),
        ));
    }
    Ok(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    fn entry(day_offset: u64, hours: f64) -> TimesheetEntryRequest {
        TimesheetEntryRequest {
            project: "PRJ-1".to_string(),
            task: "Development".to_string(),
            date: monday() + chrono::Days::new(day_offset),
            hours,
        }
    }

    #[test]
    fn accepts_a_regular_week() {
        let entries: Vec<_> = (0..5).map(|d| entry(d, 8.0)).collect();
        let parsed = parse_draft(monday(), &entries).expect("valid week");
        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed.iter().map(|e| e.hours).sum::<Hours>(), Hours::whole(40));
    }

    #[test]
    fn rejects_week_start_that_is_not_monday() {
        let tuesday = monday().succ_opt().unwrap();
        let err = parse_draft(tuesday, &[]).unwrap_err();
        assert_eq!(err.fields()[0].field, "week_start");
    }

    #[test]
    fn rejects_entry_hours_outside_a_day() {
        let err = parse_draft(monday(), &[entry(0, 24.5), entry(1, -1.0)]).unwrap_err();
        let fields: Vec<_> = err.fields().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["entries[0].hours", "entries[1].hours"]);
    }

    #[test]
    fn accepts_entry_of_exactly_24_hours() {
        assert!(parse_draft(monday(), &[entry(0, 24.0)]).is_ok());
    }

    #[test]
    fn rejects_dates_outside_the_week() {
        let err = parse_draft(monday(), &[entry(7, 1.0)]).unwrap_err();
        assert_eq!(err.fields()[0].field, "entries[0].date");
    }

    #[test]
    fn rejects_missing_project() {
        let mut e = entry(0, 1.0);
        e.project = "   ".to_string();
        let err = parse_draft(monday(), &[e]).unwrap_err();
        assert_eq!(err.fields()[0].field, "entries[0].project");
    }

    #[test]
    fn weekly_total_above_100_is_rejected() {
        // 5 x 20h + 0.25h
        let mut entries: Vec<_> = (0..5).map(|d| entry(d, 20.0)).collect();
        entries.push(entry(5, 0.25));
        let err = parse_draft(monday(), &entries).unwrap_err();
        assert_eq!(err.fields()[0].field, "entries");
    }

    #[test]
    fn weekly_total_of_exactly_100_is_accepted() {
        let entries: Vec<_> = (0..5).map(|d| entry(d, 20.0)).collect();
        assert!(parse_draft(monday(), &entries).is_ok());
    }

    #[test]
    fn reason_is_trimmed_and_required() {
        assert!(check_reason("  \t ").is_err());
        assert_eq!(check_reason("  wrong project  ").unwrap(), "wrong project");
    }
}
