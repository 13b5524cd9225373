//! Pure predicates behind the roster search and the history filters.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};

use crate::models::{DetectionRecord, Student};

/// Case-insensitive substring search over name, roll number and department.
/// A blank query keeps everything.
pub fn filter_students(students: &[Student], query: &str) -> Vec<Student> {
    let needle = query.trim().to_lowercase();
    students
        .iter()
        .filter(|s| {
            needle.is_empty()
                || contains(&s.name, &needle)
                || contains(&s.roll_no, &needle)
                || contains(&s.department, &needle)
        })
        .cloned()
        .collect()
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Smoking,
    Clear,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 3] = [StatusFilter::All, StatusFilter::Smoking, StatusFilter::Clear];

    pub fn matches(self, record: &DetectionRecord) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Smoking => record.smoking_detected,
            StatusFilter::Clear => !record.smoking_detected,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All Status",
            StatusFilter::Smoking => "Smoking",
            StatusFilter::Clear => "Clear",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all status" => Ok(StatusFilter::All),
            "smoking" => Ok(StatusFilter::Smoking),
            "clear" => Ok(StatusFilter::Clear),
            other => Err(format!("unknown status filter {other:?} (expected all, smoking or clear)")),
        }
    }
}

/// Date range over local calendar dates. Both ends are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRange {
    #[default]
    All,
    Today,
    Last7Days,
    Last30Days,
    Custom { start: NaiveDate, end: NaiveDate },
}

impl DateRange {
    /// Build a custom range; reversed ends are swapped.
    pub fn custom(a: NaiveDate, b: NaiveDate) -> Self {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        DateRange::Custom { start, end }
    }

    /// Inclusive `(first, last)` dates, or `None` for no bound.
    pub fn bounds(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let back = |days: u64| today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        match *self {
            DateRange::All => None,
            DateRange::Today => Some((today, today)),
            DateRange::Last7Days => Some((back(6), today)),
            DateRange::Last30Days => Some((back(29), today)),
            DateRange::Custom { start, end } => Some((start.min(end), start.max(end))),
        }
    }

    pub fn label(&self) -> String {
        match self {
            DateRange::All => "All Dates".into(),
            DateRange::Today => "Today".into(),
            DateRange::Last7Days => "Last 7 Days".into(),
            DateRange::Last30Days => "Last 30 Days".into(),
            DateRange::Custom { start, end } => format!("{start} to {end}"),
        }
    }
}

/// Search text, status and date range applied together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub search: String,
    pub status: StatusFilter,
    pub range: DateRange,
}

impl HistoryFilter {
    /// Filter in the machine's local time zone.
    pub fn apply(&self, records: &[DetectionRecord]) -> Vec<DetectionRecord> {
        self.apply_in(records, &Local, Local::now().date_naive())
    }

    /// Filter with an explicit zone and "today", preserving input order.
    pub fn apply_in<Tz: TimeZone>(
        &self,
        records: &[DetectionRecord],
        tz: &Tz,
        today: NaiveDate,
    ) -> Vec<DetectionRecord> {
        let bounds = self.range.bounds(today);
        let needle = self.search.trim().to_lowercase();
        records
            .iter()
            .filter(|r| self.matches_in(r, tz, bounds, &needle))
            .cloned()
            .collect()
    }

    fn matches_in<Tz: TimeZone>(
        &self,
        record: &DetectionRecord,
        tz: &Tz,
        bounds: Option<(NaiveDate, NaiveDate)>,
        needle: &str,
    ) -> bool {
        if !self.status.matches(record) {
            return false;
        }
        if let Some((first, last)) = bounds {
            let day = local_date(&record.timestamp, tz);
            if day < first || day > last {
                return false;
            }
        }
        needle.is_empty()
            || contains(record.display_name(), needle)
            || [&record.roll_no, &record.department, &record.action_taken]
                .into_iter()
                .flatten()
                .any(|field| contains(field, needle))
    }
}

fn local_date<Tz: TimeZone>(timestamp: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    timestamp.with_timezone(tz).date_naive()
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    fn student(name: &str, roll: &str, dept: &str) -> Student {
        Student {
            id: None,
            name: name.into(),
            roll_no: roll.into(),
            department: dept.into(),
            email: None,
            phone: None,
            image: None,
            enrollment_date: None,
            status: "Active".into(),
        }
    }

    fn record(ts: &str, name: Option<&str>, smoking: bool) -> DetectionRecord {
        DetectionRecord {
            id: None,
            timestamp: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
            name: name.map(str::to_string),
            roll_no: Some("CS001".into()),
            department: Some("Computer Science".into()),
            email: None,
            phone: None,
            image: None,
            smoking_detected: smoking,
            face_detected: name.is_some(),
            confidence: 88.0,
            action_taken: Some("Alert sent".into()),
            screenshot_path: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn student_search_is_case_insensitive() {
        let roster = vec![
            student("Ayesha Khan", "CS001", "Computer Science"),
            student("Bilal Ahmed", "EE014", "Electrical"),
        ];
        assert_eq!(filter_students(&roster, "ayesha").len(), 1);
        assert_eq!(filter_students(&roster, "ee0").len(), 1);
        assert_eq!(filter_students(&roster, "ELECTRICAL")[0].roll_no, "EE014");
        assert_eq!(filter_students(&roster, "  ").len(), 2);
        assert!(filter_students(&roster, "physics").is_empty());
    }

    #[test]
    fn status_filter_parses_and_matches() {
        assert_eq!("Smoking".parse::<StatusFilter>().unwrap(), StatusFilter::Smoking);
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert!("maybe".parse::<StatusFilter>().is_err());

        let smoking = record("2024-03-01T10:00:00Z", None, true);
        let clear = record("2024-03-01T10:00:00Z", None, false);
        assert!(StatusFilter::Smoking.matches(&smoking));
        assert!(!StatusFilter::Smoking.matches(&clear));
        assert!(StatusFilter::Clear.matches(&clear));
    }

    #[test]
    fn relative_ranges_include_today() {
        let today = date(2024, 3, 10);
        assert_eq!(DateRange::Today.bounds(today), Some((today, today)));
        assert_eq!(DateRange::Last7Days.bounds(today), Some((date(2024, 3, 4), today)));
        assert_eq!(DateRange::Last30Days.bounds(today), Some((date(2024, 2, 10), today)));
        assert_eq!(DateRange::All.bounds(today), None);
    }

    #[test]
    fn custom_range_is_inclusive_on_both_ends() {
        let records = vec![
            record("2024-03-01T00:00:00Z", Some("A"), true),
            record("2024-03-02T12:00:00Z", Some("B"), true),
            record("2024-03-03T23:59:59Z", Some("C"), false),
            record("2024-03-04T00:00:00Z", Some("D"), false),
        ];
        let filter = HistoryFilter {
            range: DateRange::custom(date(2024, 3, 3), date(2024, 3, 1)),
            ..Default::default()
        };
        let kept: Vec<_> = filter
            .apply_in(&records, &Utc, date(2024, 3, 10))
            .into_iter()
            .map(|r| r.name.unwrap())
            .collect();
        assert_eq!(kept, ["A", "B", "C"]);
    }

    #[test]
    fn date_filter_uses_local_dates_and_ignores_order() {
        // 2024-03-01T22:30Z is already March 2nd at UTC+5.
        let plus_five = FixedOffset::east_opt(5 * 3600).unwrap();
        let records = vec![
            record("2024-03-01T22:30:00Z", Some("late"), true),
            record("2024-03-01T12:00:00Z", Some("noon"), true),
            record("2024-03-02T20:00:00Z", Some("next"), true),
        ];
        let filter = HistoryFilter {
            range: DateRange::custom(date(2024, 3, 2), date(2024, 3, 2)),
            ..Default::default()
        };

        let forward = filter.apply_in(&records, &plus_five, date(2024, 3, 5));
        let mut reversed_input = records.clone();
        reversed_input.reverse();
        let mut backward = filter.apply_in(&reversed_input, &plus_five, date(2024, 3, 5));
        backward.reverse();

        let names: Vec<_> = forward.iter().map(|r| r.display_name()).collect();
        assert_eq!(names, ["late"]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn search_covers_action_and_falls_back_to_unknown_name() {
        let records = vec![
            record("2024-03-01T10:00:00Z", None, true),
            record("2024-03-01T11:00:00Z", Some("Sara"), false),
        ];
        let by_name = HistoryFilter {
            search: "unknown".into(),
            ..Default::default()
        };
        assert_eq!(by_name.apply_in(&records, &Utc, date(2024, 3, 1)).len(), 1);

        let by_action = HistoryFilter {
            search: "ALERT".into(),
            status: StatusFilter::Clear,
            ..Default::default()
        };
        let hits = by_action.apply_in(&records, &Utc, date(2024, 3, 1));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].display_name(), "Sara");
    }
}
