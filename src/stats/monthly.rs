use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::models::{Document, Location};

/// Number of months shown in the rolling "Articles/Month" chart.
pub const WINDOW_MONTHS: u32 = 6;

/// Bucket label format: full month name and 4-digit year ("January 2026").
pub const MONTH_LABEL_FORMAT: &str = "%B %Y";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    pub month: String,
    pub articles_added: u32,
    pub articles_read: u32,
}

impl MonthBucket {
    fn empty(month: String) -> Self {
        Self {
            month,
            articles_added: 0,
            articles_read: 0,
        }
    }

    /// "Jan" for "January 2026".
    pub fn short_month(&self) -> String {
        self.month.chars().take(3).collect()
    }

    /// "Jan '26" for "January 2026".
    pub fn short_month_and_year(&self) -> String {
        let mut parts = self.month.split(' ');
        let month: String = parts.next().unwrap_or_default().chars().take(3).collect();
        let year = parts.next().unwrap_or_default();
        let short_year = year.get(year.len().saturating_sub(2)..).unwrap_or(year);
        format!("{month} '{short_year}")
    }
}

/// A user-picked range. Either bound may be missing while the user is
/// still editing it; an incomplete range produces no buckets.
#[derive(Debug, Clone)]
pub struct DateRange<Tz: TimeZone> {
    pub from: Option<DateTime<Tz>>,
    pub to: Option<DateTime<Tz>>,
}

impl<Tz: TimeZone> DateRange<Tz> {
    #[cfg(test)]
    pub fn new(from: DateTime<Tz>, to: DateTime<Tz>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    #[cfg(test)]
    pub fn unset() -> Self {
        Self {
            from: None,
            to: None,
        }
    }

    /// Start of the current year through the end of today.
    pub fn year_to_date(now: &DateTime<Tz>) -> Self {
        let today = now.date_naive();
        let start_of_year = NaiveDate::from_ymd_opt(today.year(), 1, 1);
        Self::from_days(start_of_year, Some(today), &now.timezone())
    }

    /// Range over whole days: midnight of `from` through the last
    /// millisecond of `to`, in `tz`.
    pub fn from_days(from: Option<NaiveDate>, to: Option<NaiveDate>, tz: &Tz) -> Self {
        let from = from
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .and_then(|d| tz.from_local_datetime(&d).earliest());
        let to = to
            .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
            .and_then(|d| tz.from_local_datetime(&d).latest());
        Self { from, to }
    }

    pub fn bounds(&self) -> Option<(&DateTime<Tz>, &DateTime<Tz>)> {
        match (&self.from, &self.to) {
            (Some(from), Some(to)) => Some((from, to)),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.bounds().is_some()
    }

    /// Inclusive on both ends. Always false for an incomplete range.
    pub fn contains(&self, date: &DateTime<Utc>) -> bool {
        self.bounds()
            .is_some_and(|(from, to)| date >= from && date <= to)
    }
}

/// The activity a document contributes, if any, and when it happened.
enum Activity {
    Added(DateTime<Utc>),
    Read(DateTime<Utc>),
}

fn activity(doc: &Document) -> Option<Activity> {
    match doc.location {
        Location::Later => doc.saved_at().map(Activity::Added),
        Location::Archive => doc.last_moved_at().map(Activity::Read),
        _ => None,
    }
}

fn month_label<Tz: TimeZone>(date: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.with_timezone(tz).format(MONTH_LABEL_FORMAT).to_string()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Buckets for the trailing window: five months before `now`'s month
/// through `now`'s month, oldest first.
pub fn rolling_window_buckets<Tz: TimeZone>(now: &DateTime<Tz>) -> Vec<MonthBucket> {
    let current = first_of_month(now.date_naive());
    (0..WINDOW_MONTHS)
        .rev()
        .filter_map(|i| current.checked_sub_months(Months::new(i)))
        .map(|month| MonthBucket::empty(month.format(MONTH_LABEL_FORMAT).to_string()))
        .collect()
}

/// One bucket per calendar month from `from`'s month to `to`'s month,
/// inclusive, oldest first.
pub fn range_buckets<Tz: TimeZone>(range: &DateRange<Tz>) -> Vec<MonthBucket> {
    let Some((from, to)) = range.bounds() else {
        return Vec::new();
    };

    let end = first_of_month(to.date_naive());
    let mut current = first_of_month(from.date_naive());
    let mut buckets = Vec::new();

    while current <= end {
        buckets.push(MonthBucket::empty(
            current.format(MONTH_LABEL_FORMAT).to_string(),
        ));
        match current.checked_add_months(Months::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }

    buckets
}

/// Count a document into the bucket whose label matches its activity
/// month. Lookup is by label text; unmatched documents are dropped.
fn tally<Tz>(buckets: &mut [MonthBucket], activity: Activity, tz: &Tz)
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let (date, added) = match activity {
        Activity::Added(date) => (date, true),
        Activity::Read(date) => (date, false),
    };

    let label = month_label(&date, tz);
    if let Some(bucket) = buckets.iter_mut().find(|b| b.month == label) {
        if added {
            bucket.articles_added += 1;
        } else {
            bucket.articles_read += 1;
        }
    }
}

/// Added/read counts for the trailing six months ending at `now`.
pub fn aggregate_rolling_window<Tz>(docs: &[Document], now: &DateTime<Tz>) -> Vec<MonthBucket>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let tz = now.timezone();
    let mut buckets = rolling_window_buckets(now);

    for activity in docs.iter().filter_map(activity) {
        tally(&mut buckets, activity, &tz);
    }

    buckets
}

/// Added/read counts per month for documents whose activity date lies
/// inside `range`. Empty when the range is incomplete.
pub fn aggregate_range<Tz>(docs: &[Document], range: &DateRange<Tz>) -> Vec<MonthBucket>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let Some((from, _)) = range.bounds() else {
        return Vec::new();
    };
    let tz = from.timezone();
    let mut buckets = range_buckets(range);

    for activity in docs.iter().filter_map(activity) {
        let date = match &activity {
            Activity::Added(date) | Activity::Read(date) => *date,
        };
        if range.contains(&date) {
            tally(&mut buckets, activity, &tz);
        }
    }

    buckets
}

/// Counts inside an inclusive range, regardless of bucketing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RangeTotals {
    pub added: u32,
    pub read: u32,
}

pub fn range_totals<Tz: TimeZone>(docs: &[Document], range: &DateRange<Tz>) -> RangeTotals {
    let mut totals = RangeTotals::default();
    if !range.is_complete() {
        return totals;
    }

    for activity in docs.iter().filter_map(activity) {
        match activity {
            Activity::Added(date) if range.contains(&date) => totals.added += 1,
            Activity::Read(date) if range.contains(&date) => totals.read += 1,
            _ => {}
        }
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn doc(id: &str, location: &str, saved_at: Option<&str>, last_moved_at: Option<&str>) -> Document {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "location": location,
            "saved_at": saved_at,
            "last_moved_at": last_moved_at,
        }))
        .unwrap()
    }

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn labels(buckets: &[MonthBucket]) -> Vec<&str> {
        buckets.iter().map(|b| b.month.as_str()).collect()
    }

    #[test]
    fn window_is_six_trailing_months() {
        let buckets = rolling_window_buckets(&utc(2026, 3, 31));
        assert_eq!(
            labels(&buckets),
            vec![
                "October 2025",
                "November 2025",
                "December 2025",
                "January 2026",
                "February 2026",
                "March 2026",
            ]
        );
        assert!(buckets
            .iter()
            .all(|b| b.articles_added == 0 && b.articles_read == 0));
    }

    #[test]
    fn window_ignores_documents_outside_it() {
        let now = utc(2026, 10, 16);
        let docs = vec![
            doc("a", "later", Some("2020-01-01T00:00:00Z"), None),
            doc("b", "archive", None, Some("2026-01-05T00:00:00Z")),
            doc("c", "later", Some("2026-06-05T00:00:00Z"), None),
        ];

        let buckets = aggregate_rolling_window(&docs, &now);
        assert_eq!(buckets.len(), 6);
        assert_eq!(buckets[0].month, "May 2026");
        assert_eq!(buckets[1].articles_added, 1);
        let read: u32 = buckets.iter().map(|b| b.articles_read).sum();
        assert_eq!(read, 0);
    }

    #[test]
    fn range_spanning_three_months() {
        let range = DateRange::new(utc(2025, 11, 20), utc(2026, 1, 3));
        let buckets = range_buckets(&range);
        assert_eq!(
            labels(&buckets),
            vec!["November 2025", "December 2025", "January 2026"]
        );
    }

    #[test]
    fn incomplete_or_reversed_range_has_no_buckets() {
        let open: DateRange<Utc> = DateRange {
            from: Some(utc(2026, 1, 1)),
            to: None,
        };
        assert!(range_buckets(&open).is_empty());
        assert!(range_buckets(&DateRange::<Utc>::unset()).is_empty());
        assert!(aggregate_range(&[doc("a", "later", Some("2026-01-02T00:00:00Z"), None)], &open).is_empty());

        let reversed = DateRange::new(utc(2026, 5, 1), utc(2026, 2, 1));
        assert!(range_buckets(&reversed).is_empty());
    }

    #[test]
    fn location_decides_which_counter_moves() {
        let range = DateRange::new(utc(2026, 1, 1), utc(2026, 3, 31));
        let docs = vec![
            doc("later", "later", Some("2026-02-10T00:00:00Z"), Some("2026-01-10T00:00:00Z")),
            doc("archive", "archive", Some("2026-01-10T00:00:00Z"), Some("2026-03-10T00:00:00Z")),
            doc("inbox", "new", Some("2026-02-10T00:00:00Z"), Some("2026-02-10T00:00:00Z")),
            doc("feed", "feed", Some("2026-02-10T00:00:00Z"), Some("2026-02-10T00:00:00Z")),
        ];

        let buckets = aggregate_range(&docs, &range);
        assert_eq!(buckets.len(), 3);
        assert_eq!((buckets[0].articles_added, buckets[0].articles_read), (0, 0));
        assert_eq!((buckets[1].articles_added, buckets[1].articles_read), (1, 0));
        assert_eq!((buckets[2].articles_added, buckets[2].articles_read), (0, 1));
        assert_eq!(range_totals(&docs, &range), RangeTotals { added: 1, read: 1 });
    }

    #[test]
    fn range_bounds_are_inclusive_to_the_instant() {
        let from = utc(2026, 2, 1);
        let to = utc(2026, 2, 28);
        let range = DateRange::new(from, to);
        let at_from = from.to_rfc3339();
        let before_from = (from - Duration::seconds(1)).to_rfc3339();
        let after_to = (to + Duration::seconds(1)).to_rfc3339();
        let docs = vec![
            doc("edge", "later", Some(at_from.as_str()), None),
            doc("early", "later", Some(before_from.as_str()), None),
            doc("late", "archive", None, Some(after_to.as_str())),
        ];

        let buckets = aggregate_range(&docs, &range);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].articles_added, 1);
        assert_eq!(buckets[0].articles_read, 0);
    }

    #[test]
    fn labels_follow_the_callers_time_zone() {
        // 23:30 UTC on Jan 31 is already February in UTC+2
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2026, 2, 15, 9, 0, 0).unwrap();
        let docs = vec![doc("a", "later", Some("2026-01-31T23:30:00Z"), None)];

        let buckets = aggregate_rolling_window(&docs, &now);
        let feb = buckets.iter().find(|b| b.month == "February 2026").unwrap();
        assert_eq!(feb.articles_added, 1);
    }

    #[test]
    fn undated_documents_are_skipped() {
        let now = utc(2026, 10, 16);
        let docs = vec![
            doc("a", "later", None, None),
            doc("b", "archive", Some("2026-10-01T00:00:00Z"), Some("not a date")),
        ];
        let buckets = aggregate_rolling_window(&docs, &now);
        assert!(buckets
            .iter()
            .all(|b| b.articles_added == 0 && b.articles_read == 0));
    }

    #[test]
    fn short_labels() {
        let bucket = MonthBucket::empty("September 2025".to_string());
        assert_eq!(bucket.short_month(), "Sep");
        assert_eq!(bucket.short_month_and_year(), "Sep '25");
    }

    #[test]
    fn year_to_date_covers_today() {
        let now = utc(2026, 10, 16);
        let range = DateRange::year_to_date(&now);
        let (from, to) = range.bounds().unwrap();
        assert_eq!(*from, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(to.date_naive(), now.date_naive());
        assert!(range.contains(&now));
        assert_eq!(range_buckets(&range).len(), 10);
    }
}
