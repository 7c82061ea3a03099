use chrono::{DateTime, Datelike, Months, TimeZone};
use serde::Serialize;

use crate::models::Document;

use super::monthly::{
    aggregate_range, aggregate_rolling_window, range_totals, DateRange, MonthBucket, RangeTotals,
    WINDOW_MONTHS,
};

/// Total number of documents in the archive.
pub fn archived_total(docs: &[Document]) -> usize {
    docs.iter().filter(|d| d.is_archived()).count()
}

/// Archived documents whose archive date falls in `year` (in `tz`).
pub fn archived_in_year<Tz: TimeZone>(docs: &[Document], year: i32, tz: &Tz) -> usize {
    docs.iter()
        .filter(|d| d.is_archived())
        .filter_map(|d| d.last_moved_at())
        .filter(|date| date.with_timezone(tz).year() == year)
        .count()
}

/// Added minus read across the window. Negative when reading outpaced saving.
pub fn window_difference(buckets: &[MonthBucket]) -> i64 {
    buckets
        .iter()
        .map(|b| i64::from(b.articles_added) - i64::from(b.articles_read))
        .sum()
}

pub fn difference_sentence(difference: i64) -> String {
    format!(
        "Overall, you saved {} more articles than you read during the last {} months.",
        difference, WINDOW_MONTHS
    )
}

/// "May - October 2026" for a window ending in October 2026.
pub fn window_caption<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let start = now
        .date_naive()
        .checked_sub_months(Months::new(WINDOW_MONTHS - 1))
        .map(|d| d.format("%B").to_string())
        .unwrap_or_default();
    format!("{} - {}", start, now.format("%B %Y"))
}

/// Everything the dashboard shows, computed from the stored document list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub archived_total: usize,
    pub year: i32,
    pub archived_this_year: usize,
    pub window: Vec<MonthBucket>,
    pub window_difference: i64,
    pub range_totals: RangeTotals,
    pub range: Vec<MonthBucket>,
}

impl DashboardStats {
    pub fn compute<Tz>(docs: &[Document], range: &DateRange<Tz>, now: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let year = now.year();
        let window = aggregate_rolling_window(docs, now);
        let window_difference = window_difference(&window);

        Self {
            archived_total: archived_total(docs),
            year,
            archived_this_year: archived_in_year(docs, year, &now.timezone()),
            window,
            window_difference,
            range_totals: range_totals(docs, range),
            range: aggregate_range(docs, range),
        }
    }

    /// The window bucket for the month of `now`.
    #[cfg(test)]
    pub fn current_month(&self) -> Option<&MonthBucket> {
        self.window.last()
    }
}
