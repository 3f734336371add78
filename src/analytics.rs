//! Dashboard numbers, computed from records that are already in memory.
//! Nothing in here touches the database.

use super::models::{Habit, JournalEntry};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::collections::BTreeSet;

/// Number of days covered by the journal histogram.
pub const WEEK: usize = 7;

/// Percentage of habits currently marked complete; 0 when there are none.
pub fn completion_rate(habits: &[Habit]) -> f64 {
    if habits.is_empty() {
        return 0.0;
    }
    let done = habits.iter().filter(|h| h.completed).count();
    done as f64 / habits.len() as f64 * 100.0
}

/// Journal entries per day over the last week. Bucket 0 is six days ago and
/// bucket 6 is `today`; entries outside that window are not counted.
pub fn weekly_journal_histogram<Tz: TimeZone>(
    entries: &[JournalEntry],
    today: NaiveDate,
    tz: &Tz,
) -> [u32; WEEK] {
    let mut buckets = [0; WEEK];
    let window_start = today - Duration::days(WEEK as i64 - 1);
    for entry in entries {
        let day = local_day(&entry.created_at, tz);
        let offset = (day - window_start).num_days();
        if (0..WEEK as i64).contains(&offset) {
            buckets[offset as usize] += 1;
        }
    }
    buckets
}

/// The day a completed habit counts towards.
fn completion_day<Tz: TimeZone>(habit: &Habit, tz: &Tz) -> NaiveDate {
    local_day(habit.completed_at.as_ref().unwrap_or(&habit.created_at), tz)
}

fn local_day<Tz: TimeZone>(ts: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

/// Consecutive calendar days with at least one completed habit, ending
/// today. A streak that ended yesterday still counts, since today is not
/// over yet.
pub fn streak<Tz: TimeZone>(habits: &[Habit], today: NaiveDate, tz: &Tz) -> u32 {
    let days: BTreeSet<NaiveDate> = habits
        .iter()
        .filter(|h| h.completed)
        .map(|h| completion_day(h, tz))
        .filter(|day| *day <= today)
        .collect();

    let mut newest_first = days.into_iter().rev().peekable();
    let mut cursor = match newest_first.peek() {
        Some(day) if *day == today => today,
        Some(day) if *day == today - Duration::days(1) => *day,
        _ => return 0,
    };
    let mut count = 0;
    for day in newest_first {
        if day != cursor {
            break;
        }
        count += 1;
        cursor = day - Duration::days(1);
    }
    count
}

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub total_habits: usize,
    pub completed_habits: usize,
    pub completion_rate: f64,
    pub streak: u32,
    pub journal_entries: usize,
    pub journal_week: [u32; WEEK],
    /// Day labels for `journal_week`, oldest first.
    pub week_days: [NaiveDate; WEEK],
}

impl Summary {
    pub fn compute<Tz: TimeZone>(
        habits: &[Habit],
        entries: &[JournalEntry],
        now: &DateTime<Tz>,
    ) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let week_days = std::array::from_fn(|i| {
            today - Duration::days((WEEK - 1 - i) as i64)
        });
        Self {
            total_habits: habits.len(),
            completed_habits: habits.iter().filter(|h| h.completed).count(),
            completion_rate: completion_rate(habits),
            streak: streak(habits, today, &tz),
            journal_entries: entries.len(),
            journal_week: weekly_journal_histogram(entries, today, &tz),
            week_days,
        }
    }
}
