//! Reminders. Scheduling is fire-and-forget: nothing downstream waits on a
//! reminder or reacts to it. Actual push delivery is somebody else's job;
//! `LogNotifier` just logs the reminder when it comes due.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime, TimeZone};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    After(Duration),
    /// Every day at this local time.
    DailyAt(NaiveTime),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reminder {
    pub user_id: i32,
    pub title: String,
    pub body: String,
    /// Which screen the reminder should open.
    pub screen: &'static str,
    pub trigger: Trigger,
}

impl Reminder {
    pub fn habit_check(user_id: i32, hour: u32) -> Self {
        Self {
            user_id,
            title: "Habit Check! ⏰".into(),
            body: "Time to check off your habits today.".into(),
            screen: "habits",
            trigger: Trigger::DailyAt(at_hour(hour)),
        }
    }
    pub fn new_habit_nudge(user_id: i32, delay: Duration) -> Self {
        Self {
            user_id,
            title: "Awesome Work! 🌟".into(),
            body: "You added a new habit. Keep it up!".into(),
            screen: "habits",
            trigger: Trigger::After(delay),
        }
    }
    pub fn journal_prompt(user_id: i32, hour: u32) -> Self {
        Self {
            user_id,
            title: "Journal Time! 📝".into(),
            body: "Take a minute to write about your day.".into(),
            screen: "journal",
            trigger: Trigger::DailyAt(at_hour(hour)),
        }
    }
}

fn at_hour(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour.min(23), 0, 0).expect("hour is clamped to 0..=23")
}

/// How long from `now` until `time` next comes around. A time equal to
/// `now` is tomorrow, so a daily reminder can never fire twice in a row.
pub fn until_next<Tz: TimeZone>(now: &DateTime<Tz>, time: NaiveTime) -> Duration {
    let today_at = now.date_naive().and_time(time);
    let now_naive = now.naive_local();
    let next = if today_at > now_naive {
        today_at
    } else {
        today_at + ChronoDuration::days(1)
    };
    (next - now_naive).to_std().unwrap_or_default()
}

pub trait Notifier: Send + Sync {
    fn schedule(&self, reminder: Reminder);
}

/// Schedules reminders on the tokio runtime and logs them when they fire.
/// Daily reminders are only scheduled once per user and screen per process.
#[derive(Default)]
pub struct LogNotifier {
    daily: std::sync::Mutex<std::collections::HashSet<(i32, &'static str)>>,
}

impl LogNotifier {
    fn claim_daily(&self, reminder: &Reminder) -> bool {
        self.daily
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert((reminder.user_id, reminder.screen))
    }
}

impl Notifier for LogNotifier {
    fn schedule(&self, reminder: Reminder) {
        if let Trigger::DailyAt(_) = reminder.trigger {
            if !self.claim_daily(&reminder) {
                return;
            }
        }
        tracing::debug!(
            user_id = reminder.user_id,
            title = %reminder.title,
            trigger = ?reminder.trigger,
            "reminder scheduled"
        );
        tokio::spawn(async move {
            loop {
                let wait = match reminder.trigger {
                    Trigger::After(delay) => delay,
                    Trigger::DailyAt(time) => until_next(&Local::now(), time),
                };
                tokio::time::sleep(wait).await;
                tracing::info!(
                    user_id = reminder.user_id,
                    screen = reminder.screen,
                    title = %reminder.title,
                    body = %reminder.body,
                    "reminder due"
                );
                if let Trigger::After(_) = reminder.trigger {
                    break;
                }
            }
        });
    }
}
