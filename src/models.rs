use super::{config::Config, live::LiveHub, notify::Notifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub live: Arc<LiveHub>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
}

impl User {
    /// What we greet the user with; falls back to the email address, like
    /// the profile screen always has.
    pub fn greeting_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.email
        } else {
            &self.display_name
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
}

impl Frequency {
    pub const ALL: [Frequency; 2] = [Frequency::Daily, Frequency::Weekly];

    /// Unknown or missing values read back as the default.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("weekly") => Self::Weekly,
            _ => Self::Daily,
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    #[default]
    Neutral,
    Excited,
}

impl Mood {
    pub const ALL: [Mood; 4] =
        [Mood::Happy, Mood::Sad, Mood::Neutral, Mood::Excited];

    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("happy") => Self::Happy,
            Some("sad") => Self::Sad,
            Some("excited") => Self::Excited,
            _ => Self::Neutral,
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Neutral => "neutral",
            Self::Excited => "excited",
        }
    }
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Happy => "😊",
            Self::Sad => "😢",
            Self::Neutral => "😐",
            Self::Excited => "🤩",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Habit {
    pub id: i32,
    pub owner_id: i32,
    pub title: String,
    pub description: String,
    pub frequency: Frequency,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a habit the user fills in. Everything else is stamped by the
/// access layer or the database.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct HabitDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frequency: Frequency,
}

/// A partial update; only the `Some` fields are merged into the record,
/// and the merge happens in SQL. Setting `completed` also sets or clears
/// `completed_at`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HabitPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<Frequency>,
    pub completed: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JournalEntry {
    pub id: i32,
    pub owner_id: i32,
    pub title: String,
    pub content: String,
    pub mood: Mood,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct JournalDraft {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub mood: Mood,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct JournalPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub mood: Option<Mood>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    pub id: i32,
    pub owner_id: i32,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// The first few words of the body, with an ellipsis if anything was cut.
    pub fn preview(&self, words: usize) -> String {
        let all: Vec<&str> = self.body.split_whitespace().collect();
        if all.len() > words {
            format!("{}...", all[..words].join(" "))
        } else {
            all.join(" ")
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub body: String,
}

impl NoteDraft {
    /// Notes are written as freeform text: the first non-blank line is the
    /// title, and the rest of the non-blank lines are joined into the body.
    pub fn from_text(text: &str) -> Self {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());
        let title = lines.next().unwrap_or_default().to_string();
        let body = lines.collect::<Vec<_>>().join(" ");
        Self { title, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_defaults_on_read() {
        assert_eq!(Frequency::parse_or_default(None), Frequency::Daily);
        assert_eq!(Frequency::parse_or_default(Some("Weekly")), Frequency::Weekly);
        assert_eq!(Frequency::parse_or_default(Some("hourly")), Frequency::Daily);
        assert_eq!(Mood::parse_or_default(None), Mood::Neutral);
        assert_eq!(Mood::parse_or_default(Some("EXCITED")), Mood::Excited);
        assert_eq!(Mood::parse_or_default(Some("grumpy")), Mood::Neutral);
    }

    #[test]
    fn test_note_from_text() {
        let draft = NoteDraft::from_text("\n  Groceries \n\nmilk\n  eggs\n\n");
        assert_eq!(draft.title, "Groceries");
        assert_eq!(draft.body, "milk eggs");

        let empty = NoteDraft::from_text("   \n\n");
        assert_eq!(empty.title, "");
        assert_eq!(empty.body, "");
    }

    #[test]
    fn test_note_preview() {
        let note = Note {
            id: 1,
            owner_id: 1,
            title: "t".into(),
            body: "one two three four five six".into(),
            created_at: Utc::now(),
        };
        assert_eq!(note.preview(5), "one two three four five...");
        assert_eq!(note.preview(6), "one two three four five six");
    }

    #[test]
    fn test_greeting_falls_back_to_email() {
        let mut user = User {
            id: 1,
            username: "jack".into(),
            email: "jack@jack.com".into(),
            display_name: " ".into(),
        };
        assert_eq!(user.greeting_name(), "jack@jack.com");
        user.display_name = "Jack".into();
        assert_eq!(user.greeting_name(), "Jack");
    }
}
