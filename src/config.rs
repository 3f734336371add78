//! We can have a little hard-coded config, [as a
//! snack](https://knowyourmeme.com/memes/cats-can-have-a-little-salami).
//! Everything else comes out of the environment (and `.env`, via `dotenvy`).

use anyhow::{Context, Result};
use std::{env, net::SocketAddr};

/// How many notes the dashboard shows when `NOTES_PREVIEW_LIMIT` is unset.
pub const NOTES_PREVIEW_DEFAULT: i64 = 3;

/// A note preview is the first few words of the note body.
pub const NOTE_PREVIEW_WORDS: usize = 5;

/// Hour of the day (local time) for the daily habit and journal reminders.
pub const REMINDER_HOUR_DEFAULT: u32 = 8;

/// "Awesome Work!" fires this many seconds after a habit is created.
pub const NEW_HABIT_NUDGE_SECS: u64 = 5;

/// Longest value the `varchar(255)` columns take, in characters.
pub const MAX_TITLE_CHARS: usize = 255;

pub const SESSION_COOKIE: &str = "session";
pub const THEME_COOKIE: &str = "theme";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub session_secret: Vec<u8>,
    pub listen_addr: SocketAddr,
    pub notes_preview_limit: i64,
    pub reminder_hour: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let pg_usr = env::var("POSTGRES_USER")
            .context("postgres user to be defined in environment")?;
        let pg_pw = env::var("POSTGRES_PASSWORD")
            .context("postgres password to be defined in environment")?;
        let pg_db = env::var("POSTGRES_DB")
            .context("postgres db name to be defined in environment")?;
        let pg_host =
            env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".into());
        let session_secret = env::var("SESSION_SECRET")
            .context("session secret to be defined in the environment")?;
        let listen_addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8000".into())
            .parse()
            .context("LISTEN_ADDR must be a socket address")?;

        Ok(Self {
            database_url: format!(
                "postgres://{pg_usr}:{pg_pw}@{pg_host}:5432/{pg_db}"
            ),
            session_secret: session_secret.into_bytes(),
            listen_addr,
            notes_preview_limit: parse_or("NOTES_PREVIEW_LIMIT", NOTES_PREVIEW_DEFAULT)?,
            reminder_hour: parse_or("REMINDER_HOUR", REMINDER_HOUR_DEFAULT)?
                .min(23),
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
