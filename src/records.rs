//! The record access layer. Every operation needs a signed-in caller, every
//! record is stamped with (and scoped by) the caller's id, and every write
//! is followed by a fresh snapshot on the live hub so that open list views
//! reconcile.

use super::{
    config::MAX_TITLE_CHARS,
    db_ops::{self, DbModel, NotePreviewQuery, OwnedQuery, OwnerQuery},
    errors::{AppError, AppResult},
    live::{Feed, Snapshot},
    models::{
        AppState, Habit, HabitDraft, HabitPatch, JournalDraft, JournalEntry,
        JournalPatch, Note, NoteDraft, User,
    },
};
use chrono::Utc;
use std::{future::Future, sync::Arc};

pub fn require_user(caller: Option<&User>) -> AppResult<&User> {
    caller.ok_or(AppError::NotAuthenticated)
}

/// Titles and user names are stored as `varchar(255)`, which counts
/// characters, not bytes.
pub fn check_length(value: &str, field: &str) -> AppResult<()> {
    if value.chars().count() > MAX_TITLE_CHARS {
        Err(AppError::validation(format!(
            "{field} must be at most {MAX_TITLE_CHARS} characters"
        )))
    } else {
        Ok(())
    }
}

/// Trimmed `value`, or a validation error naming `field`.
fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    check_length(value, field)?;
    Ok(value.to_string())
}

/// Re-run the owner's list query after a write and publish the result,
/// failure included, to every open view. Nobody watching means nothing to
/// do.
async fn refresh<T, Fut>(feed: &Feed<T>, owner_id: i32, fetch: Fut)
where
    T: Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<T>>>,
{
    if !feed.watched(owner_id) {
        return;
    }
    let version = feed.next_version();
    let result = fetch.await.map_err(|err| {
        let err = AppError::from(err);
        tracing::error!(owner_id, error = %err, "live query failed");
        err.user_message()
    });
    feed.publish(owner_id, version, result);
}

pub async fn refresh_habits(state: &AppState, owner_id: i32) {
    refresh(
        &state.live.habits,
        owner_id,
        Habit::list(&state.db, &OwnerQuery { owner_id }),
    )
    .await
}

pub async fn refresh_journals(state: &AppState, owner_id: i32) {
    refresh(
        &state.live.journals,
        owner_id,
        JournalEntry::list(&state.db, &OwnerQuery { owner_id }),
    )
    .await
}

pub async fn refresh_notes(state: &AppState, owner_id: i32) {
    let query = NotePreviewQuery {
        owner_id,
        limit: state.config.notes_preview_limit,
    };
    refresh(
        &state.live.notes,
        owner_id,
        db_ops::list_notes(&state.db, &query),
    )
    .await
}

/// The owner's records for a read-only screen. A snapshot the hub already
/// holds is reused without touching the database. Otherwise the list query
/// runs and a success is shared with every open view; a failure stays with
/// the caller.
async fn load<T, Fut>(feed: &Feed<T>, owner_id: i32, fetch: Fut) -> Snapshot<T>
where
    T: Send + Sync + 'static,
    Fut: Future<Output = AppResult<Vec<T>>>,
{
    let _rx = feed.subscribe(owner_id);
    let latest = feed.latest(owner_id);
    if let Snapshot::Records { .. } = latest {
        return latest;
    }
    let version = feed.next_version();
    match fetch.await {
        Ok(records) => {
            let snapshot = Snapshot::Records {
                version,
                records: Arc::new(records),
            };
            if feed.offer(owner_id, snapshot.clone()) {
                return snapshot;
            }
            match feed.latest(owner_id) {
                newer @ Snapshot::Records { .. } => newer,
                _ => snapshot,
            }
        }
        Err(err) => {
            tracing::error!(owner_id, error = %err, "list query failed");
            Snapshot::Failed {
                version,
                message: err.user_message(),
            }
        }
    }
}

pub async fn habit_snapshot(
    state: &AppState,
    caller: Option<&User>,
) -> AppResult<Snapshot<Habit>> {
    let user = require_user(caller)?;
    let fetch = list_habits(state, Some(user));
    Ok(load(&state.live.habits, user.id, fetch).await)
}

pub async fn journal_snapshot(
    state: &AppState,
    caller: Option<&User>,
) -> AppResult<Snapshot<JournalEntry>> {
    let user = require_user(caller)?;
    let fetch = list_journals(state, Some(user));
    Ok(load(&state.live.journals, user.id, fetch).await)
}

pub async fn note_snapshot(
    state: &AppState,
    caller: Option<&User>,
) -> AppResult<Snapshot<Note>> {
    let user = require_user(caller)?;
    let fetch = list_notes(state, Some(user));
    Ok(load(&state.live.notes, user.id, fetch).await)
}

pub async fn create_habit(
    state: &AppState,
    caller: Option<&User>,
    draft: HabitDraft,
) -> AppResult<Habit> {
    let user = require_user(caller)?;
    let draft = HabitDraft {
        title: required(&draft.title, "Title")?,
        description: draft.description.trim().to_string(),
        frequency: draft.frequency,
    };
    let habit = db_ops::insert_habit(&state.db, user.id, &draft).await?;
    tracing::info!(user_id = user.id, habit_id = habit.id, "habit created");
    refresh_habits(state, user.id).await;

    Ok(habit)
}

pub async fn list_habits(
    state: &AppState,
    caller: Option<&User>,
) -> AppResult<Vec<Habit>> {
    let user = require_user(caller)?;
    Ok(Habit::list(&state.db, &OwnerQuery { owner_id: user.id }).await?)
}

pub async fn get_habit(
    state: &AppState,
    caller: Option<&User>,
    id: i32,
) -> AppResult<Habit> {
    let user = require_user(caller)?;
    Ok(Habit::get(
        &state.db,
        &OwnedQuery {
            id,
            owner_id: user.id,
        },
    )
    .await?)
}

pub async fn update_habit(
    state: &AppState,
    caller: Option<&User>,
    id: i32,
    mut patch: HabitPatch,
) -> AppResult<Habit> {
    let user = require_user(caller)?;
    if let Some(title) = &patch.title {
        patch.title = Some(required(title, "Title")?);
    }
    if let Some(description) = &patch.description {
        patch.description = Some(description.trim().to_string());
    }
    let query = OwnedQuery {
        id,
        owner_id: user.id,
    };
    let habit =
        db_ops::update_habit(&state.db, &query, &patch, Utc::now()).await?;
    tracing::info!(user_id = user.id, habit_id = id, "habit updated");
    refresh_habits(state, user.id).await;

    Ok(habit)
}

pub async fn toggle_habit(
    state: &AppState,
    caller: Option<&User>,
    id: i32,
) -> AppResult<Habit> {
    let user = require_user(caller)?;
    let query = OwnedQuery {
        id,
        owner_id: user.id,
    };
    let habit = db_ops::toggle_habit(&state.db, &query, Utc::now()).await?;
    tracing::info!(
        user_id = user.id,
        habit_id = id,
        completed = habit.completed,
        "habit toggled"
    );
    refresh_habits(state, user.id).await;

    Ok(habit)
}

pub async fn delete_habit(
    state: &AppState,
    caller: Option<&User>,
    id: i32,
) -> AppResult<()> {
    let user = require_user(caller)?;
    let habit = get_habit(state, Some(user), id).await?;
    habit.delete(&state.db).await?;
    tracing::info!(user_id = user.id, habit_id = id, "habit deleted");
    refresh_habits(state, user.id).await;

    Ok(())
}

pub async fn create_journal(
    state: &AppState,
    caller: Option<&User>,
    draft: JournalDraft,
) -> AppResult<JournalEntry> {
    let user = require_user(caller)?;
    let draft = JournalDraft {
        title: required(&draft.title, "Title")?,
        content: draft.content.trim().to_string(),
        mood: draft.mood,
    };
    let entry = db_ops::insert_journal(&state.db, user.id, &draft).await?;
    tracing::info!(user_id = user.id, entry_id = entry.id, "journal entry created");
    refresh_journals(state, user.id).await;

    Ok(entry)
}

pub async fn list_journals(
    state: &AppState,
    caller: Option<&User>,
) -> AppResult<Vec<JournalEntry>> {
    let user = require_user(caller)?;
    Ok(JournalEntry::list(&state.db, &OwnerQuery { owner_id: user.id }).await?)
}

pub async fn get_journal(
    state: &AppState,
    caller: Option<&User>,
    id: i32,
) -> AppResult<JournalEntry> {
    let user = require_user(caller)?;
    Ok(JournalEntry::get(
        &state.db,
        &OwnedQuery {
            id,
            owner_id: user.id,
        },
    )
    .await?)
}

pub async fn update_journal(
    state: &AppState,
    caller: Option<&User>,
    id: i32,
    mut patch: JournalPatch,
) -> AppResult<JournalEntry> {
    let user = require_user(caller)?;
    if let Some(title) = &patch.title {
        patch.title = Some(required(title, "Title")?);
    }
    if let Some(content) = &patch.content {
        patch.content = Some(content.trim().to_string());
    }
    let query = OwnedQuery {
        id,
        owner_id: user.id,
    };
    let entry = db_ops::update_journal(&state.db, &query, &patch).await?;
    tracing::info!(user_id = user.id, entry_id = id, "journal entry updated");
    refresh_journals(state, user.id).await;

    Ok(entry)
}

pub async fn delete_journal(
    state: &AppState,
    caller: Option<&User>,
    id: i32,
) -> AppResult<()> {
    let user = require_user(caller)?;
    let entry = get_journal(state, Some(user), id).await?;
    entry.delete(&state.db).await?;
    tracing::info!(user_id = user.id, entry_id = id, "journal entry deleted");
    refresh_journals(state, user.id).await;

    Ok(())
}

/// The most recent notes, as many as the dashboard previews.
pub async fn list_notes(
    state: &AppState,
    caller: Option<&User>,
) -> AppResult<Vec<Note>> {
    let user = require_user(caller)?;
    let query = NotePreviewQuery {
        owner_id: user.id,
        limit: state.config.notes_preview_limit,
    };
    Ok(db_ops::list_notes(&state.db, &query).await?)
}

/// `text` is the raw contents of the note editor.
pub async fn create_note(
    state: &AppState,
    caller: Option<&User>,
    text: &str,
) -> AppResult<Note> {
    let user = require_user(caller)?;
    let draft = NoteDraft::from_text(text);
    if draft.title.is_empty() || draft.body.is_empty() {
        return Err(AppError::validation(
            "Please enter both a title and a note.",
        ));
    }
    check_length(&draft.title, "A note's first line")?;
    let note = db_ops::insert_note(&state.db, user.id, &draft).await?;
    tracing::info!(user_id = user.id, note_id = note.id, "note created");
    refresh_notes(state, user.id).await;

    Ok(note)
}
