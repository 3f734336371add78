//! Everything that talks to postgres. Each record kind gets a `DbModel`
//! implementation; every query is scoped by `owner_id`, so a user can never
//! read or write a row they do not own.

use super::{
    errors::AppError,
    models::{
        Frequency, Habit, HabitDraft, HabitPatch, JournalDraft, JournalEntry,
        JournalPatch, Mood, Note, NoteDraft, User,
    },
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, query, query_as, FromRow};

/// Generic read/delete over one table. `get` returns `Err` when the row does
/// not exist (or belongs to somebody else); callers that care can downcast to
/// `sqlx::Error::RowNotFound`. Updates are free functions, because they merge
/// in SQL instead of writing back a whole record.
#[async_trait]
pub trait DbModel<GetQuery, ListQuery>: Sized + Send + Sync
where
    GetQuery: Sync,
    ListQuery: Sync,
{
    async fn get(db: &PgPool, query: &GetQuery) -> Result<Self>;
    async fn list(db: &PgPool, query: &ListQuery) -> Result<Vec<Self>>;
    async fn delete(self, db: &PgPool) -> Result<()>;
}

/// Point lookup of a record owned by `owner_id`.
pub struct OwnedQuery {
    pub id: i32,
    pub owner_id: i32,
}

pub struct OwnerQuery {
    pub owner_id: i32,
}

/// Notes are only ever read as a most-recent-first preview.
pub struct NotePreviewQuery {
    pub owner_id: i32,
    pub limit: i64,
}

fn ensure_touched(rows_affected: u64) -> Result<()> {
    if rows_affected == 0 {
        Err(AppError::NotFound.into())
    } else {
        Ok(())
    }
}

#[derive(FromRow)]
struct HabitRow {
    id: i32,
    owner_id: i32,
    title: String,
    description: Option<String>,
    frequency: Option<String>,
    completed: Option<bool>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<HabitRow> for Habit {
    fn from(row: HabitRow) -> Self {
        Habit {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            frequency: Frequency::parse_or_default(row.frequency.as_deref()),
            completed: row.completed.unwrap_or(false),
            completed_at: row.completed_at,
            created_at: row.created_at,
        }
    }
}

const HABIT_COLUMNS: &str = "id, owner_id, title, description, frequency, \
    completed, completed_at, created_at";

pub async fn insert_habit(
    db: &PgPool,
    owner_id: i32,
    draft: &HabitDraft,
) -> Result<Habit> {
    let row = query_as::<_, HabitRow>(&format!(
        "insert into habit (owner_id, title, description, frequency, completed)
        values ($1, $2, $3, $4, false)
        returning {HABIT_COLUMNS}"
    ))
    .bind(owner_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.frequency.as_str())
    .fetch_one(db)
    .await?;

    Ok(row.into())
}

#[async_trait]
impl DbModel<OwnedQuery, OwnerQuery> for Habit {
    async fn get(db: &PgPool, query: &OwnedQuery) -> Result<Self> {
        let row = query_as::<_, HabitRow>(&format!(
            "select {HABIT_COLUMNS} from habit
            where id = $1 and owner_id = $2"
        ))
        .bind(query.id)
        .bind(query.owner_id)
        .fetch_one(db)
        .await?;

        Ok(row.into())
    }
    async fn list(db: &PgPool, query: &OwnerQuery) -> Result<Vec<Self>> {
        let rows = query_as::<_, HabitRow>(&format!(
            "select {HABIT_COLUMNS} from habit
            where owner_id = $1
            order by created_at desc, id desc"
        ))
        .bind(query.owner_id)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(Habit::from).collect())
    }
    async fn delete(self, db: &PgPool) -> Result<()> {
        let res = query("delete from habit where id = $1 and owner_id = $2")
            .bind(self.id)
            .bind(self.owner_id)
            .execute(db)
            .await?;

        ensure_touched(res.rows_affected())
    }
}

/// Merge `patch` into the row in one statement, so concurrent writes to
/// different fields do not undo each other.
pub async fn update_habit(
    db: &PgPool,
    query: &OwnedQuery,
    patch: &HabitPatch,
    now: DateTime<Utc>,
) -> Result<Habit> {
    let row = query_as::<_, HabitRow>(&format!(
        "update habit
        set
            title = coalesce($3, title),
            description = coalesce($4, description),
            frequency = coalesce($5, frequency),
            completed = coalesce($6, completed),
            completed_at = case
                when $6 is null then completed_at
                when $6 then coalesce(completed_at, $7)
                else null
            end
        where id = $1 and owner_id = $2
        returning {HABIT_COLUMNS}"
    ))
    .bind(query.id)
    .bind(query.owner_id)
    .bind(patch.title.as_deref())
    .bind(patch.description.as_deref())
    .bind(patch.frequency.map(|f| f.as_str()))
    .bind(patch.completed)
    .bind(now)
    .fetch_one(db)
    .await?;

    Ok(row.into())
}

/// Flip `completed` against whatever is in the row right now. Postgres
/// serializes the row lock, so two toggles always cancel out.
pub async fn toggle_habit(
    db: &PgPool,
    query: &OwnedQuery,
    now: DateTime<Utc>,
) -> Result<Habit> {
    let row = query_as::<_, HabitRow>(&format!(
        "update habit
        set
            completed = not coalesce(completed, false),
            completed_at = case
                when coalesce(completed, false) then null
                else $3
            end
        where id = $1 and owner_id = $2
        returning {HABIT_COLUMNS}"
    ))
    .bind(query.id)
    .bind(query.owner_id)
    .bind(now)
    .fetch_one(db)
    .await?;

    Ok(row.into())
}

#[derive(FromRow)]
struct JournalRow {
    id: i32,
    owner_id: i32,
    title: String,
    content: Option<String>,
    mood: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<JournalRow> for JournalEntry {
    fn from(row: JournalRow) -> Self {
        JournalEntry {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            content: row.content.unwrap_or_default(),
            mood: Mood::parse_or_default(row.mood.as_deref()),
            created_at: row.created_at,
        }
    }
}

const JOURNAL_COLUMNS: &str = "id, owner_id, title, content, mood, created_at";

pub async fn insert_journal(
    db: &PgPool,
    owner_id: i32,
    draft: &JournalDraft,
) -> Result<JournalEntry> {
    let row = query_as::<_, JournalRow>(&format!(
        "insert into journal (owner_id, title, content, mood)
        values ($1, $2, $3, $4)
        returning {JOURNAL_COLUMNS}"
    ))
    .bind(owner_id)
    .bind(&draft.title)
    .bind(&draft.content)
    .bind(draft.mood.as_str())
    .fetch_one(db)
    .await?;

    Ok(row.into())
}

#[async_trait]
impl DbModel<OwnedQuery, OwnerQuery> for JournalEntry {
    async fn get(db: &PgPool, query: &OwnedQuery) -> Result<Self> {
        let row = query_as::<_, JournalRow>(&format!(
            "select {JOURNAL_COLUMNS} from journal
            where id = $1 and owner_id = $2"
        ))
        .bind(query.id)
        .bind(query.owner_id)
        .fetch_one(db)
        .await?;

        Ok(row.into())
    }
    async fn list(db: &PgPool, query: &OwnerQuery) -> Result<Vec<Self>> {
        let rows = query_as::<_, JournalRow>(&format!(
            "select {JOURNAL_COLUMNS} from journal
            where owner_id = $1
            order by created_at desc, id desc"
        ))
        .bind(query.owner_id)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(JournalEntry::from).collect())
    }
    async fn delete(self, db: &PgPool) -> Result<()> {
        let res =
            query("delete from journal where id = $1 and owner_id = $2")
                .bind(self.id)
                .bind(self.owner_id)
                .execute(db)
                .await?;

        ensure_touched(res.rows_affected())
    }
}

pub async fn update_journal(
    db: &PgPool,
    query: &OwnedQuery,
    patch: &JournalPatch,
) -> Result<JournalEntry> {
    let row = query_as::<_, JournalRow>(&format!(
        "update journal
        set
            title = coalesce($3, title),
            content = coalesce($4, content),
            mood = coalesce($5, mood)
        where id = $1 and owner_id = $2
        returning {JOURNAL_COLUMNS}"
    ))
    .bind(query.id)
    .bind(query.owner_id)
    .bind(patch.title.as_deref())
    .bind(patch.content.as_deref())
    .bind(patch.mood.map(|m| m.as_str()))
    .fetch_one(db)
    .await?;

    Ok(row.into())
}

#[derive(FromRow)]
struct NoteRow {
    id: i32,
    owner_id: i32,
    title: String,
    body: String,
    created_at: DateTime<Utc>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Note {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            body: row.body,
            created_at: row.created_at,
        }
    }
}

pub async fn insert_note(
    db: &PgPool,
    owner_id: i32,
    draft: &NoteDraft,
) -> Result<Note> {
    let row = query_as::<_, NoteRow>(
        "insert into note (owner_id, title, body)
        values ($1, $2, $3)
        returning id, owner_id, title, body, created_at",
    )
    .bind(owner_id)
    .bind(&draft.title)
    .bind(&draft.body)
    .fetch_one(db)
    .await?;

    Ok(row.into())
}

pub async fn list_notes(
    db: &PgPool,
    query: &NotePreviewQuery,
) -> Result<Vec<Note>> {
    let rows = query_as::<_, NoteRow>(
        "select id, owner_id, title, body, created_at from note
        where owner_id = $1
        order by created_at desc, id desc
        limit $2",
    )
    .bind(query.owner_id)
    .bind(query.limit)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Note::from).collect())
}

/// Look a user up by username or email.
pub struct GetUserQuery<'a> {
    pub identifier: &'a str,
}

#[derive(FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    display_name: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            display_name: row.display_name.unwrap_or_default(),
        }
    }
}

pub async fn get_user(db: &PgPool, query: &GetUserQuery<'_>) -> Result<User> {
    let row = query_as::<_, UserRow>(
        "select id, username, email, display_name from users
        where username = $1 or email = $1",
    )
    .bind(query.identifier)
    .fetch_one(db)
    .await?;

    Ok(row.into())
}

/// The user's argon2 PHC string; never leaves the `auth` module.
#[derive(FromRow)]
pub struct StoredCredentials {
    pub password_hash: String,
}

pub async fn get_credentials(
    db: &PgPool,
    user_id: i32,
) -> Result<StoredCredentials> {
    Ok(query_as::<_, StoredCredentials>(
        "select password_hash from users where id = $1",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?)
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub display_name: &'a str,
    pub password_hash: &'a str,
}

pub async fn create_user(db: &PgPool, user: &NewUser<'_>) -> Result<User> {
    let row = query_as::<_, UserRow>(
        "insert into users (username, email, display_name, password_hash)
        values ($1, $2, $3, $4)
        returning id, username, email, display_name",
    )
    .bind(user.username)
    .bind(user.email)
    .bind(user.display_name)
    .bind(user.password_hash)
    .fetch_one(db)
    .await?;

    Ok(row.into())
}

pub async fn user_exists(
    db: &PgPool,
    username: &str,
    email: &str,
) -> Result<bool> {
    let (exists,): (bool,) = query_as(
        "select exists(select 1 from users where username = $1 or email = $2)",
    )
    .bind(username)
    .bind(email)
    .fetch_one(db)
    .await?;

    Ok(exists)
}

pub async fn update_display_name(
    db: &PgPool,
    user_id: i32,
    display_name: &str,
) -> Result<User> {
    let row = query_as::<_, UserRow>(
        "update users set display_name = $1 where id = $2
        returning id, username, email, display_name",
    )
    .bind(display_name)
    .bind(user_id)
    .fetch_one(db)
    .await?;

    Ok(row.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::postgres::PgPoolOptions;

    #[test]
    fn test_habit_row_defaults_missing_fields() {
        let created_at = Utc.with_ymd_and_hms(2023, 11, 1, 8, 0, 0).unwrap();
        let habit = Habit::from(HabitRow {
            id: 4,
            owner_id: 2,
            title: "Stretch".into(),
            description: None,
            frequency: None,
            completed: None,
            completed_at: None,
            created_at,
        });
        assert_eq!(habit.description, "");
        assert_eq!(habit.frequency, Frequency::Daily);
        assert!(!habit.completed);
        assert_eq!(habit.created_at, created_at);
    }

    #[test]
    fn test_journal_row_defaults_missing_fields() {
        let entry = JournalEntry::from(JournalRow {
            id: 1,
            owner_id: 2,
            title: "Monday".into(),
            content: None,
            mood: None,
            created_at: Utc::now(),
        });
        assert_eq!(entry.content, "");
        assert_eq!(entry.mood, Mood::Neutral);
    }

    #[test]
    fn test_ensure_touched() {
        assert!(ensure_touched(1).is_ok());
        let err = ensure_touched(0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::NotFound)
        ));
    }

    /// Needs a scratch database: `DATABASE_URL=postgres://... cargo test -- --ignored`
    async fn scratch_db() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let db = PgPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .expect("connect");
        sqlx::migrate!().run(&db).await.expect("migrate");
        db
    }

    /// A fresh user, so tests can share a database.
    async fn scratch_user(db: &PgPool) -> User {
        let tag = uuid::Uuid::new_v4().simple().to_string();
        create_user(
            db,
            &NewUser {
                username: &tag,
                email: &format!("{tag}@example.com"),
                display_name: "",
                password_hash: "unused",
            },
        )
        .await
        .expect("user")
    }

    fn owned(id: i32, user: &User) -> OwnedQuery {
        OwnedQuery {
            id,
            owner_id: user.id,
        }
    }

    #[tokio::test]
    #[ignore = "requires postgres at DATABASE_URL"]
    async fn test_habit_round_trip() {
        let db = scratch_db().await;
        let user = scratch_user(&db).await;

        let draft = HabitDraft {
            title: "Read".into(),
            description: "20 pages".into(),
            frequency: Frequency::Weekly,
        };
        let created = insert_habit(&db, user.id, &draft).await.expect("insert");
        let listed = Habit::list(&db, &OwnerQuery { owner_id: user.id })
            .await
            .expect("list");

        assert_eq!(listed.len(), 1);
        let habit = &listed[0];
        assert_eq!(habit.id, created.id);
        assert_eq!(habit.title, "Read");
        assert_eq!(habit.description, "20 pages");
        assert_eq!(habit.frequency, Frequency::Weekly);
        assert!(!habit.completed);

        let stranger = OwnedQuery {
            id: created.id,
            owner_id: user.id + 1_000_000,
        };
        assert!(Habit::get(&db, &stranger).await.is_err());
        let err = toggle_habit(&db, &stranger, Utc::now()).await.unwrap_err();
        assert!(matches!(AppError::from(err), AppError::NotFound));
    }

    #[tokio::test]
    #[ignore = "requires postgres at DATABASE_URL"]
    async fn test_partial_update_merges_in_place() {
        let db = scratch_db().await;
        let user = scratch_user(&db).await;
        let draft = HabitDraft {
            title: "Run".into(),
            description: "5k".into(),
            frequency: Frequency::Daily,
        };
        let habit = insert_habit(&db, user.id, &draft).await.expect("insert");
        let now = Utc::now();

        let toggled = toggle_habit(&db, &owned(habit.id, &user), now)
            .await
            .expect("toggle");
        assert!(toggled.completed);
        assert!(toggled.completed_at.is_some());

        // An edit that does not mention `completed` must not undo the toggle.
        let patch = HabitPatch {
            title: Some("Run far".into()),
            ..Default::default()
        };
        let updated = update_habit(&db, &owned(habit.id, &user), &patch, now)
            .await
            .expect("update");
        assert_eq!(updated.title, "Run far");
        assert_eq!(updated.description, "5k");
        assert!(updated.completed);
        assert_eq!(updated.completed_at, toggled.completed_at);

        let patch = HabitPatch {
            completed: Some(false),
            ..Default::default()
        };
        let cleared = update_habit(&db, &owned(habit.id, &user), &patch, now)
            .await
            .expect("update");
        assert!(!cleared.completed);
        assert_eq!(cleared.completed_at, None);
    }

    #[tokio::test]
    #[ignore = "requires postgres at DATABASE_URL"]
    async fn test_concurrent_toggles_cancel_out() {
        let db = scratch_db().await;
        let user = scratch_user(&db).await;
        let draft = HabitDraft {
            title: "Stretch".into(),
            ..Default::default()
        };
        for _ in 0..30 {
            let habit = insert_habit(&db, user.id, &draft).await.expect("insert");
            let query = owned(habit.id, &user);
            let (a, b) = tokio::join!(
                toggle_habit(&db, &query, Utc::now()),
                toggle_habit(&db, &query, Utc::now()),
            );
            a.expect("first toggle");
            b.expect("second toggle");
        }

        let habits = Habit::list(&db, &OwnerQuery { owner_id: user.id })
            .await
            .expect("list");
        assert_eq!(habits.len(), 30);
        assert!(habits.iter().all(|h| !h.completed && h.completed_at.is_none()));
    }

    #[tokio::test]
    #[ignore = "requires postgres at DATABASE_URL"]
    async fn test_journal_update_and_delete_round_trip() {
        let db = scratch_db().await;
        let user = scratch_user(&db).await;
        let draft = JournalDraft {
            title: "Tuesday".into(),
            content: "Went to the beach".into(),
            mood: Mood::Happy,
        };
        let entry = insert_journal(&db, user.id, &draft).await.expect("insert");

        let patch = JournalPatch {
            mood: Some(Mood::Excited),
            ..Default::default()
        };
        let updated = update_journal(&db, &owned(entry.id, &user), &patch)
            .await
            .expect("update");
        assert_eq!(updated.title, "Tuesday");
        assert_eq!(updated.content, "Went to the beach");
        assert_eq!(updated.mood, Mood::Excited);

        let fetched = JournalEntry::get(&db, &owned(entry.id, &user))
            .await
            .expect("get");
        assert_eq!(fetched, updated);

        fetched.delete(&db).await.expect("delete");
        let err = JournalEntry::get(&db, &owned(entry.id, &user))
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::NotFound));
        let err = update_journal(&db, &owned(entry.id, &user), &patch)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::NotFound));
    }

    #[tokio::test]
    #[ignore = "requires postgres at DATABASE_URL"]
    async fn test_notes_preview_is_newest_first_and_limited() {
        let db = scratch_db().await;
        let user = scratch_user(&db).await;
        let mut ids = Vec::new();
        for n in 0..4 {
            let draft = NoteDraft {
                title: format!("note {n}"),
                body: "body".into(),
            };
            ids.push(insert_note(&db, user.id, &draft).await.expect("insert").id);
        }

        let notes = list_notes(
            &db,
            &NotePreviewQuery {
                owner_id: user.id,
                limit: 3,
            },
        )
        .await
        .expect("list");
        let listed: Vec<i32> = notes.iter().map(|n| n.id).collect();
        assert_eq!(listed, vec![ids[3], ids[2], ids[1]]);
    }

    #[tokio::test]
    #[ignore = "requires postgres at DATABASE_URL"]
    async fn test_longest_allowed_title_is_stored() {
        let db = scratch_db().await;
        let user = scratch_user(&db).await;
        let title = "é".repeat(crate::config::MAX_TITLE_CHARS);
        let draft = NoteDraft {
            title: title.clone(),
            body: "body".into(),
        };
        let note = insert_note(&db, user.id, &draft).await.expect("insert");
        assert_eq!(note.title, title);
    }
}
