use super::{
    analytics::Summary,
    auth, components,
    components::Component,
    config::NEW_HABIT_NUDGE_SECS,
    errors::{AppError, AppResult},
    extractors::{AuthenticatedUser, CurrentTheme, MaybeUser},
    htmx,
    list_view::{ListFilter, ListView, Listable},
    live::Snapshot,
    models::{
        AppState, Frequency, Habit, HabitDraft, HabitPatch, JournalDraft,
        JournalEntry, JournalPatch, Mood, User,
    },
    notify::Reminder,
    records,
    routes::Route,
    session,
    theme::Theme,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Redirect, Response,
    },
    Form,
};
use chrono::Local;
use futures::{stream, Stream, StreamExt};
use serde::Deserialize;
use std::{convert::Infallible, time::Duration};
use tokio::sync::watch;

fn page<'a>(
    title: &'a str,
    theme: Theme,
    user: Option<&'a User>,
    children: impl Component + 'a,
) -> String {
    components::Page {
        title,
        palette: theme.palette(),
        user,
        children: Box::new(children),
    }
    .render()
}

fn set_cookie(headers: &mut HeaderMap, cookie: &str) -> AppResult<()> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|err| AppError::Remote(err.into()))?;
    headers.append("Set-Cookie", value);
    Ok(())
}

/// Headers that sign `session` in and send the browser to `to`.
fn start_session(
    state: &AppState,
    session: &session::Session,
    to: &str,
) -> AppResult<HeaderMap> {
    let mut headers = htmx::redirect(to);
    set_cookie(
        &mut headers,
        &session::session_cookie(&state.config.session_secret, session),
    )?;
    Ok(headers)
}

/// The first render of a list screen, from the snapshot the hub handed out.
fn first_view<T: Listable>(
    snapshot: &Snapshot<T>,
    filter: ListFilter,
) -> ListView<T> {
    let mut view = ListView::filtered(filter);
    view.apply(snapshot);
    view
}

/// `render(view)` every time the owner's records change. Ends when the
/// feed goes away.
fn snapshot_renders<T, F>(
    rx: watch::Receiver<Snapshot<T>>,
    filter: ListFilter,
    render: F,
) -> impl Stream<Item = String>
where
    T: Listable + Send + Sync + 'static,
    F: Fn(&ListView<T>) -> String + Send + 'static,
{
    let view = ListView::filtered(filter);
    stream::unfold(
        (rx, view, render),
        |(mut rx, mut view, render)| async move {
            loop {
                let changed = {
                    let snapshot = rx.borrow_and_update();
                    view.apply(&snapshot)
                };
                if changed {
                    let html = render(&view);
                    return Some((html, (rx, view, render)));
                }
                if rx.changed().await.is_err() {
                    return None;
                }
            }
        },
    )
}

/// Dashboard numbers, once both feeds hold something. Either feed failing
/// fails the lot.
fn summarize(
    habits: &Snapshot<Habit>,
    entries: &Snapshot<JournalEntry>,
) -> Option<Result<Summary, String>> {
    match (habits, entries) {
        (Snapshot::Failed { message, .. }, _)
        | (_, Snapshot::Failed { message, .. }) => Some(Err(message.clone())),
        (
            Snapshot::Records { records: habits, .. },
            Snapshot::Records {
                records: entries, ..
            },
        ) => Some(Ok(Summary::compute(habits, entries, &Local::now()))),
        _ => None,
    }
}

/// `render(stats)` every time either the habits or the journal change.
fn stats_renders<F>(
    habits: watch::Receiver<Snapshot<Habit>>,
    entries: watch::Receiver<Snapshot<JournalEntry>>,
    render: F,
) -> impl Stream<Item = String>
where
    F: Fn(&Result<Summary, String>) -> String + Send + 'static,
{
    stream::unfold(
        (habits, entries, (0, 0), render),
        |(mut habits, mut entries, mut seen, render)| async move {
            loop {
                let (versions, stats) = {
                    let h = habits.borrow_and_update();
                    let e = entries.borrow_and_update();
                    ((h.version(), e.version()), summarize(&h, &e))
                };
                if let Some(stats) = stats.filter(|_| versions != seen) {
                    seen = versions;
                    let html = render(&stats);
                    return Some((html, (habits, entries, seen, render)));
                }
                tokio::select! {
                    changed = habits.changed() => {
                        if changed.is_err() {
                            return None;
                        }
                    }
                    changed = entries.changed() => {
                        if changed.is_err() {
                            return None;
                        }
                    }
                }
            }
        },
    )
}

/// Each render goes out as a server-sent `snapshot` event, which the live
/// region on the page swaps in.
fn live_stream(
    renders: impl Stream<Item = String> + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = renders.map(|html| {
        // SSE data lines cannot carry carriage returns.
        Ok(Event::default()
            .event("snapshot")
            .data(html.replace('\r', "")))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
pub struct ListQuery {
    search: Option<String>,
    show_completed: Option<String>,
}
impl ListQuery {
    fn filter(self) -> ListFilter {
        ListFilter::from_form(self.search, self.show_completed)
    }
}

pub async fn root(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    CurrentTheme(theme): CurrentTheme,
) -> AppResult<Response> {
    let Some(user) = user else {
        return Ok(Redirect::to(&Route::Login.to_string()).into_response());
    };
    let (habits, entries, notes) = futures::try_join!(
        records::habit_snapshot(&state, Some(&user)),
        records::journal_snapshot(&state, Some(&user)),
        records::note_snapshot(&state, Some(&user)),
    )?;
    let stats = summarize(&habits, &entries);
    let notes = first_view(&notes, ListFilter::default());

    Ok(page(
        "Home",
        theme,
        Some(&user),
        components::Dashboard {
            user: &user,
            stats: stats.as_ref(),
            notes: &notes,
            palette: theme.palette(),
        },
    )
    .into_response())
}

/// Stats move with both feeds, so this subscribes to both.
pub async fn stats_live(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentTheme(theme): CurrentTheme,
) -> AppResult<impl IntoResponse> {
    let habits = state.live.habits.subscribe(user.id);
    let entries = state.live.journals.subscribe(user.id);
    // A write since the page rendered may have dropped the cached snapshots.
    futures::try_join!(
        records::habit_snapshot(&state, Some(&user)),
        records::journal_snapshot(&state, Some(&user)),
    )?;
    let palette = theme.palette();
    Ok(live_stream(stats_renders(habits, entries, move |stats| {
        components::StatsCards {
            stats: Some(stats),
            palette,
        }
        .render()
    })))
}

pub async fn pong() -> impl IntoResponse {
    "pong"
}

pub async fn login_form(
    MaybeUser(user): MaybeUser,
    CurrentTheme(theme): CurrentTheme,
) -> Response {
    if user.is_some() {
        return Redirect::to(&Route::Root.to_string()).into_response();
    }
    page(
        "Log in",
        theme,
        None,
        components::LoginForm {
            palette: theme.palette(),
        },
    )
    .into_response()
}

#[derive(Deserialize)]
pub struct LoginForm {
    identifier: String,
    password: String,
}
pub async fn handle_login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<impl IntoResponse> {
    let session =
        auth::authenticate(&state.db, &form.identifier, &form.password)
            .await?;
    start_session(&state, &session, &Route::Root.to_string())
}

pub async fn register_form(
    MaybeUser(user): MaybeUser,
    CurrentTheme(theme): CurrentTheme,
) -> Response {
    if user.is_some() {
        return Redirect::to(&Route::Root.to_string()).into_response();
    }
    page(
        "Register",
        theme,
        None,
        components::RegisterForm {
            palette: theme.palette(),
        },
    )
    .into_response()
}

#[derive(Deserialize)]
pub struct RegisterForm {
    username: String,
    email: String,
    #[serde(default)]
    display_name: String,
    password: String,
}
pub async fn handle_registration(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<impl IntoResponse> {
    let session = auth::register(
        &state.db,
        &auth::Registration {
            username: &form.username,
            email: &form.email,
            display_name: &form.display_name,
            password: &form.password,
        },
    )
    .await?;
    start_session(&state, &session, &Route::Root.to_string())
}

pub async fn logout() -> AppResult<impl IntoResponse> {
    let mut headers = htmx::redirect(&Route::Login.to_string());
    set_cookie(&mut headers, &session::clear_cookie())?;
    Ok(headers)
}

pub async fn profile(
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentTheme(theme): CurrentTheme,
) -> impl IntoResponse {
    page(
        "Profile",
        theme,
        Some(&user),
        components::ProfilePage {
            user: &user,
            theme,
            palette: theme.palette(),
        },
    )
}

#[derive(Deserialize)]
pub struct ProfileForm {
    display_name: String,
}
pub async fn save_profile(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<ProfileForm>,
) -> AppResult<impl IntoResponse> {
    let session =
        auth::update_profile(&state.db, user.as_ref(), &form.display_name)
            .await?;
    let mut headers = HeaderMap::new();
    set_cookie(
        &mut headers,
        &session::session_cookie(&state.config.session_secret, &session),
    )?;

    Ok((
        headers,
        components::Flash {
            message: "Profile updated",
        }
        .render(),
    ))
}

#[derive(Deserialize)]
pub struct ThemeForm {
    theme: String,
}
pub async fn set_theme(
    Form(ThemeForm { theme }): Form<ThemeForm>,
) -> AppResult<impl IntoResponse> {
    let theme = Theme::parse(&theme)
        .ok_or_else(|| AppError::validation(format!("Unknown theme {theme}")))?;
    let mut headers = htmx::refresh();
    set_cookie(&mut headers, &theme.cookie())?;
    Ok(headers)
}

pub async fn habits(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentTheme(theme): CurrentTheme,
) -> AppResult<impl IntoResponse> {
    state
        .notifier
        .schedule(Reminder::habit_check(user.id, state.config.reminder_hour));
    let snapshot = records::habit_snapshot(&state, Some(&user)).await?;
    let view = first_view(&snapshot, ListFilter::default());

    Ok(page(
        "My Habits",
        theme,
        Some(&user),
        components::HabitScreen {
            view: &view,
            palette: theme.palette(),
        },
    ))
}

/// The filter form lands here; it gets back a fresh live region bound to
/// the new filter. The records come from the open snapshot, so typing in
/// the search box does not hit the database.
pub async fn habit_list(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentTheme(theme): CurrentTheme,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> AppResult<String> {
    let snapshot = records::habit_snapshot(&state, Some(&user)).await?;
    let view = first_view(&snapshot, query.filter());
    let palette = theme.palette();
    Ok(if htmx::is_htmx(&headers) {
        components::HabitRegion {
            view: &view,
            palette,
        }
        .render()
    } else {
        page(
            "My Habits",
            theme,
            Some(&user),
            components::HabitScreen {
                view: &view,
                palette,
            },
        )
    })
}

pub async fn habit_live(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentTheme(theme): CurrentTheme,
    Query(query): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let rx = state.live.habits.subscribe(user.id);
    // A write since the page rendered may have dropped the cached snapshot.
    records::habit_snapshot(&state, Some(&user)).await?;
    let palette = theme.palette();
    Ok(live_stream(snapshot_renders(
        rx,
        query.filter(),
        move |view| components::HabitList { view, palette }.render(),
    )))
}

pub async fn new_habit_form(
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentTheme(theme): CurrentTheme,
) -> impl IntoResponse {
    page(
        "Add Habit",
        theme,
        Some(&user),
        components::HabitForm {
            habit: None,
            palette: theme.palette(),
        },
    )
}

#[derive(Deserialize)]
pub struct HabitForm {
    title: String,
    #[serde(default)]
    description: String,
    frequency: Option<String>,
}
pub async fn create_habit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<HabitForm>,
) -> AppResult<impl IntoResponse> {
    let habit = records::create_habit(
        &state,
        user.as_ref(),
        HabitDraft {
            title: form.title,
            description: form.description,
            frequency: Frequency::parse_or_default(form.frequency.as_deref()),
        },
    )
    .await?;
    state.notifier.schedule(Reminder::new_habit_nudge(
        habit.owner_id,
        Duration::from_secs(NEW_HABIT_NUDGE_SECS),
    ));

    Ok(htmx::redirect(&Route::Habits.to_string()))
}

pub async fn edit_habit_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentTheme(theme): CurrentTheme,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let habit = records::get_habit(&state, Some(&user), id).await?;
    Ok(page(
        "Edit Habit",
        theme,
        Some(&user),
        components::HabitForm {
            habit: Some(&habit),
            palette: theme.palette(),
        },
    ))
}

pub async fn update_habit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i32>,
    Form(form): Form<HabitForm>,
) -> AppResult<impl IntoResponse> {
    records::update_habit(
        &state,
        user.as_ref(),
        id,
        HabitPatch {
            title: Some(form.title),
            description: Some(form.description),
            frequency: Some(Frequency::parse_or_default(
                form.frequency.as_deref(),
            )),
            ..Default::default()
        },
    )
    .await?;

    Ok(htmx::redirect(&Route::Habits.to_string()))
}

/// The list re-renders from the live feed, so there is nothing to send back.
pub async fn toggle_habit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    records::toggle_habit(&state, user.as_ref(), id).await?;
    Ok("")
}

pub async fn delete_habit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    records::delete_habit(&state, user.as_ref(), id).await?;
    Ok((
        htmx::retarget_alert(),
        components::Flash {
            message: "Habit deleted",
        }
        .render(),
    ))
}

pub async fn journal(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentTheme(theme): CurrentTheme,
) -> AppResult<impl IntoResponse> {
    state
        .notifier
        .schedule(Reminder::journal_prompt(user.id, state.config.reminder_hour));
    let snapshot = records::journal_snapshot(&state, Some(&user)).await?;
    let view = first_view(&snapshot, ListFilter::default());

    Ok(page(
        "My Journal",
        theme,
        Some(&user),
        components::JournalScreen {
            view: &view,
            palette: theme.palette(),
        },
    ))
}

pub async fn journal_list(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentTheme(theme): CurrentTheme,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> AppResult<String> {
    let snapshot = records::journal_snapshot(&state, Some(&user)).await?;
    let view = first_view(&snapshot, query.filter());
    let palette = theme.palette();
    Ok(if htmx::is_htmx(&headers) {
        components::JournalRegion {
            view: &view,
            palette,
        }
        .render()
    } else {
        page(
            "My Journal",
            theme,
            Some(&user),
            components::JournalScreen {
                view: &view,
                palette,
            },
        )
    })
}

pub async fn journal_live(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentTheme(theme): CurrentTheme,
    Query(query): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let rx = state.live.journals.subscribe(user.id);
    records::journal_snapshot(&state, Some(&user)).await?;
    let palette = theme.palette();
    Ok(live_stream(snapshot_renders(
        rx,
        query.filter(),
        move |view| components::JournalList { view, palette }.render(),
    )))
}

pub async fn new_journal_form(
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentTheme(theme): CurrentTheme,
) -> impl IntoResponse {
    page(
        "New Entry",
        theme,
        Some(&user),
        components::JournalForm {
            entry: None,
            palette: theme.palette(),
        },
    )
}

#[derive(Deserialize)]
pub struct JournalForm {
    title: String,
    #[serde(default)]
    content: String,
    mood: Option<String>,
}
pub async fn create_journal(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<JournalForm>,
) -> AppResult<impl IntoResponse> {
    records::create_journal(
        &state,
        user.as_ref(),
        JournalDraft {
            title: form.title,
            content: form.content,
            mood: Mood::parse_or_default(form.mood.as_deref()),
        },
    )
    .await?;

    Ok(htmx::redirect(&Route::Journal.to_string()))
}

pub async fn edit_journal_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentTheme(theme): CurrentTheme,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let entry = records::get_journal(&state, Some(&user), id).await?;
    Ok(page(
        "Edit Entry",
        theme,
        Some(&user),
        components::JournalForm {
            entry: Some(&entry),
            palette: theme.palette(),
        },
    ))
}

pub async fn update_journal(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i32>,
    Form(form): Form<JournalForm>,
) -> AppResult<impl IntoResponse> {
    records::update_journal(
        &state,
        user.as_ref(),
        id,
        JournalPatch {
            title: Some(form.title),
            content: Some(form.content),
            mood: Some(Mood::parse_or_default(form.mood.as_deref())),
        },
    )
    .await?;

    Ok(htmx::redirect(&Route::Journal.to_string()))
}

pub async fn delete_journal(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    records::delete_journal(&state, user.as_ref(), id).await?;
    Ok((
        htmx::retarget_alert(),
        components::Flash {
            message: "Journal entry deleted",
        }
        .render(),
    ))
}

pub async fn new_note_form(
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentTheme(theme): CurrentTheme,
) -> impl IntoResponse {
    page(
        "Add Note",
        theme,
        Some(&user),
        components::NoteForm {
            palette: theme.palette(),
        },
    )
}

#[derive(Deserialize)]
pub struct NoteForm {
    #[serde(default)]
    text: String,
}
pub async fn create_note(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(NoteForm { text }): Form<NoteForm>,
) -> AppResult<impl IntoResponse> {
    records::create_note(&state, user.as_ref(), &text).await?;
    Ok(htmx::redirect(&Route::Root.to_string()))
}

pub async fn note_live(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let rx = state.live.notes.subscribe(user.id);
    records::note_snapshot(&state, Some(&user)).await?;
    Ok(live_stream(snapshot_renders(
        rx,
        ListFilter::default(),
        |view| components::NotesPreview { view }.render(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::Habit, records::tests::offline_state};
    use axum::http::StatusCode;
    use chrono::Utc;

    fn user() -> User {
        User {
            id: 7,
            username: "jack".into(),
            email: "jack@jack.com".into(),
            display_name: "Jack".into(),
        }
    }

    fn habit(id: i32) -> Habit {
        Habit {
            id,
            owner_id: 7,
            title: format!("habit {id}"),
            description: String::new(),
            frequency: Frequency::Daily,
            completed: false,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_signed_out_writes_are_rejected() {
        let state = offline_state();
        let res = toggle_habit(State(state.clone()), MaybeUser(None), Path(1))
            .await
            .into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = create_note(
            State(state),
            MaybeUser(None),
            Form(NoteForm {
                text: "title\nbody".into(),
            }),
        )
        .await
        .into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_incomplete_note_is_a_validation_error() {
        let res = create_note(
            State(offline_state()),
            MaybeUser(Some(user())),
            Form(NoteForm {
                text: "just a title".into(),
            }),
        )
        .await
        .into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(res.headers().get("Hx-Retarget").unwrap(), "#alerts");
    }

    #[tokio::test]
    async fn test_unknown_theme_is_rejected() {
        let res = set_theme(Form(ThemeForm {
            theme: "neon".into(),
        }))
        .await
        .into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = set_theme(Form(ThemeForm {
            theme: "dark".into(),
        }))
        .await
        .into_response();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res
            .headers()
            .get("Set-Cookie")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("theme=dark;"));
    }

    #[tokio::test]
    async fn test_logout_clears_the_session() {
        let res = logout().await.into_response();
        assert_eq!(
            res.headers().get("Hx-Redirect").unwrap(),
            "/authentication/login"
        );
        assert!(res
            .headers()
            .get("Set-Cookie")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("session=;"));
    }

    #[tokio::test]
    async fn test_live_renders_follow_the_feed() {
        let state = offline_state();
        let feed = &state.live.habits;
        let renders = snapshot_renders(
            feed.subscribe(7),
            ListFilter::default(),
            |view: &ListView<Habit>| {
                view.visible()
                    .iter()
                    .map(|h| h.id.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            },
        );
        let mut renders = Box::pin(renders);

        let v = feed.next_version();
        assert!(feed.publish(7, v, Ok(vec![habit(1)])));
        assert_eq!(renders.next().await.as_deref(), Some("1"));

        let stale = feed.next_version();
        let v = feed.next_version();
        feed.publish(7, v, Ok(vec![habit(2), habit(1)]));
        assert!(!feed.publish(7, stale, Ok(vec![])));
        assert_eq!(renders.next().await.as_deref(), Some("2,1"));
    }

    fn ready<T>(version: u64, records: Vec<T>) -> Snapshot<T> {
        Snapshot::Records {
            version,
            records: std::sync::Arc::new(records),
        }
    }

    fn htmx_request() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Hx-Request", HeaderValue::from_static("true"));
        headers
    }

    fn search(text: &str) -> Query<ListQuery> {
        Query(ListQuery {
            search: Some(text.into()),
            show_completed: Some("on".into()),
        })
    }

    #[test]
    fn test_first_view_applies_snapshot_and_filter() {
        let mut first = habit(3);
        first.title = "Run".into();
        let view = first_view(
            &ready(4, vec![first, habit(5)]),
            ListFilter {
                search: "run".into(),
                show_completed: true,
            },
        );
        assert_eq!(view.phase(), &crate::list_view::Phase::Ready);
        assert_eq!(view.total(), 2);
        assert_eq!(view.visible().len(), 1);
        assert_eq!(view.visible()[0].id, 3);
    }

    #[tokio::test]
    async fn test_filter_change_reads_the_open_snapshot() {
        // The pool cannot connect, so any query would come back failed.
        let state = offline_state();
        let feed = &state.live.habits;
        let rx = feed.subscribe(7);
        let v = feed.next_version();
        feed.publish(7, v, Ok(vec![habit(1), habit(2)]));

        let html = habit_list(
            State(state.clone()),
            AuthenticatedUser(user()),
            CurrentTheme(Theme::default()),
            search("habit 2"),
            htmx_request(),
        )
        .await
        .unwrap();
        assert!(html.contains("habit 2"));
        assert!(!html.contains("habit 1"));

        // The region that was already open is untouched.
        assert!(matches!(
            &*rx.borrow(),
            Snapshot::Records { version, .. } if *version == v
        ));
    }

    #[tokio::test]
    async fn test_failed_load_is_not_shared() {
        let state = offline_state();
        let rx = state.live.journals.subscribe(7);

        let html = journal_list(
            State(state.clone()),
            AuthenticatedUser(user()),
            CurrentTheme(Theme::default()),
            search("beach"),
            htmx_request(),
        )
        .await
        .unwrap();
        assert!(html.contains("Failed to load journal entries"));
        assert!(rx.borrow().is_pending());
    }

    #[tokio::test]
    async fn test_stats_follow_both_feeds() {
        let state = offline_state();
        let (habits, journals) = (&state.live.habits, &state.live.journals);
        let renders = stats_renders(
            habits.subscribe(7),
            journals.subscribe(7),
            |stats| match stats {
                Ok(s) => format!("{}/{}", s.completed_habits, s.total_habits),
                Err(msg) => msg.clone(),
            },
        );
        let mut renders = Box::pin(renders);

        let v = habits.next_version();
        habits.publish(7, v, Ok(vec![habit(1)]));
        let v = journals.next_version();
        journals.publish(7, v, Ok(vec![]));
        assert_eq!(renders.next().await.as_deref(), Some("0/1"));

        let mut done = habit(1);
        done.completed = true;
        let v = habits.next_version();
        habits.publish(7, v, Ok(vec![done, habit(2)]));
        assert_eq!(renders.next().await.as_deref(), Some("1/2"));

        let v = journals.next_version();
        journals.publish(7, v, Err("Something went wrong".into()));
        assert_eq!(
            renders.next().await.as_deref(),
            Some("Something went wrong")
        );
    }

    #[test]
    fn test_stats_wait_for_both_feeds() {
        assert!(summarize(&ready(1, vec![habit(1)]), &Snapshot::Pending)
            .is_none());
        let failed = Snapshot::<JournalEntry>::Failed {
            version: 2,
            message: "nope".into(),
        };
        assert_eq!(
            summarize(&Snapshot::Pending, &failed).map(|s| s.is_err()),
            Some(true)
        );
    }
}
