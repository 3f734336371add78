//! Every path the app serves. Components render `Route`s into links, and the
//! router is built from the same enum, so the two cannot drift apart. A
//! `None` id renders the axum path pattern instead of a concrete path.

use super::{controllers, models::AppState};
use axum::routing::{get, post, Router};
use std::fmt::Display;

pub enum Route {
    Root,
    Ping,
    Login,
    Register,
    Logout,
    Profile,
    Theme,
    Habits,
    HabitList,
    HabitLive,
    HabitNew,
    Habit(Option<i32>),
    HabitEdit(Option<i32>),
    HabitToggle(Option<i32>),
    Journal,
    JournalList,
    JournalLive,
    JournalNew,
    JournalEntry(Option<i32>),
    JournalEdit(Option<i32>),
    Notes,
    NoteNew,
    NoteLive,
    StatsLive,
}

fn id_or_pattern(id: &Option<i32>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => ":id".to_string(),
    }
}

impl Route {
    fn as_string(&self) -> String {
        match self {
            Self::Root => "/".into(),
            Self::Ping => "/ping".into(),
            Self::Login => "/authentication/login".into(),
            Self::Register => "/authentication/register".into(),
            Self::Logout => "/authentication/logout".into(),
            Self::Profile => "/profile".into(),
            Self::Theme => "/theme".into(),
            Self::Habits => "/habits".into(),
            Self::HabitList => "/habits/list".into(),
            Self::HabitLive => "/habits/live".into(),
            Self::HabitNew => "/habits/new".into(),
            Self::Habit(id) => format!("/habits/{}", id_or_pattern(id)),
            Self::HabitEdit(id) => {
                format!("/habits/{}/edit", id_or_pattern(id))
            }
            Self::HabitToggle(id) => {
                format!("/habits/{}/toggle", id_or_pattern(id))
            }
            Self::Journal => "/journal".into(),
            Self::JournalList => "/journal/list".into(),
            Self::JournalLive => "/journal/live".into(),
            Self::JournalNew => "/journal/new".into(),
            Self::JournalEntry(id) => {
                format!("/journal/{}", id_or_pattern(id))
            }
            Self::JournalEdit(id) => {
                format!("/journal/{}/edit", id_or_pattern(id))
            }
            Self::Notes => "/notes".into(),
            Self::NoteNew => "/notes/new".into(),
            Self::NoteLive => "/notes/live".into(),
            Self::StatsLive => "/stats/live".into(),
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

#[rustfmt::skip]
pub fn get_routes() -> Router<AppState> {
    Router::new()
        .route(&Route::Root.as_string(), get(controllers::root))
        .route(&Route::Ping.as_string(), get(controllers::pong))
        .route(&Route::Login.as_string(), get(controllers::login_form).post(controllers::handle_login))
        .route(&Route::Register.as_string(), get(controllers::register_form).post(controllers::handle_registration))
        .route(&Route::Logout.as_string(), post(controllers::logout))
        .route(&Route::Profile.as_string(), get(controllers::profile).post(controllers::save_profile))
        .route(&Route::Theme.as_string(), post(controllers::set_theme))
        .route(&Route::Habits.as_string(), get(controllers::habits).post(controllers::create_habit))
        .route(&Route::HabitList.as_string(), get(controllers::habit_list))
        .route(&Route::HabitLive.as_string(), get(controllers::habit_live))
        .route(&Route::HabitNew.as_string(), get(controllers::new_habit_form))
        .route(&Route::Habit(None).as_string(), post(controllers::update_habit).delete(controllers::delete_habit))
        .route(&Route::HabitEdit(None).as_string(), get(controllers::edit_habit_form))
        .route(&Route::HabitToggle(None).as_string(), post(controllers::toggle_habit))
        .route(&Route::Journal.as_string(), get(controllers::journal).post(controllers::create_journal))
        .route(&Route::JournalList.as_string(), get(controllers::journal_list))
        .route(&Route::JournalLive.as_string(), get(controllers::journal_live))
        .route(&Route::JournalNew.as_string(), get(controllers::new_journal_form))
        .route(&Route::JournalEntry(None).as_string(), post(controllers::update_journal).delete(controllers::delete_journal))
        .route(&Route::JournalEdit(None).as_string(), get(controllers::edit_journal_form))
        .route(&Route::Notes.as_string(), post(controllers::create_note))
        .route(&Route::NoteNew.as_string(), get(controllers::new_note_form))
        .route(&Route::NoteLive.as_string(), get(controllers::note_live))
        .route(&Route::StatsLive.as_string(), get(controllers::stats_live))
}
