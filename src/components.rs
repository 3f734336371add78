use super::{
    analytics::{Summary, WEEK},
    config::NOTE_PREVIEW_WORDS,
    list_view::{ListFilter, ListView, Phase},
    models::{Frequency, Habit, JournalEntry, Mood, Note, User},
    routes::Route,
    theme::{Palette, Theme},
};
use ammonia::{clean, clean_text};
use std::fmt::Write;

pub trait Component {
    /// Render the component to a HTML string. By convention, the
    /// implementation should sanitize all string properties at render-time
    fn render(&self) -> String;
}

/// Turn 4xx / 5xx responses into swaps too; the server retargets those into
/// `#alerts`.
const ERROR_SWAP_SCRIPT: &str = r#"<script>
    document.body.addEventListener('htmx:beforeSwap', (e) => {
        if (e.detail.xhr.status >= 400) {
            e.detail.shouldSwap = true;
            e.detail.isError = false;
        }
    });
</script>"#;

pub struct Page<'a> {
    pub title: &'a str,
    pub palette: Palette,
    pub user: Option<&'a User>,
    pub children: Box<dyn Component + 'a>,
}

impl Component for Page<'_> {
    fn render(&self) -> String {
        let Palette {
            background,
            text_primary,
            ..
        } = self.palette;
        let nav = match self.user {
            Some(user) => Nav {
                user,
                palette: self.palette,
            }
            .render(),
            None => String::new(),
        };
        format!(
            r#"
            <html>
                <head>
                    <meta name="viewport" content="width=device-width, initial-scale=1.0"></meta>
                    <title>{title}</title>
                    <script src="https://cdn.tailwindcss.com"></script>
                    <script src="https://unpkg.com/htmx.org@1.9.10"></script>
                    <script src="https://unpkg.com/htmx.org@1.9.10/dist/ext/sse.js"></script>
                </head>
                <body hx-boost="true" class="{background} {text_primary} min-h-screen">
                    {nav}
                    <div id="alerts" class="max-w-xl mx-auto px-4"></div>
                    <main class="max-w-xl mx-auto p-4">
                        {body_html}
                    </main>
                    {ERROR_SWAP_SCRIPT}
                </body>
            </html>
            "#,
            title = clean_text(self.title),
            body_html = self.children.render()
        )
    }
}

struct Nav<'a> {
    user: &'a User,
    palette: Palette,
}
impl Component for Nav<'_> {
    fn render(&self) -> String {
        let name = clean_text(self.user.greeting_name());
        let card = self.palette.card;
        let root = Route::Root;
        let habits = Route::Habits;
        let journal = Route::Journal;
        let profile = Route::Profile;
        let logout = Route::Logout;
        format!(
            r#"
            <nav class="{card} shadow flex gap-4 items-center px-4 py-2">
                <a class="font-bold" href="{root}">Home</a>
                <a href="{habits}">Habits</a>
                <a href="{journal}">Journal</a>
                <a class="ml-auto" href="{profile}">{name}</a>
                <form hx-post="{logout}" class="m-0">
                    <button class="text-red-600">Logout</button>
                </form>
            </nav>
            "#
        )
    }
}

/// Blocking error message; swapped into `#alerts`.
pub struct Alert<'a> {
    pub message: &'a str,
}
impl Component for Alert<'_> {
    fn render(&self) -> String {
        let message = clean_text(self.message);
        format!(
            r#"
            <div role="alert" class="bg-red-100 text-red-900 rounded p-3 my-2 flex items-center gap-2">
                <strong>Error</strong>
                <span>{message}</span>
                <button class="ml-auto" onclick="this.parentElement.remove()">x</button>
            </div>
            "#
        )
    }
}

/// Success message; swapped into `#alerts`.
pub struct Flash<'a> {
    pub message: &'a str,
}
impl Component for Flash<'_> {
    fn render(&self) -> String {
        let message = clean_text(self.message);
        format!(
            r#"
            <div role="status" class="bg-green-100 text-green-900 rounded p-3 my-2 flex items-center gap-2">
                <strong>Success</strong>
                <span>{message}</span>
                <button class="ml-auto" onclick="this.parentElement.remove()">x</button>
            </div>
            "#
        )
    }
}

pub struct LoginRequired;
impl Component for LoginRequired {
    fn render(&self) -> String {
        let login = Route::Login;
        format!(
            r#"<p>You must be logged in. <a class="underline" href="{login}">Log in</a></p>"#
        )
    }
}

fn text_input(
    palette: Palette,
    name: &str,
    label: &str,
    kind: &str,
    value: &str,
) -> String {
    let input = palette.input;
    let value = clean_text(value);
    format!(
        r#"
        <label class="block mb-3">
            <span class="block text-sm mb-1">{label}</span>
            <input class="w-full rounded border p-2 {input}" type="{kind}" name="{name}" value="{value}" />
        </label>
        "#
    )
}

fn submit_button(palette: Palette, label: &str) -> String {
    let accent = palette.accent;
    format!(
        r#"<button class="w-full rounded p-2 font-medium {accent} disabled:opacity-50">{label}</button>"#
    )
}

pub struct LoginForm {
    pub palette: Palette,
}
impl Component for LoginForm {
    fn render(&self) -> String {
        let login = Route::Login;
        let register = Route::Register;
        let card = self.palette.card;
        let identifier = text_input(
            self.palette,
            "identifier",
            "Username or email",
            "text",
            "",
        );
        let password =
            text_input(self.palette, "password", "Password", "password", "");
        let submit = submit_button(self.palette, "Log in");
        format!(
            r#"
            <div class="{card} rounded-lg shadow p-6">
                <h1 class="text-2xl font-bold mb-4 text-center">Welcome back</h1>
                <form hx-post="{login}" hx-disabled-elt="find button">
                    {identifier}
                    {password}
                    {submit}
                </form>
                <p class="text-center mt-4 text-sm">
                    No account? <a class="underline" href="{register}">Register</a>
                </p>
            </div>
            "#
        )
    }
}

pub struct RegisterForm {
    pub palette: Palette,
}
impl Component for RegisterForm {
    fn render(&self) -> String {
        let login = Route::Login;
        let register = Route::Register;
        let card = self.palette.card;
        let fields = [
            text_input(self.palette, "username", "Username", "text", ""),
            text_input(self.palette, "display_name", "Display name", "text", ""),
            text_input(self.palette, "email", "Email", "email", ""),
            text_input(self.palette, "password", "Password", "password", ""),
        ]
        .join("");
        let submit = submit_button(self.palette, "Create account");
        format!(
            r#"
            <div class="{card} rounded-lg shadow p-6">
                <h1 class="text-2xl font-bold mb-4 text-center">Create an account</h1>
                <form hx-post="{register}" hx-disabled-elt="find button">
                    {fields}
                    {submit}
                </form>
                <p class="text-center mt-4 text-sm">
                    Already registered? <a class="underline" href="{login}">Log in</a>
                </p>
            </div>
            "#
        )
    }
}

pub struct Dashboard<'a> {
    pub user: &'a User,
    /// `None` until both the habits and the journal have loaded.
    pub stats: Option<&'a Result<Summary, String>>,
    pub notes: &'a ListView<Note>,
    pub palette: Palette,
}
impl Component for Dashboard<'_> {
    fn render(&self) -> String {
        let Palette {
            card,
            text_secondary,
            accent,
            ..
        } = self.palette;
        let name = clean_text(self.user.greeting_name());
        let stats = LiveRegion {
            id: "stats",
            live_href: Route::StatsLive.to_string(),
            children: Box::new(StatsCards {
                stats: self.stats,
                palette: self.palette,
            }),
        }
        .render();
        let notes = LiveRegion {
            id: "notes-preview",
            live_href: Route::NoteLive.to_string(),
            children: Box::new(NotesPreview { view: self.notes }),
        }
        .render();
        let habits = Route::Habits;
        let journal = Route::Journal;
        let new_note = Route::NoteNew;
        format!(
            r#"
            <h1 class="text-3xl font-bold mb-1 text-center">Welcome, {name}</h1>
            <p class="{text_secondary} mb-6 text-center">Track your habits and journal your thoughts</p>
            {stats}
            <div class="grid grid-cols-2 gap-3 my-6">
                <a class="rounded p-2 text-center {accent}" href="{habits}">View Habits</a>
                <a class="rounded p-2 text-center {accent}" href="{journal}">View Journal</a>
            </div>
            <div class="{card} rounded-lg shadow p-4">
                <div class="flex items-center mb-2">
                    <h2 class="text-lg font-bold">Latest notes</h2>
                    <a class="ml-auto underline text-sm" href="{new_note}">Add note</a>
                </div>
                {notes}
            </div>
            "#
        )
    }
}

/// The dashboard numbers and the weekly chart. Re-rendered whenever a habit
/// or journal snapshot lands.
pub struct StatsCards<'a> {
    pub stats: Option<&'a Result<Summary, String>>,
    pub palette: Palette,
}
impl Component for StatsCards<'_> {
    fn render(&self) -> String {
        let s = match self.stats {
            None => return "<p>Loading stats...</p>".into(),
            Some(Err(msg)) => {
                return format!(
                    "<p>Failed to load stats: {}</p>",
                    clean_text(msg)
                )
            }
            Some(Ok(summary)) => summary,
        };
        let Palette {
            card,
            text_secondary,
            ..
        } = self.palette;
        let rate = format!("{:.0}", s.completion_rate);
        let streak_unit = if s.streak == 1 { "day" } else { "days" };
        let chart = WeekChart {
            summary: s,
            palette: self.palette,
        }
        .render();
        let (total, completed, entries, streak) = (
            s.total_habits,
            s.completed_habits,
            s.journal_entries,
            s.streak,
        );
        format!(
            r#"
            <div class="grid grid-cols-3 gap-3 mb-6">
                <div class="{card} rounded-lg shadow p-3 text-center">
                    <p class="text-2xl font-bold">{rate}%</p>
                    <p class="text-xs {text_secondary}">habits done ({completed}/{total})</p>
                </div>
                <div class="{card} rounded-lg shadow p-3 text-center">
                    <p class="text-2xl font-bold">{streak}</p>
                    <p class="text-xs {text_secondary}">{streak_unit} streak</p>
                </div>
                <div class="{card} rounded-lg shadow p-3 text-center">
                    <p class="text-2xl font-bold">{entries}</p>
                    <p class="text-xs {text_secondary}">journal entries</p>
                </div>
            </div>
            {chart}
            "#
        )
    }
}

struct WeekChart<'a> {
    summary: &'a Summary,
    palette: Palette,
}
impl Component for WeekChart<'_> {
    fn render(&self) -> String {
        let card = self.palette.card;
        let max = self.summary.journal_week.iter().copied().max().unwrap_or(0);
        let bars = (0..WEEK).fold(String::new(), |mut acc, i| {
            let count = self.summary.journal_week[i];
            // Percent of the tallest bar; empty days still get a sliver.
            let height = if max == 0 { 2 } else { (count * 100 / max).max(2) };
            let label = self.summary.week_days[i].format("%a");
            let _ = write!(
                acc,
                r#"
                <div class="flex flex-col items-center justify-end h-32 flex-1">
                    <span class="text-xs">{count}</span>
                    <div class="w-4 bg-pink-400 rounded-t" style="height: {height}%"></div>
                    <span class="text-xs mt-1">{label}</span>
                </div>
                "#
            );
            acc
        });
        format!(
            r#"
            <div class="{card} rounded-lg shadow p-4">
                <h2 class="text-lg font-bold mb-2">Journal entries this week</h2>
                <div class="flex gap-1 items-end">{bars}</div>
            </div>
            "#
        )
    }
}

pub struct NotesPreview<'a> {
    pub view: &'a ListView<Note>,
}
impl Component for NotesPreview<'_> {
    fn render(&self) -> String {
        match self.view.phase() {
            Phase::Loading => "<p>Loading notes...</p>".into(),
            Phase::Failed(msg) => {
                format!("<p>Failed to load notes: {}</p>", clean_text(msg))
            }
            Phase::Ready => {
                let notes = self.view.visible();
                if notes.is_empty() {
                    return "<p>No notes yet.</p>".into();
                }
                notes.iter().fold(String::new(), |mut acc, note| {
                    let _ = write!(
                        acc,
                        r#"
                        <div class="py-2 border-b last:border-0">
                            <p class="font-medium">{title}</p>
                            <p class="text-sm">{preview}</p>
                        </div>
                        "#,
                        title = clean_text(&note.title),
                        preview =
                            clean_text(&note.preview(NOTE_PREVIEW_WORDS)),
                    );
                    acc
                })
            }
        }
    }
}

/// A region that re-renders itself from the server-sent `snapshot` events
/// of `live_href`. `children` is the first render. `live_href` goes out
/// as-is, so it must be built from a `Route` and `filter_query`.
pub struct LiveRegion<'a> {
    pub id: &'a str,
    pub live_href: String,
    pub children: Box<dyn Component + 'a>,
}
impl Component for LiveRegion<'_> {
    fn render(&self) -> String {
        let id = self.id;
        let live_href = &self.live_href;
        let children = self.children.render();
        format!(
            r#"
            <div id="{id}" hx-ext="sse" sse-connect="{live_href}" sse-swap="snapshot" hx-swap="innerHTML">
                {children}
            </div>
            "#
        )
    }
}

/// `?search=...&show_completed=on`, or `?search=...` when completed records
/// are hidden.
pub fn filter_query(filter: &ListFilter) -> String {
    let search = urlencoding::encode(&filter.search);
    if filter.show_completed {
        format!("?search={search}&show_completed=on")
    } else {
        format!("?search={search}")
    }
}

struct FilterForm<'a> {
    list_href: Route,
    target: &'a str,
    filter: &'a ListFilter,
    palette: Palette,
    with_completed_toggle: bool,
}
impl Component for FilterForm<'_> {
    fn render(&self) -> String {
        let list_href = &self.list_href;
        let target = self.target;
        let input = self.palette.input;
        let search = clean_text(&self.filter.search);
        let toggle = if self.with_completed_toggle {
            let checked = if self.filter.show_completed { "checked" } else { "" };
            format!(
                r#"
                <label class="flex items-center gap-1 text-sm whitespace-nowrap">
                    <input type="checkbox" name="show_completed" {checked} />
                    Show completed
                </label>
                "#
            )
        } else {
            // Nothing can be completed; always send the toggle so the query
            // matches the default filter.
            r#"<input type="hidden" name="show_completed" value="on" />"#.into()
        };
        format!(
            r##"
            <form
                class="flex gap-2 items-center mb-4"
                hx-get="{list_href}"
                hx-target="#{target}"
                hx-swap="outerHTML"
                hx-trigger="input changed delay:300ms from:find input[name=search], change"
            >
                <input
                    class="flex-1 rounded border p-2 {input}"
                    type="search"
                    name="search"
                    placeholder="Search..."
                    value="{search}"
                />
                {toggle}
            </form>
            "##
        )
    }
}

pub struct HabitScreen<'a> {
    pub view: &'a ListView<Habit>,
    pub palette: Palette,
}
impl Component for HabitScreen<'_> {
    fn render(&self) -> String {
        let accent = self.palette.accent;
        let new_habit = Route::HabitNew;
        let filter = FilterForm {
            list_href: Route::HabitList,
            target: "habit-list",
            filter: self.view.filter(),
            palette: self.palette,
            with_completed_toggle: true,
        }
        .render();
        let list = HabitRegion {
            view: self.view,
            palette: self.palette,
        }
        .render();
        format!(
            r#"
            <div class="flex items-center mb-4">
                <h1 class="text-2xl font-bold">My Habits</h1>
                <a class="ml-auto rounded px-3 py-1 {accent}" href="{new_habit}">Add habit</a>
            </div>
            {filter}
            {list}
            "#
        )
    }
}

/// The habit list wrapped in its live region; the filter form swaps this
/// whole thing so that the live stream picks up the new filter.
pub struct HabitRegion<'a> {
    pub view: &'a ListView<Habit>,
    pub palette: Palette,
}
impl Component for HabitRegion<'_> {
    fn render(&self) -> String {
        LiveRegion {
            id: "habit-list",
            live_href: format!(
                "{}{}",
                Route::HabitLive,
                filter_query(self.view.filter())
            ),
            children: Box::new(HabitList {
                view: self.view,
                palette: self.palette,
            }),
        }
        .render()
    }
}

pub struct HabitList<'a> {
    pub view: &'a ListView<Habit>,
    pub palette: Palette,
}
impl Component for HabitList<'_> {
    fn render(&self) -> String {
        match self.view.phase() {
            Phase::Loading => "<p class=\"text-center mt-5\">Loading habits...</p>".into(),
            Phase::Failed(msg) => format!(
                "<p class=\"text-center mt-5\">Failed to load habits: {}</p>",
                clean_text(msg)
            ),
            Phase::Ready if self.view.total() == 0 => {
                "<p class=\"text-center mt-5\">No habits yet. Add one!</p>".into()
            }
            Phase::Ready => {
                let habits = self.view.visible();
                if habits.is_empty() {
                    return "<p class=\"text-center mt-5\">No habits match your filter.</p>".into();
                }
                habits.iter().fold(String::new(), |mut acc, habit| {
                    acc.push_str(
                        &HabitCard {
                            habit,
                            palette: self.palette,
                        }
                        .render(),
                    );
                    acc
                })
            }
        }
    }
}

pub struct HabitCard<'a> {
    pub habit: &'a Habit,
    pub palette: Palette,
}
impl Component for HabitCard<'_> {
    fn render(&self) -> String {
        let Palette {
            card,
            text_secondary,
            ..
        } = self.palette;
        let habit = self.habit;
        let id = habit.id;
        let toggle = Route::HabitToggle(Some(id));
        let edit = Route::HabitEdit(Some(id));
        let delete = Route::Habit(Some(id));
        let (checked, done_class) = if habit.completed {
            ("checked", "line-through opacity-60")
        } else {
            ("", "")
        };
        let title = clean_text(&habit.title);
        let description = if habit.description.is_empty() {
            String::new()
        } else {
            format!(
                r#"<p class="text-sm {text_secondary}">{}</p>"#,
                clean_text(&habit.description)
            )
        };
        let frequency = habit.frequency.display_name();
        format!(
            r#"
            <div class="{card} rounded-lg shadow p-3 mb-2 flex items-center gap-3">
                <input
                    type="checkbox"
                    class="w-5 h-5"
                    {checked}
                    hx-post="{toggle}"
                    hx-swap="none"
                />
                <div class="flex-1 {done_class}">
                    <p class="font-medium">{title}</p>
                    {description}
                </div>
                <span class="text-xs rounded-full px-2 py-0.5 bg-pink-200 text-pink-900">{frequency}</span>
                <a class="text-sm underline" href="{edit}">Edit</a>
                <button
                    class="rounded-full w-6 h-6 bg-red-100 text-red-700"
                    hx-delete="{delete}"
                    hx-confirm="Are you sure you want to delete this habit?"
                    hx-swap="none"
                >x</button>
            </div>
            "#
        )
    }
}

pub struct HabitForm<'a> {
    /// `None` for a new habit.
    pub habit: Option<&'a Habit>,
    pub palette: Palette,
}
impl Component for HabitForm<'_> {
    fn render(&self) -> String {
        let Palette { card, input, .. } = self.palette;
        let (heading, action, submit_label) = match self.habit {
            Some(h) => ("Edit Habit", Route::Habit(Some(h.id)), "Save changes"),
            None => ("Add Habit", Route::Habits, "Add habit"),
        };
        let title = self.habit.map(|h| h.title.as_str()).unwrap_or_default();
        let description = clean_text(
            self.habit.map(|h| h.description.as_str()).unwrap_or_default(),
        );
        let current = self.habit.map(|h| h.frequency).unwrap_or_default();
        let options = Frequency::ALL.iter().fold(String::new(), |mut acc, f| {
            let selected = if *f == current { "selected" } else { "" };
            let _ = write!(
                acc,
                r#"<option value="{}" {selected}>{}</option>"#,
                f.as_str(),
                f.display_name()
            );
            acc
        });
        let title_input =
            text_input(self.palette, "title", "Title", "text", title);
        let submit = submit_button(self.palette, submit_label);
        let back = Route::Habits;
        format!(
            r#"
            <a class="block mb-2 underline" href="{back}">Back</a>
            <div class="{card} rounded-lg shadow p-6">
                <h1 class="text-2xl font-bold mb-4">{heading}</h1>
                <form hx-post="{action}" hx-disabled-elt="find button">
                    {title_input}
                    <label class="block mb-3">
                        <span class="block text-sm mb-1">Description</span>
                        <textarea class="w-full rounded border p-2 {input}" name="description" rows="3">{description}</textarea>
                    </label>
                    <label class="block mb-4">
                        <span class="block text-sm mb-1">Frequency</span>
                        <select class="w-full rounded border p-2 {input}" name="frequency">{options}</select>
                    </label>
                    {submit}
                </form>
            </div>
            "#
        )
    }
}

pub struct JournalScreen<'a> {
    pub view: &'a ListView<JournalEntry>,
    pub palette: Palette,
}
impl Component for JournalScreen<'_> {
    fn render(&self) -> String {
        let accent = self.palette.accent;
        let new_entry = Route::JournalNew;
        let filter = FilterForm {
            list_href: Route::JournalList,
            target: "journal-list",
            filter: self.view.filter(),
            palette: self.palette,
            with_completed_toggle: false,
        }
        .render();
        let list = JournalRegion {
            view: self.view,
            palette: self.palette,
        }
        .render();
        format!(
            r#"
            <div class="flex items-center mb-4">
                <h1 class="text-2xl font-bold">My Journal</h1>
                <a class="ml-auto rounded px-3 py-1 {accent}" href="{new_entry}">New entry</a>
            </div>
            {filter}
            {list}
            "#
        )
    }
}

pub struct JournalRegion<'a> {
    pub view: &'a ListView<JournalEntry>,
    pub palette: Palette,
}
impl Component for JournalRegion<'_> {
    fn render(&self) -> String {
        LiveRegion {
            id: "journal-list",
            live_href: format!(
                "{}{}",
                Route::JournalLive,
                filter_query(self.view.filter())
            ),
            children: Box::new(JournalList {
                view: self.view,
                palette: self.palette,
            }),
        }
        .render()
    }
}

pub struct JournalList<'a> {
    pub view: &'a ListView<JournalEntry>,
    pub palette: Palette,
}
impl Component for JournalList<'_> {
    fn render(&self) -> String {
        match self.view.phase() {
            Phase::Loading => "<p class=\"text-center mt-5\">Loading journal entries...</p>".into(),
            Phase::Failed(msg) => format!(
                "<p class=\"text-center mt-5\">Failed to load journal entries: {}</p>",
                clean_text(msg)
            ),
            Phase::Ready if self.view.total() == 0 => {
                "<p class=\"text-center mt-5\">No entries yet. Start writing!</p>".into()
            }
            Phase::Ready => {
                let entries = self.view.visible();
                if entries.is_empty() {
                    return "<p class=\"text-center mt-5\">No entries match your search.</p>".into();
                }
                entries.iter().fold(String::new(), |mut acc, entry| {
                    acc.push_str(
                        &JournalCard {
                            entry,
                            palette: self.palette,
                        }
                        .render(),
                    );
                    acc
                })
            }
        }
    }
}

pub struct JournalCard<'a> {
    pub entry: &'a JournalEntry,
    pub palette: Palette,
}
impl Component for JournalCard<'_> {
    fn render(&self) -> String {
        let Palette {
            card,
            text_secondary,
            ..
        } = self.palette;
        let entry = self.entry;
        let edit = Route::JournalEdit(Some(entry.id));
        let delete = Route::JournalEntry(Some(entry.id));
        let title = clean_text(&entry.title);
        let mood = entry.mood.emoji();
        let mood_name = entry.mood.as_str();
        let date = entry.created_at.format("%b %e, %Y");
        let content = clean(&markdown::to_html(&entry.content));
        format!(
            r#"
            <div class="{card} rounded-lg shadow p-4 mb-3">
                <div class="flex items-center gap-2">
                    <span title="{mood_name}" class="text-xl">{mood}</span>
                    <p class="font-medium flex-1">{title}</p>
                    <a class="text-sm underline" href="{edit}">Edit</a>
                    <button
                        class="rounded-full w-6 h-6 bg-red-100 text-red-700"
                        hx-delete="{delete}"
                        hx-confirm="Are you sure you want to delete this entry?"
                        hx-swap="none"
                    >x</button>
                </div>
                <p class="text-xs {text_secondary} mb-2">{date}</p>
                <div class="prose prose-sm">{content}</div>
            </div>
            "#
        )
    }
}

pub struct JournalForm<'a> {
    pub entry: Option<&'a JournalEntry>,
    pub palette: Palette,
}
impl Component for JournalForm<'_> {
    fn render(&self) -> String {
        let Palette { card, input, .. } = self.palette;
        let (heading, action, submit_label) = match self.entry {
            Some(e) => {
                ("Edit Entry", Route::JournalEntry(Some(e.id)), "Save changes")
            }
            None => ("New Entry", Route::Journal, "Save entry"),
        };
        let title = self.entry.map(|e| e.title.as_str()).unwrap_or_default();
        let content = clean_text(
            self.entry.map(|e| e.content.as_str()).unwrap_or_default(),
        );
        let current = self.entry.map(|e| e.mood).unwrap_or_default();
        let moods = Mood::ALL.iter().fold(String::new(), |mut acc, m| {
            let checked = if *m == current { "checked" } else { "" };
            let _ = write!(
                acc,
                r#"
                <label class="flex flex-col items-center text-sm">
                    <span class="text-2xl">{}</span>
                    <input type="radio" name="mood" value="{}" {checked} />
                </label>
                "#,
                m.emoji(),
                m.as_str()
            );
            acc
        });
        let title_input =
            text_input(self.palette, "title", "Title", "text", title);
        let submit = submit_button(self.palette, submit_label);
        let back = Route::Journal;
        format!(
            r#"
            <a class="block mb-2 underline" href="{back}">Back</a>
            <div class="{card} rounded-lg shadow p-6">
                <h1 class="text-2xl font-bold mb-4">{heading}</h1>
                <form hx-post="{action}" hx-disabled-elt="find button">
                    {title_input}
                    <label class="block mb-3">
                        <span class="block text-sm mb-1">What's on your mind?</span>
                        <textarea class="w-full rounded border p-2 {input}" name="content" rows="6">{content}</textarea>
                    </label>
                    <fieldset class="mb-4">
                        <legend class="text-sm mb-1">Mood</legend>
                        <div class="flex justify-around">{moods}</div>
                    </fieldset>
                    {submit}
                </form>
            </div>
            "#
        )
    }
}

pub struct NoteForm {
    pub palette: Palette,
}
impl Component for NoteForm {
    fn render(&self) -> String {
        let Palette { card, input, .. } = self.palette;
        let action = Route::Notes;
        let back = Route::Root;
        let submit = submit_button(self.palette, "Save note");
        format!(
            r#"
            <a class="block mb-2 underline" href="{back}">Back</a>
            <div class="{card} rounded-lg shadow p-6">
                <h1 class="text-2xl font-bold mb-4">Add Note</h1>
                <form hx-post="{action}" hx-disabled-elt="find button">
                    <textarea
                        class="w-full rounded border p-2 mb-4 {input}"
                        name="text"
                        rows="8"
                        placeholder="First line is the title&#10;Everything after it is the note"
                    ></textarea>
                    {submit}
                </form>
            </div>
            "#
        )
    }
}

pub struct ProfilePage<'a> {
    pub user: &'a User,
    pub theme: Theme,
    pub palette: Palette,
}
impl Component for ProfilePage<'_> {
    fn render(&self) -> String {
        let Palette {
            card,
            text_secondary,
            ..
        } = self.palette;
        let username = clean_text(&self.user.username);
        let email = clean_text(&self.user.email);
        let profile = Route::Profile;
        let theme_route = Route::Theme;
        let display_name = text_input(
            self.palette,
            "display_name",
            "Display name",
            "text",
            &self.user.display_name,
        );
        let submit = submit_button(self.palette, "Save profile");
        let themes = Theme::ALL.iter().fold(String::new(), |mut acc, t| {
            let ring = if *t == self.theme { "ring-2 ring-offset-2 ring-pink-500" } else { "" };
            let _ = write!(
                acc,
                r#"<button name="theme" value="{name}" class="rounded px-3 py-1 border {ring}">{name}</button>"#,
                name = t.as_str()
            );
            acc
        });
        format!(
            r##"
            <div class="{card} rounded-lg shadow p-6 mb-4">
                <h1 class="text-2xl font-bold mb-1">Profile</h1>
                <p class="{text_secondary} text-sm">{username} &middot; {email}</p>
                <form class="mt-4" hx-post="{profile}" hx-target="#alerts" hx-swap="innerHTML" hx-disabled-elt="find button">
                    {display_name}
                    {submit}
                </form>
            </div>
            <div class="{card} rounded-lg shadow p-6">
                <h2 class="text-lg font-bold mb-2">Theme</h2>
                <form class="flex gap-2" hx-post="{theme_route}">{themes}</form>
            </div>
            "##
        )
    }
}
