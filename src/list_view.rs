//! Screen-side state for a list of records: which snapshot we are showing,
//! and which subset of it survives the user's search / "show completed"
//! filter. Filtering is local; it never goes back to the database.

use super::{
    live::Snapshot,
    models::{Habit, JournalEntry, Note},
};
use std::sync::Arc;

/// What the list filter needs to know about a record.
pub trait Listable {
    /// Does any searchable field contain `needle`? `needle` is already
    /// lowercased.
    fn matches(&self, needle: &str) -> bool;
    fn is_completed(&self) -> bool {
        false
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

impl Listable for Habit {
    fn matches(&self, needle: &str) -> bool {
        contains_ci(&self.title, needle)
    }
    fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Listable for JournalEntry {
    fn matches(&self, needle: &str) -> bool {
        contains_ci(&self.title, needle) || contains_ci(&self.content, needle)
    }
}

impl Listable for Note {
    fn matches(&self, needle: &str) -> bool {
        contains_ci(&self.title, needle) || contains_ci(&self.body, needle)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListFilter {
    pub search: String,
    pub show_completed: bool,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            search: String::new(),
            show_completed: true,
        }
    }
}

impl ListFilter {
    /// The search text is matched as typed, surrounding spaces included.
    pub fn admits<T: Listable>(&self, record: &T) -> bool {
        let needle = self.search.to_lowercase();
        let search_ok = needle.is_empty() || record.matches(&needle);
        let completion_ok = self.show_completed || !record.is_completed();
        search_ok && completion_ok
    }

    /// HTML checkboxes only submit when checked, so the form sends
    /// `show_completed=on` or nothing at all.
    pub fn from_form(search: Option<String>, show_completed: Option<String>) -> Self {
        Self {
            search: search.unwrap_or_default(),
            show_completed: show_completed.is_some(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    /// Terminal; a new view has to be created to recover.
    Failed(String),
}

pub struct ListView<T> {
    phase: Phase,
    version: u64,
    records: Arc<Vec<T>>,
    filter: ListFilter,
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self {
            phase: Phase::Loading,
            version: 0,
            records: Arc::new(Vec::new()),
            filter: ListFilter::default(),
        }
    }
}

impl<T: Listable> ListView<T> {
    /// A view that starts out `Loading` and shows what `filter` admits.
    pub fn filtered(filter: ListFilter) -> Self {
        let mut view = Self::default();
        view.set_filter(filter);
        view
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn filter(&self) -> &ListFilter {
        &self.filter
    }

    /// Feed a snapshot from the live query. Returns whether anything the
    /// screen shows has changed.
    pub fn apply(&mut self, snapshot: &Snapshot<T>) -> bool {
        if let Phase::Failed(_) = self.phase {
            return false;
        }
        match snapshot {
            Snapshot::Pending => false,
            Snapshot::Records { version, .. } | Snapshot::Failed { version, .. }
                if *version <= self.version =>
            {
                false
            }
            Snapshot::Records { version, records } => {
                self.version = *version;
                self.records = Arc::clone(records);
                self.phase = Phase::Ready;
                true
            }
            Snapshot::Failed { version, message } => {
                self.version = *version;
                self.phase = Phase::Failed(message.clone());
                true
            }
        }
    }

    /// Changing the filter never goes back to `Loading`, and never needs a
    /// new snapshot.
    pub fn set_filter(&mut self, filter: ListFilter) {
        self.filter = filter;
    }

    /// The records that pass the current filter, in snapshot order.
    pub fn visible(&self) -> Vec<&T> {
        match self.phase {
            Phase::Ready => self
                .records
                .iter()
                .filter(|r| self.filter.admits(*r))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Number of records in the snapshot, regardless of the filter.
    pub fn total(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, Mood};
    use chrono::Utc;

    fn habit(id: i32, title: &str, completed: bool) -> Habit {
        Habit {
            id,
            owner_id: 1,
            title: title.into(),
            description: String::new(),
            frequency: Frequency::Daily,
            completed,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    fn snapshot<T>(version: u64, records: Vec<T>) -> Snapshot<T> {
        Snapshot::Records {
            version,
            records: Arc::new(records),
        }
    }

    fn ids(view: &ListView<Habit>) -> Vec<i32> {
        view.visible().iter().map(|h| h.id).collect()
    }

    #[test]
    fn test_loading_until_first_snapshot() {
        let mut view = ListView::<Habit>::default();
        assert_eq!(view.phase(), &Phase::Loading);
        assert!(!view.apply(&Snapshot::Pending));
        assert_eq!(view.phase(), &Phase::Loading);

        assert!(view.apply(&snapshot(1, vec![habit(1, "Run", false)])));
        assert_eq!(view.phase(), &Phase::Ready);
        assert_eq!(ids(&view), vec![1]);
    }

    #[test]
    fn test_search_and_completed_filter() {
        let mut view = ListView::default();
        view.apply(&snapshot(
            1,
            vec![
                habit(1, "Morning Run", true),
                habit(2, "Evening run", false),
                habit(3, "Read", false),
            ],
        ));

        view.set_filter(ListFilter {
            search: "RUN".into(),
            show_completed: true,
        });
        assert_eq!(ids(&view), vec![1, 2]);
        assert_eq!(view.phase(), &Phase::Ready);

        view.set_filter(ListFilter {
            search: "run".into(),
            show_completed: false,
        });
        assert_eq!(ids(&view), vec![2]);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let mut view = ListView::default();
        view.apply(&snapshot(
            1,
            vec![habit(1, "Run", true), habit(2, "Rest", false)],
        ));
        let filter = ListFilter {
            search: "r".into(),
            show_completed: false,
        };
        view.set_filter(filter.clone());
        let once = ids(&view);
        view.set_filter(filter);
        assert_eq!(ids(&view), once);
        assert_eq!(once, vec![2]);
    }

    #[test]
    fn test_stale_snapshots_are_ignored() {
        let mut view = ListView::default();
        view.apply(&snapshot(5, vec![habit(2, "Newer", false)]));
        assert!(!view.apply(&snapshot(4, vec![habit(1, "Older", false)])));
        assert_eq!(ids(&view), vec![2]);
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut view = ListView::default();
        view.apply(&snapshot(1, vec![habit(1, "Run", false)]));
        assert!(view.apply(&Snapshot::Failed {
            version: 2,
            message: "permission denied".into()
        }));
        assert_eq!(view.phase(), &Phase::Failed("permission denied".into()));
        assert!(view.visible().is_empty());

        assert!(!view.apply(&snapshot(3, vec![habit(1, "Run", false)])));
        assert!(matches!(view.phase(), Phase::Failed(_)));
    }

    #[test]
    fn test_search_is_not_trimmed() {
        let filter = ListFilter {
            search: " run".into(),
            show_completed: true,
        };
        assert!(!filter.admits(&habit(1, "rerun", false)));
        assert!(filter.admits(&habit(2, "Morning run", false)));
    }

    #[test]
    fn test_filter_change_keeps_the_snapshot() {
        let mut view = ListView::filtered(ListFilter {
            search: "read".into(),
            show_completed: true,
        });
        view.apply(&snapshot(
            3,
            vec![habit(1, "Run", false), habit(2, "Read", false)],
        ));
        assert_eq!(ids(&view), vec![2]);

        view.set_filter(ListFilter::default());
        assert_eq!(view.phase(), &Phase::Ready);
        assert_eq!(ids(&view), vec![1, 2]);
        // The snapshot it already holds is not re-applied as news.
        assert!(!view.apply(&snapshot(3, vec![])));
        assert_eq!(view.total(), 2);
    }

    #[test]
    fn test_journal_search_covers_content() {
        let entry = JournalEntry {
            id: 1,
            owner_id: 1,
            title: "Tuesday".into(),
            content: "Went to the Beach".into(),
            mood: Mood::Happy,
            created_at: Utc::now(),
        };
        let filter = ListFilter {
            search: "beach".into(),
            show_completed: false,
        };
        assert!(filter.admits(&entry));
    }

    #[test]
    fn test_checkbox_form_semantics() {
        let filter = ListFilter::from_form(Some("x".into()), None);
        assert!(!filter.show_completed);
        let filter = ListFilter::from_form(None, Some("on".into()));
        assert!(filter.show_completed);
        assert_eq!(filter.search, "");
    }
}
