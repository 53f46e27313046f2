use std::collections::VecDeque;

use crate::types::Activity;

/// Maximum number of entries the activity log retains
pub const ACTIVITY_LOG_CAPACITY: usize = 10;

/// Newest-first log of balance-affecting events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityLog {
    entries: VecDeque<Activity>,
}

impl ActivityLog {
    pub fn new() -> Self {
        ActivityLog {
            entries: VecDeque::with_capacity(ACTIVITY_LOG_CAPACITY + 1),
        }
    }

    /// Prepends `entry`, evicting the oldest entry once over capacity.
    pub fn record(&mut self, entry: Activity) {
        self.entries.push_front(entry);
        if self.entries.len() > ACTIVITY_LOG_CAPACITY {
            self.entries.pop_back();
        }
    }

    /// Newest entry, if any
    pub fn latest(&self) -> Option<&Activity> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Activity> {
        self.entries.iter().cloned().collect()
    }
}

/// Builds a log from entries ordered newest first, keeping the newest ones.
impl FromIterator<Activity> for ActivityLog {
    fn from_iter<I: IntoIterator<Item = Activity>>(iter: I) -> Self {
        let mut entries: VecDeque<Activity> = iter
            .into_iter()
            .take(ACTIVITY_LOG_CAPACITY)
            .collect();
        entries.reserve(1);
        ActivityLog { entries }
    }
}
