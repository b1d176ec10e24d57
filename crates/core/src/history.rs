use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::filters::FilterSet;

/// How many searches a connection remembers.
pub const HISTORY_CAPACITY: usize = 50;

/// One executed search, as remembered by the owning connection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchRecord {
    pub timestamp: DateTime<Utc>,
    pub filters: FilterSet,
    pub page: u32,
    pub page_size: u32,
    pub result_count: u64,
    pub success: bool,
}

/// Fixed-capacity FIFO history. Eviction is structural: recording entry
/// fifty-one removes entry one; there is no separate truncation step to
/// forget.
#[derive(Clone, Debug, Default)]
pub struct SearchHistory {
    entries: VecDeque<SearchRecord>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self { entries: VecDeque::with_capacity(HISTORY_CAPACITY) }
    }

    pub fn record(&mut self, entry: SearchRecord) {
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&SearchRecord> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchRecord> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
