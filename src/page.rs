//! Offset pagination contract shared by the record queries.

use serde::{Deserialize, Serialize};

/// Order in which records are returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Oldest record first.
    #[default]
    IdAsc,
    /// Newest record first.
    IdDesc,
}

/// A window into an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of matching records to skip.
    pub offset: u64,
    /// Maximum number of records to return.
    pub limit: u64,
    /// Result order.
    #[serde(default)]
    pub sort: SortOrder,
}

impl PageRequest {
    /// A page in ascending id order.
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
            sort: SortOrder::IdAsc,
        }
    }

    /// Returns the same window with a different order.
    pub fn sorted(self, sort: SortOrder) -> Self {
        Self { sort, ..self }
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Offset the page starts at.
    pub offset: u64,
    /// Limit the page was requested with.
    pub limit: u64,
    /// Number of matches across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// True when matches exist past this page.
    pub fn has_more(&self) -> bool {
        self.offset + (self.items.len() as u64) < self.total
    }
}
