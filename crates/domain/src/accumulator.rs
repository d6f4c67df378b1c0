use serde::{Deserialize, Serialize};

/// How a fetched page joins the held list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Drop the held list; used for the first page of a sequence.
    Replace,
    /// Concatenate after the held list.
    Append,
}

/// Merges a page into the held list.
///
/// Appending never deduplicates: a record that shows up in two overlapping
/// pages is kept twice.
#[must_use]
pub fn merge_page<T>(existing: Vec<T>, page: Vec<T>, mode: MergeMode) -> Vec<T> {
    match mode {
        MergeMode::Replace => page,
        MergeMode::Append => {
            let mut merged = existing;
            merged.extend(page);
            merged
        }
    }
}
