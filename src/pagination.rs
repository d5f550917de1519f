//! Pagination and free-text filtering for listing tools
//!
//! Listing tools narrow their records in a fixed order: structured filters
//! first, then [`filter_by_text`], then [`paginate`]. Slicing before
//! narrowing would make `total` and `has_more` describe the wrong set.

#[cfg(test)]
mod proptests;

use serde::Serialize;

/// Page size used when the caller does not ask for one
pub const DEFAULT_LIMIT: usize = 50;

/// Largest page size the tool schemas accept
pub const MAX_LIMIT: usize = 1000;

/// Caller-supplied page bounds, both optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Page bounds with defaults applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    #[must_use]
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self { limit, offset }
    }

    /// Apply defaults. No clamping: bounds are validated by the tool input layer.
    #[must_use]
    pub fn resolve(&self) -> PageWindow {
        PageWindow {
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
            offset: self.offset.unwrap_or(0),
        }
    }
}

/// Describes a page relative to the filtered set it was cut from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    /// Items after filtering, before slicing
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

impl PageMetadata {
    /// Offset to request for the following page, if there is one
    #[must_use]
    pub fn next_offset(&self) -> Option<usize> {
        self.has_more
            .then(|| self.offset.saturating_add(self.limit))
    }
}

/// One page of items plus its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub metadata: PageMetadata,
}

/// Records that know which text free-text search should look at
pub trait SearchText {
    fn search_text(&self) -> String;
}

/// Keep items whose projected text contains `query`, ignoring case.
///
/// An absent or empty query keeps everything. Relative order is preserved.
#[must_use]
pub fn filter_by_text<T, F>(items: Vec<T>, query: Option<&str>, project: F) -> Vec<T>
where
    F: Fn(&T) -> String,
{
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return items;
    };

    let needle = query.to_lowercase();
    items
        .into_iter()
        .filter(|item| project(item).to_lowercase().contains(&needle))
        .collect()
}

/// [`filter_by_text`] using the record's own [`SearchText`] projection
#[must_use]
pub fn filter_searchable<T: SearchText>(items: Vec<T>, query: Option<&str>) -> Vec<T> {
    filter_by_text(items, query, SearchText::search_text)
}

/// Cut one page out of `items`.
///
/// An offset at or past the end yields an empty page; a window running past
/// the end is shortened.
#[must_use]
pub fn paginate<T>(items: Vec<T>, request: &PageRequest) -> PageResult<T> {
    let PageWindow { limit, offset } = request.resolve();
    let total = items.len();
    let has_more = offset.saturating_add(limit) < total;

    let items = items.into_iter().skip(offset).take(limit).collect();

    PageResult {
        items,
        metadata: PageMetadata {
            total,
            limit,
            offset,
            has_more,
        },
    }
}

/// Human-readable summary such as `Showing 1-50 of 120 items (use offset: 50 for more)`
#[must_use]
pub fn format_summary(metadata: &PageMetadata) -> String {
    let PageMetadata {
        total,
        limit,
        offset,
        ..
    } = *metadata;

    if total == 0 {
        return "No items found".to_string();
    }

    let start = offset.saturating_add(1).min(total);
    let end = offset.saturating_add(limit).min(total);

    let mut info = format!("Showing {start}-{end} of {total} items");
    if let Some(next) = metadata.next_offset() {
        info.push_str(&format!(" (use offset: {next} for more)"));
    }
    info
}
