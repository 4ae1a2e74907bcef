use std::sync::Arc;

use dashmap::DashMap;
use harmony_runtime::ToolError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default number of lines (or chars) a view returns.
pub const DEFAULT_VIEW_COUNT: usize = 100;
/// Lines shown by `info`.
pub const DEFAULT_PREVIEW_LINES: usize = 10;

struct CacheEntry {
    payload: String,
    /// Byte offset where each line starts; `lines.len()` is the line count.
    line_starts: Vec<usize>,
    char_count: usize,
}

impl CacheEntry {
    fn new(payload: String) -> Self {
        let mut line_starts = Vec::new();
        let mut offset = 0;
        for line in payload.split_inclusive('\n') {
            line_starts.push(offset);
            offset += line.len();
        }
        let char_count = payload.chars().count();
        Self {
            payload,
            line_starts,
            char_count,
        }
    }

    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Lines `[first, last)` without their trailing newlines.
    fn lines(&self, first: usize, last: usize) -> String {
        if first >= last {
            return String::new();
        }
        let start = self.line_starts[first];
        let end = self
            .line_starts
            .get(last)
            .copied()
            .unwrap_or(self.payload.len());
        self.payload[start..end]
            .lines()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Which part of an entry to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewRequest {
    /// `count` lines from `start` (0-based), widened by `before`/`after` context lines.
    Lines {
        start: usize,
        count: usize,
        before: usize,
        after: usize,
    },
    /// 1-based page of `page_size` lines.
    Page { page: usize, page_size: usize },
    /// `count` characters from character `start`.
    Chars { start: usize, count: usize },
}

/// Unit a slice is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewUnit {
    Lines,
    Chars,
}

/// One window of a cached payload. `first..last` is 0-based, end-exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSlice {
    pub text: String,
    pub unit: ViewUnit,
    pub first: usize,
    pub last: usize,
    pub total: usize,
}

impl CacheSlice {
    pub fn len(&self) -> usize {
        self.last - self.first
    }

    pub fn is_empty(&self) -> bool {
        self.first == self.last
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInfo {
    pub id: String,
    pub total_lines: usize,
    pub total_chars: usize,
    pub preview: String,
}

/// Process-lifetime store for oversized tool output.
///
/// Ids are random (`cache-<uuid>`), never sequential. Entries live until
/// dropped explicitly.
#[derive(Default)]
pub struct OutputCache {
    entries: DashMap<String, Arc<CacheEntry>>,
}

impl OutputCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload and return its id.
    pub fn insert(&self, payload: impl Into<String>) -> String {
        let id = format!("cache-{}", uuid::Uuid::new_v4().simple());
        let entry = CacheEntry::new(payload.into());
        debug!(id = %id, lines = entry.line_count(), chars = entry.char_count, "Cached output");
        self.entries.insert(id.clone(), Arc::new(entry));
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    fn get(&self, id: &str) -> Result<Arc<CacheEntry>, ToolError> {
        self.entries
            .get(id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| ToolError::CacheMiss { id: id.to_string() })
    }

    pub fn view(&self, id: &str, request: ViewRequest) -> Result<CacheSlice, ToolError> {
        let entry = self.get(id)?;
        debug!(id, ?request, "Cache view");
        match request {
            ViewRequest::Lines {
                start,
                count,
                before,
                after,
            } => {
                let total = entry.line_count();
                if start >= total {
                    return Err(out_of_bounds("start", 0, total));
                }
                let first = start.saturating_sub(before);
                let last = start.saturating_add(count).saturating_add(after).min(total);
                Ok(CacheSlice {
                    text: entry.lines(first, last),
                    unit: ViewUnit::Lines,
                    first,
                    last,
                    total,
                })
            }
            ViewRequest::Page { page, page_size } => {
                if page_size == 0 {
                    return Err(ToolError::invalid_range("`page_size` must be at least 1."));
                }
                let total = entry.line_count();
                let pages = total.div_ceil(page_size);
                if page == 0 || page > pages {
                    return Err(ToolError::invalid_range(format!(
                        "`page` out of bounds. Valid range: [1, {pages}]"
                    )));
                }
                let first = (page - 1) * page_size;
                let last = (first + page_size).min(total);
                Ok(CacheSlice {
                    text: entry.lines(first, last),
                    unit: ViewUnit::Lines,
                    first,
                    last,
                    total,
                })
            }
            ViewRequest::Chars { start, count } => {
                let total = entry.char_count;
                if start >= total {
                    return Err(out_of_bounds("start", 0, total));
                }
                let last = start.saturating_add(count).min(total);
                let text: String = entry.payload.chars().skip(start).take(last - start).collect();
                Ok(CacheSlice {
                    text,
                    unit: ViewUnit::Chars,
                    first: start,
                    last,
                    total,
                })
            }
        }
    }

    pub fn info(&self, id: &str, preview_lines: usize) -> Result<CacheInfo, ToolError> {
        let entry = self.get(id)?;
        let total_lines = entry.line_count();
        Ok(CacheInfo {
            id: id.to_string(),
            total_lines,
            total_chars: entry.char_count,
            preview: entry.lines(0, preview_lines.min(total_lines)),
        })
    }

    /// Remove an entry; later use of `id` is a cache miss.
    pub fn remove(&self, id: &str) -> Result<(), ToolError> {
        match self.entries.remove(id) {
            Some(_) => {
                debug!(id, "Dropped cache entry");
                Ok(())
            }
            None => Err(ToolError::CacheMiss { id: id.to_string() }),
        }
    }
}

fn out_of_bounds(field: &str, low: usize, total: usize) -> ToolError {
    if total == 0 {
        return ToolError::invalid_range("Cached output is empty; nothing to view.");
    }
    ToolError::invalid_range(format!(
        "`{field}` out of bounds. Valid range: [{low}, {}]",
        total - 1
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> String {
        (0..n).map(|i| format!("line {i}\n")).collect()
    }

    fn lines(start: usize, count: usize) -> ViewRequest {
        ViewRequest::Lines {
            start,
            count,
            before: 0,
            after: 0,
        }
    }

    #[test]
    fn test_ids_are_distinct_and_opaque() {
        let cache = OutputCache::new();
        let a = cache.insert("x");
        let b = cache.insert("x");
        assert_ne!(a, b);
        assert!(a.starts_with("cache-"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_line_window_counts() {
        let cache = OutputCache::new();
        let id = cache.insert(numbered(10));
        for (s, c) in [(0, 3), (7, 5), (9, 1), (4, 0)] {
            let slice = cache.view(&id, lines(s, c)).unwrap();
            assert_eq!(slice.len(), c.min(10 - s));
            assert_eq!(slice.total, 10);
            assert_eq!(slice.first, s);
        }
        let slice = cache.view(&id, lines(8, 100)).unwrap();
        assert_eq!(slice.text, "line 8\nline 9");
    }

    #[test]
    fn test_context_widens_window() {
        let cache = OutputCache::new();
        let id = cache.insert(numbered(10));
        let slice = cache
            .view(
                &id,
                ViewRequest::Lines {
                    start: 5,
                    count: 1,
                    before: 2,
                    after: 10,
                },
            )
            .unwrap();
        assert_eq!((slice.first, slice.last), (3, 10));
    }

    #[test]
    fn test_start_out_of_bounds_names_range() {
        let cache = OutputCache::new();
        let id = cache.insert(numbered(10));
        let err = cache.view(&id, lines(10, 1)).unwrap_err();
        assert_eq!(err.to_string(), "`start` out of bounds. Valid range: [0, 9]");
    }

    #[test]
    fn test_pages_are_one_based() {
        let cache = OutputCache::new();
        let id = cache.insert(numbered(25));
        let page = cache
            .view(&id, ViewRequest::Page { page: 3, page_size: 10 })
            .unwrap();
        assert_eq!((page.first, page.last), (20, 25));
        let err = cache
            .view(&id, ViewRequest::Page { page: 4, page_size: 10 })
            .unwrap_err();
        assert!(err.to_string().contains("[1, 3]"));
    }

    #[test]
    fn test_char_window_is_char_indexed() {
        let cache = OutputCache::new();
        let id = cache.insert("héllo wörld");
        let slice = cache
            .view(&id, ViewRequest::Chars { start: 1, count: 4 })
            .unwrap();
        assert_eq!(slice.text, "éllo");
        assert_eq!(slice.total, 11);
    }

    #[test]
    fn test_info_and_drop() {
        let cache = OutputCache::new();
        let id = cache.insert(numbered(30));
        let info = cache.info(&id, DEFAULT_PREVIEW_LINES).unwrap();
        assert_eq!(info.total_lines, 30);
        assert_eq!(info.preview.lines().count(), 10);

        cache.remove(&id).unwrap();
        assert!(matches!(cache.view(&id, lines(0, 1)), Err(ToolError::CacheMiss { .. })));
        assert!(matches!(cache.remove(&id), Err(ToolError::CacheMiss { .. })));
    }
}
