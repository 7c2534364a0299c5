//! # Annotation Store
//!
//! Named key/value labels over half-open offset ranges.
//!
//! ## Invariants (per name, after every operation settles)
//!
//! - Intervals are pairwise disjoint and sorted by start.
//! - No two touching intervals carry the same value; they are coalesced.
//! - `start < end`, except a single `[0, 0)` interval on an empty document.
//!
//! Every mutation rebuilds the interval list of the affected name and swaps
//! it in, so no list is edited while it is being walked.

use crate::snapshot::{AnnotationSnapshot, RangeSnapshot};
use std::collections::BTreeMap;
use tracing::trace;

/// Reserved annotation names interpreted by clients
pub mod names {
    pub const BACKGROUND_COLOR: &str = "style/backgroundColor";
    pub const COLOR: &str = "style/color";
    pub const FONT_FAMILY: &str = "style/fontFamily";
    pub const FONT_SIZE: &str = "style/fontSize";
    pub const FONT_STYLE: &str = "style/fontStyle";
    pub const FONT_WEIGHT: &str = "style/fontWeight";
    pub const TEXT_DECORATION: &str = "style/textDecoration";
    pub const VERTICAL_ALIGN: &str = "style/verticalAlign";
    pub const LINK: &str = "link/manual";
}

/// A named value over `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Annotation {
    name: String,
    value: String,
    start: usize,
    end: usize,
}

impl Annotation {
    pub fn new(name: &str, value: &str, start: usize, end: usize) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            start,
            end,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    fn to_snapshot(&self) -> AnnotationSnapshot {
        AnnotationSnapshot {
            name: self.name.clone(),
            value: self.value.clone(),
            range: RangeSnapshot {
                start: self.start,
                end: self.end,
            },
        }
    }
}

/// Annotations of one document, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationStore {
    store: BTreeMap<String, Vec<Annotation>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label `[start, end)` with `name = value`.
    ///
    /// Same-valued intervals that overlap or touch the new range are merged
    /// into it; differently valued ones lose the contested span.
    pub fn add(&mut self, name: &str, value: &str, start: usize, end: usize) {
        if start > end || (start == end && start != 0) {
            trace!(name, start, end, "Ignoring empty annotation range");
            return;
        }

        let mut remaining = self.store.remove(name).unwrap_or_default();
        let (mut start, mut end) = (start, end);

        // Absorbing one interval can widen the range onto another one.
        loop {
            let mut absorbed = false;
            remaining.retain(|existing| {
                let touches = existing.start <= end && existing.end >= start;
                if touches && existing.value == value && !existing.is_degenerate() {
                    start = start.min(existing.start);
                    end = end.max(existing.end);
                    absorbed = true;
                    false
                } else {
                    true
                }
            });
            if !absorbed {
                break;
            }
        }

        let mut rebuilt = clip_all(remaining, start, end);
        rebuilt.push(Annotation::new(name, value, start, end));
        self.install(name, rebuilt);
    }

    /// Remove `name` from `[start, end)`, splitting intervals that straddle
    /// the span.
    pub fn delete(&mut self, name: &str, start: usize, end: usize) {
        let Some(existing) = self.store.remove(name) else {
            return;
        };
        let rebuilt = clip_all(existing, start, end);
        self.install(name, rebuilt);
    }

    /// Remove every name from `[start, end)`
    pub fn delete_all(&mut self, start: usize, end: usize) {
        let names: Vec<String> = self.store.keys().cloned().collect();
        for name in names {
            self.delete(&name, start, end);
        }
    }

    /// Move every endpoint at or after `at` by `delta`, then coalesce
    /// same-valued intervals that now touch.
    pub fn shift(&mut self, at: usize, delta: isize) {
        if delta == 0 {
            return;
        }
        let store = std::mem::take(&mut self.store);
        for (name, annotations) in store {
            let shifted = annotations
                .into_iter()
                .map(|mut annotation| {
                    if annotation.start >= at {
                        annotation.start = annotation.start.saturating_add_signed(delta);
                    }
                    if annotation.end >= at {
                        annotation.end = annotation.end.saturating_add_signed(delta);
                    }
                    annotation
                })
                .collect();
            self.install(&name, shifted);
        }
    }

    /// Intervals labelled `name`, in ascending order
    pub fn get(&self, name: &str) -> Option<&[Annotation]> {
        self.store.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.store.keys().map(String::as_str)
    }

    /// Every annotation, grouped by name
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.store.values().flatten()
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn to_snapshot(&self) -> Vec<AnnotationSnapshot> {
        self.iter().map(Annotation::to_snapshot).collect()
    }

    fn install(&mut self, name: &str, annotations: Vec<Annotation>) {
        let settled = settle(annotations);
        if !settled.is_empty() {
            self.store.insert(name.to_string(), settled);
        }
    }
}

/// Cut `[start, end)` out of every interval
fn clip_all(annotations: Vec<Annotation>, start: usize, end: usize) -> Vec<Annotation> {
    let mut kept = Vec::with_capacity(annotations.len() + 1);
    for annotation in annotations {
        if annotation.is_degenerate() {
            if annotation.start < start || annotation.start > end {
                kept.push(annotation);
            }
            continue;
        }
        if annotation.end <= start || annotation.start >= end {
            kept.push(annotation);
            continue;
        }
        if annotation.start < start {
            kept.push(Annotation {
                end: start,
                ..annotation.clone()
            });
        }
        if annotation.end > end {
            kept.push(Annotation {
                start: end,
                ..annotation
            });
        }
    }
    kept
}

/// Sort, drop empty intervals and coalesce touching same-valued neighbours
fn settle(mut annotations: Vec<Annotation>) -> Vec<Annotation> {
    annotations.sort_by_key(|annotation| (annotation.start, annotation.end));

    let mut settled: Vec<Annotation> = Vec::with_capacity(annotations.len());
    for annotation in annotations {
        if annotation.is_degenerate() && annotation.start != 0 {
            continue;
        }
        match settled.last_mut() {
            Some(last)
                if last.value == annotation.value
                    && !last.is_degenerate()
                    && annotation.start <= last.end =>
            {
                last.end = last.end.max(annotation.end);
            }
            _ => settled.push(annotation),
        }
    }
    settled
}
