//! # Document
//!
//! Owns the text buffer, the element table and the annotation store of one
//! unit of content, and is the only place where offsets get shifted.
//!
//! ## Coordinates
//!
//! Offsets count Unicode scalar values. An element occupies one offset and
//! the character stored there is a placeholder.
//!
//! ## Primitives
//!
//! ```text
//! shift(at, delta)          element keys and annotation endpoints >= at move
//! delete_range(start, end)  drop elements, labels and text in the span (no shift)
//! splice(start, end, with)  replace the span and shift everything after it
//! ```

use crate::annotations::AnnotationStore;
use crate::element::{Element, Properties, ELEMENT_PLACEHOLDER};
use crate::error::{DocumentError, DocumentResult};
use crate::snapshot::DocumentSnapshot;
use std::collections::BTreeMap;
use tracing::{trace, warn};

/// Something that can be written into a document: text or one element
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Element(Element),
}

impl Content {
    /// Characters this content occupies in the text buffer
    pub fn placeholder(&self) -> Vec<char> {
        match self {
            Content::Text(text) => text.chars().collect(),
            Content::Element(_) => vec![ELEMENT_PLACEHOLDER],
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Element(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Content::Element(element) => Some(element),
            Content::Text(_) => None,
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Element> for Content {
    fn from(element: Element) -> Self {
        Content::Element(element)
    }
}

/// Text, elements and annotations of one blip
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    content: Vec<char>,
    elements: BTreeMap<usize, Element>,
    annotations: AnnotationStore,
}

impl Document {
    /// Plain-text document without elements or annotations
    pub fn new(content: &str) -> Self {
        Self {
            content: content.chars().collect(),
            ..Self::default()
        }
    }

    /// Rebuild a document from its wire snapshot.
    ///
    /// Element offsets must be decimal and lie inside the content, annotation
    /// ranges must lie inside `[0, len]`. Zero-width annotations on a
    /// non-empty document cover nothing and are skipped.
    pub fn from_snapshot(snapshot: DocumentSnapshot) -> DocumentResult<Self> {
        let mut document = Self::new(&snapshot.content);
        let len = document.len();

        for (key, element) in snapshot.elements {
            let offset: usize = key.parse().map_err(|_| {
                DocumentError::InvalidSnapshot(format!("element offset '{key}' is not an index"))
            })?;
            if offset >= len {
                return Err(DocumentError::InvalidSnapshot(format!(
                    "element offset {offset} is outside a document of length {len}"
                )));
            }
            document.elements.insert(offset, Element::from_snapshot(element));
        }

        for annotation in snapshot.annotations {
            let (start, end) = (annotation.range.start, annotation.range.end);
            if start > end || end > len {
                return Err(DocumentError::InvalidSnapshot(format!(
                    "annotation '{}' range [{start}, {end}) is outside a document of length {len}",
                    annotation.name
                )));
            }
            if start == end && len > 0 {
                warn!(name = %annotation.name, start, "Skipping zero-width annotation");
                continue;
            }
            document
                .annotations
                .add(&annotation.name, &annotation.value, start, end);
        }

        Ok(document)
    }

    pub fn to_snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            content: self.text(),
            elements: self
                .elements
                .iter()
                .map(|(offset, element)| (offset.to_string(), element.to_snapshot()))
                .collect(),
            annotations: self.annotations.to_snapshot(),
        }
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn text(&self) -> String {
        self.content.iter().collect()
    }

    /// Text of `[start, end)`, clamped to the document
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.len());
        let start = start.min(end);
        self.content[start..end].iter().collect()
    }

    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.content.get(offset).copied()
    }

    /// First occurrence of `needle` starting at or after `from`
    pub fn find_chars(&self, needle: &[char], from: usize) -> Option<usize> {
        if needle.is_empty() || from >= self.len() {
            return None;
        }
        self.content[from..]
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|position| position + from)
    }

    pub fn find(&self, needle: &str, from: usize) -> Option<usize> {
        let needle: Vec<char> = needle.chars().collect();
        self.find_chars(&needle, from)
    }

    pub fn element_at(&self, offset: usize) -> Option<&Element> {
        self.elements.get(&offset)
    }

    /// Elements in ascending offset order
    pub fn elements(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.elements.iter().map(|(offset, element)| (*offset, element))
    }

    /// Elements at or after `from`, in ascending offset order
    pub fn elements_from(&self, from: usize) -> impl Iterator<Item = (usize, &Element)> {
        self.elements
            .range(from..)
            .map(|(offset, element)| (*offset, element))
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    /// Check a match range: `start < end <= len`, or `[0, 0)` on an empty
    /// document.
    pub fn check_range(&self, start: usize, end: usize) -> DocumentResult<()> {
        let len = self.len();
        let valid = if len == 0 {
            start == 0 && end == 0
        } else {
            start < end && end <= len
        };
        if valid {
            Ok(())
        } else {
            Err(DocumentError::out_of_range(start as i64, end as i64, len))
        }
    }

    /// Resolve a possibly negative range against the current length, then
    /// validate it with [`Document::check_range`].
    ///
    /// A negative start counts from the end; when it is paired with an end
    /// of `0` the range runs to the end of the document.
    pub fn resolve_range(&self, start: i64, end: i64) -> DocumentResult<(usize, usize)> {
        let len = self.len() as i64;
        let (mut resolved_start, mut resolved_end) = (start, end);
        if resolved_start < 0 {
            resolved_start += len;
            if resolved_end == 0 {
                resolved_end += len;
            }
        }
        if resolved_end < 0 {
            resolved_end += len;
        }
        if resolved_start < 0 || resolved_end < 0 {
            return Err(DocumentError::out_of_range(start, end, self.len()));
        }

        let (resolved_start, resolved_end) = (resolved_start as usize, resolved_end as usize);
        self.check_range(resolved_start, resolved_end)
            .map_err(|_| DocumentError::out_of_range(start, end, self.len()))?;
        Ok((resolved_start, resolved_end))
    }

    fn check_span(&self, start: usize, end: usize) -> DocumentResult<()> {
        if start <= end && end <= self.len() {
            Ok(())
        } else {
            Err(DocumentError::out_of_range(start as i64, end as i64, self.len()))
        }
    }

    /// Relabel every element key at or after `at` and shift annotations
    pub fn shift(&mut self, at: usize, delta: isize) {
        if delta == 0 {
            return;
        }
        let elements = std::mem::take(&mut self.elements);
        self.elements = elements
            .into_iter()
            .map(|(offset, element)| {
                let offset = if offset >= at {
                    offset.saturating_add_signed(delta)
                } else {
                    offset
                };
                (offset, element)
            })
            .collect();
        self.annotations.shift(at, delta);
    }

    /// Remove elements, annotation coverage and text in `[start, end)`.
    ///
    /// Offsets after the span are not shifted; callers follow up with
    /// [`Document::shift`].
    pub fn delete_range(&mut self, start: usize, end: usize) -> DocumentResult<()> {
        self.check_span(start, end)?;
        self.elements.retain(|offset, _| *offset < start || *offset >= end);
        self.annotations.delete_all(start, end);
        self.content.drain(start..end);
        trace!(start, end, "Deleted range");
        Ok(())
    }

    /// Replace `[start, end)` with `replacement` and shift what follows.
    ///
    /// When the replacement is shorter than the span, labels over the excess
    /// tail are removed first so they cannot stretch onto unrelated text.
    /// Returns the number of inserted characters.
    pub fn splice(&mut self, start: usize, end: usize, replacement: &Content) -> DocumentResult<usize> {
        self.check_span(start, end)?;
        let text = replacement.placeholder();
        let removed = end - start;

        if removed > 0 && text.len() < removed {
            self.annotations.delete_all(start + text.len(), end);
        }
        self.elements.retain(|offset, _| *offset < start || *offset >= end);
        self.shift(end, text.len() as isize - removed as isize);
        self.content.splice(start..end, text.iter().copied());

        if let Content::Element(element) = replacement {
            self.elements.insert(start, element.clone());
        }
        trace!(start, end, inserted = text.len(), "Spliced range");
        Ok(text.len())
    }

    /// Append text at the very end without extending any annotation
    pub fn append_text(&mut self, text: &str) {
        self.content.extend(text.chars());
    }

    /// Label `[start, end)` with `name = value`
    pub fn annotate(&mut self, name: &str, value: &str, start: usize, end: usize) -> DocumentResult<()> {
        self.check_span(start, end)?;
        self.annotations.add(name, value, start, end);
        Ok(())
    }

    /// Remove `name` from `[start, end)`
    pub fn clear_annotation(&mut self, name: &str, start: usize, end: usize) -> DocumentResult<()> {
        self.check_span(start, end)?;
        self.annotations.delete(name, start, end);
        Ok(())
    }

    /// Remove every label from `[start, end)`
    pub fn clear_annotations(&mut self, start: usize, end: usize) -> DocumentResult<()> {
        self.check_span(start, end)?;
        self.annotations.delete_all(start, end);
        Ok(())
    }

    /// Merge `updates` into the element at `offset`
    pub fn update_element(&mut self, offset: usize, updates: &Properties) -> DocumentResult<&Element> {
        let element = self
            .elements
            .get_mut(&offset)
            .ok_or(DocumentError::NoElementAtPosition(offset))?;
        element.update(updates);
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementType;

    fn foo_bar(start: usize, end: usize) -> Document {
        let mut doc = Document::new("\nFoo bar.");
        doc.annotate("style", "bold", start, end).unwrap();
        doc
    }

    fn style(doc: &Document) -> Vec<(usize, usize)> {
        doc.annotations()
            .get("style")
            .unwrap()
            .iter()
            .map(|a| (a.start(), a.end()))
            .collect()
    }

    #[test]
    fn test_delete_inside_annotation() {
        let mut doc = foo_bar(1, 5);
        doc.delete_range(2, 4).unwrap();
        doc.shift(4, -2);

        assert_eq!(doc.text(), "\nF bar.");
        assert_eq!(style(&doc), vec![(1, 3)]);
    }

    #[test]
    fn test_insert_at_annotation_start_shifts_it() {
        let mut doc = foo_bar(4, 9);
        doc.splice(4, 4, &Content::from("d and")).unwrap();

        assert_eq!(doc.text(), "\nFood and bar.");
        assert_eq!(style(&doc), vec![(9, 14)]);
    }

    #[test]
    fn test_shorter_replacement_trims_tail_labels() {
        let mut doc = foo_bar(1, 6);
        doc.splice(2, 5, &Content::from("o")).unwrap();

        assert_eq!(doc.text(), "\nFobar.");
        assert_eq!(style(&doc), vec![(1, 4)]);
    }

    #[test]
    fn test_splice_moves_elements() {
        let mut doc = Document::new("ab cd");
        doc.splice(2, 3, &Content::from(Element::button("b", "Go"))).unwrap();
        doc.splice(0, 0, &Content::from("xyz")).unwrap();

        assert_eq!(doc.element_at(2), None);
        assert_eq!(
            doc.element_at(5).map(Element::element_type),
            Some(&ElementType::Button)
        );

        doc.splice(5, 6, &Content::from("!")).unwrap();
        assert_eq!(doc.elements().count(), 0);
        assert_eq!(doc.text(), "xyzab!cd");
    }

    #[test]
    fn test_check_range_rules() {
        let doc = Document::new("hello");
        assert!(doc.check_range(0, 5).is_ok());
        assert!(doc.check_range(2, 2).is_err());
        assert!(doc.check_range(3, 6).is_err());

        let empty = Document::default();
        assert!(empty.check_range(0, 0).is_ok());
        assert!(empty.check_range(0, 1).is_err());
    }

    #[test]
    fn test_resolve_negative_range() {
        let doc = Document::new("hello");
        assert_eq!(doc.resolve_range(-1, 0).unwrap(), (4, 5));
        assert_eq!(doc.resolve_range(1, -1).unwrap(), (1, 4));
        assert!(matches!(
            doc.resolve_range(-9, 0),
            Err(DocumentError::OutOfRange { start: -9, end: 0, len: 5 })
        ));
    }

    #[test]
    fn test_update_element_requires_element() {
        let mut doc = Document::new("x ");
        doc.splice(1, 2, &Content::from(Element::button("a", "b"))).unwrap();

        let mut updates = Properties::new();
        updates.insert("value".to_string(), "c".into());
        assert_eq!(doc.update_element(1, &updates).unwrap().get_str("value"), Some("c"));
        assert_eq!(
            doc.update_element(0, &updates).unwrap_err(),
            DocumentError::NoElementAtPosition(0)
        );
    }

    #[test]
    fn test_find_chars() {
        let doc = Document::new("aaa 012 aaa");
        assert_eq!(doc.find("aaa", 0), Some(0));
        assert_eq!(doc.find("aaa", 3), Some(8));
        assert_eq!(doc.find("aaa", 9), None);
        assert_eq!(doc.find("", 0), None);
    }
}
