//! # Selectors
//!
//! A selector is a query over a document's current state. Evaluating it
//! yields disjoint `(start, end)` hits in ascending order:
//!
//! | query                 | hits                                        |
//! |-----------------------|---------------------------------------------|
//! | everything            | `(0, len)`                                  |
//! | literal text          | non-overlapping occurrences, left to right  |
//! | element type + props  | offsets of matching elements, length 1      |
//! | explicit range        | the range itself, possibly negative         |
//!
//! Hits are computed lazily and from scratch on every call, so a selector
//! can be evaluated again after the document changed.

use serde_json::{json, Map, Value};
use wavekit_document::{Document, Element, ElementType, Properties};

/// One match. Explicit ranges may carry negative offsets that are resolved
/// against the document length before use.
pub type Hit = (i64, i64);

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// The whole document
    Everything,
    /// Literal substring
    Text(String),
    /// Elements of a type whose properties equal every restriction
    Element {
        element_type: ElementType,
        restrictions: Properties,
    },
}

impl Query {
    pub fn text(text: &str) -> Self {
        Query::Text(text.to_string())
    }

    pub fn element(element_type: ElementType) -> Self {
        Query::Element {
            element_type,
            restrictions: Properties::new(),
        }
    }

    /// Element query with one more property restriction
    pub fn with_restriction(self, key: &str, value: impl Into<Value>) -> Self {
        match self {
            Query::Element {
                element_type,
                mut restrictions,
            } => {
                restrictions.insert(key.to_string(), value.into());
                Query::Element {
                    element_type,
                    restrictions,
                }
            }
            other => other,
        }
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Query::text(text)
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Query::Text(text)
    }
}

impl From<ElementType> for Query {
    fn from(element_type: ElementType) -> Self {
        Query::element(element_type)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Up to `max_results` matches of `query`; `max_results <= 0` is unbounded
    Matches { query: Query, max_results: i64 },
    /// A single explicit range
    Range { start: i64, end: i64 },
}

impl Selector {
    pub fn all(query: impl Into<Query>, max_results: i64) -> Self {
        Selector::Matches {
            query: query.into(),
            max_results,
        }
    }

    pub fn first(query: impl Into<Query>) -> Self {
        Self::all(query, 1)
    }

    /// The whole document as one hit
    pub fn everything() -> Self {
        Self::all(Query::Everything, -1)
    }

    pub fn range(start: i64, end: i64) -> Self {
        Selector::Range { start, end }
    }

    /// The single offset `index`
    pub fn at(index: i64) -> Self {
        Self::range(index, index + 1)
    }

    pub fn hits<'a>(&'a self, document: &'a Document) -> Hits<'a> {
        let (cursor, limit) = match self {
            Selector::Range { start, end } => (Cursor::Once(Some((*start, *end))), None),
            Selector::Matches { query, max_results } => {
                let limit = (*max_results > 0).then_some(*max_results as usize);
                let cursor = match query {
                    Query::Everything => Cursor::Once(Some((0, document.len() as i64))),
                    Query::Text(text) if text.is_empty() => Cursor::Done,
                    Query::Text(text) => Cursor::Text {
                        needle: text.chars().collect(),
                        from: 0,
                    },
                    Query::Element {
                        element_type,
                        restrictions,
                    } => Cursor::Elements {
                        element_type,
                        restrictions,
                        from: 0,
                    },
                };
                (cursor, limit)
            }
        };
        Hits {
            document,
            cursor,
            remaining: limit,
        }
    }

    /// Parameters that let the server re-run this selection
    pub fn query_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        match self {
            Selector::Range { start, end } => {
                params.insert("range".to_string(), json!({ "start": start, "end": end }));
            }
            Selector::Matches { query, max_results } => match query {
                Query::Everything => {}
                Query::Text(text) => {
                    params.insert(
                        "modifyQuery".to_string(),
                        json!({ "maxRes": max_results, "textMatch": text }),
                    );
                }
                Query::Element {
                    element_type,
                    restrictions,
                } => {
                    params.insert(
                        "modifyQuery".to_string(),
                        json!({
                            "maxRes": max_results,
                            "elementMatch": element_type.as_str(),
                            "restrictions": restrictions,
                        }),
                    );
                }
            },
        }
        params
    }
}

enum Cursor<'a> {
    Once(Option<Hit>),
    Text {
        needle: Vec<char>,
        from: usize,
    },
    Elements {
        element_type: &'a ElementType,
        restrictions: &'a Properties,
        from: usize,
    },
    Done,
}

/// Lazy hit sequence of a selector over one document state
pub struct Hits<'a> {
    document: &'a Document,
    cursor: Cursor<'a>,
    remaining: Option<usize>,
}

impl Iterator for Hits<'_> {
    type Item = Hit;

    fn next(&mut self) -> Option<Hit> {
        if self.remaining == Some(0) {
            return None;
        }

        let hit = match &mut self.cursor {
            Cursor::Once(hit) => hit.take(),
            Cursor::Text { needle, from } => {
                self.document.find_chars(needle, *from).map(|start| {
                    *from = start + needle.len();
                    (start as i64, (start + needle.len()) as i64)
                })
            }
            Cursor::Elements {
                element_type,
                restrictions,
                from,
            } => self
                .document
                .elements_from(*from)
                .find(|(_, element)| element.matches(element_type, restrictions))
                .map(|(offset, _)| {
                    *from = offset + 1;
                    (offset as i64, offset as i64 + 1)
                }),
            Cursor::Done => None,
        };

        match hit {
            Some(hit) => {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                Some(hit)
            }
            None => {
                self.cursor = Cursor::Done;
                None
            }
        }
    }
}

/// What a hit points at: the element of a one-wide hit, or the text slice
#[derive(Debug, Clone, PartialEq)]
pub enum HitValue {
    Element(Element),
    Text(String),
}

impl HitValue {
    /// Value of the resolved range `[start, end)`
    pub fn of(document: &Document, start: usize, end: usize) -> Self {
        if end == start + 1 {
            if let Some(element) = document.element_at(start) {
                return HitValue::Element(element.clone());
            }
        }
        HitValue::Text(document.slice(start, end))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            HitValue::Text(text) => Some(text),
            HitValue::Element(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            HitValue::Element(element) => Some(element),
            HitValue::Text(_) => None,
        }
    }
}
