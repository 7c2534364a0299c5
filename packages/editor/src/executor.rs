//! # Mutation Executor
//!
//! Applies one action to every hit of a selector and records the batch as a
//! single `document.modify` operation.
//!
//! ## Snapshot, then apply
//!
//! The hit list is computed once, before anything changes, and replayed in
//! ascending order. A running `delta` translates each snapshotted hit into the
//! coordinates of the document as modified by the earlier hits:
//!
//! ```text
//! before:    aaa 012 aaa        hits (0,3) (8,11)
//! replace "thing": after hit 1, delta = +2, hit 2 applies at (10,13)
//! ```
//!
//! Every hit is resolved and validated and every per-hit value is computed
//! before the first mutation, so a failing batch leaves the document and the
//! log untouched. A selector without hits mutates nothing and logs nothing.

use crate::errors::{EditorError, EditorResult};
use crate::ops::{Operation, OperationQueue};
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, instrument};
use wavekit_document::{Content, Document, DocumentError, Element, ElementSnapshot, Properties};

/// The `modifyHow` tag of a `document.modify` operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifyHow {
    Delete,
    Replace,
    Insert,
    InsertAfter,
    Annotate,
    ClearAnnotation,
    UpdateElement,
}

impl ModifyHow {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModifyHow::Delete => "DELETE",
            ModifyHow::Replace => "REPLACE",
            ModifyHow::Insert => "INSERT",
            ModifyHow::InsertAfter => "INSERT_AFTER",
            ModifyHow::Annotate => "ANNOTATE",
            ModifyHow::ClearAnnotation => "CLEAR_ANNOTATION",
            ModifyHow::UpdateElement => "UPDATE_ELEMENT",
        }
    }
}

impl fmt::Display for ModifyHow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModifyHow {
    type Err = DocumentError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "DELETE" => Ok(ModifyHow::Delete),
            "REPLACE" => Ok(ModifyHow::Replace),
            "INSERT" => Ok(ModifyHow::Insert),
            "INSERT_AFTER" => Ok(ModifyHow::InsertAfter),
            "ANNOTATE" => Ok(ModifyHow::Annotate),
            "CLEAR_ANNOTATION" => Ok(ModifyHow::ClearAnnotation),
            "UPDATE_ELEMENT" => Ok(ModifyHow::UpdateElement),
            other => Err(DocumentError::InvalidAction(other.to_string())),
        }
    }
}

/// Per-hit values of an action.
///
/// `Fixed` values are reused cyclically when there are more hits than
/// values. `Computed` values are produced by calling the function with the
/// document text and the hit's character offsets, before any mutation.
/// Through [`BlipRefs`](crate::BlipRefs) the closure runs while no borrow of
/// the blip is held, so it may read any blip of the session.
pub enum Payload<T> {
    Fixed(Vec<T>),
    Computed(Box<dyn Fn(&str, usize, usize) -> T>),
}

impl<T> Payload<T> {
    pub fn computed(f: impl Fn(&str, usize, usize) -> T + 'static) -> Self {
        Payload::Computed(Box::new(f))
    }

    fn is_computed(&self) -> bool {
        matches!(self, Payload::Computed(_))
    }

    /// Evaluate a computed payload into one fixed value per hit
    fn into_fixed(self, text: &str, hits: &[(usize, usize)]) -> Self {
        match self {
            Payload::Computed(f) => Payload::Fixed(hits.iter().map(|&(start, end)| f(text, start, end)).collect()),
            fixed => fixed,
        }
    }
}

impl<T: Clone> Payload<T> {
    fn resolve(&self, text: &str, hits: &[(usize, usize)]) -> EditorResult<Vec<T>> {
        match self {
            Payload::Fixed(values) if values.is_empty() => Err(EditorError::EmptyPayload),
            Payload::Fixed(values) => Ok(values.iter().cycle().take(hits.len()).cloned().collect()),
            Payload::Computed(f) => Ok(hits.iter().map(|&(start, end)| f(text, start, end)).collect()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Payload<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Fixed(values) => f.debug_tuple("Fixed").field(values).finish(),
            Payload::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<Content> for Payload<Content> {
    fn from(content: Content) -> Self {
        Payload::Fixed(vec![content])
    }
}

impl From<&str> for Payload<Content> {
    fn from(text: &str) -> Self {
        Payload::Fixed(vec![Content::from(text)])
    }
}

impl From<String> for Payload<Content> {
    fn from(text: String) -> Self {
        Payload::Fixed(vec![Content::from(text)])
    }
}

impl From<Element> for Payload<Content> {
    fn from(element: Element) -> Self {
        Payload::Fixed(vec![Content::from(element)])
    }
}

impl From<Vec<Content>> for Payload<Content> {
    fn from(values: Vec<Content>) -> Self {
        Payload::Fixed(values)
    }
}

impl From<Vec<&str>> for Payload<Content> {
    fn from(values: Vec<&str>) -> Self {
        Payload::Fixed(values.into_iter().map(Content::from).collect())
    }
}

impl From<Vec<Element>> for Payload<Content> {
    fn from(values: Vec<Element>) -> Self {
        Payload::Fixed(values.into_iter().map(Content::from).collect())
    }
}

impl From<&str> for Payload<String> {
    fn from(value: &str) -> Self {
        Payload::Fixed(vec![value.to_string()])
    }
}

impl From<String> for Payload<String> {
    fn from(value: String) -> Self {
        Payload::Fixed(vec![value])
    }
}

impl From<Vec<String>> for Payload<String> {
    fn from(values: Vec<String>) -> Self {
        Payload::Fixed(values)
    }
}

impl From<Vec<&str>> for Payload<String> {
    fn from(values: Vec<&str>) -> Self {
        Payload::Fixed(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Properties> for Payload<Properties> {
    fn from(values: Properties) -> Self {
        Payload::Fixed(vec![values])
    }
}

impl From<Vec<Properties>> for Payload<Properties> {
    fn from(values: Vec<Properties>) -> Self {
        Payload::Fixed(values)
    }
}

/// Labels applied over exactly the inserted span of each hit
pub type BundledAnnotations = Vec<(String, String)>;

/// What to do at every hit
#[derive(Debug)]
pub enum Action {
    Delete,
    Insert {
        values: Payload<Content>,
        bundled: BundledAnnotations,
    },
    InsertAfter {
        values: Payload<Content>,
        bundled: BundledAnnotations,
    },
    Replace {
        values: Payload<Content>,
        bundled: BundledAnnotations,
    },
    Annotate {
        name: String,
        values: Payload<String>,
    },
    ClearAnnotation {
        name: String,
    },
    UpdateElement {
        values: Payload<Properties>,
    },
}

impl Action {
    /// Whether any value of this action is produced by a closure
    pub fn is_computed(&self) -> bool {
        match self {
            Action::Insert { values, .. } | Action::InsertAfter { values, .. } | Action::Replace { values, .. } => {
                values.is_computed()
            }
            Action::Annotate { values, .. } => values.is_computed(),
            Action::UpdateElement { values } => values.is_computed(),
            Action::Delete | Action::ClearAnnotation { .. } => false,
        }
    }

    /// Replace computed values with the values they produce for `hits` of
    /// the pre-batch `text`
    pub fn into_fixed(self, text: &str, hits: &[(usize, usize)]) -> Action {
        match self {
            Action::Insert { values, bundled } => Action::Insert {
                values: values.into_fixed(text, hits),
                bundled,
            },
            Action::InsertAfter { values, bundled } => Action::InsertAfter {
                values: values.into_fixed(text, hits),
                bundled,
            },
            Action::Replace { values, bundled } => Action::Replace {
                values: values.into_fixed(text, hits),
                bundled,
            },
            Action::Annotate { name, values } => Action::Annotate {
                name,
                values: values.into_fixed(text, hits),
            },
            Action::UpdateElement { values } => Action::UpdateElement {
                values: values.into_fixed(text, hits),
            },
            other => other,
        }
    }

    pub fn modify_how(&self) -> ModifyHow {
        match self {
            Action::Delete => ModifyHow::Delete,
            Action::Insert { .. } => ModifyHow::Insert,
            Action::InsertAfter { .. } => ModifyHow::InsertAfter,
            Action::Replace { .. } => ModifyHow::Replace,
            Action::Annotate { .. } => ModifyHow::Annotate,
            Action::ClearAnnotation { .. } => ModifyHow::ClearAnnotation,
            Action::UpdateElement { .. } => ModifyHow::UpdateElement,
        }
    }
}

/// Ids stamped on the `document.modify` operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTarget {
    pub wave_id: String,
    pub wavelet_id: String,
    pub blip_id: String,
}

/// Values resolved for every hit before the batch starts
enum Plan {
    Delete,
    Splice {
        values: Vec<Content>,
        bundled: BundledAnnotations,
    },
    Annotate {
        name: String,
        values: Vec<String>,
    },
    Clear {
        name: String,
    },
    Update {
        values: Vec<Properties>,
    },
}

/// Hits of `selector` in `document` as non-negative character offsets
pub fn resolved_hits(selector: &Selector, document: &Document) -> EditorResult<Vec<(usize, usize)>> {
    let hits = selector
        .hits(document)
        .map(|(start, end)| document.resolve_range(start, end))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(hits)
}

pub struct MutationExecutor<'a> {
    document: &'a mut Document,
    queue: &'a OperationQueue,
    target: &'a OperationTarget,
}

impl<'a> MutationExecutor<'a> {
    pub fn new(document: &'a mut Document, queue: &'a OperationQueue, target: &'a OperationTarget) -> Self {
        Self {
            document,
            queue,
            target,
        }
    }

    /// Apply `action` at every hit of `selector`.
    ///
    /// Returns the queued operation, or `None` when the selector had no hits.
    #[instrument(skip_all, fields(blip = %self.target.blip_id, modify_how = %action.modify_how()))]
    pub fn run(mut self, selector: &Selector, action: &Action) -> EditorResult<Option<Operation>> {
        let hits = resolved_hits(selector, self.document)?;
        if hits.is_empty() {
            debug!("Selection has no hits");
            return Ok(None);
        }

        let plan = self.plan(action, &hits)?;

        let mut delta: isize = 0;
        for (index, &(start, end)) in hits.iter().enumerate() {
            let start = start.saturating_add_signed(delta);
            let end = end.saturating_add_signed(delta);
            delta += self.apply(&plan, index, start, end, action.modify_how())?;
            debug!(index, start, end, delta, "Applied hit");
        }

        let mut params = selector.query_params();
        params.insert("modifyAction".to_string(), Self::modify_action(&plan, action.modify_how(), self.document, &hits));

        let operation = self.queue.document_modify(
            &self.target.wave_id,
            &self.target.wavelet_id,
            &self.target.blip_id,
            params,
        );
        info!(hits = hits.len(), id = %operation.id, "Applied batch");
        Ok(Some(operation))
    }

    fn plan(&self, action: &Action, hits: &[(usize, usize)]) -> EditorResult<Plan> {
        let text = self.document.text();
        let plan = match action {
            Action::Delete => Plan::Delete,
            Action::Insert { values, bundled }
            | Action::InsertAfter { values, bundled }
            | Action::Replace { values, bundled } => {
                let values = values.resolve(&text, hits)?;
                let elements = values.iter().filter(|value| value.as_element().is_some()).count();
                if elements != 0 && elements != values.len() {
                    return Err(EditorError::MixedContent);
                }
                Plan::Splice {
                    values,
                    bundled: bundled.clone(),
                }
            }
            Action::Annotate { name, values } => Plan::Annotate {
                name: name.clone(),
                values: values.resolve(&text, hits)?,
            },
            Action::ClearAnnotation { name } => Plan::Clear { name: name.clone() },
            Action::UpdateElement { values } => {
                if let Some(&(start, _)) = hits
                    .iter()
                    .find(|(start, _)| self.document.element_at(*start).is_none())
                {
                    return Err(DocumentError::NoElementAtPosition(start).into());
                }
                Plan::Update {
                    values: values.resolve(&text, hits)?,
                }
            }
        };
        Ok(plan)
    }

    /// Apply hit `index` at its current offsets; returns the width change
    fn apply(&mut self, plan: &Plan, index: usize, start: usize, end: usize, how: ModifyHow) -> EditorResult<isize> {
        match plan {
            Plan::Delete => {
                self.document.splice(start, end, &Content::Text(String::new()))?;
                Ok(-((end - start) as isize))
            }
            Plan::Splice { values, bundled } => {
                let (start, end) = match how {
                    ModifyHow::Insert => (start, start),
                    ModifyHow::InsertAfter => (end, end),
                    _ => (start, end),
                };
                let inserted = self.document.splice(start, end, &values[index])?;
                if !bundled.is_empty() && inserted > 0 {
                    self.document.clear_annotations(start, start + inserted)?;
                    for (name, value) in bundled {
                        self.document.annotate(name, value, start, start + inserted)?;
                    }
                }
                Ok(inserted as isize - (end - start) as isize)
            }
            Plan::Annotate { name, values } => {
                self.document.annotate(name, &values[index], start, end)?;
                Ok(0)
            }
            Plan::Clear { name } => {
                self.document.clear_annotation(name, start, end)?;
                Ok(0)
            }
            Plan::Update { values } => {
                self.document.update_element(start, &values[index])?;
                Ok(0)
            }
        }
    }

    /// The `modifyAction` record describing the whole batch
    fn modify_action(plan: &Plan, how: ModifyHow, document: &Document, hits: &[(usize, usize)]) -> Value {
        let mut action = Map::new();
        action.insert("modifyHow".to_string(), how.as_str().into());

        match plan {
            Plan::Delete => {}
            Plan::Splice { values, bundled } => {
                if values.iter().all(|value| value.as_text().is_some()) {
                    let texts: Vec<&str> = values.iter().filter_map(Content::as_text).collect();
                    action.insert("values".to_string(), json!(texts));
                } else {
                    let elements: Vec<ElementSnapshot> = values
                        .iter()
                        .filter_map(Content::as_element)
                        .map(Element::to_snapshot)
                        .collect();
                    action.insert("elements".to_string(), json!(elements));
                }
                if !bundled.is_empty() {
                    let bundled: Vec<Value> = bundled
                        .iter()
                        .map(|(key, value)| json!({ "key": key, "value": value }))
                        .collect();
                    action.insert("bundledAnnotations".to_string(), Value::Array(bundled));
                }
            }
            Plan::Annotate { name, values } => {
                action.insert("values".to_string(), json!(values));
                action.insert("annotationKey".to_string(), name.as_str().into());
            }
            Plan::Clear { name } => {
                action.insert("annotationKey".to_string(), name.as_str().into());
            }
            Plan::Update { values } => {
                // Offsets are unchanged by updates, so the hits still address the elements
                let elements: Vec<Value> = hits
                    .iter()
                    .zip(values)
                    .map(|(&(start, _), properties)| {
                        let element_type = document
                            .element_at(start)
                            .map(|element| element.element_type().as_str().to_string());
                        json!({ "type": element_type, "properties": properties })
                    })
                    .collect();
                action.insert("elements".to_string(), Value::Array(elements));
            }
        }
        Value::Object(action)
    }
}
