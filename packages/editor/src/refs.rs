//! Actions on a selection within one blip

use crate::blip::Blip;
use crate::errors::{EditorError, EditorResult};
use crate::executor::{resolved_hits, Action, BundledAnnotations, MutationExecutor, Payload};
use crate::ops::Operation;
use crate::selector::{Hit, HitValue, Selector};
use wavekit_document::{Content, Properties};

/// A selector bound to a blip.
///
/// Every action re-evaluates the selector against the current content,
/// applies itself to all hits and queues one operation. Actions return the
/// queued operation, or `None` when nothing matched.
#[derive(Debug, Clone)]
pub struct BlipRefs {
    blip: Blip,
    selector: Selector,
}

impl BlipRefs {
    pub fn new(blip: Blip, selector: Selector) -> Self {
        Self { blip, selector }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Current hits, unresolved
    pub fn hits(&self) -> Vec<Hit> {
        let document = self.blip.document();
        let hits = self.selector.hits(&document).collect();
        hits
    }

    pub fn has_hits(&self) -> bool {
        let document = self.blip.document();
        let found = self.selector.hits(&document).next().is_some();
        found
    }

    /// Element or text at the first hit
    pub fn value(&self) -> EditorResult<HitValue> {
        let document = self.blip.document();
        let first = self.selector.hits(&document).next();
        let (start, end) = first.ok_or(EditorError::NoMatch)?;
        let (start, end) = document.resolve_range(start, end)?;
        Ok(HitValue::of(&document, start, end))
    }

    pub fn execute(&self, action: Action) -> EditorResult<Option<Operation>> {
        let action = if action.is_computed() {
            let (text, hits) = {
                let document = self.blip.document();
                let hits = resolved_hits(&self.selector, &document)?;
                (document.text(), hits)
            };
            action.into_fixed(&text, &hits)
        } else {
            action
        };

        let target = self.blip.target();
        let mut state = self.blip.state().borrow_mut();
        MutationExecutor::new(&mut state.document, self.blip.queue(), &target)
            .run(&self.selector, &action)
    }

    pub fn insert(&self, values: impl Into<Payload<Content>>) -> EditorResult<Option<Operation>> {
        self.insert_with(values, &[])
    }

    pub fn insert_with(
        &self,
        values: impl Into<Payload<Content>>,
        bundled: &[(&str, &str)],
    ) -> EditorResult<Option<Operation>> {
        self.execute(Action::Insert {
            values: values.into(),
            bundled: bundle(bundled),
        })
    }

    pub fn insert_after(&self, values: impl Into<Payload<Content>>) -> EditorResult<Option<Operation>> {
        self.insert_after_with(values, &[])
    }

    pub fn insert_after_with(
        &self,
        values: impl Into<Payload<Content>>,
        bundled: &[(&str, &str)],
    ) -> EditorResult<Option<Operation>> {
        self.execute(Action::InsertAfter {
            values: values.into(),
            bundled: bundle(bundled),
        })
    }

    pub fn replace(&self, values: impl Into<Payload<Content>>) -> EditorResult<Option<Operation>> {
        self.replace_with(values, &[])
    }

    pub fn replace_with(
        &self,
        values: impl Into<Payload<Content>>,
        bundled: &[(&str, &str)],
    ) -> EditorResult<Option<Operation>> {
        self.execute(Action::Replace {
            values: values.into(),
            bundled: bundle(bundled),
        })
    }

    pub fn delete(&self) -> EditorResult<Option<Operation>> {
        self.execute(Action::Delete)
    }

    /// Label every hit with `name = value`
    pub fn annotate(&self, name: &str, value: &str) -> EditorResult<Option<Operation>> {
        self.annotate_each(name, value)
    }

    /// Label every hit with `name`, drawing values from `values`
    pub fn annotate_each(&self, name: &str, values: impl Into<Payload<String>>) -> EditorResult<Option<Operation>> {
        self.execute(Action::Annotate {
            name: name.to_string(),
            values: values.into(),
        })
    }

    pub fn clear_annotation(&self, name: &str) -> EditorResult<Option<Operation>> {
        self.execute(Action::ClearAnnotation {
            name: name.to_string(),
        })
    }

    /// Merge `updates` into the element at every hit
    pub fn update_element(&self, updates: Properties) -> EditorResult<Option<Operation>> {
        self.update_elements(updates)
    }

    pub fn update_elements(&self, values: impl Into<Payload<Properties>>) -> EditorResult<Option<Operation>> {
        self.execute(Action::UpdateElement {
            values: values.into(),
        })
    }
}

fn bundle(pairs: &[(&str, &str)]) -> BundledAnnotations {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
