//! # Blip
//!
//! A blip is a [`Document`] plus its identity inside a conversation. The
//! [`Blip`] handle is cheap to clone: every handle for the same id shares
//! one state, and edits made through any handle, proxy views included, are
//! visible through all of them.
//!
//! Selections are built from a handle and acted on through [`BlipRefs`]:
//!
//! ```rust,ignore
//! blip.first("world").replace("jupiter")?;
//! blip.all("aaa").annotate(names::FONT_WEIGHT, "bold")?;
//! blip.append_with("bold", &[(names::FONT_WEIGHT, "bold")])?;
//! ```

use crate::blips::{Blips, SharedState};
use crate::data::BlipData;
use crate::errors::{EditorError, EditorResult};
use crate::executor::{OperationTarget, Payload};
use crate::markup::parse_markup;
use crate::ops::{Operation, OperationQueue};
use crate::refs::BlipRefs;
use crate::selector::{HitValue, Query, Selector};
use std::cell::{Ref, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;
use tracing::debug;
use wavekit_document::{Content, Document, Element, ElementType};

/// Identity, thread links and content of one blip
#[derive(Debug)]
pub(crate) struct BlipState {
    pub(crate) blip_id: String,
    pub(crate) wave_id: String,
    pub(crate) wavelet_id: String,
    pub(crate) parent_blip_id: Option<String>,
    pub(crate) child_blip_ids: Vec<String>,
    pub(crate) contributors: BTreeSet<String>,
    pub(crate) creator: Option<String>,
    pub(crate) last_modified_time: i64,
    pub(crate) version: i64,
    pub(crate) document: Document,
}

impl BlipState {
    pub(crate) fn from_data(data: BlipData) -> EditorResult<Self> {
        Ok(Self {
            document: Document::from_snapshot(data.document)?,
            blip_id: data.blip_id,
            wave_id: data.wave_id,
            wavelet_id: data.wavelet_id,
            parent_blip_id: data.parent_blip_id,
            child_blip_ids: data.child_blip_ids,
            contributors: data.contributors,
            creator: data.creator,
            last_modified_time: data.last_modified_time,
            version: data.version,
        })
    }

    pub(crate) fn to_data(&self) -> BlipData {
        BlipData {
            blip_id: self.blip_id.clone(),
            wave_id: self.wave_id.clone(),
            wavelet_id: self.wavelet_id.clone(),
            parent_blip_id: self.parent_blip_id.clone(),
            child_blip_ids: self.child_blip_ids.clone(),
            contributors: self.contributors.clone(),
            creator: self.creator.clone(),
            last_modified_time: self.last_modified_time,
            version: self.version,
            document: self.document.to_snapshot(),
        }
    }

    fn target(&self) -> OperationTarget {
        OperationTarget {
            wave_id: self.wave_id.clone(),
            wavelet_id: self.wavelet_id.clone(),
            blip_id: self.blip_id.clone(),
        }
    }
}

/// Handle to one blip of a session
#[derive(Debug, Clone)]
pub struct Blip {
    state: SharedState,
    blips: Blips,
    queue: OperationQueue,
}

impl Blip {
    pub(crate) fn from_parts(state: SharedState, blips: Blips, queue: OperationQueue) -> Self {
        Self { state, blips, queue }
    }

    pub fn blip_id(&self) -> String {
        self.state.borrow().blip_id.clone()
    }

    pub fn wave_id(&self) -> String {
        self.state.borrow().wave_id.clone()
    }

    pub fn wavelet_id(&self) -> String {
        self.state.borrow().wavelet_id.clone()
    }

    /// `None` for the root blip
    pub fn parent_blip_id(&self) -> Option<String> {
        self.state.borrow().parent_blip_id.clone()
    }

    pub fn child_blip_ids(&self) -> Vec<String> {
        self.state.borrow().child_blip_ids.clone()
    }

    pub fn contributors(&self) -> BTreeSet<String> {
        self.state.borrow().contributors.clone()
    }

    pub fn creator(&self) -> Option<String> {
        self.state.borrow().creator.clone()
    }

    pub fn last_modified_time(&self) -> i64 {
        self.state.borrow().last_modified_time
    }

    pub fn version(&self) -> i64 {
        self.state.borrow().version
    }

    pub fn is_root(&self) -> bool {
        self.state.borrow().parent_blip_id.is_none()
    }

    /// The parent, if it is known to the session
    pub fn parent_blip(&self) -> Option<Blip> {
        let parent_id = self.parent_blip_id()?;
        self.blips.get(&parent_id)
    }

    /// Children known to the session, in child-list order
    pub fn child_blips(&self) -> Vec<Blip> {
        self.child_blip_ids()
            .iter()
            .filter_map(|id| self.blips.get(id))
            .collect()
    }

    /// Offset of this blip's placeholder in its parent, or `-1` when the blip
    /// is not inline or the parent is unknown
    pub fn inline_blip_offset(&self) -> i64 {
        let Some(parent) = self.parent_blip() else {
            return -1;
        };
        let blip_id = self.blip_id();
        let document = parent.document();
        let offset = document
            .elements()
            .find(|(_, element)| {
                element.element_type() == &ElementType::InlineBlip
                    && element.get_str("id") == Some(blip_id.as_str())
            })
            .map_or(-1, |(offset, _)| offset as i64);
        offset
    }

    /// Read access to the document. Drop the guard before editing.
    pub fn document(&self) -> Ref<'_, Document> {
        Ref::map(self.state.borrow(), |state| &state.document)
    }

    pub fn text(&self) -> String {
        self.state.borrow().document.text()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().document.is_empty()
    }

    pub fn element_at(&self, offset: usize) -> Option<Element> {
        self.state.borrow().document.element_at(offset).cloned()
    }

    pub fn elements(&self) -> Vec<(usize, Element)> {
        self.state
            .borrow()
            .document
            .elements()
            .map(|(offset, element)| (offset, element.clone()))
            .collect()
    }

    pub fn refs(&self, selector: Selector) -> BlipRefs {
        BlipRefs::new(self.clone(), selector)
    }

    /// Every match of `query`
    pub fn all(&self, query: impl Into<Query>) -> BlipRefs {
        self.refs(Selector::all(query, -1))
    }

    /// At most `max_results` matches of `query`; `<= 0` is unbounded
    pub fn all_limited(&self, query: impl Into<Query>, max_results: i64) -> BlipRefs {
        self.refs(Selector::all(query, max_results))
    }

    pub fn first(&self, query: impl Into<Query>) -> BlipRefs {
        self.refs(Selector::first(query))
    }

    /// The whole document
    pub fn whole(&self) -> BlipRefs {
        self.refs(Selector::everything())
    }

    pub fn at(&self, index: i64) -> BlipRefs {
        self.refs(Selector::at(index))
    }

    pub fn range(&self, start: i64, end: i64) -> BlipRefs {
        self.refs(Selector::range(start, end))
    }

    /// Elements or text slices matched by `query`
    pub fn find(&self, query: impl Into<Query>) -> Vec<HitValue> {
        let selector = Selector::all(query, -1);
        let document = self.document();
        let values = selector
            .hits(&document)
            .map(|(start, end)| HitValue::of(&document, start as usize, end as usize))
            .collect();
        values
    }

    /// Insert `content` at the end of the document
    pub fn append(&self, content: impl Into<Payload<Content>>) -> EditorResult<Option<Operation>> {
        self.whole().insert_after(content)
    }

    /// Insert `content` at the end, labelled with `bundled`
    pub fn append_with(
        &self,
        content: impl Into<Payload<Content>>,
        bundled: &[(&str, &str)],
    ) -> EditorResult<Option<Operation>> {
        self.whole().insert_after_with(content, bundled)
    }

    /// Queue `markup` for the server to interpret and append its plain text
    /// locally
    pub fn append_markup(&self, markup: &str) -> EditorResult<Operation> {
        let text = parse_markup(markup)?;
        let target = self.target();
        let operation = self.queue.document_append_markup(
            &target.wave_id,
            &target.wavelet_id,
            &target.blip_id,
            markup,
        );
        self.state
            .borrow_mut()
            .document
            .append_text(&text);
        Ok(operation)
    }

    /// Create a reply to this blip
    pub fn reply(&self) -> EditorResult<Blip> {
        let target = self.target();
        let data = self
            .queue
            .blip_create_child(&target.wave_id, &target.wavelet_id, &target.blip_id)?;
        self.adopt(data)
    }

    /// Create a blip after this one in the same thread
    pub fn continue_thread(&self) -> EditorResult<Blip> {
        let target = self.target();
        let mut data = self
            .queue
            .blip_continue_thread(&target.wave_id, &target.wavelet_id, &target.blip_id)?;
        data.parent_blip_id = self.parent_blip_id();

        let blip = self.register(data)?;
        if let Some(parent) = self.parent_blip() {
            parent.add_child(&blip.blip_id());
        }
        Ok(blip)
    }

    /// Create an inline reply anchored at `position`, which must be > 0.
    /// The placeholder element is inserted by the server.
    pub fn insert_inline_blip(&self, position: i64) -> EditorResult<Blip> {
        if position <= 0 {
            return Err(EditorError::InvalidPosition(position));
        }
        let target = self.target();
        let data = self.queue.document_inline_blip_insert(
            &target.wave_id,
            &target.wavelet_id,
            &target.blip_id,
            position,
        )?;
        self.adopt(data)
    }

    /// View of this blip whose operations are sent on behalf of
    /// `proxy_for_id`. The view shares this blip's state.
    pub fn proxy_for(&self, proxy_for_id: &str) -> EditorResult<Blip> {
        Ok(Self {
            state: Rc::clone(&self.state),
            blips: self.blips.clone(),
            queue: self.queue.proxy_for(proxy_for_id)?,
        })
    }

    pub fn proxy_for_id(&self) -> Option<&str> {
        self.queue.proxy_for_id()
    }

    pub fn serialize(&self) -> BlipData {
        self.state.borrow().to_data()
    }

    pub(crate) fn target(&self) -> OperationTarget {
        self.state.borrow().target()
    }

    pub(crate) fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    pub(crate) fn state(&self) -> &RefCell<BlipState> {
        &self.state
    }

    /// Register `data` as a new child of this blip
    fn adopt(&self, data: BlipData) -> EditorResult<Blip> {
        let blip = self.register(data)?;
        self.add_child(&blip.blip_id());
        Ok(blip)
    }

    fn register(&self, data: BlipData) -> EditorResult<Blip> {
        let blip = self.blips.load(data)?;
        debug!(blip_id = %blip.blip_id(), "Registered new blip");
        Ok(Self {
            queue: self.queue.clone(),
            ..blip
        })
    }

    fn add_child(&self, child_id: &str) {
        let mut state = self.state.borrow_mut();
        if !state.child_blip_ids.iter().any(|id| id == child_id) {
            state.child_blip_ids.push(child_id.to_string());
        }
    }
}

impl PartialEq for Blip {
    /// Two handles are equal when they share the same blip state
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}
