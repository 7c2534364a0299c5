//! Id-keyed table of the blips known to a session
//!
//! Parent and child links between blips are ids resolved through this
//! table, never direct references.

use crate::blip::{Blip, BlipState};
use crate::data::BlipData;
use crate::errors::EditorResult;
use crate::ops::OperationQueue;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

pub(crate) type SharedState = Rc<RefCell<BlipState>>;

/// Shared handle to the blip table; clones see the same table
#[derive(Debug, Clone)]
pub struct Blips {
    table: Rc<RefCell<BTreeMap<String, SharedState>>>,
    queue: OperationQueue,
}

impl Blips {
    pub fn new(queue: OperationQueue) -> Self {
        Self {
            table: Rc::default(),
            queue,
        }
    }

    /// Register a blip built from `data`, replacing any blip with the same id
    pub fn load(&self, data: BlipData) -> EditorResult<Blip> {
        let state = Rc::new(RefCell::new(BlipState::from_data(data)?));
        let id = state.borrow().blip_id.clone();
        self.table.borrow_mut().insert(id, Rc::clone(&state));
        Ok(self.handle(state))
    }

    pub fn get(&self, blip_id: &str) -> Option<Blip> {
        let state = self.table.borrow().get(blip_id).cloned()?;
        Some(self.handle(state))
    }

    pub fn contains(&self, blip_id: &str) -> bool {
        self.table.borrow().contains_key(blip_id)
    }

    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.table.borrow().keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Blip> {
        let states: Vec<SharedState> = self.table.borrow().values().cloned().collect();
        states.into_iter().map(|state| self.handle(state)).collect()
    }

    /// Drop `blip_id` from the table and from its parent's child list
    pub fn remove(&self, blip_id: &str) -> Option<Blip> {
        let state = self.table.borrow_mut().remove(blip_id)?;
        let parent_id = state.borrow().parent_blip_id.clone();
        if let Some(parent) = parent_id.and_then(|id| self.table.borrow().get(&id).cloned()) {
            parent
                .borrow_mut()
                .child_blip_ids
                .retain(|child| child != blip_id);
        }
        Some(self.handle(state))
    }

    pub fn serialize(&self) -> BTreeMap<String, BlipData> {
        self.table
            .borrow()
            .iter()
            .map(|(id, state)| (id.clone(), state.borrow().to_data()))
            .collect()
    }

    fn handle(&self, state: SharedState) -> Blip {
        Blip::from_parts(state, self.clone(), self.queue.clone())
    }
}
