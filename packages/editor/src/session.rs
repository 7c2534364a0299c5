//! # Edit Session
//!
//! One batch of edits made against the last known server snapshot.
//!
//! A session owns the operation queue and the blip table. Every blip handle
//! created by the session, and every reply or proxy view derived from one,
//! queues into the same log and draws ids from the same counters.

use crate::blip::Blip;
use crate::blips::Blips;
use crate::config::SessionOptions;
use crate::data::BlipData;
use crate::errors::{EditorError, EditorResult};
use crate::ops::{check_proxy_id, Operation, OperationQueue};
use serde_json::Value;
use tracing::info;

pub struct EditSession {
    options: SessionOptions,
    queue: OperationQueue,
    blips: Blips,
}

impl EditSession {
    /// Create a session. A configured proxy id must be valid.
    pub fn new(options: SessionOptions) -> EditorResult<Self> {
        if let Some(proxy) = &options.proxy_for_id {
            check_proxy_id(proxy)?;
        }
        let queue = OperationQueue::new(options.clone());
        Ok(Self {
            options,
            blips: Blips::new(queue.clone()),
            queue,
        })
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    pub fn blips(&self) -> &Blips {
        &self.blips
    }

    /// Register a blip received from the server
    pub fn load_blip(&self, data: BlipData) -> EditorResult<Blip> {
        self.blips.load(data)
    }

    /// Register every blip of a wavelet snapshot
    pub fn load_blips(&self, blips: impl IntoIterator<Item = BlipData>) -> EditorResult<Vec<Blip>> {
        let loaded = blips
            .into_iter()
            .map(|data| self.blips.load(data))
            .collect::<EditorResult<Vec<_>>>()?;
        info!(count = loaded.len(), "Loaded blips");
        Ok(loaded)
    }

    /// Load blips from their JSON form, keyed by id
    pub fn load_json(&self, json: &str) -> EditorResult<Vec<Blip>> {
        let blips: std::collections::BTreeMap<String, BlipData> = serde_json::from_str(json)?;
        self.load_blips(blips.into_values())
    }

    pub fn blip(&self, blip_id: &str) -> EditorResult<Blip> {
        self.blips
            .get(blip_id)
            .ok_or_else(|| EditorError::UnknownBlip(blip_id.to_string()))
    }

    /// Append a new blip to a wavelet
    pub fn append_blip(&self, wave_id: &str, wavelet_id: &str, initial_content: &str) -> EditorResult<Blip> {
        let data = self
            .queue
            .wavelet_append_blip(wave_id, wavelet_id, initial_content)?;
        self.blips.load(data)
    }

    /// Queue the deletion of a blip and drop it from the table
    pub fn delete_blip(&self, blip_id: &str) -> EditorResult<Operation> {
        let blip = self.blip(blip_id)?;
        let operation = self
            .queue
            .blip_delete(&blip.wave_id(), &blip.wavelet_id(), blip_id);
        self.blips.remove(blip_id);
        Ok(operation)
    }

    /// Number of operations waiting for the transport
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Serialized batch for the transport, leaving the queue intact
    pub fn serialize_operations(&self) -> Vec<Value> {
        self.queue.serialize()
    }

    /// Serialized batch for the transport; the queue is emptied
    pub fn take_operations(&self) -> Vec<Value> {
        let batch = self.queue.serialize();
        self.queue.clear();
        batch
    }
}
