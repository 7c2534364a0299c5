//! # Operation Log
//!
//! Ordered buffer of remote commands produced while editing. Each entry is a
//! `{method, id, params}` record; the transport drains the queue and ships
//! it as one batch preceded by a `robot.notify` entry.
//!
//! A queue handle is cheap to clone. Clones and proxy views share the
//! pending list and the id counters, so operation ids stay unique across
//! every view of one session.

use crate::config::SessionOptions;
use crate::data::BlipData;
use crate::errors::{EditorError, EditorResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Method names of the fixed action vocabulary
pub mod methods {
    pub const WAVELET_APPEND_BLIP: &str = "wavelet.appendBlip";
    pub const WAVELET_SET_TITLE: &str = "wavelet.setTitle";
    pub const WAVELET_ADD_PARTICIPANT: &str = "wavelet.participant.add";
    pub const WAVELET_DATADOC_SET: &str = "wavelet.datadoc.set";
    pub const WAVELET_MODIFY_TAG: &str = "wavelet.modifyTag";
    pub const BLIP_CONTINUE_THREAD: &str = "blip.continueThread";
    pub const BLIP_CREATE_CHILD: &str = "blip.createChild";
    pub const BLIP_DELETE: &str = "blip.delete";
    pub const DOCUMENT_APPEND_MARKUP: &str = "document.appendMarkup";
    pub const DOCUMENT_INLINE_BLIP_INSERT: &str = "document.inlineBlip.insert";
    pub const DOCUMENT_MODIFY: &str = "document.modify";
    pub const ROBOT_NOTIFY: &str = "robot.notify";
}

/// Id of the notify entry that leads every serialized batch
pub const NOTIFY_OP_ID: &str = "0";

/// One queued remote command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub method: String,
    pub id: String,
    pub params: Map<String, Value>,
}

impl Operation {
    pub fn new(method: &str, id: &str, params: Map<String, Value>) -> Self {
        Self {
            method: method.to_string(),
            id: id.to_string(),
            params,
        }
    }

    pub fn set_param(&mut self, param: &str, value: impl Into<Value>) -> &mut Self {
        self.params.insert(param.to_string(), value.into());
        self
    }

    /// Set `param` unless `value` is null or an empty string
    pub fn set_optional(&mut self, param: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        match &value {
            Value::Null => self,
            Value::String(s) if s.is_empty() => self,
            _ => self.set_param(param, value),
        }
    }

    pub fn param(&self, param: &str) -> Option<&Value> {
        self.params.get(param)
    }

    /// JSON form with `method_prefix` prepended to the method name
    pub fn serialize(&self, method_prefix: &str) -> Value {
        json!({
            "method": format!("{}{}", method_prefix, self.method),
            "id": self.id,
            "params": self.params,
        })
    }
}

#[derive(Debug)]
struct QueueState {
    options: SessionOptions,
    pending: Vec<Operation>,
    next_operation_id: u64,
    next_temp_id: u64,
}

/// Shared handle to the pending operations of one session
#[derive(Debug, Clone)]
pub struct OperationQueue {
    state: Rc<RefCell<QueueState>>,
    proxy_for_id: Option<String>,
}

impl Default for OperationQueue {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl OperationQueue {
    pub fn new(options: SessionOptions) -> Self {
        let proxy_for_id = options.proxy_for_id.clone();
        Self {
            state: Rc::new(RefCell::new(QueueState {
                options,
                pending: Vec::new(),
                next_operation_id: 1,
                next_temp_id: 1,
            })),
            proxy_for_id,
        }
    }

    /// View of this queue whose operations are sent on behalf of `proxy_for_id`
    pub fn proxy_for(&self, proxy_for_id: &str) -> EditorResult<Self> {
        check_proxy_id(proxy_for_id)?;
        Ok(Self {
            state: Rc::clone(&self.state),
            proxy_for_id: Some(proxy_for_id.to_string()),
        })
    }

    pub fn proxy_for_id(&self) -> Option<&str> {
        self.proxy_for_id.as_deref()
    }

    pub fn set_capabilities_hash(&self, hash: &str) {
        self.state.borrow_mut().options.capabilities_hash = Some(hash.to_string());
    }

    pub fn len(&self) -> usize {
        self.state.borrow().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().pending.is_empty()
    }

    /// Copy of the pending operations in queue order
    pub fn operations(&self) -> Vec<Operation> {
        self.state.borrow().pending.clone()
    }

    pub fn last(&self) -> Option<Operation> {
        self.state.borrow().pending.last().cloned()
    }

    pub fn clear(&self) {
        self.state.borrow_mut().pending.clear();
    }

    /// Append the pending operations of `other` to this queue
    pub fn copy_operations(&self, other: &OperationQueue) {
        let copied = other.operations();
        self.state.borrow_mut().pending.extend(copied);
    }

    /// Batch ready for the transport: the notify entry, then every pending
    /// operation, methods prefixed with the configured namespace.
    pub fn serialize(&self) -> Vec<Value> {
        let state = self.state.borrow();
        let prefix = state.options.normalized_prefix();

        let mut notify = Operation::new(methods::ROBOT_NOTIFY, NOTIFY_OP_ID, Map::new());
        notify
            .set_param("capabilitiesHash", state.options.capabilities_hash.clone())
            .set_param("protocolVersion", state.options.protocol_version.clone());

        std::iter::once(&notify)
            .chain(state.pending.iter())
            .map(|operation| operation.serialize(&prefix))
            .collect()
    }

    pub fn to_json(&self) -> EditorResult<String> {
        Ok(serde_json::to_string(&self.serialize())?)
    }

    /// Mint a temporary blip id, unique within this session
    pub fn next_temp_blip_id(&self, wavelet_id: &str) -> String {
        let mut state = self.state.borrow_mut();
        let counter = state.next_temp_id;
        state.next_temp_id += 1;
        format!("{}_{}_{:#x}", state.options.temp_id_prefix, wavelet_id, counter)
    }

    /// Queue `method` with `params` plus the wave/wavelet ids and the proxy id
    pub fn new_operation(
        &self,
        method: &str,
        wave_id: Option<&str>,
        wavelet_id: Option<&str>,
        mut params: Map<String, Value>,
    ) -> Operation {
        if let Some(wave_id) = wave_id {
            params.insert("waveId".to_string(), wave_id.into());
        }
        if let Some(wavelet_id) = wavelet_id {
            params.insert("waveletId".to_string(), wavelet_id.into());
        }
        if let Some(proxy) = &self.proxy_for_id {
            params.insert("proxyingFor".to_string(), proxy.as_str().into());
        }

        let mut state = self.state.borrow_mut();
        let operation = Operation::new(method, &format!("op{}", state.next_operation_id), params);
        state.next_operation_id += 1;
        state.pending.push(operation.clone());

        debug!(method, id = %operation.id, "Queued operation");
        operation
    }

    fn new_blip_data(
        &self,
        wave_id: &str,
        wavelet_id: &str,
        content: &str,
        parent_blip_id: Option<&str>,
    ) -> BlipData {
        let blip_id = self.next_temp_blip_id(wavelet_id);
        BlipData::pending(blip_id, wave_id, wavelet_id, content, parent_blip_id)
    }

    /// Queue a new blip at the end of the wavelet
    pub fn wavelet_append_blip(
        &self,
        wave_id: &str,
        wavelet_id: &str,
        initial_content: &str,
    ) -> EditorResult<BlipData> {
        let data = self.new_blip_data(wave_id, wavelet_id, initial_content, None);
        self.new_operation(
            methods::WAVELET_APPEND_BLIP,
            Some(wave_id),
            Some(wavelet_id),
            params([("blipData", serde_json::to_value(&data)?)]),
        );
        Ok(data)
    }

    pub fn wavelet_add_participant(&self, wave_id: &str, wavelet_id: &str, participant_id: &str) -> Operation {
        self.new_operation(
            methods::WAVELET_ADD_PARTICIPANT,
            Some(wave_id),
            Some(wavelet_id),
            params([("participantId", participant_id.into())]),
        )
    }

    pub fn wavelet_datadoc_set(&self, wave_id: &str, wavelet_id: &str, name: &str, data: &str) -> Operation {
        self.new_operation(
            methods::WAVELET_DATADOC_SET,
            Some(wave_id),
            Some(wavelet_id),
            params([("datadocName", name.into()), ("datadocValue", data.into())]),
        )
    }

    pub fn wavelet_set_title(&self, wave_id: &str, wavelet_id: &str, title: &str) -> Operation {
        self.new_operation(
            methods::WAVELET_SET_TITLE,
            Some(wave_id),
            Some(wavelet_id),
            params([("waveletTitle", title.into())]),
        )
    }

    /// Add or remove a tag; `modify_how` is left to the server default when `None`
    pub fn wavelet_modify_tag(
        &self,
        wave_id: &str,
        wavelet_id: &str,
        tag: &str,
        modify_how: Option<&str>,
    ) -> Operation {
        let mut operation_params = params([("name", tag.into())]);
        if let Some(how) = modify_how.filter(|how| !how.is_empty()) {
            operation_params.insert("modify_how".to_string(), how.into());
        }
        self.new_operation(
            methods::WAVELET_MODIFY_TAG,
            Some(wave_id),
            Some(wavelet_id),
            operation_params,
        )
    }

    /// Queue a reply to `blip_id`; returns the data of the new child
    pub fn blip_create_child(&self, wave_id: &str, wavelet_id: &str, blip_id: &str) -> EditorResult<BlipData> {
        let data = self.new_blip_data(wave_id, wavelet_id, "", Some(blip_id));
        self.new_operation(
            methods::BLIP_CREATE_CHILD,
            Some(wave_id),
            Some(wavelet_id),
            params([
                ("blipId", blip_id.into()),
                ("blipData", serde_json::to_value(&data)?),
            ]),
        );
        Ok(data)
    }

    /// Queue a new blip in the thread of `blip_id`
    pub fn blip_continue_thread(&self, wave_id: &str, wavelet_id: &str, blip_id: &str) -> EditorResult<BlipData> {
        let data = self.new_blip_data(wave_id, wavelet_id, "", None);
        self.new_operation(
            methods::BLIP_CONTINUE_THREAD,
            Some(wave_id),
            Some(wavelet_id),
            params([
                ("blipId", blip_id.into()),
                ("blipData", serde_json::to_value(&data)?),
            ]),
        );
        Ok(data)
    }

    pub fn blip_delete(&self, wave_id: &str, wavelet_id: &str, blip_id: &str) -> Operation {
        self.new_operation(
            methods::BLIP_DELETE,
            Some(wave_id),
            Some(wavelet_id),
            params([("blipId", blip_id.into())]),
        )
    }

    pub fn document_append_markup(
        &self,
        wave_id: &str,
        wavelet_id: &str,
        blip_id: &str,
        content: &str,
    ) -> Operation {
        self.new_operation(
            methods::DOCUMENT_APPEND_MARKUP,
            Some(wave_id),
            Some(wavelet_id),
            params([("blipId", blip_id.into()), ("content", content.into())]),
        )
    }

    /// Queue a document modification; `extra` carries the query and the
    /// `modifyAction` record.
    pub fn document_modify(
        &self,
        wave_id: &str,
        wavelet_id: &str,
        blip_id: &str,
        extra: Map<String, Value>,
    ) -> Operation {
        let mut operation_params = params([("blipId", blip_id.into())]);
        operation_params.extend(extra);
        self.new_operation(
            methods::DOCUMENT_MODIFY,
            Some(wave_id),
            Some(wavelet_id),
            operation_params,
        )
    }

    /// Queue an inline blip at `position` of `blip_id`
    pub fn document_inline_blip_insert(
        &self,
        wave_id: &str,
        wavelet_id: &str,
        blip_id: &str,
        position: i64,
    ) -> EditorResult<BlipData> {
        let data = self.new_blip_data(wave_id, wavelet_id, "", Some(blip_id));
        self.new_operation(
            methods::DOCUMENT_INLINE_BLIP_INSERT,
            Some(wave_id),
            Some(wavelet_id),
            params([
                ("blipId", blip_id.into()),
                ("index", position.into()),
                ("blipData", serde_json::to_value(&data)?),
            ]),
        );
        Ok(data)
    }
}

/// A proxy id ends up in a participant address, so it must be non-empty and
/// free of whitespace and `@`.
pub fn check_proxy_id(proxy_for_id: &str) -> EditorResult<()> {
    let invalid = proxy_for_id.is_empty()
        || proxy_for_id
            .chars()
            .any(|c| c.is_whitespace() || c == '@');
    if invalid {
        return Err(EditorError::InvalidProxyId(proxy_for_id.to_string()));
    }
    Ok(())
}

fn params<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
