//! # Wavekit Editor
//!
//! Selection-driven editing of blips, recorded as a log of remote operations.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ document: text + elements + annotations     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: selections, batched mutations       │
//! │  - Selector: lazy hits over current state   │
//! │  - MutationExecutor: snapshot, then apply   │
//! │  - OperationQueue: one op per batch         │
//! │  - Blip / Blips / EditSession handles       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ transport: serialized operation batch       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wavekit_editor::{EditSession, SessionOptions};
//!
//! let session = EditSession::new(SessionOptions::default())?;
//! let blip = session.load_blip(data)?;
//!
//! // One document.modify operation for all three matches
//! blip.all("aaa").replace("thing")?;
//!
//! let batch = session.take_operations();
//! ```

mod blip;
mod blips;
mod config;
mod data;
mod errors;
mod executor;
mod markup;
mod ops;
mod refs;
mod selector;
mod session;

pub use blip::Blip;
pub use blips::Blips;
pub use config::{SessionOptions, PROTOCOL_VERSION};
pub use data::BlipData;
pub use errors::{EditorError, EditorResult};
pub use executor::{
    resolved_hits, Action, BundledAnnotations, ModifyHow, MutationExecutor, OperationTarget, Payload,
};
pub use markup::parse_markup;
pub use ops::{check_proxy_id, methods, Operation, OperationQueue, NOTIFY_OP_ID};
pub use refs::BlipRefs;
pub use selector::{Hit, HitValue, Hits, Query, Selector};
pub use session::EditSession;

// Re-export the document model for convenience
pub use wavekit_document as document;
