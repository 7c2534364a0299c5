//! # Wavekit Document
//!
//! Offset-indexed rich-text model for a single blip: a character buffer, a
//! sparse table of embedded elements and a store of named range labels.
//!
//! Every mutation goes through [`Document`], which keeps element keys and
//! annotation endpoints consistent with the text.

mod annotations;
mod document;
mod element;
mod error;
mod snapshot;

pub use annotations::{names, Annotation, AnnotationStore};
pub use document::{Content, Document};
pub use element::{line, Element, ElementType, Properties, ELEMENT_PLACEHOLDER};
pub use error::{DocumentError, DocumentResult};
pub use snapshot::{AnnotationSnapshot, DocumentSnapshot, ElementSnapshot, RangeSnapshot};
