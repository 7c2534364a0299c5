//! Wire format of a document snapshot
//!
//! ```json
//! {
//!   "content": "\nhello",
//!   "elements": { "3": { "type": "GADGET", "properties": { "url": "..." } } },
//!   "annotations": [ { "name": "style/fontWeight", "value": "bold",
//!                      "range": { "start": 1, "end": 4 } } ]
//! }
//! ```

use crate::element::{ElementType, Properties};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub content: String,

    /// Elements keyed by their offset, written as a decimal string
    #[serde(default)]
    pub elements: BTreeMap<String, ElementSnapshot>,

    #[serde(default)]
    pub annotations: Vec<AnnotationSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    #[serde(rename = "type")]
    pub element_type: ElementType,

    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationSnapshot {
    pub name: String,
    pub value: String,
    pub range: RangeSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RangeSnapshot {
    pub start: usize,
    pub end: usize,
}
