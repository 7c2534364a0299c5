//! Wire form of a blip: identity, thread links and the document snapshot

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use wavekit_document::DocumentSnapshot;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlipData {
    #[serde(default)]
    pub blip_id: String,

    #[serde(default)]
    pub wave_id: String,

    #[serde(default)]
    pub wavelet_id: String,

    /// `None` for the root blip of a wavelet
    #[serde(default)]
    pub parent_blip_id: Option<String>,

    #[serde(default)]
    pub child_blip_ids: Vec<String>,

    #[serde(default)]
    pub contributors: BTreeSet<String>,

    #[serde(default)]
    pub creator: Option<String>,

    #[serde(default)]
    pub last_modified_time: i64,

    #[serde(default)]
    pub version: i64,

    #[serde(flatten)]
    pub document: DocumentSnapshot,
}

impl BlipData {
    /// Data of a blip that only exists locally until the server assigns an id
    pub fn pending(
        blip_id: String,
        wave_id: &str,
        wavelet_id: &str,
        content: &str,
        parent_blip_id: Option<&str>,
    ) -> Self {
        Self {
            blip_id,
            wave_id: wave_id.to_string(),
            wavelet_id: wavelet_id.to_string(),
            parent_blip_id: parent_blip_id.map(str::to_string),
            document: DocumentSnapshot {
                content: content.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
