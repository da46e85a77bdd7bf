//! Data the host page injects at startup.
//!
//! The CMS prints a small JSON object (`ubrData`) into the editor page. It is
//! parsed once and turned into explicit configuration; nothing reads it from
//! ambient state afterwards.

use serde::{Deserialize, Serialize};

use crate::ids::PageId;

/// The `{currentPageId, nonce}` object the host page provides.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostData {
    #[serde(default, deserialize_with = "lenient_page_id")]
    pub current_page_id: Option<PageId>,
    #[serde(default)]
    pub nonce: Option<String>,
}

/// A page id that is not a non-negative integer (or numeric string) reads as
/// absent, the same as a missing field.
fn lenient_page_id<'de, D>(deserializer: D) -> Result<Option<PageId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Page(PageId),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Page(page)) => Some(page),
        Some(Raw::Other(_)) | None => None,
    })
}

impl HostData {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The page id, or [`PageId::UNSET`] when absent.
    pub fn page_id(&self) -> PageId {
        self.current_page_id.unwrap_or(PageId::UNSET)
    }

    /// The anti-forgery token; absence degrades to an empty token.
    pub fn token(&self) -> String {
        self.nonce.clone().unwrap_or_default()
    }
}
