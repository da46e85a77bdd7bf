//! Catalog block definitions.

use serde::{Deserialize, Serialize};

use crate::ids::BlockId;

/// A reusable block template available for insertion into any page.
///
/// Read-only on the client. The catalog is fetched fresh every time the
/// add-block flow opens, so these are never cached across openings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub id: BlockId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl BlockDefinition {
    pub fn new(id: impl Into<BlockId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            image: None,
        }
    }

    /// Alt text the picker shows for the preview image.
    pub fn image_alt(&self) -> String {
        format!("{} Block", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entry_from_json() {
        let json = r#"[
            {"id": 3, "name": "Hero", "description": "Big banner", "image": "/hero.png"},
            {"id": "faq", "name": "FAQ"}
        ]"#;
        let blocks: Vec<BlockDefinition> = serde_json::from_str(json).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].id.as_str(), "3");
        assert_eq!(blocks[0].description.as_deref(), Some("Big banner"));
        assert_eq!(blocks[1].id.as_str(), "faq");
        assert_eq!(blocks[1].image, None);
        assert_eq!(blocks[1].image_alt(), "FAQ Block");
    }
}
