//! JSON request and response bodies of the Unicorn Builder REST API.
//!
//! Field names match the server exactly. Anything the client derives locally
//! (slugs, sort position) lives on [`Section`](crate::Section), not here.

use serde::{Deserialize, Serialize};

use crate::ids::{BlockId, SectionId};

/// A section as returned by `POST /page-blocks/{pageId}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageBlockRecord {
    pub id: SectionId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_rank")]
    pub order: Option<i64>,
}

/// Accept `order` as a number, a numeric string, or null.
///
/// WordPress meta values frequently arrive stringly typed; anything that does
/// not parse is treated as unranked.
fn lenient_rank<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Rank {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<Rank>::deserialize(deserializer)? {
        Some(Rank::Int(n)) => Some(n),
        Some(Rank::Float(f)) => Some(f as i64),
        Some(Rank::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Body of `POST /blocks/add-to-page/{pageId}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToPageRequest {
    pub block_id: BlockId,
}

/// Response of `POST /blocks/add-to-page/{pageId}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToPageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /page-blocks-reorder/{pageId}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub block_order: Vec<SectionId>,
}

/// Empty JSON object body (`{}`) the page-blocks listing expects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyBody {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reorder_body_sends_numbers() {
        let body = ReorderRequest {
            block_order: vec!["7".into(), "9".into(), "5".into()],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "block_order": [7, 9, 5] })
        );
    }

    #[test]
    fn test_page_block_record_tolerates_missing_fields() {
        let record: PageBlockRecord =
            serde_json::from_str(r#"{"id": 5, "name": "Hero"}"#).unwrap();
        assert_eq!(record.id.as_str(), "5");
        assert_eq!(record.order, None);
        assert_eq!(record.description, None);
    }

    #[test]
    fn test_page_block_record_accepts_string_order() {
        let record: PageBlockRecord =
            serde_json::from_str(r#"{"id": "5", "name": "Hero", "order": "3"}"#).unwrap();
        assert_eq!(record.order, Some(3));

        let record: PageBlockRecord =
            serde_json::from_str(r#"{"id": 5, "name": "Hero", "order": null}"#).unwrap();
        assert_eq!(record.order, None);
    }

    #[test]
    fn test_empty_body_is_empty_object() {
        assert_eq!(serde_json::to_string(&EmptyBody {}).unwrap(), "{}");
    }

    #[test]
    fn test_add_response_without_message() {
        let resp: AddToPageResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.message, None);
    }
}
