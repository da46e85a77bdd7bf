//! Page sections: block instances attached to a page, in page order.

use serde::{Deserialize, Serialize};

use crate::ids::SectionId;
use crate::wire::PageBlockRecord;

/// One block instance attached to a page.
///
/// `order` is the rank the server reported at fetch time. It seeds the initial
/// sort and is never maintained afterwards: once loaded, the position in the
/// owning sequence is the only ordering that matters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    /// Display slug derived from the title. Never sent to the server.
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub order: i64,
}

impl Section {
    pub fn new(id: impl Into<SectionId>, title: impl Into<String>, order: i64) -> Self {
        let title = title.into();
        Self {
            id: id.into(),
            kind: slugify(&title),
            title,
            description: None,
            image: None,
            order,
        }
    }
}

impl From<PageBlockRecord> for Section {
    fn from(record: PageBlockRecord) -> Self {
        Self {
            id: record.id,
            kind: slugify(&record.name),
            title: record.name,
            description: record.description,
            image: record.image,
            order: record.order.unwrap_or(0),
        }
    }
}

/// Lowercase the title and collapse each whitespace run into one hyphen.
///
/// `"Hero  Banner"` → `"hero-banner"`. Leading/trailing whitespace yields a
/// leading/trailing hyphen, same as the host's own slugging.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut in_space = false;
    for ch in title.chars() {
        if ch.is_whitespace() {
            if !in_space {
                slug.push('-');
                in_space = true;
            }
        } else {
            in_space = false;
            slug.extend(ch.to_lowercase());
        }
    }
    slug
}

/// Convert fetched records into sections sorted ascending by `order`.
///
/// The sort is stable: records with equal rank keep the order the server sent.
pub fn sections_from_records(records: Vec<PageBlockRecord>) -> Vec<Section> {
    let mut sections: Vec<Section> = records.into_iter().map(Section::from).collect();
    sections.sort_by_key(|s| s.order);
    sections
}

/// The id sequence of a section list.
pub fn section_ids(sections: &[Section]) -> Vec<SectionId> {
    sections.iter().map(|s| s.id.clone()).collect()
}
