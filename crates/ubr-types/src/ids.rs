//! Typed identifiers for pages, page sections, and catalog blocks.
//!
//! The host CMS hands out numeric post ids, but the client treats section and
//! block ids as opaque tokens. They keep whatever text the server sent and only
//! turn back into numbers when written to the wire (`block_order`, `block_id`),
//! so a non-numeric id survives a round trip untouched.
//!
//! `PageId` is different: pages are addressed in URL paths and the host marks
//! "no page" with `0`, so it stays a plain integer with an explicit unset state.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A page (post) identifier. `0` means "no page" and leaves the store inert.
#[derive(Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PageId(u64);

impl PageId {
    pub const UNSET: PageId = PageId(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// A usable page id is strictly positive.
    pub fn is_set(&self) -> bool {
        self.0 > 0
    }

    /// `Some(self)` when set, for `?`-style guards.
    pub fn checked(self) -> Option<Self> {
        self.is_set().then_some(self)
    }
}

impl From<u64> for PageId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", self.0)
    }
}

impl<'de> Deserialize<'de> for PageId {
    /// Hosts print the page id either as a number or as a numeric string.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawId::deserialize(deserializer)? {
            RawId::Num(n) => Ok(Self(n)),
            RawId::Str(s) if s.trim().is_empty() => Ok(Self::UNSET),
            RawId::Str(s) => s
                .trim()
                .parse()
                .map(Self)
                .map_err(|_| serde::de::Error::custom(format!("invalid page id '{s}'"))),
        }
    }
}

/// Wire form of an opaque id: the server may send either a number or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Num(u64),
    Str(String),
}

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_opaque_id {
    ($T:ident, $name:literal) => {
        impl $T {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The numeric form, when the token is a plain unsigned integer.
            pub fn as_number(&self) -> Option<u64> {
                self.0.parse().ok()
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<u64> for $T {
            fn from(n: u64) -> Self {
                Self(n.to_string())
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.0)
            }
        }

        impl Serialize for $T {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match self.as_number() {
                    Some(n) => serializer.serialize_u64(n),
                    None => serializer.serialize_str(&self.0),
                }
            }
        }

        impl<'de> Deserialize<'de> for $T {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                Ok(match RawId::deserialize(deserializer)? {
                    RawId::Num(n) => Self(n.to_string()),
                    RawId::Str(s) => Self(s),
                })
            }
        }
    };
}

/// Identifier of a section (block instance) attached to a page.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct SectionId(String);

/// Identifier of a catalog block definition.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct BlockId(String);

impl_opaque_id!(SectionId, "SectionId");
impl_opaque_id!(BlockId, "BlockId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_unset() {
        assert!(!PageId::UNSET.is_set());
        assert!(PageId::default().checked().is_none());
        assert_eq!(PageId::new(42).checked(), Some(PageId::new(42)));
    }

    #[test]
    fn test_page_id_from_string() {
        let id: PageId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(id.get(), 42);
        let id: PageId = serde_json::from_str("\"\"").unwrap();
        assert!(!id.is_set());
        assert!(serde_json::from_str::<PageId>("\"home\"").is_err());
    }

    #[test]
    fn test_numeric_id_from_wire_number() {
        let id: SectionId = serde_json::from_str("17").unwrap();
        assert_eq!(id.as_str(), "17");
        assert_eq!(id.as_number(), Some(17));
    }

    #[test]
    fn test_string_id_from_wire_string() {
        let id: BlockId = serde_json::from_str("\"hero-v2\"").unwrap();
        assert_eq!(id.as_str(), "hero-v2");
        assert_eq!(id.as_number(), None);
    }

    #[test]
    fn test_numeric_string_serializes_as_number() {
        let id = SectionId::from("7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
    }

    #[test]
    fn test_opaque_string_serializes_as_string() {
        let id = BlockId::from("hero-v2");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"hero-v2\"");
    }

    #[test]
    fn test_debug_names_the_kind() {
        assert_eq!(format!("{:?}", SectionId::from(9u64)), "SectionId(9)");
        assert_eq!(format!("{:?}", PageId::new(3)), "PageId(3)");
    }
}
