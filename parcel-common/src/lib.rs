//! Common types shared between parcel-core and parcel-cli

use serde::{Deserialize, Serialize};

/// Maximum description length when printing in short form
pub const SHORT_DESCRIPTION_LEN: usize = 200;

/// A dataset published by the catalog service
///
/// Identity is the numeric `id`; `name` is not guaranteed to be unique.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dataset {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
}

impl Dataset {
    /// Returns true if any keyword occurs in the name or description (case-insensitive)
    pub fn contains_keywords<S: AsRef<str>>(&self, keywords: &[S]) -> bool {
        let name = self.name.to_lowercase();
        let description = self.description.to_lowercase();

        keywords.iter().any(|keyword| {
            let keyword = keyword.as_ref().to_lowercase();
            !keyword.is_empty() && (name.contains(&keyword) || description.contains(&keyword))
        })
    }

    /// Description cut down to at most `max_len` characters, with an ellipsis when cut
    pub fn short_description(&self, max_len: usize) -> String {
        if self.description.chars().count() <= max_len {
            return self.description.clone();
        }

        let keep = max_len.saturating_sub(3);
        let mut short: String = self.description.chars().take(keep).collect();
        short.push_str("...");
        short
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.id, self.name)
    }
}
