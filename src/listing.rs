use serde::Deserialize;

use crate::tag_filter::ALL_TAGS;

#[derive(Debug, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub title: Option<String>,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    pub title: String,
    pub url: String,
    /// `YYYY-MM-DD`, optionally followed by a time.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Entry {
    pub fn year(&self) -> Option<u32> {
        let date = self.date.as_deref()?.trim();
        let year = date.get(..4)?;
        if !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        year.parse().ok()
    }

    /// Trimmed, non-empty tags in their original order. Tags containing a
    /// comma cannot be expressed in `data-tags` and are dropped, as is the
    /// reserved `all` value.
    pub fn clean_tags(&self) -> Vec<&str> {
        self.tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty() && !t.contains(',') && *t != ALL_TAGS)
            .collect()
    }
}
