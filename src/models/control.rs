use serde::{Deserialize, Serialize};

/// An atomic, auditable requirement extracted from a compliance standard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl Control {
    /// Domain with surrounding whitespace removed; blank domains count as absent.
    pub fn domain_key(&self) -> Option<&str> {
        self.domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Fetched evidence document, tagged with its caller-assigned logical id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedDocument {
    pub doc_id: String,
    pub document_text: String,
}
