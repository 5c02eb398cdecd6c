use serde::{Deserialize, Serialize};

/// Evidence supporting a generated answer.
///
/// Each evidence is meant to be a direct quote from the context the answer was
/// generated from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Quotes lifted from the context.
    #[serde(default)]
    pub evidences: Vec<String>,
}

impl Citation {
    /// Creates a citation from a list of quotes.
    pub fn new(evidences: Vec<String>) -> Self {
        Self { evidences }
    }

    /// Returns true if the model produced no evidence.
    pub fn is_empty(&self) -> bool {
        self.evidences.is_empty()
    }
}
