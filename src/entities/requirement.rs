// 📋 Business Requirement - which documents a business type needs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRequirement {
    /// Business type name, e.g. "Address Change"
    pub business_name: String,

    /// Required documents, in the order they should be prepared
    #[serde(default)]
    pub required_docs: Vec<String>,

    #[serde(default)]
    pub notes: String,
}

impl BusinessRequirement {
    pub fn new(business_name: impl Into<String>) -> Self {
        BusinessRequirement {
            business_name: business_name.into(),
            required_docs: Vec::new(),
            notes: String::new(),
        }
    }

    /// Builder: append a required document
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.required_docs.push(doc.into());
        self
    }

    /// Builder: set notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}
