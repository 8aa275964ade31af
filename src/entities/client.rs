// 🏢 Client Entity - registered companies we prepare filings for
//
// A client has two natural keys: the registered name and the unified
// (registration/tax) number. Both are unique in the record store.

use serde::{Deserialize, Serialize};

// ============================================================================
// CLIENT RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Registered company name (e.g. "A Tech Co")
    pub name: String,

    /// Unified business number / registration id
    pub unified_number: String,

    /// Currently registered address
    pub current_address: String,

    /// Legal representative
    pub legal_rep: String,
}

impl Client {
    pub fn new(
        name: impl Into<String>,
        unified_number: impl Into<String>,
        current_address: impl Into<String>,
        legal_rep: impl Into<String>,
    ) -> Self {
        Client {
            name: name.into(),
            unified_number: unified_number.into(),
            current_address: current_address.into(),
            legal_rep: legal_rep.into(),
        }
    }

    /// Read an attribute through the closed dispatch table
    pub fn attribute(&self, attr: ClientAttribute) -> &str {
        attr.read(self)
    }
}

// ============================================================================
// ATTRIBUTE DISPATCH
// ============================================================================

/// The client attributes a template may reference with `ClientField.<attr>`.
///
/// This is a closed set: anything not listed here is rejected by the
/// resolver with an unknown-field error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientAttribute {
    Name,
    UnifiedNumber,
    CurrentAddress,
    LegalRep,
}

impl ClientAttribute {
    pub const ALL: [ClientAttribute; 4] = [
        ClientAttribute::Name,
        ClientAttribute::UnifiedNumber,
        ClientAttribute::CurrentAddress,
        ClientAttribute::LegalRep,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "name" => Some(ClientAttribute::Name),
            "unified_number" => Some(ClientAttribute::UnifiedNumber),
            "current_address" => Some(ClientAttribute::CurrentAddress),
            "legal_rep" => Some(ClientAttribute::LegalRep),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientAttribute::Name => "name",
            ClientAttribute::UnifiedNumber => "unified_number",
            ClientAttribute::CurrentAddress => "current_address",
            ClientAttribute::LegalRep => "legal_rep",
        }
    }

    pub fn read<'a>(&self, client: &'a Client) -> &'a str {
        match self {
            ClientAttribute::Name => &client.name,
            ClientAttribute::UnifiedNumber => &client.unified_number,
            ClientAttribute::CurrentAddress => &client.current_address,
            ClientAttribute::LegalRep => &client.legal_rep,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
