// 🔖 Placeholder Mappings & Catalogs
//
// A mapping says where one placeholder token of one template gets its
// value. All mappings of a template form that template's catalog.
//
// Source descriptors:
//   ClientField.<attr>  - read <attr> from the client record
//   UserInput.<key>     - take <key> from the runtime input
//   ClientIndex.<attr>  - legacy spelling of ClientField, still accepted

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

const CLIENT_FIELD_PREFIX: &str = "ClientField";
const LEGACY_CLIENT_PREFIX: &str = "ClientIndex";
const USER_INPUT_PREFIX: &str = "UserInput";

// ============================================================================
// SOURCE DESCRIPTOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// Attribute name on the client record (validated at resolve time)
    ClientField(String),

    /// Key into the runtime input, as written in the descriptor
    UserInput(String),
}

impl SourceDescriptor {
    pub fn parse(placeholder: &str, raw: &str) -> Result<Self, CatalogError> {
        let invalid = || CatalogError::InvalidSource {
            placeholder: placeholder.to_string(),
            descriptor: raw.to_string(),
        };

        let (prefix, rest) = raw.trim().split_once('.').ok_or_else(invalid)?;
        let rest = rest.trim();
        if rest.is_empty() {
            return Err(invalid());
        }

        match prefix.trim() {
            CLIENT_FIELD_PREFIX | LEGACY_CLIENT_PREFIX => {
                Ok(SourceDescriptor::ClientField(rest.to_string()))
            }
            USER_INPUT_PREFIX => Ok(SourceDescriptor::UserInput(rest.to_string())),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::ClientField(attr) => write!(f, "{}.{}", CLIENT_FIELD_PREFIX, attr),
            SourceDescriptor::UserInput(key) => write!(f, "{}.{}", USER_INPUT_PREFIX, key),
        }
    }
}

// ============================================================================
// PLACEHOLDER MAPPING (stored row)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderMapping {
    /// Template file the placeholder lives in
    pub template_id: String,

    /// Literal token, e.g. "<<COMPANY_NAME>>"
    pub placeholder: String,

    /// Raw source descriptor string
    pub source: String,
}

impl PlaceholderMapping {
    pub fn new(
        template_id: impl Into<String>,
        placeholder: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        PlaceholderMapping {
            template_id: template_id.into(),
            placeholder: placeholder.into(),
            source: source.into(),
        }
    }

    pub fn parse_source(&self) -> Result<SourceDescriptor, CatalogError> {
        SourceDescriptor::parse(&self.placeholder, &self.source)
    }
}

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    placeholder: String,
    source: SourceDescriptor,
}

impl CatalogEntry {
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }
}

/// Placeholder catalog of one template, in declaration order.
///
/// Building a catalog rejects duplicate tokens, empty tokens, unparseable
/// source descriptors and mappings that belong to another template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderCatalog {
    template_id: String,
    entries: Vec<CatalogEntry>,
}

impl PlaceholderCatalog {
    pub fn build(
        template_id: impl Into<String>,
        mappings: impl IntoIterator<Item = PlaceholderMapping>,
    ) -> Result<Self, CatalogError> {
        let template_id = template_id.into();
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for mapping in mappings {
            if mapping.template_id != template_id {
                return Err(CatalogError::ForeignMapping {
                    expected: template_id,
                    found: mapping.template_id,
                    placeholder: mapping.placeholder,
                });
            }
            if mapping.placeholder.trim().is_empty() {
                return Err(CatalogError::EmptyPlaceholder { template_id });
            }
            if !seen.insert(mapping.placeholder.clone()) {
                return Err(CatalogError::DuplicatePlaceholder {
                    template_id,
                    placeholder: mapping.placeholder,
                });
            }

            let source = mapping.parse_source()?;
            entries.push(CatalogEntry {
                placeholder: mapping.placeholder,
                source,
            });
        }

        let catalog = PlaceholderCatalog { template_id, entries };
        for (outer, inner) in catalog.overlapping_tokens() {
            warn!(
                template = %catalog.template_id,
                outer,
                inner,
                "placeholder token contains another token; substitution follows declaration order"
            );
        }

        Ok(catalog)
    }

    pub fn empty(template_id: impl Into<String>) -> Self {
        PlaceholderCatalog {
            template_id: template_id.into(),
            entries: Vec::new(),
        }
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.placeholder.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pairs (outer, inner) where `inner` is a substring of `outer`
    pub fn overlapping_tokens(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        for outer in &self.entries {
            for inner in &self.entries {
                if outer.placeholder != inner.placeholder
                    && outer.placeholder.contains(&inner.placeholder)
                {
                    pairs.push((outer.placeholder.as_str(), inner.placeholder.as_str()));
                }
            }
        }
        pairs
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "change_registration.txt";

    fn mapping(token: &str, source: &str) -> PlaceholderMapping {
        PlaceholderMapping::new(TEMPLATE, token, source)
    }

    #[test]
    fn test_parse_source_descriptors() {
        assert_eq!(
            SourceDescriptor::parse("<<A>>", "ClientField.name").unwrap(),
            SourceDescriptor::ClientField("name".to_string())
        );
        assert_eq!(
            SourceDescriptor::parse("<<A>>", "ClientIndex.legal_rep").unwrap(),
            SourceDescriptor::ClientField("legal_rep".to_string())
        );
        assert_eq!(
            SourceDescriptor::parse("<<A>>", "UserInput.new_address").unwrap(),
            SourceDescriptor::UserInput("new_address".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_malformed_descriptors() {
        for raw in ["", "name", "ClientField.", "Database.name", "UserInput"] {
            let err = SourceDescriptor::parse("<<A>>", raw).unwrap_err();
            assert!(
                matches!(err, CatalogError::InvalidSource { .. }),
                "expected InvalidSource for {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_display_uses_canonical_prefix() {
        let source = SourceDescriptor::parse("<<A>>", "ClientIndex.name").unwrap();
        assert_eq!(source.to_string(), "ClientField.name");
    }

    #[test]
    fn test_catalog_preserves_declaration_order() {
        let catalog = PlaceholderCatalog::build(
            TEMPLATE,
            vec![
                mapping("<<COMPANY_NAME>>", "ClientField.name"),
                mapping("<<NEW_ADDRESS>>", "UserInput.new_address"),
                mapping("<<LEGAL_REP>>", "ClientField.legal_rep"),
            ],
        )
        .unwrap();

        let tokens: Vec<&str> = catalog.tokens().collect();
        assert_eq!(tokens, vec!["<<COMPANY_NAME>>", "<<NEW_ADDRESS>>", "<<LEGAL_REP>>"]);
        assert_eq!(catalog.template_id(), TEMPLATE);
    }

    #[test]
    fn test_duplicate_tokens_rejected_at_build() {
        let err = PlaceholderCatalog::build(
            TEMPLATE,
            vec![
                mapping("<<COMPANY_NAME>>", "ClientField.name"),
                mapping("<<COMPANY_NAME>>", "UserInput.company"),
            ],
        )
        .unwrap_err();

        assert_eq!(
            err,
            CatalogError::DuplicatePlaceholder {
                template_id: TEMPLATE.to_string(),
                placeholder: "<<COMPANY_NAME>>".to_string(),
            }
        );
    }

    #[test]
    fn test_foreign_and_empty_mappings_rejected() {
        let foreign = PlaceholderCatalog::build(
            TEMPLATE,
            vec![PlaceholderMapping::new("other.txt", "<<X>>", "ClientField.name")],
        )
        .unwrap_err();
        assert!(matches!(foreign, CatalogError::ForeignMapping { .. }));

        let empty = PlaceholderCatalog::build(TEMPLATE, vec![mapping("", "ClientField.name")])
            .unwrap_err();
        assert!(matches!(empty, CatalogError::EmptyPlaceholder { .. }));

        let blank = PlaceholderCatalog::build(TEMPLATE, vec![mapping(" \t", "ClientField.name")])
            .unwrap_err();
        assert!(matches!(blank, CatalogError::EmptyPlaceholder { .. }));
    }

    #[test]
    fn test_empty_catalog_is_valid() {
        let catalog = PlaceholderCatalog::build(TEMPLATE, Vec::new()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog, PlaceholderCatalog::empty(TEMPLATE));
    }

    #[test]
    fn test_overlapping_tokens_detected() {
        let catalog = PlaceholderCatalog::build(
            TEMPLATE,
            vec![
                mapping("<<ADDR>>", "UserInput.addr"),
                mapping("<<ADDR>>_ZIP", "UserInput.zip"),
            ],
        )
        .unwrap();

        assert_eq!(catalog.overlapping_tokens(), vec![("<<ADDR>>_ZIP", "<<ADDR>>")]);
    }
}
