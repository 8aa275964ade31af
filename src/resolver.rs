// 🧩 Variable Resolver - placeholder catalog + client + runtime input → values
//
// Routing per catalog entry:
//   ClientField.<attr>  → client attribute (unknown attr aborts the request)
//   UserInput.<key>     → runtime input under the upper-cased key, or the
//                         marker "[missing input: <KEY>]" when absent
// Policy overrides run after routing and replace its result:
//   <<OLD_ADDRESS>> ← client.current_address
//   <<LEGAL_REP>>   ← client.legal_rep

use crate::entities::{Client, ClientAttribute, PlaceholderCatalog, SourceDescriptor};
use crate::error::GenerationError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

pub const OLD_ADDRESS_PLACEHOLDER: &str = "<<OLD_ADDRESS>>";
pub const LEGAL_REP_PLACEHOLDER: &str = "<<LEGAL_REP>>";

/// "Old" values always come from the record, never from user input.
const POLICY_OVERRIDES: [(&str, ClientAttribute); 2] = [
    (OLD_ADDRESS_PLACEHOLDER, ClientAttribute::CurrentAddress),
    (LEGAL_REP_PLACEHOLDER, ClientAttribute::LegalRep),
];

// ============================================================================
// RESOLVED VARIABLES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", content = "detail", rename_all = "snake_case")]
pub enum ValueOrigin {
    ClientRecord(ClientAttribute),
    UserInput(String),
    MissingInput(String),
    PolicyOverride(ClientAttribute),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVariable {
    pub placeholder: String,
    pub value: String,
    pub origin: ValueOrigin,
}

/// Placeholder → value, in catalog declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedVariables {
    entries: Vec<ResolvedVariable>,
}

impl ResolvedVariables {
    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|v| v.placeholder == placeholder)
            .map(|v| v.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedVariable> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical input keys that had no runtime value
    pub fn missing_inputs(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|v| match &v.origin {
                ValueOrigin::MissingInput(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|v| (v.placeholder.clone(), v.value.clone()))
            .collect()
    }
}

impl FromIterator<(String, String)> for ResolvedVariables {
    /// Build from literal pairs; origin is recorded as user input.
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        ResolvedVariables {
            entries: iter
                .into_iter()
                .map(|(placeholder, value)| ResolvedVariable {
                    origin: ValueOrigin::UserInput(placeholder.clone()),
                    placeholder,
                    value,
                })
                .collect(),
        }
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Canonical casing of runtime input keys
pub fn canonical_input_key(key: &str) -> String {
    key.trim().to_uppercase()
}

pub fn missing_input_marker(key: &str) -> String {
    format!("[missing input: {}]", key)
}

fn policy_override(placeholder: &str) -> Option<ClientAttribute> {
    POLICY_OVERRIDES
        .iter()
        .find(|(token, _)| *token == placeholder)
        .map(|(_, attr)| *attr)
}

/// Resolve every catalog entry. `user_input` keys are expected in canonical
/// (upper) casing; see [`canonical_input_key`].
pub fn resolve(
    client: &Client,
    business_type: &str,
    catalog: &PlaceholderCatalog,
    user_input: &HashMap<String, String>,
) -> Result<ResolvedVariables, GenerationError> {
    let mut entries = Vec::with_capacity(catalog.len());

    for entry in catalog.entries() {
        let (mut value, mut origin) = match entry.source() {
            SourceDescriptor::ClientField(field) => {
                let attr = ClientAttribute::from_name(field).ok_or_else(|| {
                    GenerationError::UnknownField {
                        template_id: catalog.template_id().to_string(),
                        placeholder: entry.placeholder().to_string(),
                        field: field.clone(),
                    }
                })?;
                (attr.read(client).to_string(), ValueOrigin::ClientRecord(attr))
            }
            SourceDescriptor::UserInput(key) => {
                let key = canonical_input_key(key);
                match user_input.get(&key) {
                    Some(v) => (v.clone(), ValueOrigin::UserInput(key)),
                    None => (missing_input_marker(&key), ValueOrigin::MissingInput(key)),
                }
            }
        };

        if let Some(attr) = policy_override(entry.placeholder()) {
            value = attr.read(client).to_string();
            origin = ValueOrigin::PolicyOverride(attr);
        }

        if let ValueOrigin::MissingInput(key) = &origin {
            warn!(
                client = %client.name,
                business_type,
                placeholder = entry.placeholder(),
                key = %key,
                "missing runtime input; marker left in document"
            );
        }

        entries.push(ResolvedVariable {
            placeholder: entry.placeholder().to_string(),
            value,
            origin,
        });
    }

    debug!(
        client = %client.name,
        business_type,
        template = catalog.template_id(),
        resolved = entries.len(),
        "resolved placeholder values"
    );

    Ok(ResolvedVariables { entries })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PlaceholderMapping;
    use crate::test_support::capture_logs;

    const TEMPLATE: &str = "change_registration.txt";

    fn a_tech() -> Client {
        Client::new("A Tech Co", "12345678", "100 Main Rd", "Wang")
    }

    fn catalog(pairs: &[(&str, &str)]) -> PlaceholderCatalog {
        PlaceholderCatalog::build(
            TEMPLATE,
            pairs
                .iter()
                .map(|(token, source)| PlaceholderMapping::new(TEMPLATE, *token, *source)),
        )
        .unwrap()
    }

    fn input(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_client_field_resolves_to_attribute() {
        let client = Client::new("Acme Co", "11112222", "1 Main St", "Lee");
        let catalog = catalog(&[
            ("<<COMPANY_NAME>>", "ClientField.name"),
            ("<<ID>>", "ClientField.unified_number"),
        ]);

        let vars = resolve(&client, "Address Change", &catalog, &HashMap::new()).unwrap();

        assert_eq!(vars.get("<<COMPANY_NAME>>"), Some("Acme Co"));
        assert_eq!(vars.get("<<ID>>"), Some("11112222"));
        assert!(vars.missing_inputs().is_empty());
    }

    #[test]
    fn test_user_input_key_is_upper_cased() {
        let catalog = catalog(&[("<<NEW_ADDRESS>>", "UserInput.new_address")]);
        let vars = resolve(&a_tech(), "Address Change", &catalog, &input(&[("NEW_ADDRESS", "200 New Rd")]))
            .unwrap();

        assert_eq!(vars.get("<<NEW_ADDRESS>>"), Some("200 New Rd"));
    }

    #[test]
    fn test_missing_input_becomes_marker() {
        let catalog = catalog(&[("<<NEW_ADDRESS>>", "UserInput.new_address")]);
        let vars = resolve(&a_tech(), "Address Change", &catalog, &HashMap::new()).unwrap();

        assert_eq!(vars.get("<<NEW_ADDRESS>>"), Some("[missing input: NEW_ADDRESS]"));
        assert_eq!(vars.missing_inputs(), vec!["NEW_ADDRESS".to_string()]);
    }

    #[test]
    fn test_missing_input_logged_as_warning() {
        let catalog = catalog(&[
            ("<<COMPANY_NAME>>", "ClientField.name"),
            ("<<NEW_ADDRESS>>", "UserInput.new_address"),
        ]);
        let (vars, logs) =
            capture_logs(|| resolve(&a_tech(), "Address Change", &catalog, &HashMap::new()).unwrap());

        assert_eq!(vars.missing_inputs(), vec!["NEW_ADDRESS".to_string()]);
        assert!(logs.contains("WARN"));
        assert!(logs.contains("missing runtime input"));
        assert!(logs.contains("NEW_ADDRESS"));
        assert!(logs.contains("A Tech Co"));

        // supplied input: nothing to warn about
        let (_, logs) = capture_logs(|| {
            resolve(&a_tech(), "Address Change", &catalog, &input(&[("NEW_ADDRESS", "200 New Rd")]))
                .unwrap()
        });
        assert!(!logs.contains("missing runtime input"));
        println!("✅ Missing input warning test PASSED");
    }

    #[test]
    fn test_unknown_client_field_aborts() {
        let catalog = catalog(&[
            ("<<COMPANY_NAME>>", "ClientField.name"),
            ("<<CAPITAL>>", "ClientField.capital"),
        ]);

        let err = resolve(&a_tech(), "Address Change", &catalog, &HashMap::new()).unwrap_err();
        match err {
            GenerationError::UnknownField { template_id, placeholder, field } => {
                assert_eq!(template_id, TEMPLATE);
                assert_eq!(placeholder, "<<CAPITAL>>");
                assert_eq!(field, "capital");
            }
            other => panic!("expected UnknownField, got {:?}", other),
        }
    }

    #[test]
    fn test_old_address_override_beats_user_input_source() {
        let catalog = catalog(&[("<<OLD_ADDRESS>>", "UserInput.new_address")]);
        let vars = resolve(
            &a_tech(),
            "Address Change",
            &catalog,
            &input(&[("NEW_ADDRESS", "200 New Rd")]),
        )
        .unwrap();

        assert_eq!(vars.get("<<OLD_ADDRESS>>"), Some("100 Main Rd"));
        assert!(vars.missing_inputs().is_empty());
    }

    #[test]
    fn test_override_replaces_missing_marker() {
        let catalog = catalog(&[("<<OLD_ADDRESS>>", "UserInput.old_address")]);
        let vars = resolve(&a_tech(), "Address Change", &catalog, &HashMap::new()).unwrap();

        assert_eq!(vars.get("<<OLD_ADDRESS>>"), Some("100 Main Rd"));
        assert!(vars.missing_inputs().is_empty());
        assert_eq!(
            vars.iter().next().unwrap().origin,
            ValueOrigin::PolicyOverride(ClientAttribute::CurrentAddress)
        );
    }

    #[test]
    fn test_legal_rep_override_beats_other_client_field() {
        let catalog = catalog(&[("<<LEGAL_REP>>", "ClientField.name")]);
        let vars = resolve(&a_tech(), "Address Change", &catalog, &HashMap::new()).unwrap();

        assert_eq!(vars.get("<<LEGAL_REP>>"), Some("Wang"));
    }

    #[test]
    fn test_routing_error_precedes_override() {
        // generic routing runs first, so a bad field still aborts
        let catalog = catalog(&[("<<OLD_ADDRESS>>", "ClientField.previous_address")]);
        let err = resolve(&a_tech(), "Address Change", &catalog, &HashMap::new()).unwrap_err();

        assert!(matches!(err, GenerationError::UnknownField { .. }));
    }

    #[test]
    fn test_empty_catalog_yields_empty_map() {
        let vars = resolve(
            &a_tech(),
            "Address Change",
            &PlaceholderCatalog::empty(TEMPLATE),
            &HashMap::new(),
        )
        .unwrap();

        assert!(vars.is_empty());
    }

    #[test]
    fn test_resolution_is_pure() {
        let catalog = catalog(&[
            ("<<COMPANY_NAME>>", "ClientField.name"),
            ("<<NEW_ADDRESS>>", "UserInput.new_address"),
        ]);
        let user = input(&[("NEW_ADDRESS", "200 New Rd")]);

        let first = resolve(&a_tech(), "Address Change", &catalog, &user).unwrap();
        let second = resolve(&a_tech(), "Address Change", &catalog, &user).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_address_change_scenario() {
        let catalog = catalog(&[
            ("<<COMPANY_NAME>>", "ClientField.name"),
            ("<<OLD_ADDRESS>>", "ClientField.current_address"),
            ("<<NEW_ADDRESS>>", "UserInput.new_address"),
            ("<<LEGAL_REP>>", "ClientField.legal_rep"),
        ]);

        let vars = resolve(
            &a_tech(),
            "Address Change",
            &catalog,
            &input(&[("NEW_ADDRESS", "200 New Rd")]),
        )
        .unwrap();

        let expected: BTreeMap<String, String> = [
            ("<<COMPANY_NAME>>", "A Tech Co"),
            ("<<OLD_ADDRESS>>", "100 Main Rd"),
            ("<<NEW_ADDRESS>>", "200 New Rd"),
            ("<<LEGAL_REP>>", "Wang"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(vars.to_map(), expected);

        println!("✅ Address change resolution test PASSED");
    }
}
