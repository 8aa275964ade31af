// ⚙️ Document Generation - the one operation an operator actually runs
//
// Phases:
//   1. gather_inputs     - client, business requirement, catalog, template
//   2. compose           - resolve + render (pure, no I/O)
//   3. publish           - write to the client folder
//   4. record_generation - audit event
//
// `generate_document` runs all four; the server time-boxes them one by one.

use crate::db::{Event, RecordStore};
use crate::entities::{BusinessRequirement, Client, PlaceholderCatalog};
use crate::error::{GenerationError, StoreError};
use crate::publisher::DocumentPublisher;
use crate::renderer::{render, TemplateDocument};
use crate::resolver::{canonical_input_key, resolve, ResolvedVariables};
use crate::template::{template_for_business, TemplateSource};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const GENERATOR_ACTOR: &str = "docgen";

// ============================================================================
// REQUEST / RESULT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub client_name: String,
    pub business_type: String,
    #[serde(default)]
    pub user_input: HashMap<String, String>,
}

impl GenerationRequest {
    pub fn new(client_name: impl Into<String>, business_type: impl Into<String>) -> Self {
        GenerationRequest {
            client_name: client_name.into(),
            business_type: business_type.into(),
            user_input: HashMap::new(),
        }
    }

    /// Builder: add one runtime input. The key is canonicalised, so a later
    /// call with any spelling of the same key replaces the earlier value.
    pub fn with_input(mut self, key: &str, value: impl Into<String>) -> Self {
        self.user_input.insert(canonical_input_key(key), value.into());
        self
    }

    /// Runtime input with every key in canonical casing. Two keys that only
    /// differ in case (or surrounding whitespace) are rejected rather than
    /// picking one by map iteration order.
    pub fn canonical_input(&self) -> Result<HashMap<String, String>, GenerationError> {
        let mut spellings: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for key in self.user_input.keys() {
            spellings.entry(canonical_input_key(key)).or_default().push(key);
        }

        if let Some((key, raw)) = spellings.into_iter().find(|(_, raw)| raw.len() > 1) {
            let mut raw: Vec<String> = raw.into_iter().map(str::to_string).collect();
            raw.sort();
            return Err(GenerationError::ConflictingInput { key, spellings: raw });
        }

        Ok(self
            .user_input
            .iter()
            .map(|(k, v)| (canonical_input_key(k), v.clone()))
            .collect())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub output_path: PathBuf,
    pub client_name: String,
    pub business_type: String,
    pub template_id: String,
    pub variables: BTreeMap<String, String>,
    pub missing_inputs: Vec<String>,
    pub unmatched_placeholders: Vec<String>,
    /// Checklist from the business requirement; not validated
    pub required_documents: Vec<String>,
    pub content_sha256: String,
    pub generated_at: String,
}

/// Everything looked up from storage and the template source
#[derive(Debug, Clone)]
pub struct GenerationInputs {
    pub client: Client,
    pub requirement: Option<BusinessRequirement>,
    pub template_id: String,
    pub catalog: PlaceholderCatalog,
    pub template: TemplateDocument,
}

#[derive(Debug, Clone)]
pub struct ComposedDocument {
    pub variables: ResolvedVariables,
    pub document: TemplateDocument,
    pub unmatched: Vec<String>,
}

impl ComposedDocument {
    pub fn content_sha256(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.document.to_text().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// PHASES
// ============================================================================

pub fn gather_inputs(
    store: &RecordStore,
    templates: &dyn TemplateSource,
    request: &GenerationRequest,
) -> Result<GenerationInputs, GenerationError> {
    let client = store
        .find_client_by_name(&request.client_name)?
        .ok_or_else(|| GenerationError::ClientNotFound {
            name: request.client_name.clone(),
        })?;

    let requirement = store.find_business_requirement(&request.business_type)?;
    match &requirement {
        Some(req) => debug!(
            business_type = %req.business_name,
            required_docs = req.required_docs.len(),
            "business requirement found"
        ),
        None => warn!(
            business_type = %request.business_type,
            "no business requirement on record; document checklist will be empty"
        ),
    }

    let template_id = template_for_business(&request.business_type).to_string();
    let catalog = store
        .find_placeholder_catalog(&template_id)
        .map_err(|e| match e {
            StoreError::Catalog(e) => GenerationError::Catalog(e),
            other => other.into(),
        })?;
    let template = templates.load(&template_id)?;

    Ok(GenerationInputs {
        client,
        requirement,
        template_id,
        catalog,
        template,
    })
}

pub fn compose(
    inputs: &GenerationInputs,
    request: &GenerationRequest,
) -> Result<ComposedDocument, GenerationError> {
    let variables = resolve(
        &inputs.client,
        &request.business_type,
        &inputs.catalog,
        &request.canonical_input()?,
    )?;
    let outcome = render(&inputs.template, &variables);

    Ok(ComposedDocument {
        variables,
        document: outcome.document,
        unmatched: outcome.unmatched,
    })
}

/// Assemble the result and leave an audit event. The document is already on
/// disk at this point, so an audit failure is logged rather than returned.
pub fn record_generation(
    store: &RecordStore,
    inputs: &GenerationInputs,
    request: &GenerationRequest,
    composed: &ComposedDocument,
    output_path: PathBuf,
    generated_at: NaiveDateTime,
) -> GenerationResult {
    let result = GenerationResult {
        output_path,
        client_name: inputs.client.name.clone(),
        business_type: request.business_type.clone(),
        template_id: inputs.template_id.clone(),
        variables: composed.variables.to_map(),
        missing_inputs: composed.variables.missing_inputs(),
        unmatched_placeholders: composed.unmatched.clone(),
        required_documents: inputs
            .requirement
            .as_ref()
            .map(|r| r.required_docs.clone())
            .unwrap_or_default(),
        content_sha256: composed.content_sha256(),
        generated_at: generated_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
    };

    let event = Event::new(
        "document_generated",
        "client",
        &result.client_name,
        serde_json::json!({
            "business_type": result.business_type,
            "template_id": result.template_id,
            "output_path": result.output_path.display().to_string(),
            "missing_inputs": result.missing_inputs,
            "unmatched_placeholders": result.unmatched_placeholders,
            "content_sha256": result.content_sha256,
        }),
        GENERATOR_ACTOR,
    );
    if let Err(e) = store.record_event(&event) {
        warn!(error = %e, client = %result.client_name, "failed to record generation event");
    }

    info!(
        client = %result.client_name,
        business_type = %result.business_type,
        path = %result.output_path.display(),
        missing = result.missing_inputs.len(),
        unmatched = result.unmatched_placeholders.len(),
        "document generated"
    );

    result
}

// ============================================================================
// ENTRY POINT
// ============================================================================

pub fn generate_document(
    store: &RecordStore,
    templates: &dyn TemplateSource,
    publisher: &DocumentPublisher,
    request: &GenerationRequest,
) -> Result<GenerationResult, GenerationError> {
    generate_document_at(store, templates, publisher, request, Local::now().naive_local())
}

/// Same as [`generate_document`] with an explicit timestamp
pub fn generate_document_at(
    store: &RecordStore,
    templates: &dyn TemplateSource,
    publisher: &DocumentPublisher,
    request: &GenerationRequest,
    generated_at: NaiveDateTime,
) -> Result<GenerationResult, GenerationError> {
    let inputs = gather_inputs(store, templates, request)?;
    let composed = compose(&inputs, request)?;
    let output_path = publisher.publish(
        &inputs.client.name,
        &request.business_type,
        &composed.document,
        generated_at,
    )?;

    Ok(record_generation(
        store,
        &inputs,
        request,
        &composed,
        output_path,
        generated_at,
    ))
}

// ============================================================================
// TESTS
// ============================================================================
