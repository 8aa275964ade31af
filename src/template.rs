// 📄 Template Source - where template text comes from
//
// Templates are plain UTF-8 text files, one block per line. Which template
// a business type uses is a static lookup.

use crate::error::GenerationError;
use crate::renderer::TemplateDocument;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_TEMPLATE: &str = "change_registration.txt";

const TEMPLATE_ROUTES: &[(&str, &str)] = &[
    ("Address Change", DEFAULT_TEMPLATE),
    ("地址變更", DEFAULT_TEMPLATE),
];

/// Template id for a business type. Unlisted business types use the
/// change-registration form.
pub fn template_for_business(business_type: &str) -> &'static str {
    TEMPLATE_ROUTES
        .iter()
        .find(|(name, _)| *name == business_type.trim())
        .map(|(_, template)| *template)
        .unwrap_or(DEFAULT_TEMPLATE)
}

pub trait TemplateSource {
    fn load(&self, template_id: &str) -> Result<TemplateDocument, GenerationError>;
}

// ============================================================================
// FILESYSTEM
// ============================================================================

#[derive(Debug, Clone)]
pub struct FsTemplateSource {
    root: PathBuf,
}

impl FsTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsTemplateSource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_plain_file_name(template_id: &str) -> bool {
        !template_id.is_empty()
            && template_id != "."
            && template_id != ".."
            && !template_id.contains(['/', '\\'])
    }
}

impl TemplateSource for FsTemplateSource {
    fn load(&self, template_id: &str) -> Result<TemplateDocument, GenerationError> {
        let path = self.root.join(template_id);

        if !Self::is_plain_file_name(template_id) {
            return Err(GenerationError::TemplateNotFound {
                template_id: template_id.to_string(),
                path,
            });
        }

        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let doc = TemplateDocument::parse(&text);
                debug!(template = template_id, blocks = doc.blocks().len(), "loaded template");
                Ok(doc)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(GenerationError::TemplateNotFound {
                template_id: template_id.to_string(),
                path,
            }),
            Err(e) => Err(GenerationError::TemplateUnreadable {
                template_id: template_id.to_string(),
                path,
                source: e,
            }),
        }
    }
}

// ============================================================================
// IN MEMORY
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateSource {
    templates: HashMap<String, TemplateDocument>,
}

impl InMemoryTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, template_id: impl Into<String>, doc: TemplateDocument) -> Self {
        self.templates.insert(template_id.into(), doc);
        self
    }
}

impl TemplateSource for InMemoryTemplateSource {
    fn load(&self, template_id: &str) -> Result<TemplateDocument, GenerationError> {
        self.templates
            .get(template_id)
            .cloned()
            .ok_or_else(|| GenerationError::TemplateNotFound {
                template_id: template_id.to_string(),
                path: PathBuf::from(template_id),
            })
    }
}
