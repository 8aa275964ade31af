// 🖨️ Template Renderer - literal substitution of placeholder tokens
//
// Works block by block (paragraph granularity). A token split across two
// blocks is never matched.

use crate::resolver::ResolvedVariables;
use tracing::warn;

// ============================================================================
// DOCUMENT
// ============================================================================

/// Text-bearing document: an ordered sequence of text blocks
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateDocument {
    blocks: Vec<String>,
}

impl TemplateDocument {
    pub fn from_blocks<I, S>(blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TemplateDocument {
            blocks: blocks.into_iter().map(Into::into).collect(),
        }
    }

    /// One block per line
    pub fn parse(text: &str) -> Self {
        TemplateDocument::from_blocks(text.lines())
    }

    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    pub fn to_text(&self) -> String {
        let mut text = self.blocks.join("\n");
        if !self.blocks.is_empty() {
            text.push('\n');
        }
        text
    }
}

// ============================================================================
// RENDERING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Fresh document; the template is left untouched
    pub document: TemplateDocument,

    /// Catalog tokens that never occurred in any block
    pub unmatched: Vec<String>,
}

/// Replace every occurrence of every token, block by block.
///
/// Within a block, tokens are applied in catalog declaration order against
/// the progressively substituted text. This matters when one token contains
/// another, and when a substituted value itself contains a token declared
/// later: that token is replaced too and counts as matched even if the
/// template text never had it.
pub fn render(template: &TemplateDocument, variables: &ResolvedVariables) -> RenderOutcome {
    let mut matched = vec![false; variables.len()];

    let blocks = template
        .blocks()
        .iter()
        .map(|block| {
            let mut text = block.clone();
            for (i, var) in variables.iter().enumerate() {
                if text.contains(&var.placeholder) {
                    text = text.replace(&var.placeholder, &var.value);
                    matched[i] = true;
                }
            }
            text
        })
        .collect();

    let unmatched: Vec<String> = variables
        .iter()
        .zip(&matched)
        .filter(|(_, hit)| !**hit)
        .map(|(var, _)| var.placeholder.clone())
        .collect();

    for token in &unmatched {
        warn!(placeholder = %token, "placeholder not found in template text");
    }

    RenderOutcome {
        document: TemplateDocument { blocks },
        unmatched,
    }
}
