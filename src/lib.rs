// docgen - Client Document Generation
// Record store + placeholder resolution + template rendering, exposed for
// the CLI, the API server and tests.

pub mod error;
pub mod config;
pub mod entities;
pub mod db;
pub mod seed;
pub mod resolver;   // the decision logic: where each placeholder value comes from
pub mod renderer;
pub mod template;
pub mod publisher;
pub mod generator;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use error::{CatalogError, GenerationError, StoreError};
pub use config::AppConfig;
pub use entities::{
    BusinessRequirement, CatalogEntry, Client, ClientAttribute,
    PlaceholderCatalog, PlaceholderMapping, SourceDescriptor,
};
pub use db::{setup_database, Event, Record, RecordStore};
pub use seed::{import_clients_csv, load_clients_csv, seed_if_absent, SeedData, SeedReport};
pub use resolver::{
    canonical_input_key, missing_input_marker, resolve,
    ResolvedVariable, ResolvedVariables, ValueOrigin,
    LEGAL_REP_PLACEHOLDER, OLD_ADDRESS_PLACEHOLDER,
};
pub use renderer::{render, RenderOutcome, TemplateDocument};
pub use template::{
    template_for_business, FsTemplateSource, InMemoryTemplateSource, TemplateSource,
    DEFAULT_TEMPLATE,
};
pub use publisher::DocumentPublisher;
pub use generator::{
    compose, gather_inputs, generate_document, generate_document_at, record_generation,
    ComposedDocument, GenerationInputs, GenerationRequest, GenerationResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
