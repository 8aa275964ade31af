// Entity Models
//
// The three record kinds the store keeps, each addressable by a natural key:
// - Client (name, or unified number)
// - BusinessRequirement (business name)
// - PlaceholderMapping (template id + placeholder token)

pub mod client;
pub mod requirement;
pub mod placeholder;

pub use client::{Client, ClientAttribute};
pub use requirement::BusinessRequirement;
pub use placeholder::{CatalogEntry, PlaceholderCatalog, PlaceholderMapping, SourceDescriptor};
