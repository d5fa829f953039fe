//! Data access for the Horizons catalog.
//!
//! [`Catalog`] sits between request handlers and the authoritative
//! [`CatalogSource`], consulting and maintaining the entity cache on the way.

pub mod catalog;
pub mod error;
pub mod memory;
pub mod source;

pub use catalog::{CascadeParent, Catalog};
pub use error::CatalogError;
pub use memory::InMemorySource;
pub use source::{CatalogSource, SourceError, SourceErrorCategory};
