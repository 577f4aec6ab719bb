//! Units of measure: a named, immutable scale on a [`crate::dimension::Dimension`],
//! plus the registry that resolves names and symbols to units.

mod quantity_catalog;
mod registry;
mod unit;

pub use quantity_catalog::{QuantityCatalog, QuantityCatalogEntry, QuantityCatalogFile, QuantityKind};
pub use registry::{edit_distance, standard_si_prefixes, PrefixEntry, UnitCatalogFile, UnitRegistry};
pub use unit::{Unit, UnitCatalogEntry};
