//! The external "Quantity catalog" contract from §6: a declarative mapping
//! from a named physical quantity kind (`"Pressure"`, `"Length"`, …) to the
//! dimension it carries, a default display unit, and the set of units a
//! caller may reassign it to. This module owns only the data-driven registry;
//! the per-quantity wrapper types (`Length`, `Pressure`, …) it is meant to
//! back are an external, generated concern, out of this crate's scope (§1).

use rustc_hash::FxHashMap;
use serde::Deserialize;

use super::registry::UnitRegistry;
use super::unit::Unit;
use crate::core::{EngineError, EngineResult};
use crate::dimension::Dimension;

/// On-disk representation of one quantity-kind entry, matching §6's
/// `(name, dimension_signature, default_unit_name, allowed_units)` contract.
#[derive(Debug, Clone, Deserialize)]
pub struct QuantityCatalogEntry {
    /// The quantity kind's name, e.g. `"Pressure"`.
    pub name: String,
    /// Exponents of the seven SI base dimensions this kind carries.
    pub dimension: [i32; crate::dimension::BASE_COUNT],
    /// Canonical name of the unit new variables of this kind default to.
    pub default_unit_name: String,
    /// Canonical names of every unit this kind may be displayed or assigned
    /// in. Empty means "any unit sharing this kind's dimension", resolved
    /// lazily against a [`UnitRegistry`] rather than enumerated here.
    #[serde(default)]
    pub allowed_unit_names: Vec<String>,
}

/// On-disk catalog format: a flat list of quantity-kind entries.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct QuantityCatalogFile {
    /// The quantity kinds this catalog declares.
    #[serde(default)]
    pub quantities: Vec<QuantityCatalogEntry>,
}

/// A resolved quantity kind: the dimension a [`crate::variable::Variable`] of
/// this kind must carry, its default display unit, and the units it may be
/// re-expressed in.
#[derive(Debug, Clone)]
pub struct QuantityKind {
    name: String,
    dimension: Dimension,
    default_unit: std::sync::Arc<Unit>,
    allowed_units: Vec<std::sync::Arc<Unit>>,
}

impl QuantityKind {
    /// This kind's name, e.g. `"Pressure"`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dimension every `Variable` of this kind must carry.
    #[must_use]
    pub const fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// The unit new variables of this kind default to for display.
    #[must_use]
    pub fn default_unit(&self) -> &std::sync::Arc<Unit> {
        &self.default_unit
    }

    /// The units a variable of this kind may be displayed or reassigned in.
    /// Empty means unrestricted (any unit sharing [`Self::dimension`]).
    #[must_use]
    pub fn allowed_units(&self) -> &[std::sync::Arc<Unit>] {
        &self.allowed_units
    }

    /// Whether `unit` is a valid display unit for this kind: either the
    /// allow-list is empty (unrestricted) and the dimensions agree, or `unit`
    /// is named in the allow-list.
    #[must_use]
    pub fn permits(&self, unit: &Unit) -> bool {
        if unit.dimension() != self.dimension {
            return false;
        }
        self.allowed_units.is_empty() || self.allowed_units.iter().any(|allowed| allowed.name() == unit.name())
    }
}

/// Process-wide (or test-scoped) index from quantity-kind name to
/// [`QuantityKind`], resolved against a [`UnitRegistry`].
#[derive(Debug, Default)]
pub struct QuantityCatalog {
    kinds: FxHashMap<String, QuantityKind>,
}

impl QuantityCatalog {
    /// An empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one quantity kind, resolving its default and allowed units
    /// against `registry`.
    ///
    /// # Errors
    /// Returns [`EngineError::CompositionError`] if `entry.name` is already
    /// registered, or propagates [`EngineError::UnknownUnit`] if
    /// `default_unit_name` or any `allowed_unit_names` entry cannot be
    /// resolved.
    pub fn register(&mut self, entry: &QuantityCatalogEntry, registry: &UnitRegistry) -> EngineResult<()> {
        if self.kinds.contains_key(&entry.name) {
            return Err(EngineError::CompositionError {
                prefix: entry.name.clone(),
                reason: "a quantity kind with this name is already registered".to_owned(),
            });
        }
        let dimension = Dimension::from_exponents(entry.dimension);
        let default_unit = registry.by_name(&entry.default_unit_name)?;
        if default_unit.dimension() != dimension {
            return Err(EngineError::dimension_mismatch(
                format!("quantity kind '{}' default unit", entry.name),
                dimension,
                default_unit.dimension(),
            ));
        }
        let allowed_units = entry
            .allowed_unit_names
            .iter()
            .map(|name| registry.by_name(name))
            .collect::<EngineResult<Vec<_>>>()?;

        self.kinds.insert(
            entry.name.clone(),
            QuantityKind { name: entry.name.clone(), dimension, default_unit, allowed_units },
        );
        Ok(())
    }

    /// Build a catalog from a TOML document matching [`QuantityCatalogFile`],
    /// resolving every entry against `registry`.
    ///
    /// # Errors
    /// Returns [`EngineError::CompositionError`] if the document cannot be
    /// parsed, plus the errors [`Self::register`] can return.
    pub fn from_toml_str(text: &str, registry: &UnitRegistry) -> EngineResult<Self> {
        let file: QuantityCatalogFile = toml::from_str(text).map_err(|e| EngineError::CompositionError {
            prefix: "<quantity catalog>".to_owned(),
            reason: format!("invalid quantity catalog TOML: {e}"),
        })?;
        let mut catalog = Self::new();
        for entry in &file.quantities {
            catalog.register(entry, registry)?;
        }
        Ok(catalog)
    }

    /// Look up a quantity kind by name.
    ///
    /// # Errors
    /// Returns [`EngineError::VariableNotFound`] (reused here as a generic
    /// "name not in this catalog" signal) if no kind with this name exists.
    pub fn kind(&self, name: &str) -> EngineResult<&QuantityKind> {
        self.kinds.get(name).ok_or_else(|| EngineError::variable_not_found(name, self.kinds.keys().cloned().collect()))
    }

    /// Number of distinct quantity kinds registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether no quantity kinds are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::{LENGTH, MASS};

    fn registry_with_meter_and_psi() -> UnitRegistry {
        let mut reg = UnitRegistry::new();
        reg.register(Unit::scaled("meter", "m", Dimension::base(LENGTH), 1.0, true)).expect("register meter");
        reg.register(Unit::scaled("psi", "psi", Dimension::base(MASS), 6894.76, false)).expect("register psi");
        reg
    }

    #[test]
    fn registers_and_resolves_a_quantity_kind() {
        let registry = registry_with_meter_and_psi();
        let entry = QuantityCatalogEntry {
            name: "Length".to_owned(),
            dimension: {
                let mut e = [0; crate::dimension::BASE_COUNT];
                e[LENGTH] = 1;
                e
            },
            default_unit_name: "meter".to_owned(),
            allowed_unit_names: vec!["meter".to_owned()],
        };
        let mut catalog = QuantityCatalog::new();
        catalog.register(&entry, &registry).expect("register Length");
        let kind = catalog.kind("Length").expect("Length kind");
        assert_eq!(kind.default_unit().name(), "meter");
        assert!(kind.permits(&registry.by_name("meter").unwrap()));
    }

    #[test]
    fn default_unit_must_match_declared_dimension() {
        let registry = registry_with_meter_and_psi();
        let entry = QuantityCatalogEntry {
            name: "Length".to_owned(),
            dimension: {
                let mut e = [0; crate::dimension::BASE_COUNT];
                e[LENGTH] = 1;
                e
            },
            default_unit_name: "psi".to_owned(),
            allowed_unit_names: vec![],
        };
        let mut catalog = QuantityCatalog::new();
        let err = catalog.register(&entry, &registry).unwrap_err();
        assert!(matches!(err, EngineError::DimensionMismatch { .. }));
    }

    #[test]
    fn unrestricted_allow_list_permits_any_unit_of_the_right_dimension() {
        let registry = registry_with_meter_and_psi();
        let entry = QuantityCatalogEntry {
            name: "Length".to_owned(),
            dimension: {
                let mut e = [0; crate::dimension::BASE_COUNT];
                e[LENGTH] = 1;
                e
            },
            default_unit_name: "meter".to_owned(),
            allowed_unit_names: vec![],
        };
        let mut catalog = QuantityCatalog::new();
        catalog.register(&entry, &registry).expect("register Length");
        let kind = catalog.kind("Length").expect("Length kind");
        assert!(kind.permits(&registry.by_name("meter").unwrap()));
        assert!(!kind.permits(&registry.by_name("psi").unwrap()));
    }

    #[test]
    fn from_toml_str_builds_catalog() {
        let registry = registry_with_meter_and_psi();
        let toml_text = r#"
            [[quantities]]
            name = "Length"
            dimension = [1, 0, 0, 0, 0, 0, 0]
            default_unit_name = "meter"
        "#;
        let catalog = QuantityCatalog::from_toml_str(toml_text, &registry).expect("parse catalog");
        assert_eq!(catalog.len(), 1);
    }
}
