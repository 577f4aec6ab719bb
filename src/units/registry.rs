//! Process-wide (or test-scoped) index from unit name/symbol to [`Unit`].

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use super::unit::{Unit, UnitCatalogEntry};
use crate::core::{EngineError, EngineResult};

/// An SI prefix definition, e.g. `("kilo", "k", 1e3)`.
#[derive(Debug, Clone, Deserialize)]
pub struct PrefixEntry {
    /// Prefix name, e.g. `"kilo"`.
    pub name: String,
    /// Prefix symbol, e.g. `"k"`.
    pub symbol: String,
    /// Multiplicative factor, e.g. `1e3`.
    pub factor: f64,
}

/// The standard decimal SI prefixes, used when a registry is built without
/// an explicit prefix table.
#[must_use]
pub fn standard_si_prefixes() -> Vec<PrefixEntry> {
    [
        ("yocto", "y", 1e-24),
        ("zepto", "z", 1e-21),
        ("atto", "a", 1e-18),
        ("femto", "f", 1e-15),
        ("pico", "p", 1e-12),
        ("nano", "n", 1e-9),
        ("micro", "u", 1e-6),
        ("milli", "m", 1e-3),
        ("centi", "c", 1e-2),
        ("deci", "d", 1e-1),
        ("deca", "da", 1e1),
        ("hecto", "h", 1e2),
        ("kilo", "k", 1e3),
        ("mega", "M", 1e6),
        ("giga", "G", 1e9),
        ("tera", "T", 1e12),
        ("peta", "P", 1e15),
        ("exa", "E", 1e18),
    ]
    .into_iter()
    .map(|(name, symbol, factor)| PrefixEntry {
        name: name.to_owned(),
        symbol: symbol.to_owned(),
        factor,
    })
    .collect()
}

/// On-disk catalog format: a flat list of unit entries plus the prefix
/// table, matching the external "Unit catalog" contract.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UnitCatalogFile {
    /// The units defined by this catalog.
    #[serde(default)]
    pub units: Vec<UnitCatalogEntry>,
}

/// Process-wide index from canonical unit name, and from symbol/alias, to
/// [`Unit`]. Populated once during construction and immutable thereafter, so
/// it is `Send + Sync` and may be shared by reference across threads solving
/// distinct `Problem`s concurrently.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    by_name: FxHashMap<String, Arc<Unit>>,
    by_symbol: FxHashMap<String, Arc<Unit>>,
}

impl UnitRegistry {
    /// An empty registry (useful as a starting point for `register`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single unit, and if it is prefixable, every standard SI
    /// prefix combination of it.
    ///
    /// # Errors
    /// Returns [`EngineError::CompositionError`] if a unit with the same
    /// name or symbol is already registered (the registry enforces exactly
    /// one `Unit` per name and per symbol).
    pub fn register(&mut self, unit: Unit) -> EngineResult<()> {
        self.register_with_prefixes(unit, &standard_si_prefixes())
    }

    /// Register a unit using an explicit prefix table instead of the
    /// standard SI prefixes.
    ///
    /// # Errors
    /// See [`Self::register`].
    pub fn register_with_prefixes(
        &mut self,
        unit: Unit,
        prefixes: &[PrefixEntry],
    ) -> EngineResult<()> {
        self.insert_unique(unit.name().to_owned(), unit.symbol().to_owned(), unit.clone())?;
        let unit = Arc::new(unit);

        if unit.is_prefixable() {
            for prefix in prefixes {
                let prefixed = unit.with_prefix(&prefix.name, &prefix.symbol, prefix.factor);
                self.insert_unique(
                    prefixed.name().to_owned(),
                    prefixed.symbol().to_owned(),
                    prefixed,
                )?;
            }
        }
        Ok(())
    }

    /// Register an additional alias (name or symbol) for an already
    /// registered unit, looked up by its canonical name.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownUnit`] if `canonical_name` is not yet
    /// registered, or [`EngineError::CompositionError`] if `alias` collides
    /// with an existing entry.
    pub fn register_alias(&mut self, canonical_name: &str, alias: impl Into<String>) -> EngineResult<()> {
        let unit = self.by_name.get(canonical_name).cloned().ok_or_else(|| {
            EngineError::UnknownUnit {
                query: canonical_name.to_owned(),
                suggestions: self.suggest(canonical_name),
            }
        })?;
        let alias = alias.into();
        if self.by_symbol.contains_key(&alias) || self.by_name.contains_key(&alias) {
            return Err(EngineError::CompositionError {
                prefix: alias,
                reason: "alias collides with an existing unit name or symbol".to_owned(),
            });
        }
        self.by_symbol.insert(alias, unit);
        Ok(())
    }

    fn insert_unique(&mut self, name: String, symbol: String, unit: Unit) -> EngineResult<()> {
        if self.by_name.contains_key(&name) {
            return Err(EngineError::CompositionError {
                prefix: name,
                reason: "a unit with this name is already registered".to_owned(),
            });
        }
        if self.by_symbol.contains_key(&symbol) {
            return Err(EngineError::CompositionError {
                prefix: symbol,
                reason: "a unit with this symbol is already registered".to_owned(),
            });
        }
        let unit = Arc::new(unit);
        self.by_name.insert(name, Arc::clone(&unit));
        self.by_symbol.insert(symbol, unit);
        Ok(())
    }

    /// Look up a unit by its canonical name.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownUnit`] with up to three edit-distance
    /// suggestions when no unit matches.
    pub fn by_name(&self, name: &str) -> EngineResult<Arc<Unit>> {
        self.by_name
            .get(name)
            .map(Arc::clone)
            .ok_or_else(|| EngineError::UnknownUnit {
                query: name.to_owned(),
                suggestions: self.suggest(name),
            })
    }

    /// Look up a unit by symbol or registered alias.
    ///
    /// # Errors
    /// See [`Self::by_name`].
    pub fn by_symbol(&self, symbol: &str) -> EngineResult<Arc<Unit>> {
        self.by_symbol
            .get(symbol)
            .map(Arc::clone)
            .ok_or_else(|| EngineError::UnknownUnit {
                query: symbol.to_owned(),
                suggestions: self.suggest(symbol),
            })
    }

    /// Look up a unit by either name or symbol, name first.
    ///
    /// # Errors
    /// See [`Self::by_name`].
    pub fn resolve(&self, query: &str) -> EngineResult<Arc<Unit>> {
        self.by_name(query).or_else(|_| self.by_symbol(query))
    }

    /// Number of distinct unit entries (after prefix expansion) known to the
    /// name index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the registry has no units registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Build a registry from a TOML document matching [`UnitCatalogFile`].
    ///
    /// # Errors
    /// Returns [`EngineError::CompositionError`] if the document cannot be
    /// parsed or contains duplicate/invalid unit entries.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let file: UnitCatalogFile = toml::from_str(text).map_err(|e| EngineError::CompositionError {
            prefix: "<catalog>".to_owned(),
            reason: format!("invalid unit catalog TOML: {e}"),
        })?;

        let mut registry = Self::new();
        for entry in file.units {
            let unit = entry.to_unit().ok_or_else(|| EngineError::CompositionError {
                prefix: entry.name.clone(),
                reason: "offset-bearing unit must be non-prefixable and pure temperature"
                    .to_owned(),
            })?;
            let aliases = entry.aliases.clone();
            registry.register(unit)?;
            for alias in aliases {
                registry.register_alias(&entry.name, alias)?;
            }
        }
        Ok(registry)
    }

    /// Compute up to three nearest-neighbor suggestions for an unresolved
    /// query, by Levenshtein edit distance over every registered name and
    /// symbol, closest first.
    #[must_use]
    pub fn suggest(&self, query: &str) -> Vec<String> {
        let mut scored: Vec<(usize, &str)> = self
            .by_name
            .keys()
            .chain(self.by_symbol.keys())
            .map(|candidate| (edit_distance(query, candidate), candidate.as_str()))
            .collect();
        scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .map(|(_, name)| name.to_owned())
            .take(3)
            .collect()
    }
}

/// Levenshtein edit distance between two strings.
#[must_use]
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::Dimension;

    fn meter() -> Unit {
        Unit::scaled("meter", "m", Dimension::base(crate::dimension::LENGTH), 1.0, true)
    }

    #[test]
    fn registers_and_resolves_by_name_and_symbol() {
        let mut reg = UnitRegistry::new();
        reg.register(meter()).expect("register meter");
        assert_eq!(reg.by_name("meter").unwrap().symbol(), "m");
        assert_eq!(reg.by_symbol("m").unwrap().name(), "meter");
    }

    #[test]
    fn prefixable_unit_expands_to_kilo_and_milli() {
        let mut reg = UnitRegistry::new();
        reg.register(meter()).expect("register meter");
        let km = reg.by_name("kilometer").expect("kilometer should exist");
        assert!((km.si_factor() - 1000.0).abs() < 1e-12);
        let mm = reg.by_symbol("mm").expect("mm should exist");
        assert!((mm.si_factor() - 1e-3).abs() < 1e-12);
    }

    #[test]
    fn offset_bearing_unit_cannot_be_prefixed() {
        let fahrenheit = Unit::new(
            "fahrenheit",
            "F",
            Dimension::base(crate::dimension::TEMPERATURE),
            5.0 / 9.0,
            255.372_222,
            true,
        );
        assert!(fahrenheit.is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut reg = UnitRegistry::new();
        reg.register(meter()).expect("register meter");
        let err = reg.register(meter()).unwrap_err();
        assert!(matches!(err, EngineError::CompositionError { .. }));
    }

    #[test]
    fn unknown_unit_suggests_nearest_neighbors() {
        let mut reg = UnitRegistry::new();
        reg.register(meter()).expect("register meter");
        let err = reg.by_name("meterr").unwrap_err();
        match err {
            EngineError::UnknownUnit { suggestions, .. } => {
                assert!(suggestions.contains(&"meter".to_owned()));
            }
            other => panic!("expected UnknownUnit, got {other:?}"),
        }
    }

    #[test]
    fn from_toml_str_builds_registry() {
        let toml_text = r#"
            [[units]]
            name = "meter"
            symbol = "m"
            dimension = [1, 0, 0, 0, 0, 0, 0]
            si_factor = 1.0
            prefixable = true

            [[units]]
            name = "inch"
            symbol = "in"
            dimension = [1, 0, 0, 0, 0, 0, 0]
            si_factor = 0.0254
            aliases = ["inches"]
        "#;
        let reg = UnitRegistry::from_toml_str(toml_text).expect("parse catalog");
        assert!(reg.by_symbol("mm").is_ok());
        assert!(reg.by_symbol("inches").is_ok());
    }
}
