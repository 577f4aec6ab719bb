//! A named scale on one [`Dimension`].

use serde::Deserialize;

use crate::dimension::Dimension;

/// A `Unit` is a named, immutable scale on a single dimension.
///
/// Conversion to SI base units is affine: `x_si = x * si_factor + si_offset`.
/// Only units whose dimension is pure temperature may carry a non-zero
/// `si_offset`; composed units (built by multiplying/dividing/raising other
/// units) always have a zero offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// Canonical name, e.g. `"pound_force_per_square_inch"`.
    name: String,
    /// Display symbol, e.g. `"psi"`.
    symbol: String,
    /// The physical dimension this unit measures.
    dimension: Dimension,
    /// Multiplicative factor to SI base units.
    si_factor: f64,
    /// Additive offset to SI base units (non-zero only for affine scales).
    si_offset: f64,
    /// Whether this unit may be combined with an SI prefix (e.g. `"kilo"`).
    /// Offset-bearing units can never be prefixable.
    prefixable: bool,
}

impl Unit {
    /// Construct a new unit. Returns `None` if an offset-bearing unit is
    /// marked prefixable, or a non-temperature dimension is given a
    /// non-zero offset (both are invariant violations per the data model).
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        dimension: Dimension,
        si_factor: f64,
        si_offset: f64,
        prefixable: bool,
    ) -> Option<Self> {
        if si_offset != 0.0 {
            if prefixable {
                return None;
            }
            if dimension != Dimension::base(crate::dimension::TEMPERATURE) {
                return None;
            }
        }
        Some(Self {
            name: name.into(),
            symbol: symbol.into(),
            dimension,
            si_factor,
            si_offset,
            prefixable,
        })
    }

    /// Build a purely multiplicative unit (`si_offset = 0`).
    #[must_use]
    pub fn scaled(
        name: impl Into<String>,
        symbol: impl Into<String>,
        dimension: Dimension,
        si_factor: f64,
        prefixable: bool,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            dimension,
            si_factor,
            si_offset: 0.0,
            prefixable,
        }
    }

    /// Canonical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The dimension this unit measures.
    #[must_use]
    pub const fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Multiplicative factor to SI.
    #[must_use]
    pub const fn si_factor(&self) -> f64 {
        self.si_factor
    }

    /// Additive offset to SI.
    #[must_use]
    pub const fn si_offset(&self) -> f64 {
        self.si_offset
    }

    /// Whether this unit may carry an SI prefix.
    #[must_use]
    pub const fn is_prefixable(&self) -> bool {
        self.prefixable
    }

    /// Convert a raw numeric value in this unit to SI base units.
    #[must_use]
    pub fn to_si(&self, value: f64) -> f64 {
        value * self.si_factor + self.si_offset
    }

    /// Convert an SI base-unit value into this unit's display value.
    #[must_use]
    pub fn from_si(&self, si_value: f64) -> f64 {
        (si_value - self.si_offset) / self.si_factor
    }

    /// Derive a prefixed copy of this unit (e.g. `kilo` + `gram` = `kilogram`).
    /// The caller is responsible for checking [`Self::is_prefixable`] first.
    #[must_use]
    pub fn with_prefix(&self, prefix_name: &str, prefix_symbol: &str, factor: f64) -> Self {
        Self {
            name: format!("{prefix_name}{}", self.name),
            symbol: format!("{prefix_symbol}{}", self.symbol),
            dimension: self.dimension,
            si_factor: self.si_factor * factor,
            si_offset: 0.0,
            prefixable: false,
        }
    }
}

/// On-disk representation of a unit entry loaded from a TOML/JSON catalog.
/// Mirrors the external Unit catalog contract: `(name, symbol, dimension
/// exponents, si_factor, si_offset, aliases, prefixable)`.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitCatalogEntry {
    /// Canonical name.
    pub name: String,
    /// Display symbol.
    pub symbol: String,
    /// Exponents of the seven SI base dimensions, in
    /// `[length, mass, time, current, temperature, amount, luminosity]` order.
    pub dimension: [i32; crate::dimension::BASE_COUNT],
    /// Multiplicative factor to SI base units.
    pub si_factor: f64,
    /// Additive offset to SI base units.
    #[serde(default)]
    pub si_offset: f64,
    /// Alternative names/symbols this unit may be looked up by.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Whether SI prefixes may be applied to this unit.
    #[serde(default)]
    pub prefixable: bool,
}

impl UnitCatalogEntry {
    /// Build the runtime [`Unit`] this catalog entry describes.
    #[must_use]
    pub fn to_unit(&self) -> Option<Unit> {
        Unit::new(
            self.name.clone(),
            self.symbol.clone(),
            Dimension::from_exponents(self.dimension),
            self.si_factor,
            self.si_offset,
            self.prefixable,
        )
    }
}
