//! Loading unit and quantity catalogs from files on disk, as a caller
//! shipping a TOML catalog alongside their binary would.

mod common;

use std::io::Write;

use qnty_core::units::standard_si_prefixes;
use qnty_core::{QuantityCatalog, UnitRegistry};

const UNIT_CATALOG_TOML: &str = r#"
[[units]]
name = "meter"
symbol = "m"
dimension = [1, 0, 0, 0, 0, 0, 0]
si_factor = 1.0
prefixable = true

[[units]]
name = "pound_force_per_square_inch"
symbol = "psi"
dimension = [-1, 1, -2, 0, 0, 0, 0]
si_factor = 6894.757293168361
"#;

const QUANTITY_CATALOG_TOML: &str = r#"
[[quantities]]
name = "Length"
dimension = [1, 0, 0, 0, 0, 0, 0]
default_unit_name = "meter"

[[quantities]]
name = "Pressure"
dimension = [-1, 1, -2, 0, 0, 0, 0]
default_unit_name = "pound_force_per_square_inch"
"#;

#[test]
fn unit_registry_loads_from_a_file_on_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp catalog file");
    file.write_all(UNIT_CATALOG_TOML.as_bytes()).expect("write catalog");

    let text = std::fs::read_to_string(file.path()).expect("read catalog back");
    let registry = UnitRegistry::from_toml_str(&text).expect("parse catalog");

    // 2 declared units, plus every standard SI-prefix variant of the
    // prefixable "meter" entry ("psi" is not prefixable).
    assert_eq!(registry.len(), 2 + standard_si_prefixes().len());
    let meter = registry.by_name("meter").expect("meter registered");
    assert_eq!(meter.symbol(), "m");
    let kilometer = registry.resolve("kilometer").expect("prefix expansion applies to meter");
    assert!((kilometer.si_factor() - 1000.0).abs() < 1e-9);
}

#[test]
fn quantity_catalog_loads_from_a_file_and_resolves_against_the_unit_registry() {
    let mut unit_file = tempfile::NamedTempFile::new().expect("create temp unit catalog");
    unit_file.write_all(UNIT_CATALOG_TOML.as_bytes()).expect("write unit catalog");
    let unit_text = std::fs::read_to_string(unit_file.path()).expect("read unit catalog");
    let registry = UnitRegistry::from_toml_str(&unit_text).expect("parse unit catalog");

    let mut quantity_file = tempfile::NamedTempFile::new().expect("create temp quantity catalog");
    quantity_file.write_all(QUANTITY_CATALOG_TOML.as_bytes()).expect("write quantity catalog");
    let quantity_text = std::fs::read_to_string(quantity_file.path()).expect("read quantity catalog");

    let catalog = QuantityCatalog::from_toml_str(&quantity_text, &registry).expect("parse quantity catalog");
    assert_eq!(catalog.len(), 2);

    let pressure = catalog.kind("Pressure").expect("Pressure kind registered");
    assert_eq!(pressure.dimension(), common::pressure_dimension());
    assert_eq!(pressure.default_unit().name(), "pound_force_per_square_inch");
}
