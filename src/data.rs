// src/data.rs
// Static element data used to build target materials. Molar masses are the
// standard atomic weights in g/mole (rounded), which is what the dark brem
// cross section expects for its A argument.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Entry in the element table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementData {
    pub symbol: &'static str,
    pub name: &'static str,
    /// Atomic number
    pub z: u32,
    /// Molar mass in g/mole
    pub a: f64,
}

const ELEMENT_TABLE: &[ElementData] = &[
    ElementData { symbol: "H", name: "Hydrogen", z: 1, a: 1.008 },
    ElementData { symbol: "He", name: "Helium", z: 2, a: 4.0026 },
    ElementData { symbol: "Li", name: "Lithium", z: 3, a: 6.94 },
    ElementData { symbol: "Be", name: "Beryllium", z: 4, a: 9.0122 },
    ElementData { symbol: "B", name: "Boron", z: 5, a: 10.81 },
    ElementData { symbol: "C", name: "Carbon", z: 6, a: 12.011 },
    ElementData { symbol: "N", name: "Nitrogen", z: 7, a: 14.007 },
    ElementData { symbol: "O", name: "Oxygen", z: 8, a: 15.999 },
    ElementData { symbol: "F", name: "Fluorine", z: 9, a: 18.998 },
    ElementData { symbol: "Na", name: "Sodium", z: 11, a: 22.990 },
    ElementData { symbol: "Mg", name: "Magnesium", z: 12, a: 24.305 },
    ElementData { symbol: "Al", name: "Aluminum", z: 13, a: 26.982 },
    ElementData { symbol: "Si", name: "Silicon", z: 14, a: 28.085 },
    ElementData { symbol: "P", name: "Phosphorus", z: 15, a: 30.974 },
    ElementData { symbol: "S", name: "Sulfur", z: 16, a: 32.06 },
    ElementData { symbol: "Cl", name: "Chlorine", z: 17, a: 35.45 },
    ElementData { symbol: "Ar", name: "Argon", z: 18, a: 39.948 },
    ElementData { symbol: "K", name: "Potassium", z: 19, a: 39.098 },
    ElementData { symbol: "Ca", name: "Calcium", z: 20, a: 40.078 },
    ElementData { symbol: "Ti", name: "Titanium", z: 22, a: 47.867 },
    ElementData { symbol: "Cr", name: "Chromium", z: 24, a: 51.996 },
    ElementData { symbol: "Mn", name: "Manganese", z: 25, a: 54.938 },
    ElementData { symbol: "Fe", name: "Iron", z: 26, a: 55.845 },
    ElementData { symbol: "Ni", name: "Nickel", z: 28, a: 58.693 },
    ElementData { symbol: "Cu", name: "Copper", z: 29, a: 63.546 },
    ElementData { symbol: "Zn", name: "Zinc", z: 30, a: 65.38 },
    ElementData { symbol: "Ge", name: "Germanium", z: 32, a: 72.630 },
    ElementData { symbol: "Mo", name: "Molybdenum", z: 42, a: 95.95 },
    ElementData { symbol: "Ag", name: "Silver", z: 47, a: 107.87 },
    ElementData { symbol: "Sn", name: "Tin", z: 50, a: 118.71 },
    ElementData { symbol: "I", name: "Iodine", z: 53, a: 126.90 },
    ElementData { symbol: "Cs", name: "Cesium", z: 55, a: 132.91 },
    ElementData { symbol: "Ba", name: "Barium", z: 56, a: 137.33 },
    ElementData { symbol: "W", name: "Tungsten", z: 74, a: 183.84 },
    ElementData { symbol: "Pt", name: "Platinum", z: 78, a: 195.08 },
    ElementData { symbol: "Au", name: "Gold", z: 79, a: 196.97 },
    ElementData { symbol: "Pb", name: "Lead", z: 82, a: 207.2 },
    ElementData { symbol: "Bi", name: "Bismuth", z: 83, a: 208.98 },
    ElementData { symbol: "U", name: "Uranium", z: 92, a: 238.03 },
];

/// Element data keyed by symbol (e.g. `"W"`).
pub static ELEMENTS: Lazy<HashMap<&'static str, ElementData>> = Lazy::new(|| {
    ELEMENT_TABLE.iter().map(|e| (e.symbol, *e)).collect()
});

/// Look up an element by exact symbol first, then by exact name.
pub fn find_element(symbol_or_name: &str) -> Option<ElementData> {
    let input = symbol_or_name.trim();
    ELEMENTS
        .get(input)
        .copied()
        .or_else(|| ELEMENT_TABLE.iter().find(|e| e.name == input).copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_symbol_and_name() {
        let w = find_element("W").unwrap();
        assert_eq!(w.z, 74);
        assert_eq!(find_element("Tungsten"), Some(w));
        assert_eq!(find_element(" Pb ").unwrap().z, 82);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert!(find_element("w").is_none());
        assert!(find_element("tungsten").is_none());
    }

    #[test]
    fn test_table_has_unique_symbols() {
        assert_eq!(ELEMENTS.len(), ELEMENT_TABLE.len());
    }
}
