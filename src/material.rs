use crate::data::{find_element, ElementData};
use crate::units::{AVOGADRO, CM3, GRAM};

/// One element of a material together with its (unnormalized) atom fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub element: ElementData,
    pub fraction: f64,
}

/// A homogeneous target material built from elements.
///
/// Composition is given as atom fractions which need not sum to one; they are
/// normalized when the number densities are computed. The number density of
/// every element (atoms/mm³) is recomputed whenever the composition or the
/// density changes, so transport code can read it without any setup call.
///
/// The material id is the identity used by the dark brem cross-section cache
/// and the partial-sum tables, so distinct materials in one run need distinct
/// ids.
#[derive(Debug, Clone)]
pub struct Material {
    /// Unique identifier for the material
    pub material_id: u32,
    /// Optional name of the material
    pub name: Option<String>,
    /// Density value in `density_units`
    pub density: Option<f64>,
    /// Density unit (default: g/cm³)
    pub density_units: String,
    components: Vec<Component>,
    atom_densities: Vec<f64>,
}

impl Material {
    /// Create a new material with a specific ID
    pub fn with_id(material_id: u32) -> Self {
        Material {
            material_id,
            name: None,
            density: None,
            density_units: String::from("g/cm3"),
            components: Vec::new(),
            atom_densities: Vec::new(),
        }
    }

    /// Set the name of the material
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Get the name of the material
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for log messages, falling back to the id
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("material {}", self.material_id),
        }
    }

    /// Add an element by symbol (`"W"`) or name (`"Tungsten"`).
    ///
    /// Adding an element that is already present accumulates its fraction.
    pub fn add_element(&mut self, element: impl AsRef<str>, fraction: f64) -> Result<(), String> {
        if fraction <= 0.0 {
            return Err(String::from("Fraction must be positive"));
        }
        let data = find_element(element.as_ref()).ok_or_else(|| {
            format!(
                "Element '{}' is not a recognized element symbol or name (case-sensitive, must match exactly)",
                element.as_ref()
            )
        })?;

        match self
            .components
            .iter_mut()
            .find(|c| c.element.symbol == data.symbol)
        {
            Some(existing) => existing.fraction += fraction,
            None => self.components.push(Component {
                element: data,
                fraction,
            }),
        }
        self.update_atom_densities();
        Ok(())
    }

    pub fn set_density(&mut self, unit: impl AsRef<str>, value: f64) -> Result<(), String> {
        if value <= 0.0 {
            return Err(String::from("Density must be positive"));
        }
        match unit.as_ref() {
            "g/cm3" | "kg/m3" => {}
            other => return Err(format!("Unsupported density unit '{}'", other)),
        }

        self.density = Some(value);
        self.density_units = String::from(unit.as_ref());
        self.update_atom_densities();
        Ok(())
    }

    /// Elements in insertion order
    pub fn elements(&self) -> impl Iterator<Item = &ElementData> {
        self.components.iter().map(|c| &c.element)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn number_of_elements(&self) -> usize {
        self.components.len()
    }

    /// Atoms per mm³ for each element, in the same order as [`Material::elements`].
    ///
    /// Empty until both a density and at least one element are set.
    pub fn atoms_per_volume(&self) -> &[f64] {
        &self.atom_densities
    }

    /// Check that the material can be used for transport.
    pub fn validate(&self) -> Result<(), String> {
        if self.density.is_none() {
            return Err(format!("Material '{}' has no density defined", self.label()));
        }
        if self.components.is_empty() {
            return Err(format!("Material '{}' has no elements defined", self.label()));
        }
        Ok(())
    }

    fn density_g_per_cm3(&self) -> Option<f64> {
        let density = self.density?;
        match self.density_units.as_str() {
            "kg/m3" => Some(density / 1000.0),
            _ => Some(density),
        }
    }

    fn update_atom_densities(&mut self) {
        self.atom_densities.clear();
        let density = match self.density_g_per_cm3() {
            Some(d) => d * GRAM / CM3,
            None => return,
        };
        if self.components.is_empty() {
            return;
        }

        // Normalize the fractions and weight the molar mass with them
        let total_fraction: f64 = self.components.iter().map(|c| c.fraction).sum();
        let average_molar_mass: f64 = self
            .components
            .iter()
            .map(|c| c.fraction * c.element.a)
            .sum::<f64>()
            / total_fraction;

        for c in &self.components {
            let normalized_fraction = c.fraction / total_fraction;
            self.atom_densities
                .push(density * AVOGADRO / average_molar_mass * normalized_fraction);
        }
    }
}
