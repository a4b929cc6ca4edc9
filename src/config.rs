//! TOML run configuration.
//!
//! ```toml
//! [run]
//! events = 1000
//! seed = 7
//!
//! [dark_brem]
//! enable = true
//! ap_mass = 10.0            # MeV
//! only_one_per_event = true
//!
//! [dark_brem.model]
//! name = "vertex_library"
//! library_path = "libs/electron_W_mA_10MeV"
//! method = "forward_only"   # or 1, 2, 3
//! threshold = 2.0           # GeV
//!
//! [[biasing_operators]]
//! class_name = "DarkBremXsec"
//! volume = "target"
//! factor = 1e9
//! threshold = 2000.0        # MeV
//! ```

use crate::biasing::operator_class_names;
use crate::error::ConfigError;
use crate::kinematics::ScalingMethod;
use crate::material::Material;
use crate::model::model_names;
use crate::track::Species;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub dark_brem: DarkBremConfig,
    #[serde(default)]
    pub biasing_operators: Vec<BiasOperatorConfig>,
    #[serde(default)]
    pub natural_processes: Vec<NaturalProcessConfig>,
    #[serde(default)]
    pub materials: Vec<MaterialConfig>,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub beam: BeamConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    #[serde(default = "default_events")]
    pub events: u64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub run_number: u32,
    #[serde(default)]
    pub description: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            events: default_events(),
            seed: default_seed(),
            run_number: 0,
            description: String::new(),
        }
    }
}

fn default_events() -> u64 {
    10
}
fn default_seed() -> u64 {
    1
}

/// Dark brem process settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DarkBremConfig {
    #[serde(default)]
    pub enable: bool,
    /// Dark photon mass [MeV]
    #[serde(default)]
    pub ap_mass: f64,
    #[serde(default)]
    pub only_one_per_event: bool,
    #[serde(default = "default_true")]
    pub cache_xsec: bool,
    /// Attach the process to mu- instead of e-
    #[serde(default)]
    pub muons: bool,
    #[serde(default = "default_true")]
    pub always_create_new_lepton: bool,
    #[serde(default)]
    pub model: ModelConfig,
}

impl Default for DarkBremConfig {
    fn default() -> Self {
        Self {
            enable: false,
            ap_mass: 0.0,
            only_one_per_event: false,
            cache_xsec: true,
            muons: false,
            always_create_new_lepton: true,
            model: ModelConfig::default(),
        }
    }
}

impl DarkBremConfig {
    /// Lepton the process is attached to
    pub fn lepton(&self) -> Species {
        if self.muons {
            Species::MuonMinus
        } else {
            Species::Electron
        }
    }
}

/// Scaling method given either by name or by its number.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MethodSetting {
    Index(i64),
    Name(String),
}

impl Default for MethodSetting {
    fn default() -> Self {
        MethodSetting::Name(String::from("forward_only"))
    }
}

/// Model name plus the parameters any registered model may read.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default)]
    pub library_path: Option<PathBuf>,
    #[serde(default)]
    pub method: MethodSetting,
    /// Minimum lepton energy [GeV]
    #[serde(default)]
    pub threshold: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Target molar mass for fixed-target models [g/mole]
    #[serde(default = "default_target_a")]
    pub target_a: f64,
    /// Target atomic number for fixed-target models
    #[serde(default = "default_target_z")]
    pub target_z: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            library_path: None,
            method: MethodSetting::default(),
            threshold: 0.0,
            epsilon: default_epsilon(),
            max_iterations: default_max_iterations(),
            target_a: default_target_a(),
            target_z: default_target_z(),
        }
    }
}

impl ModelConfig {
    pub fn scaling_method(&self) -> Result<ScalingMethod, ConfigError> {
        match &self.method {
            MethodSetting::Index(i) => ScalingMethod::from_index(*i).ok_or_else(|| {
                ConfigError::invalid("dark_brem.model.method", format!("unknown method {}", i))
            }),
            MethodSetting::Name(name) => name.parse(),
        }
    }
}

fn default_model_name() -> String {
    "vertex_library".into()
}
fn default_epsilon() -> f64 {
    1.0
}
fn default_max_iterations() -> u32 {
    10000
}
fn default_target_a() -> f64 {
    183.84
}
fn default_target_z() -> f64 {
    74.0
}
fn default_true() -> bool {
    true
}

/// One `[[biasing_operators]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BiasOperatorConfig {
    pub class_name: String,
    #[serde(default)]
    pub instance_name: Option<String>,
    pub volume: String,
    pub factor: f64,
    /// Minimum kinetic energy [MeV]
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub bias_all: bool,
    /// Overrides the particle the operator biases, where supported
    #[serde(default)]
    pub particle: Option<String>,
    #[serde(default)]
    pub down_bias_conversion: bool,
}

impl BiasOperatorConfig {
    pub fn instance_name(&self) -> &str {
        self.instance_name.as_deref().unwrap_or(&self.class_name)
    }
}

/// A natural process with a constant per-atom cross section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NaturalProcessConfig {
    pub name: String,
    pub particle: String,
    /// Per-atom cross section [mb]
    pub cross_section: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MaterialConfig {
    pub id: u32,
    pub name: String,
    pub density: f64,
    #[serde(default = "default_density_units")]
    pub density_units: String,
    /// Element symbol or name -> atom fraction
    pub elements: BTreeMap<String, f64>,
}

fn default_density_units() -> String {
    "g/cm3".into()
}

impl MaterialConfig {
    pub fn build(&self) -> Result<Material, ConfigError> {
        let key = format!("materials.{}", self.name);
        let mut material = Material::with_id(self.id);
        material.set_name(self.name.clone());
        material
            .set_density(&self.density_units, self.density)
            .map_err(|e| ConfigError::invalid(&key, e))?;
        for (element, fraction) in &self.elements {
            material
                .add_element(element, *fraction)
                .map_err(|e| ConfigError::invalid(&key, e))?;
        }
        material.validate().map_err(|e| ConfigError::invalid(&key, e))?;
        Ok(material)
    }
}

/// Slab of material, stacked along +z in file order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LayerConfig {
    pub name: String,
    pub material: String,
    /// Thickness [mm]
    pub thickness: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BeamConfig {
    #[serde(default = "default_beam_species")]
    pub species: String,
    /// Kinetic energy [MeV]
    #[serde(default = "default_beam_energy")]
    pub energy: f64,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            species: default_beam_species(),
            energy: default_beam_energy(),
        }
    }
}

fn default_beam_species() -> String {
    "e-".into()
}
fn default_beam_energy() -> f64 {
    4000.0
}

impl SimConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let db = &self.dark_brem;
        if db.enable {
            if !model_names().contains(&db.model.name.as_str()) {
                return Err(ConfigError::UnknownModel(db.model.name.clone()));
            }
            db.model.scaling_method()?;
            if !(db.ap_mass > 0.0) {
                return Err(ConfigError::invalid("dark_brem.ap_mass", "must be positive"));
            }
            if !(db.model.epsilon > 0.0) {
                return Err(ConfigError::invalid("dark_brem.model.epsilon", "must be positive"));
            }
            if db.model.max_iterations == 0 {
                return Err(ConfigError::invalid("dark_brem.model.max_iterations", "must be at least 1"));
            }
            if db.model.name == "vertex_library" && db.model.library_path.is_none() {
                return Err(ConfigError::invalid(
                    "dark_brem.model.library_path",
                    "required by the vertex_library model",
                ));
            }
        }

        for op in &self.biasing_operators {
            if !operator_class_names().contains(&op.class_name.as_str()) {
                return Err(ConfigError::UnknownOperator(op.class_name.clone()));
            }
            if !(op.factor > 0.0) {
                return Err(ConfigError::invalid(
                    format!("biasing_operators.{}.factor", op.instance_name()),
                    format!("must be positive, got {}", op.factor),
                ));
            }
            if let Some(particle) = &op.particle {
                particle.parse::<Species>()?;
            }
        }

        for p in &self.natural_processes {
            p.particle.parse::<Species>()?;
            if p.cross_section < 0.0 {
                return Err(ConfigError::invalid(
                    format!("natural_processes.{}.cross_section", p.name),
                    "must not be negative",
                ));
            }
        }

        for m in &self.materials {
            m.build()?;
        }
        for layer in &self.layers {
            if !self.materials.iter().any(|m| m.name == layer.material) {
                return Err(ConfigError::invalid(
                    format!("layers.{}.material", layer.name),
                    format!("no material named '{}'", layer.material),
                ));
            }
            if !(layer.thickness > 0.0) {
                return Err(ConfigError::invalid(
                    format!("layers.{}.thickness", layer.name),
                    "must be positive",
                ));
            }
        }

        self.beam.species.parse::<Species>()?;
        if !(self.beam.energy > 0.0) {
            return Err(ConfigError::invalid("beam.energy", "must be positive"));
        }
        Ok(())
    }
}

/// Load and parse a TOML configuration file.
pub fn load_config(path: &Path) -> Result<SimConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    SimConfig::from_toml_str(&content)
}
