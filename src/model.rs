//! Dark brem model interface and the registry of named models.

use crate::analytic_model::AnalyticModel;
use crate::config::ModelConfig;
use crate::data::ElementData;
use crate::error::{PhysicsError, Result};
use crate::particle_change::ParticleChange;
use crate::run_header::RunHeader;
use crate::track::{Species, Track};
use crate::vertex_library_model::VertexLibraryModel;
use once_cell::sync::Lazy;
use rand::RngCore;
use std::collections::BTreeMap;

/// Cross section and final state of the dark brem process.
///
/// Energies are in MeV and cross sections in mm² per atom. A model that
/// talks to an external library in other units converts at this boundary.
pub trait DarkBremModel: Send {
    fn name(&self) -> &str;

    /// Log a summary of the model parameters
    fn print_info(&self);

    fn record_config(&self, header: &mut RunHeader);

    /// Zero below the model threshold.
    fn cross_section_per_atom(&self, kinetic_energy: f64, a: f64, z: f64) -> f64;

    /// Reset any per-run sampling state.
    fn start_run(&mut self, _rng: &mut dyn RngCore) {}

    /// Final state of an interaction of `track` on the `target` element the
    /// process selected.
    fn generate_change(
        &mut self,
        track: &Track,
        target: &ElementData,
        rng: &mut dyn RngCore,
    ) -> std::result::Result<ParticleChange, PhysicsError>;
}

/// Everything a model constructor may read.
#[derive(Debug, Clone, Copy)]
pub struct ModelSetup<'a> {
    /// Dark photon mass [MeV]
    pub ap_mass: f64,
    /// Lepton the process is attached to
    pub lepton: Species,
    pub always_create_new_lepton: bool,
    pub params: &'a ModelConfig,
}

pub type ModelConstructor = fn(&ModelSetup) -> Result<Box<dyn DarkBremModel>>;

static MODEL_REGISTRY: Lazy<BTreeMap<&'static str, ModelConstructor>> = Lazy::new(|| {
    let mut registry: BTreeMap<&'static str, ModelConstructor> = BTreeMap::new();
    registry.insert("vertex_library", |setup| {
        Ok(Box::new(VertexLibraryModel::from_setup(setup)?))
    });
    registry.insert("analytic", |setup| Ok(Box::new(AnalyticModel::from_setup(setup)?)));
    registry
});

/// Names accepted by [`create_model`]
pub fn model_names() -> Vec<&'static str> {
    MODEL_REGISTRY.keys().copied().collect()
}

/// Build the model named in `setup.params.name`.
pub fn create_model(setup: &ModelSetup) -> Result<Box<dyn DarkBremModel>> {
    let constructor = MODEL_REGISTRY
        .get(setup.params.name.as_str())
        .ok_or_else(|| crate::error::ConfigError::UnknownModel(setup.params.name.clone()))?;
    constructor(setup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, SimError};

    #[test]
    fn test_registered_names() {
        assert_eq!(model_names(), vec!["analytic", "vertex_library"]);
    }

    #[test]
    fn test_unknown_model() {
        let params = ModelConfig {
            name: "not_a_model".into(),
            ..Default::default()
        };
        let setup = ModelSetup {
            ap_mass: 10.0,
            lepton: Species::Electron,
            always_create_new_lepton: true,
            params: &params,
        };
        match create_model(&setup) {
            Err(SimError::Config(ConfigError::UnknownModel(name))) => assert_eq!(name, "not_a_model"),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("model should not exist"),
        }
    }

    #[test]
    fn test_create_analytic_model() {
        let params = ModelConfig {
            name: "analytic".into(),
            ..Default::default()
        };
        let setup = ModelSetup {
            ap_mass: 10.0,
            lepton: Species::Electron,
            always_create_new_lepton: true,
            params: &params,
        };
        let model = create_model(&setup).unwrap();
        assert_eq!(model.name(), "analytic");
        assert!(model.cross_section_per_atom(4000.0, 183.84, 74.0) > 0.0);
    }
}
