//! Cross-section biasing.
//!
//! An operator multiplies the natural cross section of one wrapped process
//! by a factor for the tracks it selects. The distance to the next
//! interaction is then drawn from the biased rate and the track weight is
//! corrected with [`ChangeCrossSection::weight_for_interaction`] or
//! [`ChangeCrossSection::weight_for_survival`] at the end of the step, so
//! weighted observables stay unbiased.

use crate::bias_operators::{
    DarkBremXsec, ElectroNuclear, GammaToMuPair, K0LongInelastic, PhotoNuclear,
};
use crate::config::BiasOperatorConfig;
use crate::error::BiasSetupError;
use crate::process_table::ProcessTable;
use crate::run_header::RunHeader;
use crate::track::{Species, Track};
use once_cell::sync::Lazy;
use rand::RngCore;
use rand_distr::{Distribution, Exp1};
use std::collections::BTreeMap;

/// Occurrence biasing operation with a replaced cross section.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChangeCrossSection {
    /// Biased macroscopic cross section [1/mm]
    biased_cross_section: f64,
    /// Number of biased interaction lengths before the interaction
    interaction_lengths_left: f64,
}

impl ChangeCrossSection {
    pub fn set_biased_cross_section(&mut self, cross_section: f64) {
        self.biased_cross_section = cross_section;
    }

    pub fn biased_cross_section(&self) -> f64 {
        self.biased_cross_section
    }

    /// Draw a new number of interaction lengths.
    pub fn sample(&mut self, rng: &mut dyn RngCore) {
        self.interaction_lengths_left = Exp1.sample(rng);
    }

    pub fn interaction_lengths_left(&self) -> f64 {
        self.interaction_lengths_left
    }

    /// Distance [mm] to the interaction under the biased cross section
    pub fn distance(&self) -> f64 {
        if self.biased_cross_section > 0.0 {
            self.interaction_lengths_left / self.biased_cross_section
        } else {
            f64::INFINITY
        }
    }

    /// Weight factor when the biased process occurs after a step of length
    /// `step`, given the natural cross section [1/mm].
    pub fn weight_for_interaction(&self, natural_cross_section: f64, step: f64) -> f64 {
        natural_cross_section / self.biased_cross_section
            * (-(natural_cross_section - self.biased_cross_section) * step).exp()
    }

    /// Weight factor when the track travels `step` without the process occurring.
    pub fn weight_for_survival(&self, natural_cross_section: f64, step: f64) -> f64 {
        (-(natural_cross_section - self.biased_cross_section) * step).exp()
    }
}

/// Which tracks an operator acts on, by parent id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSelection {
    All,
    /// Tracks with parent id 0
    PrimaryOnly,
    /// Tracks with parent id 1
    ChildrenOfPrimary,
}

impl TrackSelection {
    pub fn accepts(&self, track: &Track) -> bool {
        match self {
            TrackSelection::All => true,
            TrackSelection::PrimaryOnly => track.parent_id == 0,
            TrackSelection::ChildrenOfPrimary => track.parent_id == 1,
        }
    }
}

/// State shared by every cross-section biasing operator.
#[derive(Debug, Clone)]
pub struct BiasingCore {
    pub instance_name: String,
    pub process: String,
    pub particle: Species,
    pub volume: String,
    pub factor: f64,
    /// Minimum kinetic energy [MeV]
    pub threshold: f64,
    pub selection: TrackSelection,
    operation: ChangeCrossSection,
}

impl BiasingCore {
    pub fn new(
        instance_name: impl Into<String>,
        process: impl Into<String>,
        particle: Species,
        volume: impl Into<String>,
        factor: f64,
        threshold: f64,
        selection: TrackSelection,
    ) -> Result<Self, BiasSetupError> {
        let instance_name = instance_name.into();
        if !(factor > 0.0) || !factor.is_finite() {
            return Err(BiasSetupError::InvalidFactor {
                operator: instance_name,
                factor,
            });
        }
        Ok(Self {
            instance_name,
            process: process.into(),
            particle,
            volume: volume.into(),
            factor,
            threshold,
            selection,
            operation: ChangeCrossSection::default(),
        })
    }
}

/// Particle names an operator may be declared for
pub fn particle_species(name: &str) -> Result<Species, BiasSetupError> {
    match name {
        "gamma" => Ok(Species::Gamma),
        "e-" => Ok(Species::Electron),
        "mu-" => Ok(Species::MuonMinus),
        "neutron" => Ok(Species::Neutron),
        "kaon0L" => Ok(Species::KaonZeroLong),
        other => Err(BiasSetupError::InvalidParticle(other.to_string())),
    }
}

/// Cross-section biasing operator attached to one process of one particle.
pub trait XsecBiasingOperator: Send {
    /// Name used for registration and in run header keys
    fn class_name(&self) -> &'static str;

    fn core(&self) -> &BiasingCore;

    fn core_mut(&mut self) -> &mut BiasingCore;

    fn process_to_bias(&self) -> &str {
        &self.core().process
    }

    fn particle_to_bias(&self) -> Species {
        self.core().particle
    }

    fn volume_to_bias(&self) -> &str {
        &self.core().volume
    }

    /// Factor applied to `process`, `None` if this operator leaves it alone.
    fn factor_for(&self, process: &str) -> Option<f64> {
        (process == self.core().process).then_some(self.core().factor)
    }

    /// Processes that must be wrapped for this operator besides the main one
    fn additional_processes(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Check that every process this operator biases is wrapped.
    fn start_run(&mut self, processes: &ProcessTable) -> Result<(), BiasSetupError> {
        let particle = self.particle_to_bias();
        log::info!(
            "[ {} ]: Biasing particles of type {}",
            self.core().instance_name,
            particle
        );
        processes.find_wrapped(particle, self.process_to_bias())?;
        for extra in self.additional_processes() {
            processes.find_wrapped(particle, extra)?;
        }
        Ok(())
    }

    /// Propose a biased occurrence for `calling_process` acting on `track`.
    ///
    /// `natural_interaction_length` is the mean free path [mm] the wrapped
    /// process reports for this step. Returns `None` when natural physics
    /// should proceed.
    fn propose_occurrence(
        &mut self,
        track: &Track,
        calling_process: &str,
        natural_interaction_length: f64,
        rng: &mut dyn RngCore,
    ) -> Option<ChangeCrossSection> {
        let factor = self.factor_for(calling_process)?;
        let core = self.core();
        if track.species != core.particle
            || !core.selection.accepts(track)
            || track.kinetic_energy < core.threshold
        {
            return None;
        }

        let unbiased = 1.0 / natural_interaction_length;
        let biased = unbiased * factor;
        log::trace!(
            "[ {} ]: Unbiased {} xsec: {} -> Biased xsec: {}",
            core.instance_name,
            calling_process,
            unbiased,
            biased
        );

        let operation = &mut self.core_mut().operation;
        operation.set_biased_cross_section(biased);
        operation.sample(rng);
        Some(*operation)
    }

    fn record_config(&self, header: &mut RunHeader) {
        let core = self.core();
        let prefix = format!("BiasOperator::{}", self.class_name());
        header.set_string_parameter(format!("{}::Volume", prefix), core.volume.clone());
        header.set_float_parameter(format!("{}::Factor", prefix), core.factor);
        header.set_float_parameter(format!("{}::Threshold", prefix), core.threshold);
    }
}

/// Builds an operator from its configuration. The species is the lepton the
/// dark brem process is attached to.
pub type OperatorConstructor =
    fn(&BiasOperatorConfig, Species) -> Result<Box<dyn XsecBiasingOperator>, BiasSetupError>;

static OPERATOR_REGISTRY: Lazy<BTreeMap<&'static str, OperatorConstructor>> = Lazy::new(|| {
    let mut registry: BTreeMap<&'static str, OperatorConstructor> = BTreeMap::new();
    registry.insert("DarkBremXsec", |c, lepton| Ok(Box::new(DarkBremXsec::from_config(c, lepton)?)));
    registry.insert("PhotoNuclear", |c, _| Ok(Box::new(PhotoNuclear::from_config(c)?)));
    registry.insert("ElectroNuclear", |c, _| Ok(Box::new(ElectroNuclear::from_config(c)?)));
    registry.insert("GammaToMuPair", |c, _| Ok(Box::new(GammaToMuPair::from_config(c)?)));
    registry.insert("K0LongInelastic", |c, _| Ok(Box::new(K0LongInelastic::from_config(c)?)));
    registry
});

/// Class names accepted by [`create_operator`]
pub fn operator_class_names() -> Vec<&'static str> {
    OPERATOR_REGISTRY.keys().copied().collect()
}

/// `None` if the class name is not registered.
pub fn create_operator(
    config: &BiasOperatorConfig,
    dark_brem_lepton: Species,
) -> Option<Result<Box<dyn XsecBiasingOperator>, BiasSetupError>> {
    OPERATOR_REGISTRY
        .get(config.class_name.as_str())
        .map(|constructor| constructor(config, dark_brem_lepton))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_change_cross_section_weights() {
        let mut op = ChangeCrossSection::default();
        op.set_biased_cross_section(2.0);
        // natural 0.5/mm, step 1 mm
        assert_relative_eq!(op.weight_for_interaction(0.5, 1.0), 0.25 * (1.5_f64).exp());
        assert_relative_eq!(op.weight_for_survival(0.5, 1.0), (1.5_f64).exp());
        // unbiased operation leaves weights alone
        op.set_biased_cross_section(0.5);
        assert_relative_eq!(op.weight_for_interaction(0.5, 3.0), 1.0);
        assert_relative_eq!(op.weight_for_survival(0.5, 3.0), 1.0);
    }

    #[test]
    fn test_sampled_distance_has_biased_mean() {
        let mut op = ChangeCrossSection::default();
        op.set_biased_cross_section(4.0);
        let mut rng = StdRng::seed_from_u64(9);
        let n = 20000;
        let mean = (0..n)
            .map(|_| {
                op.sample(&mut rng);
                op.distance()
            })
            .sum::<f64>()
            / n as f64;
        assert_relative_eq!(mean, 0.25, max_relative = 0.03);

        op.set_biased_cross_section(0.0);
        assert!(op.distance().is_infinite());
    }

    #[test]
    fn test_track_selection() {
        let primary = Track::new(Species::Electron, 100.0, Vector3::z());
        let child = primary.clone().with_ids(2, 1);
        let grandchild = primary.clone().with_ids(3, 2);
        assert!(TrackSelection::PrimaryOnly.accepts(&primary));
        assert!(!TrackSelection::PrimaryOnly.accepts(&child));
        assert!(TrackSelection::ChildrenOfPrimary.accepts(&child));
        assert!(!TrackSelection::ChildrenOfPrimary.accepts(&grandchild));
        assert!(TrackSelection::All.accepts(&grandchild));
    }

    #[test]
    fn test_particle_species() {
        assert_eq!(particle_species("kaon0L").unwrap(), Species::KaonZeroLong);
        let err = particle_species("e+").unwrap_err();
        assert_eq!(err.to_string(), "Invalid particle type 'e+'.");
    }

    #[test]
    fn test_invalid_factor() {
        let err = BiasingCore::new("op", "conv", Species::Gamma, "v", 0.0, 0.0, TrackSelection::All)
            .unwrap_err();
        assert!(matches!(err, BiasSetupError::InvalidFactor { .. }));
    }

    #[test]
    fn test_registry() {
        assert_eq!(
            operator_class_names(),
            vec!["DarkBremXsec", "ElectroNuclear", "GammaToMuPair", "K0LongInelastic", "PhotoNuclear"]
        );
        let config = BiasOperatorConfig {
            class_name: "Unknown".into(),
            instance_name: None,
            volume: "target".into(),
            factor: 2.0,
            threshold: 0.0,
            bias_all: false,
            particle: None,
            down_bias_conversion: false,
        };
        assert!(create_operator(&config, Species::Electron).is_none());
    }
}
