//! Concrete cross-section biasing operators.

use crate::biasing::{particle_species, BiasingCore, TrackSelection, XsecBiasingOperator};
use crate::config::BiasOperatorConfig;
use crate::error::BiasSetupError;
use crate::process::DARK_BREM_PROCESS_NAME;
use crate::run_header::RunHeader;
use crate::track::Species;

fn core_from_config(
    config: &BiasOperatorConfig,
    process: &str,
    particle: Species,
    selection: TrackSelection,
) -> Result<BiasingCore, BiasSetupError> {
    BiasingCore::new(
        config.instance_name(),
        process,
        particle,
        config.volume.clone(),
        config.factor,
        config.threshold,
        if config.bias_all { TrackSelection::All } else { selection },
    )
}

/// Biases the dark brem process of the lepton it is attached to.
///
/// Only the primary lepton is biased unless `bias_all` is set.
pub struct DarkBremXsec {
    core: BiasingCore,
}

impl DarkBremXsec {
    pub fn from_config(
        config: &BiasOperatorConfig,
        lepton: Species,
    ) -> Result<Self, BiasSetupError> {
        let particle = match &config.particle {
            Some(name) => particle_species(name)?,
            None => lepton,
        };
        Ok(Self {
            core: core_from_config(
                config,
                DARK_BREM_PROCESS_NAME,
                particle,
                TrackSelection::PrimaryOnly,
            )?,
        })
    }
}

impl XsecBiasingOperator for DarkBremXsec {
    fn class_name(&self) -> &'static str {
        "DarkBremXsec"
    }

    fn core(&self) -> &BiasingCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BiasingCore {
        &mut self.core
    }

    fn record_config(&self, header: &mut RunHeader) {
        header.set_string_parameter("BiasOperator::DarkBremXsec::Volume", self.core.volume.clone());
        header.set_float_parameter("BiasOperator::DarkBremXsec::Factor", self.core.factor);
        header.set_float_parameter("BiasOperator::DarkBremXsec::Threshold", self.core.threshold);
        header.set_int_parameter(
            "BiasOperator::DarkBremXsec::Bias All",
            i64::from(self.core.selection == TrackSelection::All),
        );
    }
}

/// Biases photo-nuclear reactions of photons produced by the primary.
///
/// With `down_bias_conversion` the pair conversion of the same photons is
/// suppressed by the inverse factor.
pub struct PhotoNuclear {
    core: BiasingCore,
    down_bias_conversion: bool,
}

impl PhotoNuclear {
    pub const CONVERSION_PROCESS: &'static str = "conv";

    pub fn from_config(config: &BiasOperatorConfig) -> Result<Self, BiasSetupError> {
        Ok(Self {
            core: core_from_config(
                config,
                "photonNuclear",
                Species::Gamma,
                TrackSelection::ChildrenOfPrimary,
            )?,
            down_bias_conversion: config.down_bias_conversion,
        })
    }
}

impl XsecBiasingOperator for PhotoNuclear {
    fn class_name(&self) -> &'static str {
        "PhotoNuclear"
    }

    fn core(&self) -> &BiasingCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BiasingCore {
        &mut self.core
    }

    fn factor_for(&self, process: &str) -> Option<f64> {
        if process == self.core.process {
            Some(self.core.factor)
        } else if self.down_bias_conversion && process == Self::CONVERSION_PROCESS {
            Some(1.0 / self.core.factor)
        } else {
            None
        }
    }

    fn additional_processes(&self) -> Vec<&str> {
        if self.down_bias_conversion {
            vec![Self::CONVERSION_PROCESS]
        } else {
            Vec::new()
        }
    }
}

/// Biases electro-nuclear reactions of the primary electron.
pub struct ElectroNuclear {
    core: BiasingCore,
}

impl ElectroNuclear {
    pub fn from_config(config: &BiasOperatorConfig) -> Result<Self, BiasSetupError> {
        Ok(Self {
            core: core_from_config(
                config,
                "electronNuclear",
                Species::Electron,
                TrackSelection::PrimaryOnly,
            )?,
        })
    }
}

impl XsecBiasingOperator for ElectroNuclear {
    fn class_name(&self) -> &'static str {
        "ElectroNuclear"
    }

    fn core(&self) -> &BiasingCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BiasingCore {
        &mut self.core
    }
}

/// Biases muon pair production by photons above the threshold.
pub struct GammaToMuPair {
    core: BiasingCore,
}

impl GammaToMuPair {
    pub fn from_config(config: &BiasOperatorConfig) -> Result<Self, BiasSetupError> {
        Ok(Self {
            core: core_from_config(config, "GammaToMuPair", Species::Gamma, TrackSelection::All)?,
        })
    }
}

impl XsecBiasingOperator for GammaToMuPair {
    fn class_name(&self) -> &'static str {
        "GammaToMuPair"
    }

    fn core(&self) -> &BiasingCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BiasingCore {
        &mut self.core
    }
}

/// Biases inelastic interactions of long-lived neutral kaons.
pub struct K0LongInelastic {
    core: BiasingCore,
}

impl K0LongInelastic {
    pub fn from_config(config: &BiasOperatorConfig) -> Result<Self, BiasSetupError> {
        Ok(Self {
            core: core_from_config(
                config,
                "kaon0LInelastic",
                Species::KaonZeroLong,
                TrackSelection::All,
            )?,
        })
    }
}

impl XsecBiasingOperator for K0LongInelastic {
    fn class_name(&self) -> &'static str {
        "K0LongInelastic"
    }

    fn core(&self) -> &BiasingCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BiasingCore {
        &mut self.core
    }
}
