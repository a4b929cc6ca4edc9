//! Adapter from a GeV/picobarn dark photon library to the dark brem model interface.

use crate::dark_photons::{ExternalDarkPhotonLibrary, TabulatedDarkPhotons};
use crate::data::ElementData;
use crate::error::{PhysicsError, Result};
use crate::four_vector::{direction_from_angles, rotate_uz, FourMomentum};
use crate::model::{DarkBremModel, ModelSetup};
use crate::particle_change::ParticleChange;
use crate::run_header::RunHeader;
use crate::track::{Species, Track};
use crate::units::{GEV, PICOBARN};
use nalgebra::Vector3;
use rand::RngCore;

/// Upper end of the tabulated cross section [GeV]
const TABLE_MAX_ENERGY: f64 = 100.0;
const TABLE_POINTS: usize = 80;

/// Dark brem model backed by an [`ExternalDarkPhotonLibrary`].
///
/// The external library has a fixed target, so the per-atom (A, Z) arguments
/// are ignored. The lepton keeps `E0 (1 - x)` and the dark photon takes
/// `x E0`; for electrons the emission angles belong to the dark photon and the
/// lepton continues along the incident direction, for muons it is the other
/// way round. The nucleus absorbs any momentum imbalance.
pub struct AnalyticModel {
    library: Box<dyn ExternalDarkPhotonLibrary>,
    lepton: Species,
    always_create_new_lepton: bool,
    /// Atomic number the library was set up for
    target_z: u32,
    /// A selected element differing from `target_z` was already reported this run
    reported_mismatch: bool,
}

impl AnalyticModel {
    pub fn from_setup(setup: &ModelSetup) -> Result<Self> {
        let params = setup.params;
        let mut library = TabulatedDarkPhotons::new(
            setup.ap_mass / GEV,
            setup.lepton.mass() / GEV,
            params.epsilon,
            params.threshold,
            params.target_a,
            params.target_z,
        );
        library.prepare_table(TABLE_MAX_ENERGY, TABLE_POINTS);
        Ok(Self::with_library(Box::new(library), setup))
    }

    pub fn with_library(library: Box<dyn ExternalDarkPhotonLibrary>, setup: &ModelSetup) -> Self {
        Self {
            library,
            lepton: setup.lepton,
            always_create_new_lepton: setup.always_create_new_lepton,
            target_z: setup.params.target_z.round() as u32,
            reported_mismatch: false,
        }
    }

    /// Atomic number of the fixed target
    pub fn target_z(&self) -> u32 {
        self.target_z
    }

    fn check_target(&mut self, target: &ElementData) {
        if target.z == self.target_z {
            return;
        }
        if self.reported_mismatch {
            log::debug!("Dark brem on {} generated with the Z = {} target", target.symbol, self.target_z);
        } else {
            log::warn!(
                "Dark brem on {} (Z = {}) but the analytic model only knows Z = {}; using its kinematics",
                target.symbol,
                target.z,
                self.target_z
            );
            self.reported_mismatch = true;
        }
    }
}

impl DarkBremModel for AnalyticModel {
    fn name(&self) -> &str {
        "analytic"
    }

    fn print_info(&self) {
        log::info!("Analytic dark photon model");
        log::info!("  Threshold [GeV]: {}", self.library.threshold());
        log::info!("  Epsilon:         {}", self.library.epsilon());
    }

    fn record_config(&self, header: &mut RunHeader) {
        header.set_float_parameter("Minimum Threshold to DB [GeV]", self.library.threshold());
        header.set_float_parameter("DB Xsec Epsilon", self.library.epsilon());
    }

    fn cross_section_per_atom(&self, kinetic_energy: f64, _a: f64, _z: f64) -> f64 {
        let e = kinetic_energy / GEV;
        if e < self.library.threshold() {
            return 0.0;
        }
        self.library.sigma_total(e) * PICOBARN
    }

    fn start_run(&mut self, _rng: &mut dyn RngCore) {
        self.reported_mismatch = false;
    }

    fn generate_change(
        &mut self,
        track: &Track,
        target: &ElementData,
        rng: &mut dyn RngCore,
    ) -> std::result::Result<ParticleChange, PhysicsError> {
        self.check_target(target);
        let e0 = track.total_energy();
        let emission = self
            .library
            .simulate_emission(e0 / GEV, rng)
            .ok_or(PhysicsError::KinematicsRejected {
                attempts: 1,
                energy: e0,
            })?;

        let ap_mass = self.library.mass() * GEV;
        let lepton_e = e0 * (1.0 - emission.x);
        let ap_e = e0 * emission.x;

        let angled = rotate_uz(&track.direction, &direction_from_angles(emission.theta, emission.phi));
        let forward: Vector3<f64> = track.direction;
        let (lepton_dir, ap_dir) = if self.lepton == Species::MuonMinus {
            (angled, forward)
        } else {
            (forward, angled)
        };

        let momentum = |e: f64, m: f64, dir: Vector3<f64>| {
            FourMomentum::from_parts(e, dir * (e * e - m * m).max(0.0).sqrt())
        };
        let change = ParticleChange::dark_brem(
            track,
            momentum(lepton_e, track.mass, lepton_dir),
            momentum(ap_e, ap_mass, ap_dir),
            ap_mass,
            self.always_create_new_lepton,
        );
        Ok(change.on_target(*target))
    }
}
