//! Dark brem model backed by a library of pre-generated vertices.

use crate::config::ModelConfig;
use crate::data::ElementData;
use crate::error::{ConfigError, PhysicsError, Result};
use crate::four_vector::{rotate_uz, FourMomentum};
use crate::kinematics::{self, ScalingMethod};
use crate::model::{DarkBremModel, ModelSetup};
use crate::particle_change::ParticleChange;
use crate::run_header::RunHeader;
use crate::track::Track;
use crate::units::GEV;
use crate::vertex_library::{LibraryCursor, VertexLibrary};
use crate::xsec::WwCrossSection;
use rand::RngCore;
use std::path::PathBuf;
use std::sync::Arc;

/// Dark brem model that draws outgoing kinematics from a vertex library and
/// computes the cross section in the Weizsäcker-Williams approximation.
pub struct VertexLibraryModel {
    library: Arc<VertexLibrary>,
    library_path: Option<PathBuf>,
    cursor: LibraryCursor,
    method: ScalingMethod,
    max_iterations: u32,
    ap_mass: f64,
    always_create_new_lepton: bool,
    xsec: WwCrossSection,
}

impl VertexLibraryModel {
    pub fn from_setup(setup: &ModelSetup) -> Result<Self> {
        let path = setup.params.library_path.as_ref().ok_or_else(|| {
            ConfigError::invalid("dark_brem.model.library_path", "required by the vertex_library model")
        })?;
        let library = Arc::new(VertexLibrary::load(path)?);
        let mut model = Self::with_library(library, setup)?;
        model.library_path = Some(path.clone());
        Ok(model)
    }

    /// Use an already loaded library. The library path in `setup` is ignored.
    pub fn with_library(library: Arc<VertexLibrary>, setup: &ModelSetup) -> Result<Self> {
        let params: &ModelConfig = setup.params;
        Ok(Self {
            cursor: LibraryCursor::at_start(&library),
            library,
            library_path: None,
            method: params.scaling_method()?,
            max_iterations: params.max_iterations.max(1),
            ap_mass: setup.ap_mass,
            always_create_new_lepton: setup.always_create_new_lepton,
            xsec: WwCrossSection::new(
                setup.ap_mass,
                setup.lepton.mass(),
                params.epsilon,
                params.threshold * GEV,
            ),
        })
    }

    pub fn method(&self) -> ScalingMethod {
        self.method
    }

    pub fn library(&self) -> &VertexLibrary {
        &self.library
    }
}

impl DarkBremModel for VertexLibraryModel {
    fn name(&self) -> &str {
        "vertex_library"
    }

    fn print_info(&self) {
        log::info!("Dark brem vertex library model");
        if let Some(path) = &self.library_path {
            log::info!("  Vertex library:       {}", path.display());
        }
        log::info!("  Interpretation method: {}", self.method);
        log::info!("  Threshold [GeV]:      {}", self.xsec.threshold() / GEV);
        log::info!("  Epsilon:              {}", self.xsec.epsilon());
    }

    fn record_config(&self, header: &mut RunHeader) {
        header.set_float_parameter("Minimum Threshold to DB [GeV]", self.xsec.threshold() / GEV);
        header.set_float_parameter("DB Xsec Epsilon", self.xsec.epsilon());
        header.set_int_parameter("Dark Brem Interpretation Method", self.method as i64);
        if let Some(path) = &self.library_path {
            header.set_string_parameter("Dark Brem Vertex Library", path.display().to_string());
        }
    }

    fn cross_section_per_atom(&self, kinetic_energy: f64, a: f64, z: f64) -> f64 {
        self.xsec.per_atom(kinetic_energy, a, z)
    }

    fn start_run(&mut self, rng: &mut dyn RngCore) {
        self.cursor = self.library.cursor(rng);
    }

    fn generate_change(
        &mut self,
        track: &Track,
        target: &ElementData,
        _rng: &mut dyn RngCore,
    ) -> std::result::Result<ParticleChange, PhysicsError> {
        let e0 = track.total_energy();
        if self.library.bucket_index(e0).1 {
            log::warn!(
                "Requested dark brem vertex at {:.1} MeV is above the library maximum of {:.1} MeV",
                e0,
                self.library.max_energy()
            );
        }

        for _ in 0..self.max_iterations {
            let sample = self.cursor.sample(&self.library, e0);
            if self.method == ScalingMethod::CmScaling && sample.record.center_momentum.is_none() {
                return Err(PhysicsError::MissingCenterOfMomentum {
                    energy: sample.record.incident_energy,
                });
            }

            if let Some(out) = kinematics::scale(self.method, sample.record, e0, track.mass, self.ap_mass) {
                let to_lab =
                    |v: FourMomentum| FourMomentum::from_parts(v.e, rotate_uz(&track.direction, &v.p));
                log::debug!(
                    "Dark brem on {} at {:.1} MeV from library bin {:.1} MeV: lepton {:.1} MeV, A' {:.1} MeV",
                    target.symbol,
                    e0,
                    sample.record.incident_energy,
                    out.lepton.e,
                    out.dark_photon.e
                );
                let change = ParticleChange::dark_brem(
                    track,
                    to_lab(out.lepton),
                    to_lab(out.dark_photon),
                    self.ap_mass,
                    self.always_create_new_lepton,
                );
                return Ok(change.on_target(*target));
            }
        }

        Err(PhysicsError::KinematicsRejected {
            attempts: self.max_iterations,
            energy: e0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MethodSetting;
    use crate::data::find_element;
    use crate::kinematics::incident_along_z;
    use crate::particle_change::TrackStatus;
    use crate::track::Species;
    use crate::units::ELECTRON_MASS;
    use crate::vertex_library::VertexRecord;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record(e_lib: f64, fraction: f64, pt: f64) -> VertexRecord {
        let e = fraction * e_lib;
        let pz = (e * e - ELECTRON_MASS * ELECTRON_MASS - pt * pt).sqrt();
        let lepton = FourMomentum::new(e, pt, 0.0, pz);
        VertexRecord::from_momenta(e_lib, lepton, Some(incident_along_z(e_lib, ELECTRON_MASS) - lepton))
    }

    fn tungsten() -> ElementData {
        find_element("W").unwrap()
    }

    fn model(records: Vec<VertexRecord>, method: i64, max_iterations: u32) -> VertexLibraryModel {
        let params = ModelConfig {
            method: MethodSetting::Index(method),
            max_iterations,
            ..Default::default()
        };
        let setup = ModelSetup {
            ap_mass: 10.0,
            lepton: Species::Electron,
            always_create_new_lepton: true,
            params: &params,
        };
        let library = Arc::new(VertexLibrary::from_records(records).unwrap());
        VertexLibraryModel::with_library(library, &setup).unwrap()
    }

    #[test]
    fn test_forward_only_change() {
        let mut m = model(vec![record(4000.0, 0.3, 10.0)], 1, 10);
        let track = Track::new(Species::Electron, 3500.0 - ELECTRON_MASS, Vector3::z());
        let mut rng = StdRng::seed_from_u64(1);
        let change = m.generate_change(&track, &tungsten(), &mut rng).unwrap();
        assert_eq!(change.status, TrackStatus::StopAndKill);
        assert_relative_eq!(change.secondaries[1].momentum.e, 1050.0, max_relative = 1e-9);
        let ap = &change.secondaries[0];
        assert_relative_eq!(ap.momentum.mass(), 10.0, max_relative = 1e-6);
        assert_eq!(change.target.unwrap().z, 74);
        let diff = change.outgoing_four_momentum(&track).max_abs_diff(&track.four_momentum());
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_energy_above_library_is_scaled_up() {
        let mut m = model(vec![record(4000.0, 0.3, 10.0)], 1, 10);
        let track = Track::new(Species::Electron, 6000.0, Vector3::z());
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..3 {
            let change = m.generate_change(&track, &tungsten(), &mut rng).unwrap();
            assert_relative_eq!(
                change.secondaries[1].momentum.e,
                0.3 * track.total_energy(),
                max_relative = 1e-9
            );
        }
    }

    #[test]
    fn test_change_is_rotated_into_track_frame() {
        let mut m = model(vec![record(4000.0, 0.5, 0.0)], 1, 10);
        let dir = Vector3::new(1.0, 0.0, 1.0).normalize();
        let track = Track::new(Species::Electron, 3000.0, dir);
        let mut rng = StdRng::seed_from_u64(2);
        let change = m.generate_change(&track, &tungsten(), &mut rng).unwrap();
        let lepton = &change.secondaries[1];
        assert!((lepton.direction - dir).norm() < 1e-9);
        let diff = change.outgoing_four_momentum(&track).max_abs_diff(&track.four_momentum());
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_rejection_limit_is_fatal() {
        // 0.01 * 1000 MeV = 10 MeV lepton cannot carry 30 MeV of pt
        let mut m = model(vec![record(4000.0, 0.01, 30.0)], 1, 25);
        let track = Track::new(Species::Electron, 1000.0, Vector3::z());
        let mut rng = StdRng::seed_from_u64(3);
        match m.generate_change(&track, &tungsten(), &mut rng) {
            Err(PhysicsError::KinematicsRejected { attempts, .. }) => assert_eq!(attempts, 25),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_cm_scaling_requires_center_momentum() {
        let mut r = record(4000.0, 0.3, 10.0);
        r.center_momentum = None;
        let mut m = model(vec![r], 2, 10);
        let track = Track::new(Species::Electron, 3500.0, Vector3::z());
        let mut rng = StdRng::seed_from_u64(4);
        assert!(matches!(
            m.generate_change(&track, &tungsten(), &mut rng),
            Err(PhysicsError::MissingCenterOfMomentum { .. })
        ));
    }

    #[test]
    fn test_record_config() {
        let m = model(vec![record(4000.0, 0.3, 10.0)], 2, 10);
        let mut header = RunHeader::default();
        m.record_config(&mut header);
        assert_eq!(header.int_parameter("Dark Brem Interpretation Method"), Some(2));
        assert_eq!(header.float_parameter("DB Xsec Epsilon"), Some(1.0));
        // threshold defaults to twice the A' mass
        assert_relative_eq!(header.float_parameter("Minimum Threshold to DB [GeV]").unwrap(), 0.02);
    }
}
