// Integration tests for loading vertex libraries and scaling library vertices to the track energy

use approx::assert_relative_eq;
use dark_brem_sim::config::{MethodSetting, ModelConfig};
use dark_brem_sim::kinematics::{self, ScalingMethod};
use dark_brem_sim::model::{DarkBremModel, ModelSetup};
use dark_brem_sim::particle_change::TrackStatus;
use dark_brem_sim::vertex_library_model::VertexLibraryModel;
use dark_brem_sim::{find_element, FourMomentum, LibraryCursor, LoadError, Species, Track, VertexLibrary};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

fn data_dir(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

fn model_with(library: &Arc<VertexLibrary>, method: i64) -> VertexLibraryModel {
    let params = ModelConfig {
        method: MethodSetting::Index(method),
        max_iterations: 50,
        ..ModelConfig::default()
    };
    let setup = ModelSetup {
        ap_mass: 100.0,
        lepton: Species::Electron,
        always_create_new_lepton: true,
        params: &params,
    };
    VertexLibraryModel::with_library(library.clone(), &setup).unwrap()
}

#[test]
fn test_two_entry_library_loads() {
    let library = VertexLibrary::load(data_dir("two_entry")).unwrap();
    assert_eq!(library.len(), 2);
    assert_eq!(library.energies().len(), 1);
    assert_relative_eq!(library.max_energy(), 4000.0, max_relative = 1e-12);

    let fractions: Vec<f64> = library.bucket_records(0).iter().map(|r| r.fraction).collect();
    assert_relative_eq!(fractions[0], 0.3, max_relative = 1e-9);
    assert_relative_eq!(fractions[1], 0.7, max_relative = 1e-9);
    assert!(library.bucket_records(0).iter().all(|r| r.center_momentum.is_some()));
}

#[test]
fn test_directory_library_has_one_bucket_per_energy() {
    let library = VertexLibrary::load(data_dir("multi_energy")).unwrap();
    assert_eq!(library.len(), 6);
    let energies = library.energies();
    assert_eq!(energies.len(), 2);
    assert_relative_eq!(energies[0], 2000.0, max_relative = 1e-12);
    assert_relative_eq!(energies[1], 4000.0, max_relative = 1e-12);

    // smallest bucket at or above the request
    assert_eq!(library.bucket_index(1500.0), (0, false));
    assert_eq!(library.bucket_index(2000.0), (0, false));
    assert_eq!(library.bucket_index(2000.5), (1, false));
    assert_eq!(library.bucket_index(4100.0), (1, true));
}

#[test]
fn test_missing_and_empty_libraries() {
    let err = VertexLibrary::load(data_dir("does_not_exist.lhe")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));

    // a directory without any .lhe file
    let err = VertexLibrary::load(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/bin")).unwrap_err();
    assert!(matches!(err, LoadError::Empty(_)));
}

#[test]
fn test_cursor_cycles_through_every_record() {
    let library = VertexLibrary::load(data_dir("multi_energy")).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..5 {
        let mut cursor: LibraryCursor = library.cursor(&mut rng);
        let n = library.bucket_records(0).len();

        let first_pass: Vec<f64> = (0..n)
            .map(|_| cursor.sample(&library, 1800.0).record.fraction)
            .collect();
        let distinct: HashSet<u64> = first_pass.iter().map(|f| f.to_bits()).collect();
        assert_eq!(distinct.len(), n);

        // the second pass repeats the first in the same order
        let second_pass: Vec<f64> = (0..n)
            .map(|_| cursor.sample(&library, 1800.0).record.fraction)
            .collect();
        assert_eq!(first_pass, second_pass);
    }
}

#[test]
fn test_forward_only_end_to_end() {
    let library = Arc::new(VertexLibrary::load(data_dir("two_entry")).unwrap());
    let record = library
        .bucket_records(0)
        .iter()
        .find(|r| (r.fraction - 0.3).abs() < 1e-9)
        .unwrap();

    let out = kinematics::forward_only(record, 3500.0, Species::Electron.mass(), 100.0).unwrap();
    assert_relative_eq!(out.lepton.e, 1050.0, max_relative = 1e-9);
    assert_relative_eq!(out.dark_photon.mass(), 100.0, max_relative = 1e-9);
    assert_relative_eq!(
        out.lepton.e + out.dark_photon.e + out.recoil.e,
        3500.0,
        max_relative = 1e-12
    );
    assert_relative_eq!(out.lepton.pt(), record.pt, max_relative = 1e-9);
    assert!(out.lepton.pz() >= 0.0);
}

#[test]
fn test_model_draws_both_library_fractions() {
    let library = Arc::new(VertexLibrary::load(data_dir("two_entry")).unwrap());
    let mut model = model_with(&library, 1);
    let mut rng = StdRng::seed_from_u64(5);
    model.start_run(&mut rng);

    let tungsten = find_element("W").unwrap();
    let track = Track::new(Species::Electron, 3500.0, Vector3::z());
    let e0 = track.total_energy();
    let mut fractions = Vec::new();
    for _ in 0..2 {
        let change = model.generate_change(&track, &tungsten, &mut rng).unwrap();
        assert_eq!(change.status, TrackStatus::StopAndKill);
        let lepton = &change.secondaries[1];
        fractions.push(lepton.momentum.e / e0);
    }
    fractions.sort_by(f64::total_cmp);
    assert_relative_eq!(fractions[0], 0.3, max_relative = 1e-9);
    assert_relative_eq!(fractions[1], 0.7, max_relative = 1e-9);
}

#[test]
fn test_conservation_for_every_method() {
    let library = Arc::new(VertexLibrary::load(data_dir("multi_energy")).unwrap());
    let tungsten = find_element("W").unwrap();
    let mut rng = StdRng::seed_from_u64(77);

    let cases = [
        (ScalingMethod::ForwardOnly, [1800.0, 2500.0, 3900.0]),
        (ScalingMethod::CmScaling, [1800.0, 2500.0, 3900.0]),
        // unscaled vertices only make sense next to the library energies
        (ScalingMethod::Undefined, [1999.0, 3990.0, 3999.0]),
    ];
    for (method, energies) in cases {
        let mut model = model_with(&library, method as i64);
        model.start_run(&mut rng);

        for ke in energies {
            let direction = Vector3::new(0.1, -0.05, 1.0).normalize();
            let track = Track::new(Species::Electron, ke, direction);
            let incoming = track.four_momentum();
            for _ in 0..6 {
                let change = model.generate_change(&track, &tungsten, &mut rng).unwrap();
                let outgoing: FourMomentum = change.outgoing_four_momentum(&track);
                let ap = &change.secondaries[0];
                assert_relative_eq!(ap.momentum.mass(), 100.0, max_relative = 1e-6);
                assert!(
                    incoming.max_abs_diff(&outgoing) < 1e-6 * incoming.e,
                    "{} at {} MeV: {:?} vs {:?}",
                    method,
                    ke,
                    incoming,
                    outgoing
                );
                // forward along the incident direction
                assert!(change.secondaries[1].direction.dot(&direction) >= 0.0);
            }
        }
    }
}
