// End-to-end tests running the dark brem process from a TOML configuration

use approx::assert_relative_eq;
use dark_brem_sim::{
    ConfigError, SimConfig, SimError, Simulator, Species, DARK_BREM_PROCESS_NAME,
};

fn library_dir() -> String {
    format!("{}/tests/data/two_entry", env!("CARGO_MANIFEST_DIR"))
}

fn config(only_one_per_event: bool) -> SimConfig {
    config_with(only_one_per_event, true)
}

fn config_with(only_one_per_event: bool, always_create_new_lepton: bool) -> SimConfig {
    let text = format!(
        r#"
        [run]
        events = 20
        seed = 11
        run_number = 3

        [dark_brem]
        enable = true
        ap_mass = 100.0
        only_one_per_event = {only_one_per_event}
        always_create_new_lepton = {always_create_new_lepton}

        [dark_brem.model]
        name = "vertex_library"
        library_path = "{library}"
        method = "forward_only"

        [[materials]]
        id = 1
        name = "tungsten"
        density = 19.3
        elements = {{ W = 1.0 }}

        [[layers]]
        name = "target"
        material = "tungsten"
        thickness = 0.35

        [[layers]]
        name = "downstream"
        material = "tungsten"
        thickness = 1.0

        [[biasing_operators]]
        class_name = "DarkBremXsec"
        volume = "target"
        factor = 1.0e6

        [beam]
        species = "e-"
        energy = 3500.0
        "#,
        library = library_dir(),
    );
    let config = SimConfig::from_toml_str(&text).unwrap();
    config.validate().unwrap();
    config
}

#[test]
fn test_biased_dark_brem_run() {
    let mut sim = Simulator::from_config(&config(true)).unwrap();
    sim.begin_run().unwrap();

    let header = sim.header();
    assert_eq!(header.run_number, 3);
    assert_eq!(header.float_parameter("A' Mass [MeV]"), Some(100.0));
    assert_eq!(header.int_parameter("Only One DB Per Event"), Some(1));
    assert_eq!(header.int_parameter("Dark Brem Interpretation Method"), Some(1));
    assert_eq!(header.float_parameter("BiasOperator::DarkBremXsec::Factor"), Some(1.0e6));

    let mut events_with_brem = 0;
    for event_id in 0..20 {
        let primary = sim.primary().clone();
        let event = sim.simulate_event(event_id, primary).unwrap();
        assert!(event.dark_brem_count <= 1);
        // the process is switched back on once the event is over
        assert!(sim
            .processes()
            .find(DARK_BREM_PROCESS_NAME)
            .map(|i| sim.processes().get(i).is_active())
            .unwrap());

        for hit in event.dark_brem_interactions() {
            events_with_brem += 1;
            assert_eq!(hit.track_id, 1);
            assert_eq!(hit.layer, "target");
            assert!(hit.weight < 1.0);

            let ap = &hit.secondaries[0];
            let lepton = &hit.secondaries[1];
            assert_eq!(ap.species, Species::DarkPhoton);
            assert_eq!(lepton.species, Species::Electron);
            let e0 = hit.kinetic_energy + Species::Electron.mass();
            let fraction = lepton.momentum.e / e0;
            assert!(
                (fraction - 0.3).abs() < 1e-9 || (fraction - 0.7).abs() < 1e-9,
                "fraction {}",
                fraction
            );
            assert_relative_eq!(ap.momentum.mass(), 100.0, max_relative = 1e-6);
            assert_eq!(hit.target.map(|t| t.z), Some(74));
        }
    }
    // about 99 % of primaries convert in the target with this factor
    assert!(events_with_brem >= 15, "{} dark brems", events_with_brem);
}

#[test]
fn test_without_once_per_event_the_process_stays_active() {
    let mut sim = Simulator::from_config(&config(false)).unwrap();
    sim.begin_run().unwrap();
    let summary = sim.run(10).unwrap();
    assert_eq!(summary.events, 10);
    assert!(summary.dark_brem_count >= 5);
    assert!(summary.weighted_dark_brem > 0.0);
    assert!(summary.weighted_dark_brem < summary.dark_brem_count as f64);
}

/// Largest number of dark brems in one event when the primary keeps
/// radiating after each brem
fn max_brems_per_event(only_one_per_event: bool) -> usize {
    let mut sim = Simulator::from_config(&config_with(only_one_per_event, false)).unwrap();
    sim.begin_run().unwrap();
    let mut most = 0;
    for event_id in 0..20 {
        let primary = sim.primary().clone();
        let event = sim.simulate_event(event_id, primary).unwrap();
        for hit in event.dark_brem_interactions() {
            assert_eq!(hit.track_id, 1);
            assert!(hit.secondaries.len() == 1);
        }
        most = most.max(event.dark_brem_count);
    }
    most
}

#[test]
fn test_surviving_primary_radiates_once_per_event() {
    assert_eq!(max_brems_per_event(true), 1);
}

#[test]
fn test_surviving_primary_radiates_repeatedly_without_the_limit() {
    let most = max_brems_per_event(false);
    assert!(most > 1, "at most {} dark brems in an event", most);
}

#[test]
fn test_run_is_reproducible() {
    let run = || {
        let mut sim = Simulator::from_config(&config(true)).unwrap();
        sim.begin_run().unwrap();
        (0..5)
            .map(|id| {
                let primary = sim.primary().clone();
                let event = sim.simulate_event(id, primary).unwrap();
                event
                    .interactions
                    .iter()
                    .map(|i| (i.position.z, i.weight))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_bad_configurations() {
    let mut bad_model = config(true);
    bad_model.dark_brem.model.name = "madgraph".into();
    assert!(matches!(
        Simulator::from_config(&bad_model),
        Err(SimError::Config(ConfigError::UnknownModel(_)))
    ));

    let mut bad_path = config(true);
    bad_path.dark_brem.model.library_path = Some("/no/such/library".into());
    assert!(matches!(
        Simulator::from_config(&bad_path),
        Err(SimError::Load(_))
    ));

    // dark brem is switched off, so nothing provides eDarkBrem for e-
    let mut no_process = config(true);
    no_process.dark_brem.enable = false;
    let mut sim = Simulator::from_config(&no_process).unwrap();
    assert!(matches!(sim.begin_run(), Err(SimError::BiasSetup(_))));
}

#[test]
fn test_analytic_model_from_config() {
    let mut analytic = config(true);
    analytic.dark_brem.model.name = "analytic".into();
    analytic.dark_brem.model.library_path = None;
    let mut sim = Simulator::from_config(&analytic).unwrap();
    sim.begin_run().unwrap();
    let summary = sim.run(10).unwrap();
    assert!(summary.dark_brem_count >= 5);
    assert!(summary.dark_brem_count <= 10);
}
