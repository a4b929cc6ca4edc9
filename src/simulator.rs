//! Caller-owned transport loop over a stack of slabs.
//!
//! Every track is stepped to whichever comes first: the next discrete
//! interaction of one of its active processes or the next slab boundary
//! along z. Biasing operators declared for the current slab replace the
//! natural interaction rate of the process they wrap, and the track weight
//! picks up the compensating factor at the end of each step.

use crate::bank::TrackStack;
use crate::biasing::{create_operator, ChangeCrossSection, XsecBiasingOperator};
use crate::config::SimConfig;
use crate::data::ElementData;
use crate::error::{ConfigError, Result};
use crate::fast_rng::FastRng;
use crate::material::Material;
use crate::model::{create_model, ModelSetup};
use crate::particle_change::{Secondary, TrackStatus};
use crate::process::{ConstantXsecProcess, DarkBremProcess, DarkBremSettings, DARK_BREM_PROCESS_NAME};
use crate::process_table::ProcessTable;
use crate::run_header::RunHeader;
use crate::track::{Species, Track};
use crate::units::MILLIBARN;
use nalgebra::Vector3;
use rand::RngCore;
use rand_distr::{Distribution, Exp1};

/// Steps after which a track is abandoned
const MAX_STEPS_PER_TRACK: u32 = 100_000;
/// Stream index used for run-level random numbers
const RUN_STREAM: u64 = u64::MAX;

/// Slab of material perpendicular to z.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    /// Index into the simulator's materials
    pub material: usize,
    /// Thickness [mm]
    pub thickness: f64,
}

/// One discrete interaction that happened during an event.
#[derive(Debug, Clone)]
pub struct InteractionRecord {
    pub track_id: u32,
    pub parent_id: u32,
    pub species: Species,
    pub process: String,
    pub layer: String,
    /// Element struck, for processes that pick one
    pub target: Option<ElementData>,
    pub position: Vector3<f64>,
    /// Kinetic energy before the interaction [MeV]
    pub kinetic_energy: f64,
    /// Track weight including the factor of this step
    pub weight: f64,
    pub secondaries: Vec<Secondary>,
}

#[derive(Debug, Clone)]
pub struct EventSummary {
    pub event_id: u64,
    /// Final weight of the primary
    pub weight: f64,
    pub interactions: Vec<InteractionRecord>,
    pub dark_brem_count: usize,
    pub tracks: u32,
}

impl EventSummary {
    pub fn dark_brem_interactions(&self) -> impl Iterator<Item = &InteractionRecord> {
        self.interactions
            .iter()
            .filter(|i| i.process == DARK_BREM_PROCESS_NAME)
    }
}

/// Totals over the events of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub events: u64,
    pub interactions: u64,
    pub dark_brem_count: u64,
    /// Sum of the weights of every dark brem interaction
    pub weighted_dark_brem: f64,
}

/// A candidate interaction for the current step
struct Candidate {
    process: usize,
    natural_cross_section: f64,
    biasing: Option<ChangeCrossSection>,
    distance: f64,
}

pub struct Simulator {
    processes: ProcessTable,
    operators: Vec<Box<dyn XsecBiasingOperator>>,
    materials: Vec<Material>,
    layers: Vec<Layer>,
    /// z of each layer's upstream face, plus the downstream face of the last
    edges: Vec<f64>,
    stack: TrackStack,
    header: RunHeader,
    seed: u64,
    primary: Track,
    run_started: bool,
}

impl Simulator {
    pub fn new(
        processes: ProcessTable,
        operators: Vec<Box<dyn XsecBiasingOperator>>,
        materials: Vec<Material>,
        layers: Vec<Layer>,
        header: RunHeader,
        seed: u64,
        primary: Track,
    ) -> Self {
        let mut edges = Vec::with_capacity(layers.len() + 1);
        let mut z = 0.0;
        edges.push(z);
        for layer in &layers {
            z += layer.thickness;
            edges.push(z);
        }
        Self {
            processes,
            operators,
            materials,
            layers,
            edges,
            stack: TrackStack::with_capacity(16),
            header,
            seed,
            primary,
            run_started: false,
        }
    }

    /// Build the geometry, processes and operators a configuration describes.
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        config.validate()?;

        let mut materials = Vec::with_capacity(config.materials.len());
        for m in &config.materials {
            if materials.iter().any(|other: &Material| other.material_id == m.id) {
                return Err(ConfigError::invalid(
                    format!("materials.{}.id", m.name),
                    format!("material id {} is used twice", m.id),
                )
                .into());
            }
            materials.push(m.build()?);
        }

        let layers = config
            .layers
            .iter()
            .map(|l| -> Result<Layer> {
                let material = config
                    .materials
                    .iter()
                    .position(|m| m.name == l.material)
                    .ok_or_else(|| {
                        ConfigError::invalid(
                            format!("layers.{}.material", l.name),
                            format!("no material named '{}'", l.material),
                        )
                    })?;
                Ok(Layer {
                    name: l.name.clone(),
                    material,
                    thickness: l.thickness,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let beam_species: Species = config.beam.species.parse()?;
        let db = &config.dark_brem;
        let lepton = db.lepton();

        let mut processes = ProcessTable::new();
        for p in &config.natural_processes {
            let species: Species = p.particle.parse()?;
            processes.register(Box::new(ConstantXsecProcess::new(
                p.name.clone(),
                species,
                p.cross_section * MILLIBARN,
            )));
        }
        if db.enable {
            let setup = ModelSetup {
                ap_mass: db.ap_mass,
                lepton,
                always_create_new_lepton: db.always_create_new_lepton,
                params: &db.model,
            };
            let model = create_model(&setup)?;
            let settings = DarkBremSettings {
                lepton,
                ap_mass: db.ap_mass,
                only_one_per_event: db.only_one_per_event,
                cache_xsec: db.cache_xsec,
                table_energy: config.beam.energy,
            };
            processes.register(Box::new(DarkBremProcess::new(model, settings)));
        }

        let mut operators = Vec::with_capacity(config.biasing_operators.len());
        for op_config in &config.biasing_operators {
            let operator = create_operator(op_config, lepton)
                .ok_or_else(|| ConfigError::UnknownOperator(op_config.class_name.clone()))??;
            if !config.layers.iter().any(|l| l.name == operator.volume_to_bias()) {
                log::warn!(
                    "[ {} ]: Volume '{}' is not part of the geometry, operator will never act",
                    op_config.instance_name(),
                    operator.volume_to_bias()
                );
            }
            processes.bias(operator.particle_to_bias());
            operators.push(operator);
        }

        let primary = Track::new(beam_species, config.beam.energy, Vector3::z());
        let header = RunHeader::new(config.run.run_number, config.run.description.clone());

        Ok(Self::new(
            processes,
            operators,
            materials,
            layers,
            header,
            config.run.seed,
            primary,
        ))
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    pub fn processes_mut(&mut self) -> &mut ProcessTable {
        &mut self.processes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn header(&self) -> &RunHeader {
        &self.header
    }

    /// Primary used by [`Simulator::run`]
    pub fn primary(&self) -> &Track {
        &self.primary
    }

    /// Prepare processes and operators for a new run and record the
    /// configuration into the run header.
    pub fn begin_run(&mut self) -> Result<()> {
        let mut rng = FastRng::for_event(self.seed, RUN_STREAM);
        self.processes.start_run(&self.materials, &mut rng)?;
        for op in &mut self.operators {
            op.start_run(&self.processes)?;
        }

        self.processes.record_config(&mut self.header);
        for op in &self.operators {
            op.record_config(&mut self.header);
        }
        self.run_started = true;
        log::info!(
            "Run {} started with {} processes and {} biasing operators",
            self.header.run_number,
            self.processes.len(),
            self.operators.len()
        );
        Ok(())
    }

    /// Simulate `events` events of the configured primary.
    pub fn run(&mut self, events: u64) -> Result<RunSummary> {
        if !self.run_started {
            self.begin_run()?;
        }
        let mut summary = RunSummary::default();
        for event_id in 0..events {
            let event = self.simulate_event(event_id, self.primary.clone())?;
            summary.events += 1;
            summary.interactions += event.interactions.len() as u64;
            summary.dark_brem_count += event.dark_brem_count as u64;
            summary.weighted_dark_brem += event.dark_brem_interactions().map(|i| i.weight).sum::<f64>();
            if (event_id + 1) % 1000 == 0 {
                log::info!("Processed {} events", event_id + 1);
            }
        }
        Ok(summary)
    }

    /// Transport `primary` and all its descendants.
    ///
    /// Processes are told the event ended even when transport fails, so a
    /// dark brem process switched off by this event is active again.
    pub fn simulate_event(&mut self, event_id: u64, primary: Track) -> Result<EventSummary> {
        let mut rng = FastRng::for_event(self.seed, event_id);
        let result = self.transport_event(event_id, primary, &mut rng);
        self.processes.end_event();
        result
    }

    fn transport_event(
        &mut self,
        event_id: u64,
        primary: Track,
        rng: &mut dyn RngCore,
    ) -> Result<EventSummary> {
        let mut summary = EventSummary {
            event_id,
            weight: primary.weight,
            interactions: Vec::new(),
            dark_brem_count: 0,
            tracks: 0,
        };

        self.stack.push_primary(primary);
        while let Some(mut track) = self.stack.pop() {
            self.transport_track(&mut track, &mut summary, rng)?;
            if track.track_id == 1 {
                summary.weight = track.weight;
            }
        }
        summary.tracks = self.stack.tracks_created();
        summary.dark_brem_count = summary.dark_brem_interactions().count();
        log::debug!(
            "Event {}: {} tracks, {} interactions, weight {}",
            event_id,
            summary.tracks,
            summary.interactions.len(),
            summary.weight
        );
        Ok(summary)
    }

    /// Layer containing `z` for a track moving with `dir_z`
    fn locate(&self, z: f64, dir_z: f64) -> Option<usize> {
        let n = self.layers.len();
        let idx = if dir_z >= 0.0 {
            self.edges.partition_point(|&e| e <= z)
        } else {
            self.edges.partition_point(|&e| e < z)
        };
        (idx >= 1 && idx <= n).then(|| idx - 1)
    }

    fn transport_track(
        &mut self,
        track: &mut Track,
        summary: &mut EventSummary,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let Some(mut layer_idx) = self.locate(track.position.z, track.direction.z) else {
            return Ok(());
        };

        for _ in 0..MAX_STEPS_PER_TRACK {
            if !track.alive || track.kinetic_energy <= 0.0 {
                return Ok(());
            }
            let material_idx = self.layers[layer_idx].material;

            let candidates = self.collect_candidates(track, layer_idx, rng);
            let collision = candidates
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.distance.total_cmp(&b.1.distance))
                .map(|(i, c)| (i, c.distance));
            let dist_collision = collision.map_or(f64::INFINITY, |(_, d)| d);

            let dir_z = track.direction.z;
            let (dist_surface, exit_z) = if dir_z > 0.0 {
                ((self.edges[layer_idx + 1] - track.position.z) / dir_z, self.edges[layer_idx + 1])
            } else if dir_z < 0.0 {
                ((self.edges[layer_idx] - track.position.z) / dir_z, self.edges[layer_idx])
            } else {
                (f64::INFINITY, track.position.z)
            };

            if dist_surface.is_infinite() && dist_collision.is_infinite() {
                // moving parallel to the slabs with nothing to do
                return Ok(());
            }

            let step = dist_surface.min(dist_collision);
            let fired = collision.and_then(|(i, d)| (d < dist_surface).then_some(i));
            track.move_by(step);

            for (i, c) in candidates.iter().enumerate() {
                if let Some(op) = &c.biasing {
                    track.weight *= if Some(i) == fired {
                        op.weight_for_interaction(c.natural_cross_section, step)
                    } else {
                        op.weight_for_survival(c.natural_cross_section, step)
                    };
                }
            }

            let Some(fired) = fired else {
                track.position.z = exit_z;
                let next = if dir_z > 0.0 {
                    layer_idx + 1
                } else {
                    layer_idx.wrapping_sub(1)
                };
                if next >= self.layers.len() {
                    log::trace!("Track {} left the setup", track.track_id);
                    return Ok(());
                }
                layer_idx = next;
                continue;
            };

            let process_idx = candidates[fired].process;
            let material = &self.materials[material_idx];
            let process = self.processes.get_mut(process_idx);
            let change = process.post_step_do_it(track, material, rng)?;
            let process_name = process.name().to_string();
            log::debug!(
                "Track {} ({}) underwent {} in {} at z = {:.4} mm",
                track.track_id,
                track.species,
                process_name,
                self.layers[layer_idx].name,
                track.position.z
            );

            for secondary in &change.secondaries {
                self.stack.push_secondary(secondary, track);
            }
            summary.interactions.push(InteractionRecord {
                track_id: track.track_id,
                parent_id: track.parent_id,
                species: track.species,
                process: process_name,
                layer: self.layers[layer_idx].name.clone(),
                target: change.target,
                position: track.position,
                kinetic_energy: track.kinetic_energy,
                weight: track.weight,
                secondaries: change.secondaries.clone(),
            });

            change.update_track(track);
            if change.status == TrackStatus::StopAndKill {
                return Ok(());
            }
        }

        log::warn!(
            "Track {} abandoned after {} steps at z = {} mm",
            track.track_id,
            MAX_STEPS_PER_TRACK,
            track.position.z
        );
        track.alive = false;
        Ok(())
    }

    /// Distance to the next interaction of every active process of `track`.
    fn collect_candidates(
        &mut self,
        track: &Track,
        layer_idx: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Candidate> {
        let layer = &self.layers[layer_idx];
        let material = &self.materials[layer.material];
        let mut candidates = Vec::new();

        for process_idx in self.processes.active_for(track.species) {
            let process = self.processes.get_mut(process_idx);
            let mfp = process.mean_free_path(track, material);
            if !(mfp.is_finite() && mfp > 0.0) {
                continue;
            }

            let name = process.name();
            let biasing = self
                .operators
                .iter_mut()
                .find(|op| {
                    op.particle_to_bias() == track.species
                        && op.volume_to_bias() == layer.name
                        && op.factor_for(name).is_some()
                })
                .and_then(|op| op.propose_occurrence(track, name, mfp, rng));

            let distance = match &biasing {
                Some(op) => op.distance(),
                None => {
                    let lengths: f64 = Exp1.sample(rng);
                    lengths * mfp
                }
            };
            candidates.push(Candidate {
                process: process_idx,
                natural_cross_section: 1.0 / mfp,
                biasing,
                distance,
            });
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::BARN;
    use approx::assert_relative_eq;

    fn tungsten(id: u32) -> Material {
        let mut m = Material::with_id(id);
        m.set_name("W");
        m.add_element("W", 1.0).unwrap();
        m.set_density("g/cm3", 19.3).unwrap();
        m
    }

    fn two_slabs(processes: ProcessTable) -> Simulator {
        let layers = vec![
            Layer { name: "target".into(), material: 0, thickness: 0.35 },
            Layer { name: "absorber".into(), material: 0, thickness: 10.0 },
        ];
        Simulator::new(
            processes,
            Vec::new(),
            vec![tungsten(1)],
            layers,
            RunHeader::default(),
            42,
            Track::new(Species::Electron, 4000.0, Vector3::z()),
        )
    }

    #[test]
    fn test_locate() {
        let sim = two_slabs(ProcessTable::new());
        assert_eq!(sim.locate(0.0, 1.0), Some(0));
        assert_eq!(sim.locate(0.35, 1.0), Some(1));
        assert_eq!(sim.locate(0.35, -1.0), Some(0));
        assert_eq!(sim.locate(20.0, 1.0), None);
        assert_eq!(sim.locate(-1.0, 1.0), None);
        assert_eq!(sim.locate(0.0, -1.0), None);
    }

    #[test]
    fn test_track_without_processes_crosses_every_layer() {
        let mut sim = two_slabs(ProcessTable::new());
        sim.begin_run().unwrap();
        let event = sim
            .simulate_event(0, Track::new(Species::Gamma, 10.0, Vector3::z()))
            .unwrap();
        assert!(event.interactions.is_empty());
        assert_eq!(event.tracks, 1);
        assert_eq!(event.weight, 1.0);
    }

    #[test]
    fn test_absorbed_in_thick_layer() {
        let mut table = ProcessTable::new();
        // mean free path of about 16 um in tungsten
        table.register(Box::new(ConstantXsecProcess::new("electronNuclear", Species::Electron, 1.0e4 * BARN)));
        let mut sim = two_slabs(table);
        sim.begin_run().unwrap();
        let summary = sim.run(50).unwrap();
        assert_eq!(summary.events, 50);
        assert_eq!(summary.interactions, 50);
        assert_eq!(summary.dark_brem_count, 0);
    }

    #[test]
    fn test_events_are_reproducible() {
        let mut table = ProcessTable::new();
        table.register(Box::new(ConstantXsecProcess::new("electronNuclear", Species::Electron, 1.0e4 * BARN)));
        let mut sim = two_slabs(table);
        sim.begin_run().unwrap();
        let primary = sim.primary().clone();
        let a = sim.simulate_event(7, primary.clone()).unwrap();
        let _ = sim.simulate_event(8, primary.clone()).unwrap();
        let b = sim.simulate_event(7, primary).unwrap();
        assert_eq!(a.interactions.len(), 1);
        assert_relative_eq!(a.interactions[0].position.z, b.interactions[0].position.z);
        assert_eq!(a.interactions[0].layer, b.interactions[0].layer);
    }
}
