//! Discrete processes driven by the caller-owned stepping loop.

use crate::data::ElementData;
use crate::error::{PhysicsError, Result};
use crate::material::Material;
use crate::model::DarkBremModel;
use crate::particle_change::ParticleChange;
use crate::run_header::RunHeader;
use crate::track::{Species, Track};
use crate::xsec::PartialSumTable;
use rand::{Rng, RngCore};
use std::collections::HashMap;

/// A process that may occur at the end of a step.
///
/// The stepping loop asks every active, applicable process for its mean free
/// path, samples the distance to the next interaction and calls
/// [`DiscreteProcess::post_step_do_it`] on the process that wins.
pub trait DiscreteProcess: Send {
    fn name(&self) -> &str;

    fn is_applicable(&self, species: Species) -> bool;

    fn is_active(&self) -> bool;

    fn set_active(&mut self, active: bool);

    /// Mean free path [mm] of `track` in `material`, infinite if the track
    /// cannot interact.
    fn mean_free_path(&mut self, track: &Track, material: &Material) -> f64;

    fn post_step_do_it(
        &mut self,
        track: &Track,
        material: &Material,
        rng: &mut dyn RngCore,
    ) -> Result<ParticleChange>;

    /// Called once before the first event of a run.
    fn start_run(&mut self, _materials: &[Material], _rng: &mut dyn RngCore) -> Result<()> {
        Ok(())
    }

    /// Called after every event.
    fn end_event(&mut self) {}

    fn record_config(&self, _header: &mut RunHeader) {}
}

/// Entries in the mean free path cache before it is emptied
const MAX_CACHED_MEAN_FREE_PATHS: usize = 1 << 16;

/// Name the dark brem process is registered under
pub const DARK_BREM_PROCESS_NAME: &str = "eDarkBrem";

/// Process-level dark brem settings.
#[derive(Debug, Clone, Copy)]
pub struct DarkBremSettings {
    pub lepton: Species,
    /// Dark photon mass [MeV]
    pub ap_mass: f64,
    pub only_one_per_event: bool,
    pub cache_xsec: bool,
    /// Kinetic energy the element-selection tables are built at [MeV]
    pub table_energy: f64,
}

/// Dark bremsstrahlung of an electron or muon off nuclei.
///
/// Holds the active model, the per-run mean free path cache and the element
/// selection tables. With `only_one_per_event` the process switches itself
/// off when it fires; [`DiscreteProcess::end_event`] always switches it back on.
pub struct DarkBremProcess {
    model: Box<dyn DarkBremModel>,
    settings: DarkBremSettings,
    active: bool,
    xsec_cache: HashMap<(u32, u64), f64>,
    partial_sums: HashMap<u32, PartialSumTable>,
    last_target: Option<ElementData>,
}

impl DarkBremProcess {
    pub fn new(model: Box<dyn DarkBremModel>, settings: DarkBremSettings) -> Self {
        Self {
            model,
            settings,
            active: true,
            xsec_cache: HashMap::new(),
            partial_sums: HashMap::new(),
            last_target: None,
        }
    }

    pub fn model(&self) -> &dyn DarkBremModel {
        self.model.as_ref()
    }

    pub fn settings(&self) -> &DarkBremSettings {
        &self.settings
    }

    /// Number of cached mean free paths
    pub fn cache_len(&self) -> usize {
        self.xsec_cache.len()
    }

    /// Element the last interaction happened on
    pub fn last_target(&self) -> Option<&ElementData> {
        self.last_target.as_ref()
    }

    /// Pick the target element for an interaction in `material`.
    pub fn select_random_atom(&mut self, material: &Material, u: f64) -> Result<ElementData> {
        let components = material.components();
        match components.len() {
            0 => return Err(PhysicsError::EmptyMaterial(material.label()).into()),
            1 => return Ok(components[0].element),
            _ => {}
        }

        if !self.partial_sums.contains_key(&material.material_id) {
            let table = self.build_partial_sums(material);
            self.partial_sums.insert(material.material_id, table);
        }
        let idx = self.partial_sums[&material.material_id].select(u);
        Ok(components[idx].element)
    }

    fn build_partial_sums(&self, material: &Material) -> PartialSumTable {
        let model = self.model.as_ref();
        PartialSumTable::build(material, self.settings.table_energy, |ke, a, z| {
            model.cross_section_per_atom(ke, a, z)
        })
    }

    fn compute_mean_free_path(&self, kinetic_energy: f64, material: &Material) -> f64 {
        let sigma: f64 = material
            .components()
            .iter()
            .zip(material.atoms_per_volume())
            .map(|(c, n)| n * self.model.cross_section_per_atom(kinetic_energy, c.element.a, c.element.z as f64))
            .sum();
        if sigma > f64::MIN_POSITIVE {
            1.0 / sigma
        } else {
            f64::INFINITY
        }
    }
}

impl DiscreteProcess for DarkBremProcess {
    fn name(&self) -> &str {
        DARK_BREM_PROCESS_NAME
    }

    fn is_applicable(&self, species: Species) -> bool {
        species == self.settings.lepton
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn mean_free_path(&mut self, track: &Track, material: &Material) -> f64 {
        if !self.is_applicable(track.species) {
            return f64::INFINITY;
        }
        if !self.settings.cache_xsec {
            return self.compute_mean_free_path(track.kinetic_energy, material);
        }

        // Exact energies repeat because tracks only lose energy at discrete
        // interactions. Continuous loss would produce a new key every step, so
        // the cache is capped.
        let key = (material.material_id, track.kinetic_energy.to_bits());
        if let Some(&mfp) = self.xsec_cache.get(&key) {
            return mfp;
        }
        let mfp = self.compute_mean_free_path(track.kinetic_energy, material);
        if self.xsec_cache.len() >= MAX_CACHED_MEAN_FREE_PATHS {
            log::debug!("Mean free path cache full, clearing {} entries", self.xsec_cache.len());
            self.xsec_cache.clear();
        }
        self.xsec_cache.insert(key, mfp);
        mfp
    }

    fn post_step_do_it(
        &mut self,
        track: &Track,
        material: &Material,
        rng: &mut dyn RngCore,
    ) -> Result<ParticleChange> {
        if !self.is_applicable(track.species) {
            return Err(PhysicsError::InapplicableTrack {
                process: DARK_BREM_PROCESS_NAME.to_string(),
                species: track.species.name().to_string(),
            }
            .into());
        }

        if self.settings.only_one_per_event {
            self.active = false;
        }

        let u: f64 = rng.gen();
        let target = self.select_random_atom(material, u)?;
        log::debug!(
            "Dark brem of track {} ({:.1} MeV) on {} in {}",
            track.track_id,
            track.kinetic_energy,
            target.symbol,
            material.label()
        );
        self.last_target = Some(target);

        Ok(self.model.generate_change(track, &target, rng)?)
    }

    fn start_run(&mut self, materials: &[Material], rng: &mut dyn RngCore) -> Result<()> {
        self.xsec_cache.clear();
        self.partial_sums.clear();
        for material in materials {
            if material.number_of_elements() == 0 {
                return Err(PhysicsError::EmptyMaterial(material.label()).into());
            }
            let table = self.build_partial_sums(material);
            self.partial_sums.insert(material.material_id, table);
        }
        self.active = true;
        self.model.start_run(rng);
        self.model.print_info();
        Ok(())
    }

    fn end_event(&mut self) {
        self.active = true;
    }

    fn record_config(&self, header: &mut RunHeader) {
        header.set_int_parameter("Only One DB Per Event", self.settings.only_one_per_event as i64);
        header.set_float_parameter("A' Mass [MeV]", self.settings.ap_mass);
        header.set_int_parameter("Cache DB Xsec", self.settings.cache_xsec as i64);
        header.set_string_parameter("Dark Brem Lepton", self.settings.lepton.name());
        header.set_string_parameter("Dark Brem Model", self.model.name());
        self.model.record_config(header);
    }
}

/// Natural process with a fixed per-atom cross section that removes the track.
pub struct ConstantXsecProcess {
    name: String,
    species: Species,
    /// Per-atom cross section [mm²]
    cross_section: f64,
    active: bool,
}

impl ConstantXsecProcess {
    pub fn new(name: impl Into<String>, species: Species, cross_section: f64) -> Self {
        Self {
            name: name.into(),
            species,
            cross_section,
            active: true,
        }
    }

    pub fn species(&self) -> Species {
        self.species
    }
}

impl DiscreteProcess for ConstantXsecProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_applicable(&self, species: Species) -> bool {
        species == self.species
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn mean_free_path(&mut self, track: &Track, material: &Material) -> f64 {
        if !self.is_applicable(track.species) {
            return f64::INFINITY;
        }
        let n_total: f64 = material.atoms_per_volume().iter().sum();
        let sigma = n_total * self.cross_section;
        if sigma > f64::MIN_POSITIVE {
            1.0 / sigma
        } else {
            f64::INFINITY
        }
    }

    fn post_step_do_it(
        &mut self,
        track: &Track,
        _material: &Material,
        _rng: &mut dyn RngCore,
    ) -> Result<ParticleChange> {
        if !self.is_applicable(track.species) {
            return Err(PhysicsError::InapplicableTrack {
                process: self.name.clone(),
                species: track.species.name().to_string(),
            }
            .into());
        }
        Ok(ParticleChange::absorbed(track))
    }
}
