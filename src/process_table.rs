//! Registry of the discrete processes in a run and which species are wrapped for biasing.

use crate::error::{BiasSetupError, Result};
use crate::material::Material;
use crate::process::DiscreteProcess;
use crate::run_header::RunHeader;
use crate::track::Species;
use rand::RngCore;
use std::collections::HashSet;

/// Every discrete process in the run, plus the species whose processes are
/// wrapped so biasing operators may act on them.
#[derive(Default)]
pub struct ProcessTable {
    processes: Vec<Box<dyn DiscreteProcess>>,
    biased_species: HashSet<Species>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a process and return its index.
    pub fn register(&mut self, process: Box<dyn DiscreteProcess>) -> usize {
        log::debug!("Registering process '{}'", process.name());
        self.processes.push(process);
        self.processes.len() - 1
    }

    /// Wrap all processes of `species` for biasing.
    pub fn bias(&mut self, species: Species) {
        self.biased_species.insert(species);
    }

    pub fn is_biased(&self, species: Species) -> bool {
        self.biased_species.contains(&species)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn get(&self, index: usize) -> &dyn DiscreteProcess {
        self.processes[index].as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> &mut dyn DiscreteProcess {
        self.processes[index].as_mut()
    }

    /// Indices of the active processes applicable to `species`
    pub fn active_for(&self, species: Species) -> Vec<usize> {
        self.processes
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_active() && p.is_applicable(species))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.processes.iter().position(|p| p.name() == name)
    }

    /// Resolve a process of `species` that biasing may act on.
    pub fn find_wrapped(&self, species: Species, name: &str) -> std::result::Result<usize, BiasSetupError> {
        let not_biased = || BiasSetupError::ProcessNotBiased {
            process: name.to_string(),
            particle: species.name().to_string(),
        };
        if !self.is_biased(species) {
            return Err(not_biased());
        }
        self.processes
            .iter()
            .position(|p| p.name() == name && p.is_applicable(species))
            .ok_or_else(not_biased)
    }

    /// Switch a process on or off for every particle. Returns false if no
    /// process has that name.
    pub fn set_process_activation(&mut self, name: &str, active: bool) -> bool {
        let mut found = false;
        for p in self.processes.iter_mut().filter(|p| p.name() == name) {
            p.set_active(active);
            found = true;
        }
        found
    }

    pub fn start_run(&mut self, materials: &[Material], rng: &mut dyn RngCore) -> Result<()> {
        for p in &mut self.processes {
            p.start_run(materials, rng)?;
        }
        Ok(())
    }

    pub fn end_event(&mut self) {
        for p in &mut self.processes {
            p.end_event();
        }
    }

    pub fn record_config(&self, header: &mut RunHeader) {
        for p in &self.processes {
            p.record_config(header);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ConstantXsecProcess;
    use crate::units::BARN;

    fn table() -> ProcessTable {
        let mut t = ProcessTable::new();
        t.register(Box::new(ConstantXsecProcess::new("photonNuclear", Species::Gamma, BARN)));
        t.register(Box::new(ConstantXsecProcess::new("conv", Species::Gamma, BARN)));
        t.register(Box::new(ConstantXsecProcess::new("electronNuclear", Species::Electron, BARN)));
        t
    }

    #[test]
    fn test_find_wrapped_requires_biasing() {
        let mut t = table();
        assert!(matches!(
            t.find_wrapped(Species::Gamma, "photonNuclear"),
            Err(BiasSetupError::ProcessNotBiased { .. })
        ));
        t.bias(Species::Gamma);
        assert_eq!(t.find_wrapped(Species::Gamma, "photonNuclear").unwrap(), 0);
        // registered, but for another particle
        let err = t.find_wrapped(Species::Gamma, "electronNuclear").unwrap_err();
        assert_eq!(
            err.to_string(),
            "electronNuclear is not found in list of biased processes for gamma!"
        );
    }

    #[test]
    fn test_activation() {
        let mut t = table();
        assert_eq!(t.active_for(Species::Gamma), vec![0, 1]);
        assert!(t.set_process_activation("conv", false));
        assert_eq!(t.active_for(Species::Gamma), vec![0]);
        assert!(!t.set_process_activation("eDarkBrem", false));
        assert_eq!(t.find("electronNuclear"), Some(2));
        assert_eq!(t.len(), 3);
    }
}
