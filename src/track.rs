use crate::error::ConfigError;
use crate::four_vector::FourMomentum;
use crate::units::{ELECTRON_MASS, KAON_ZERO_LONG_MASS, MUON_MASS, NEUTRON_MASS};
use nalgebra::Vector3;
use std::fmt;
use std::str::FromStr;

/// PDG code used for the dark photon in the vertex libraries
pub const DARK_PHOTON_PDG: i32 = 622;

/// Particle species known to the simulation core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Electron,
    Positron,
    MuonMinus,
    Gamma,
    Neutron,
    KaonZeroLong,
    DarkPhoton,
}

impl Species {
    pub const ALL: [Species; 7] = [
        Species::Electron,
        Species::Positron,
        Species::MuonMinus,
        Species::Gamma,
        Species::Neutron,
        Species::KaonZeroLong,
        Species::DarkPhoton,
    ];

    /// Particle name as used in configuration files
    pub fn name(&self) -> &'static str {
        match self {
            Species::Electron => "e-",
            Species::Positron => "e+",
            Species::MuonMinus => "mu-",
            Species::Gamma => "gamma",
            Species::Neutron => "neutron",
            Species::KaonZeroLong => "kaon0L",
            Species::DarkPhoton => "A^1",
        }
    }

    pub fn pdg_id(&self) -> i32 {
        match self {
            Species::Electron => 11,
            Species::Positron => -11,
            Species::MuonMinus => 13,
            Species::Gamma => 22,
            Species::Neutron => 2112,
            Species::KaonZeroLong => 130,
            Species::DarkPhoton => DARK_PHOTON_PDG,
        }
    }

    pub fn from_pdg_id(id: i32) -> Option<Species> {
        Species::ALL.iter().copied().find(|s| s.pdg_id() == id)
    }

    /// Rest mass in MeV. The dark photon mass is a run parameter, so it is
    /// reported as zero here and carried by the particle change instead.
    pub fn mass(&self) -> f64 {
        match self {
            Species::Electron | Species::Positron => ELECTRON_MASS,
            Species::MuonMinus => MUON_MASS,
            Species::Neutron => NEUTRON_MASS,
            Species::KaonZeroLong => KAON_ZERO_LONG_MASS,
            Species::Gamma | Species::DarkPhoton => 0.0,
        }
    }

    pub fn is_charged_lepton(&self) -> bool {
        matches!(
            self,
            Species::Electron | Species::Positron | Species::MuonMinus
        )
    }
}

impl FromStr for Species {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Species::ALL
            .iter()
            .copied()
            .find(|sp| sp.name() == s)
            .ok_or_else(|| ConfigError::UnknownSpecies(s.to_string()))
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A particle being transported.
#[derive(Debug, Clone)]
pub struct Track {
    pub track_id: u32,
    /// Zero for primaries
    pub parent_id: u32,
    pub species: Species,
    /// Rest mass in MeV
    pub mass: f64,
    /// Kinetic energy in MeV
    pub kinetic_energy: f64,
    /// Position in mm
    pub position: Vector3<f64>,
    /// Unit momentum direction
    pub direction: Vector3<f64>,
    pub weight: f64,
    pub alive: bool,
}

impl Track {
    pub fn new(species: Species, kinetic_energy: f64, direction: Vector3<f64>) -> Self {
        Self {
            track_id: 1,
            parent_id: 0,
            species,
            mass: species.mass(),
            kinetic_energy,
            position: Vector3::zeros(),
            direction: direction.normalize(),
            weight: 1.0,
            alive: true,
        }
    }

    pub fn with_ids(mut self, track_id: u32, parent_id: u32) -> Self {
        self.track_id = track_id;
        self.parent_id = parent_id;
        self
    }

    pub fn at(mut self, position: Vector3<f64>) -> Self {
        self.position = position;
        self
    }

    pub fn total_energy(&self) -> f64 {
        self.kinetic_energy + self.mass
    }

    pub fn momentum_magnitude(&self) -> f64 {
        (self.kinetic_energy * (self.kinetic_energy + 2.0 * self.mass)).sqrt()
    }

    pub fn momentum(&self) -> Vector3<f64> {
        self.direction * self.momentum_magnitude()
    }

    pub fn four_momentum(&self) -> FourMomentum {
        FourMomentum::from_parts(self.total_energy(), self.momentum())
    }

    pub fn move_by(&mut self, distance: f64) {
        self.position += self.direction * distance;
    }
}
