use crate::data::ElementData;
use crate::four_vector::FourMomentum;
use crate::track::{Species, Track};
use nalgebra::Vector3;

/// What happens to the primary after a discrete interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    Alive,
    StopAndKill,
}

/// A particle produced by an interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Secondary {
    pub species: Species,
    /// Rest mass used to derive the kinetic energy [MeV]
    pub mass: f64,
    pub kinetic_energy: f64,
    pub direction: Vector3<f64>,
    pub momentum: FourMomentum,
}

impl Secondary {
    /// `fallback_direction` is used when the momentum vanishes.
    pub fn new(
        species: Species,
        mass: f64,
        momentum: FourMomentum,
        fallback_direction: &Vector3<f64>,
    ) -> Self {
        let p = momentum.p_mag();
        let direction = if p > 0.0 {
            momentum.p / p
        } else {
            *fallback_direction
        };
        Self {
            species,
            mass,
            kinetic_energy: (momentum.e - mass).max(0.0),
            direction,
            momentum,
        }
    }

    /// Track for this secondary, born at the parent's position.
    pub fn to_track(&self, track_id: u32, parent: &Track) -> Track {
        let mut track = Track::new(self.species, self.kinetic_energy, self.direction)
            .with_ids(track_id, parent.track_id)
            .at(parent.position);
        track.mass = self.mass;
        track.weight = parent.weight;
        track
    }
}

/// Proposed final state of a discrete interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleChange {
    pub status: TrackStatus,
    /// Kinetic energy of the primary if it survives [MeV]
    pub kinetic_energy: f64,
    pub direction: Vector3<f64>,
    pub secondaries: Vec<Secondary>,
    /// Four-momentum given to the target nucleus, which is not tracked
    pub nuclear_recoil: FourMomentum,
    /// Element the interaction happened on, if the process picked one
    pub target: Option<ElementData>,
}

impl ParticleChange {
    /// Primary is removed and nothing is produced.
    pub fn absorbed(track: &Track) -> Self {
        Self {
            status: TrackStatus::StopAndKill,
            kinetic_energy: 0.0,
            direction: track.direction,
            secondaries: Vec::new(),
            nuclear_recoil: FourMomentum::default(),
            target: None,
        }
    }

    /// Final state of a dark brem with lab-frame four-momenta.
    ///
    /// With `always_create_new_lepton` the incident lepton is killed and both
    /// the lepton and the dark photon become secondaries, otherwise the
    /// primary continues with the outgoing lepton's kinematics. Whatever the
    /// lepton and dark photon leave of the incident four-momentum is booked
    /// as nuclear recoil.
    pub fn dark_brem(
        track: &Track,
        lepton: FourMomentum,
        dark_photon: FourMomentum,
        ap_mass: f64,
        always_create_new_lepton: bool,
    ) -> Self {
        let nuclear_recoil = track.four_momentum() - lepton - dark_photon;
        let dark_photon = Secondary::new(Species::DarkPhoton, ap_mass, dark_photon, &track.direction);
        let lepton = Secondary::new(track.species, track.mass, lepton, &track.direction);

        if always_create_new_lepton {
            Self {
                status: TrackStatus::StopAndKill,
                kinetic_energy: 0.0,
                direction: track.direction,
                secondaries: vec![dark_photon, lepton],
                nuclear_recoil,
                target: None,
            }
        } else {
            Self {
                status: TrackStatus::Alive,
                kinetic_energy: lepton.kinetic_energy,
                direction: lepton.direction,
                secondaries: vec![dark_photon],
                nuclear_recoil,
                target: None,
            }
        }
    }

    pub fn on_target(mut self, target: ElementData) -> Self {
        self.target = Some(target);
        self
    }

    /// Sum of everything leaving the interaction, including a surviving
    /// primary and the nuclear recoil
    pub fn outgoing_four_momentum(&self, track: &Track) -> FourMomentum {
        let mut total = self
            .secondaries
            .iter()
            .fold(self.nuclear_recoil, |acc, s| acc + s.momentum);
        if self.status == TrackStatus::Alive {
            let p = (self.kinetic_energy * (self.kinetic_energy + 2.0 * track.mass)).sqrt();
            total = total
                + FourMomentum::from_parts(self.kinetic_energy + track.mass, self.direction * p);
        }
        total
    }

    /// Apply the change to the primary.
    pub fn update_track(&self, track: &mut Track) {
        match self.status {
            TrackStatus::StopAndKill => {
                track.kinetic_energy = 0.0;
                track.alive = false;
            }
            TrackStatus::Alive => {
                track.kinetic_energy = self.kinetic_energy;
                track.direction = self.direction;
            }
        }
    }
}
