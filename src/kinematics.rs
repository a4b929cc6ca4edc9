//! Scaling of library vertices to the actual incident energy.
//!
//! Every function here works in the frame where the incident lepton travels
//! along +z. The outgoing lepton is produced by the chosen policy. The dark
//! photon takes the remaining three-momentum and is put on its mass shell;
//! the nucleus takes up the energy left over, so
//! `incident = lepton + dark_photon + recoil` holds exactly.

use crate::error::ConfigError;
use crate::four_vector::FourMomentum;
use crate::vertex_library::VertexRecord;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How library vertices are adapted to a different incident energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMethod {
    /// Keep the transverse momentum, scale the energy by the stored fraction
    ForwardOnly = 1,
    /// Boost the vertex into the centre-of-momentum frame matching E0
    CmScaling = 2,
    /// Use the library vertex unchanged
    Undefined = 3,
}

impl ScalingMethod {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            1 => Some(ScalingMethod::ForwardOnly),
            2 => Some(ScalingMethod::CmScaling),
            3 => Some(ScalingMethod::Undefined),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingMethod::ForwardOnly => "forward_only",
            ScalingMethod::CmScaling => "cm_scaling",
            ScalingMethod::Undefined => "undefined",
        }
    }
}

impl fmt::Display for ScalingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalingMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward_only" | "ForwardOnly" => Ok(ScalingMethod::ForwardOnly),
            "cm_scaling" | "CMScaling" => Ok(ScalingMethod::CmScaling),
            "undefined" | "Undefined" => Ok(ScalingMethod::Undefined),
            other => other
                .parse::<i64>()
                .ok()
                .and_then(ScalingMethod::from_index)
                .ok_or_else(|| {
                    ConfigError::invalid("dark_brem.model.method", format!("unknown method '{}'", other))
                }),
        }
    }
}

/// Outgoing four-momenta of one interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutgoingKinematics {
    pub lepton: FourMomentum,
    /// On shell with the dark photon mass
    pub dark_photon: FourMomentum,
    /// Four-momentum handed to the nucleus. Zero three-momentum; the energy
    /// may be slightly negative when the scaled vertex is off shell.
    pub recoil: FourMomentum,
}

impl OutgoingKinematics {
    fn from_lepton(incident: &FourMomentum, mut lepton: FourMomentum, ap_mass: f64) -> Self {
        // the lepton always continues forward
        lepton.p.z = lepton.p.z.abs();
        let dark_photon = FourMomentum::on_shell(ap_mass, incident.p - lepton.p);
        Self {
            lepton,
            dark_photon,
            recoil: *incident - lepton - dark_photon,
        }
    }
}

/// Four-momentum of a lepton of `mass` and total energy `e0` moving along +z
pub fn incident_along_z(e0: f64, mass: f64) -> FourMomentum {
    FourMomentum::new(e0, 0.0, 0.0, (e0 * e0 - mass * mass).max(0.0).sqrt())
}

/// Scale `record` to total incident energy `e0` with the given policy.
///
/// Returns `None` when the vertex cannot be made kinematically allowed at
/// `e0`; the caller is expected to draw another vertex.
pub fn scale(
    method: ScalingMethod,
    record: &VertexRecord,
    e0: f64,
    lepton_mass: f64,
    ap_mass: f64,
) -> Option<OutgoingKinematics> {
    match method {
        ScalingMethod::ForwardOnly => forward_only(record, e0, lepton_mass, ap_mass),
        ScalingMethod::CmScaling => cm_scaling(record, e0, lepton_mass, ap_mass),
        ScalingMethod::Undefined => Some(unscaled(record, e0, lepton_mass, ap_mass)),
    }
}

/// Keep pt and azimuth, set the lepton energy to `fraction * e0`.
pub fn forward_only(
    record: &VertexRecord,
    e0: f64,
    lepton_mass: f64,
    ap_mass: f64,
) -> Option<OutgoingKinematics> {
    let energy = record.fraction * e0;
    let p2 = energy * energy - lepton_mass * lepton_mass;
    let pt2 = record.pt * record.pt;
    if pt2 > p2 {
        return None;
    }
    let pz = (p2 - pt2).sqrt();
    let lepton = FourMomentum::from_parts(
        energy,
        Vector3::new(record.pt * record.phi.cos(), record.pt * record.phi.sin(), pz),
    );
    Some(OutgoingKinematics::from_lepton(&incident_along_z(e0, lepton_mass), lepton, ap_mass))
}

/// Move the lepton into the library centre-of-momentum frame, shift that
/// frame by the energy difference between the library and `e0` (removed from
/// both E and pz of the centre-of-momentum vector), and boost back out.
///
/// Returns `None` if the vertex has no centre-of-momentum vector, if the
/// shifted frame is not timelike, or if the scaled lepton would carry more
/// energy than the incident one.
pub fn cm_scaling(
    record: &VertexRecord,
    e0: f64,
    lepton_mass: f64,
    ap_mass: f64,
) -> Option<OutgoingKinematics> {
    let cm = record.center_momentum?;
    let in_cm = record.lepton.boost(&(-cm.boost_vector()));

    let ediff = record.incident_energy - e0;
    let shifted = FourMomentum::from_parts(
        cm.e - ediff,
        Vector3::new(cm.p.x, cm.p.y, cm.p.z - ediff),
    );
    if shifted.e <= 0.0 || shifted.p.norm() >= shifted.e {
        return None;
    }
    let lepton = in_cm.boost(&shifted.boost_vector());
    if lepton.e >= e0 || lepton.e < lepton_mass {
        return None;
    }
    Some(OutgoingKinematics::from_lepton(&incident_along_z(e0, lepton_mass), lepton, ap_mass))
}

/// Library lepton as stored. Only meaningful when the library energy is
/// close to `e0`.
pub fn unscaled(record: &VertexRecord, e0: f64, lepton_mass: f64, ap_mass: f64) -> OutgoingKinematics {
    OutgoingKinematics::from_lepton(&incident_along_z(e0, lepton_mass), record.lepton, ap_mass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{ELECTRON_MASS, MUON_MASS};
    use approx::assert_relative_eq;

    fn library_vertex(e_lib: f64, fraction: f64, pt: f64, phi: f64, mass: f64) -> VertexRecord {
        let e = fraction * e_lib;
        let pz = (e * e - mass * mass - pt * pt).sqrt();
        let lepton = FourMomentum::new(e, pt * phi.cos(), pt * phi.sin(), pz);
        // 100 MeV dark photon balancing pt, nucleus keeps 0.5 MeV
        let (ma, recoil) = (AP_MASS, 0.5);
        let ea = e_lib - e - recoil;
        let pza = (ea * ea - ma * ma - pt * pt).sqrt();
        let dark_photon = FourMomentum::new(ea, -pt * phi.cos(), -pt * phi.sin(), pza);
        VertexRecord::from_momenta(e_lib, lepton, Some(dark_photon))
    }

    const AP_MASS: f64 = 100.0;

    fn assert_conserved(out: &OutgoingKinematics, e0: f64, mass: f64) {
        let total = out.lepton + out.dark_photon + out.recoil;
        assert!(total.max_abs_diff(&incident_along_z(e0, mass)) < 1e-9 * e0);
        assert!(out.recoil.p_mag() < 1e-9 * e0);
        assert_relative_eq!(out.dark_photon.mass2(), AP_MASS * AP_MASS, max_relative = 1e-6);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("forward_only".parse::<ScalingMethod>().unwrap(), ScalingMethod::ForwardOnly);
        assert_eq!("CMScaling".parse::<ScalingMethod>().unwrap(), ScalingMethod::CmScaling);
        assert_eq!("3".parse::<ScalingMethod>().unwrap(), ScalingMethod::Undefined);
        assert!("4".parse::<ScalingMethod>().is_err());
        assert!("sideways".parse::<ScalingMethod>().is_err());
        assert_eq!(ScalingMethod::CmScaling as i32, 2);
    }

    #[test]
    fn test_forward_only_keeps_fraction_and_pt() {
        let record = library_vertex(4000.0, 0.3, 15.0, 0.7, ELECTRON_MASS);
        let out = forward_only(&record, 3500.0, ELECTRON_MASS, AP_MASS).unwrap();
        assert_relative_eq!(out.lepton.e, 1050.0, max_relative = 1e-12);
        // A' keeps the remaining momentum and sits on its mass shell
        let missing = incident_along_z(3500.0, ELECTRON_MASS).p - out.lepton.p;
        assert!((out.dark_photon.p - missing).norm() < 1e-9);
        assert_relative_eq!(out.dark_photon.mass(), AP_MASS, max_relative = 1e-9);
        assert_relative_eq!(out.lepton.e + out.dark_photon.e + out.recoil.e, 3500.0, max_relative = 1e-12);
        assert_relative_eq!(out.lepton.pt(), 15.0, max_relative = 1e-12);
        assert_relative_eq!(out.lepton.phi(), 0.7, max_relative = 1e-12);
        assert_relative_eq!(out.lepton.mass(), ELECTRON_MASS, max_relative = 1e-6);
        assert!(out.lepton.pz() >= 0.0);
        assert_conserved(&out, 3500.0, ELECTRON_MASS);
    }

    #[test]
    fn test_forward_only_rejects_large_pt() {
        let record = library_vertex(4000.0, 0.1, 350.0, 0.0, ELECTRON_MASS);
        // 0.1 * 3000 = 300 MeV cannot carry 350 MeV of pt
        assert!(forward_only(&record, 3000.0, ELECTRON_MASS, AP_MASS).is_none());
        assert!(forward_only(&record, 4000.0, ELECTRON_MASS, AP_MASS).is_some());
    }

    #[test]
    fn test_cm_scaling_is_identity_at_library_energy() {
        let record = library_vertex(4000.0, 0.4, 20.0, 1.1, ELECTRON_MASS);
        let out = cm_scaling(&record, 4000.0, ELECTRON_MASS, AP_MASS).unwrap();
        assert!(out.lepton.max_abs_diff(&record.lepton) < 1e-6);
    }

    #[test]
    fn test_cm_scaling_conserves_and_stays_on_shell() {
        let record = library_vertex(4000.0, 0.4, 20.0, 1.1, MUON_MASS);
        let out = cm_scaling(&record, 3600.0, MUON_MASS, AP_MASS).unwrap();
        assert_relative_eq!(out.lepton.mass(), MUON_MASS, max_relative = 1e-6);
        assert!(out.lepton.e < 3600.0);
        assert!(out.lepton.pz() >= 0.0);
        assert_conserved(&out, 3600.0, MUON_MASS);
    }

    #[test]
    fn test_cm_scaling_needs_center_momentum() {
        let mut record = library_vertex(4000.0, 0.4, 20.0, 1.1, ELECTRON_MASS);
        record.center_momentum = None;
        assert!(cm_scaling(&record, 3800.0, ELECTRON_MASS, AP_MASS).is_none());
        assert!(scale(ScalingMethod::CmScaling, &record, 3800.0, ELECTRON_MASS, AP_MASS).is_none());
    }

    #[test]
    fn test_unscaled_uses_library_lepton() {
        let record = library_vertex(4000.0, 0.25, 5.0, 0.0, ELECTRON_MASS);
        let out = scale(ScalingMethod::Undefined, &record, 4000.0, ELECTRON_MASS, AP_MASS).unwrap();
        assert_eq!(out.lepton, record.lepton);
        assert_conserved(&out, 4000.0, ELECTRON_MASS);
    }

    #[test]
    fn test_backward_lepton_is_flipped_forward() {
        let mut record = library_vertex(4000.0, 0.25, 5.0, 0.0, ELECTRON_MASS);
        record.lepton.p.z = -record.lepton.p.z;
        let out = unscaled(&record, 4000.0, ELECTRON_MASS, AP_MASS);
        assert!(out.lepton.pz() > 0.0);
        assert_conserved(&out, 4000.0, ELECTRON_MASS);
    }
}
