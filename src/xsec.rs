//! Dark brem cross section in the Weizsäcker-Williams approximation.
//!
//! σ = 4 α³ ε² ∫χ(t) dt ∫dσ/dx dx, converted from GeV⁻² to picobarn. The
//! integrands are evaluated in GeV; the public interface speaks framework
//! units (MeV, mm²).

use crate::integrate::{integrate, integrate_log, Tolerance};
use crate::material::Material;
use crate::units::{ALPHA_EW, ELECTRON_MASS, GEV, GEV2_TO_PB, PICOBARN};

/// Proton magnetic moment (nuclear magnetons)
const MU_P: f64 = 2.79;
/// Proton mass [GeV]
const M_P: f64 = 0.938;

/// Form-factor weighting function χ(t) for a target (A, Z).
///
/// Elastic (screened nuclear) plus inelastic (proton) contributions,
/// weighted by (t - t_min)/t². Everything in GeV.
#[derive(Debug, Clone, Copy)]
pub struct Chi {
    /// molar mass of the target [g/mole]
    pub a: f64,
    /// atomic number of the target
    pub z: f64,
    /// incoming lepton energy [GeV]
    pub e0: f64,
    /// dark photon mass [GeV]
    pub ma: f64,
}

impl Chi {
    pub fn t_min(&self) -> f64 {
        self.ma.powi(4) / (4.0 * self.e0 * self.e0)
    }

    pub fn t_max(&self) -> f64 {
        self.ma * self.ma
    }

    pub fn integrand(&self, t: f64) -> f64 {
        let mel = ELECTRON_MASS / GEV;
        let a_el = 111.0 / (mel * self.z.powf(1.0 / 3.0));
        let a_in = 773.0 / (mel * self.z.powf(2.0 / 3.0));
        let d = 0.164 / self.a.powf(2.0 / 3.0);

        let g2_el = self.z * self.z * a_el.powi(4) * t * t
            / ((1.0 + a_el * a_el * t).powi(2) * (1.0 + t / d).powi(2));
        let g2_in = self.z * a_in.powi(4) * t * t
            / ((1.0 + a_in * a_in * t).powi(2) * (1.0 + t / 0.71).powi(8))
            * (1.0 + t * (MU_P * MU_P - 1.0) / (4.0 * M_P * M_P)).powi(2);

        (g2_el + g2_in) * (t - self.t_min()) / (t * t)
    }

    /// ∫χ dt over [t_min, t_max]
    pub fn integral(&self, tol: Tolerance) -> f64 {
        integrate_log(|t| self.integrand(t), self.t_min(), self.t_max(), tol)
    }
}

/// Differential cross section dσ/dx in the outgoing dark photon energy
/// fraction x. Everything in GeV.
#[derive(Debug, Clone, Copy)]
pub struct DiffCross {
    /// incoming lepton energy [GeV]
    pub e0: f64,
    /// dark photon mass [GeV]
    pub ma: f64,
    /// lepton mass [GeV]
    pub ml: f64,
}

impl DiffCross {
    pub fn x_max(&self) -> f64 {
        (1.0 - self.ml / self.e0).min(1.0 - self.ma / self.e0)
    }

    pub fn integrand(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        let beta = (1.0 - self.ma * self.ma / (self.e0 * self.e0)).sqrt();
        let num = 1.0 - x + x * x / 3.0;
        let denom = self.ma * self.ma * (1.0 - x) / x + self.ml * self.ml * x;
        beta * num / denom
    }

    pub fn integral(&self, tol: Tolerance) -> f64 {
        integrate(|x| self.integrand(x), 0.0, self.x_max(), tol)
    }
}

/// Cross-section calculator for one dark photon hypothesis.
#[derive(Debug, Clone)]
pub struct WwCrossSection {
    ap_mass: f64,
    lepton_mass: f64,
    epsilon: f64,
    threshold: f64,
    tolerance: Tolerance,
}

impl WwCrossSection {
    /// Masses and threshold in MeV. The effective threshold is never below
    /// twice the dark photon mass.
    pub fn new(ap_mass: f64, lepton_mass: f64, epsilon: f64, threshold: f64) -> Self {
        Self {
            ap_mass,
            lepton_mass,
            epsilon,
            threshold: threshold.max(2.0 * ap_mass),
            tolerance: Tolerance::default(),
        }
    }

    /// Effective threshold [MeV]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Cross section per atom [mm²] for a lepton of kinetic energy
    /// `kinetic_energy` [MeV] on a target of molar mass `a` [g/mole] and
    /// atomic number `z`. Zero below threshold.
    pub fn per_atom(&self, kinetic_energy: f64, a: f64, z: f64) -> f64 {
        if kinetic_energy < self.threshold {
            return 0.0;
        }
        ww_sigma_pb(
            kinetic_energy / GEV,
            self.ap_mass / GEV,
            self.lepton_mass / GEV,
            self.epsilon,
            a,
            z,
            self.tolerance,
        ) * PICOBARN
    }
}

/// Total cross section [pb] for a lepton of energy `e0`, dark photon mass
/// `ma` and lepton mass `ml`, all in GeV. Never negative.
pub fn ww_sigma_pb(e0: f64, ma: f64, ml: f64, epsilon: f64, a: f64, z: f64, tol: Tolerance) -> f64 {
    let chi = Chi { a, z, e0, ma }.integral(tol);
    let diff = DiffCross { e0, ma, ml }.integral(tol);
    let sigma = GEV2_TO_PB * 4.0 * ALPHA_EW.powi(3) * epsilon * epsilon * chi * diff;
    if sigma.is_finite() && sigma > 0.0 {
        sigma
    } else {
        0.0
    }
}

/// Running sums of n_i σ_i over the elements of one material, in element
/// order, used to pick which atom a lepton interacts with.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialSumTable {
    pub material_id: u32,
    pub cumulative: Vec<f64>,
}

impl PartialSumTable {
    /// `per_atom(ke, a, z)` is the per-atom cross section of the model in use.
    pub fn build<F>(material: &Material, kinetic_energy: f64, per_atom: F) -> Self
    where
        F: Fn(f64, f64, f64) -> f64,
    {
        let mut running = 0.0;
        let cumulative = material
            .components()
            .iter()
            .zip(material.atoms_per_volume())
            .map(|(c, n)| {
                running += n * per_atom(kinetic_energy, c.element.a, c.element.z as f64);
                running
            })
            .collect();
        Self {
            material_id: material.material_id,
            cumulative,
        }
    }

    /// Index of the selected element for a uniform deviate `u` in [0, 1).
    ///
    /// A single-element material always returns 0. Otherwise the first
    /// element whose running sum reaches `u * total` is chosen, falling back
    /// to the last element.
    pub fn select(&self, u: f64) -> usize {
        let n = self.cumulative.len();
        if n <= 1 {
            return 0;
        }
        let rval = u * self.cumulative[n - 1];
        self.cumulative
            .iter()
            .position(|&c| rval <= c)
            .unwrap_or(n - 1)
    }
}
