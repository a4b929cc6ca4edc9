//! Stand-alone analytic dark photon emission library.
//!
//! Works entirely in GeV and picobarn for one fixed target, the way external
//! dark photon packages are usually written. [`crate::analytic_model`] adapts
//! it to the framework units.

use crate::integrate::Tolerance;
use crate::utilities::{interpolate_log_log, log_spaced};
use crate::xsec::{ww_sigma_pb, DiffCross};
use rand::{Rng, RngCore};
use std::f64::consts::PI;

/// Energy fraction and angles of one emitted dark photon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    /// Fraction of the lepton energy carried by the dark photon
    pub x: f64,
    pub theta: f64,
    pub phi: f64,
}

/// Interface of an external dark photon library. All energies in GeV,
/// cross sections in pb per atom of the library's target.
pub trait ExternalDarkPhotonLibrary: Send {
    fn threshold(&self) -> f64;
    fn epsilon(&self) -> f64;
    fn mass(&self) -> f64;
    fn sigma_total(&self, e0: f64) -> f64;
    /// `None` if no emission could be generated at `e0`.
    fn simulate_emission(&self, e0: f64, rng: &mut dyn RngCore) -> Option<Emission>;
}

/// Maximum number of trials for the x rejection sampling
const MAX_EMISSION_TRIALS: u32 = 100_000;
/// Grid points used to bound dσ/dx
const ENVELOPE_POINTS: usize = 400;

/// Weizsäcker-Williams dark photon library with a tabulated total cross section.
pub struct TabulatedDarkPhotons {
    ma: f64,
    ml: f64,
    epsilon: f64,
    threshold: f64,
    a: f64,
    z: f64,
    energies: Vec<f64>,
    sigmas: Vec<f64>,
    tolerance: Tolerance,
}

impl TabulatedDarkPhotons {
    /// Masses and threshold in GeV, target molar mass `a` [g/mole] and
    /// atomic number `z`.
    pub fn new(ma: f64, ml: f64, epsilon: f64, threshold: f64, a: f64, z: f64) -> Self {
        Self {
            ma,
            ml,
            epsilon,
            threshold: threshold.max(2.0 * ma),
            a,
            z,
            energies: Vec::new(),
            sigmas: Vec::new(),
            tolerance: Tolerance::default(),
        }
    }

    /// Tabulate σ(E) on `n` log-spaced energies from threshold to `e_max`.
    pub fn prepare_table(&mut self, e_max: f64, n: usize) {
        self.energies = log_spaced(self.threshold, e_max.max(self.threshold), n);
        self.sigmas = self.energies.iter().map(|&e| self.compute_sigma(e)).collect();
        log::debug!(
            "Tabulated dark photon cross section at {} energies between {} and {} GeV",
            self.energies.len(),
            self.threshold,
            e_max
        );
    }

    fn compute_sigma(&self, e0: f64) -> f64 {
        ww_sigma_pb(e0, self.ma, self.ml, self.epsilon, self.a, self.z, self.tolerance)
    }

    fn in_table(&self, e0: f64) -> bool {
        match (self.energies.first(), self.energies.last()) {
            (Some(&lo), Some(&hi)) => e0 >= lo && e0 <= hi,
            _ => false,
        }
    }
}

impl ExternalDarkPhotonLibrary for TabulatedDarkPhotons {
    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn mass(&self) -> f64 {
        self.ma
    }

    fn sigma_total(&self, e0: f64) -> f64 {
        if e0 < self.threshold {
            return 0.0;
        }
        if self.in_table(e0) {
            interpolate_log_log(&self.energies, &self.sigmas, e0)
        } else {
            self.compute_sigma(e0)
        }
    }

    fn simulate_emission(&self, e0: f64, rng: &mut dyn RngCore) -> Option<Emission> {
        if e0 < self.threshold {
            return None;
        }
        let diff = DiffCross {
            e0,
            ma: self.ma,
            ml: self.ml,
        };
        let x_max = diff.x_max();
        if !(x_max > 0.0) {
            return None;
        }

        // dσ/dx peaks towards x_max, so bound it on a grid with some margin
        let f_max = (1..=ENVELOPE_POINTS)
            .map(|i| diff.integrand(x_max * i as f64 / ENVELOPE_POINTS as f64))
            .fold(0.0_f64, f64::max)
            * 1.2;
        if !(f_max > 0.0) {
            return None;
        }

        let x = (0..MAX_EMISSION_TRIALS).find_map(|_| {
            let x = x_max * rng.gen::<f64>();
            (rng.gen::<f64>() * f_max < diff.integrand(x)).then_some(x)
        })?;

        // θ² follows 1/(c θ² + u0)² with c = E0² x
        let c = e0 * e0 * x;
        let u0 = self.ma * self.ma * (1.0 - x) / x + self.ml * self.ml * x;
        let w_max = PI * PI;
        let inv_lo = 1.0 / u0;
        let inv_hi = 1.0 / (c * w_max + u0);
        let inv = inv_lo - rng.gen::<f64>() * (inv_lo - inv_hi);
        let w = ((1.0 / inv - u0) / c).clamp(0.0, w_max);

        Some(Emission {
            x,
            theta: w.sqrt(),
            phi: 2.0 * PI * rng.gen::<f64>(),
        })
    }
}
