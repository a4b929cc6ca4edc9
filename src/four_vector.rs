// Four-momenta and frame rotations used by the interaction kinematics

use nalgebra::Vector3;
use std::ops::{Add, Neg, Sub};

/// Energy-momentum four-vector (E, p) in framework units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FourMomentum {
    pub e: f64,
    pub p: Vector3<f64>,
}

impl FourMomentum {
    pub fn new(e: f64, px: f64, py: f64, pz: f64) -> Self {
        Self {
            e,
            p: Vector3::new(px, py, pz),
        }
    }

    pub fn from_parts(e: f64, p: Vector3<f64>) -> Self {
        Self { e, p }
    }

    /// Four-momentum of a particle of the given mass carrying momentum `p`
    pub fn on_shell(mass: f64, p: Vector3<f64>) -> Self {
        Self {
            e: (p.norm_squared() + mass * mass).sqrt(),
            p,
        }
    }

    pub fn px(&self) -> f64 {
        self.p.x
    }

    pub fn py(&self) -> f64 {
        self.p.y
    }

    pub fn pz(&self) -> f64 {
        self.p.z
    }

    /// Magnitude of the three-momentum
    pub fn p_mag(&self) -> f64 {
        self.p.norm()
    }

    /// Momentum transverse to the z axis
    pub fn pt(&self) -> f64 {
        (self.p.x * self.p.x + self.p.y * self.p.y).sqrt()
    }

    /// Azimuthal angle around the z axis, zero for a purely longitudinal vector
    pub fn phi(&self) -> f64 {
        if self.p.x == 0.0 && self.p.y == 0.0 {
            0.0
        } else {
            self.p.y.atan2(self.p.x)
        }
    }

    pub fn mass2(&self) -> f64 {
        self.e * self.e - self.p.norm_squared()
    }

    /// Invariant mass, with negative mass² clamped to zero
    pub fn mass(&self) -> f64 {
        self.mass2().max(0.0).sqrt()
    }

    /// Velocity of the frame in which this four-vector is at rest
    pub fn boost_vector(&self) -> Vector3<f64> {
        self.p / self.e
    }

    /// Lorentz boost by velocity `beta` (units of c).
    pub fn boost(&self, beta: &Vector3<f64>) -> Self {
        let b2 = beta.norm_squared();
        if b2 == 0.0 {
            return *self;
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let bp = beta.dot(&self.p);
        let gamma2 = (gamma - 1.0) / b2;
        Self {
            e: gamma * (self.e + bp),
            p: self.p + (gamma2 * bp + gamma * self.e) * beta,
        }
    }

    /// Largest absolute difference between the components of two four-vectors
    pub fn max_abs_diff(&self, other: &FourMomentum) -> f64 {
        let d = *self - *other;
        d.e.abs().max(d.p.x.abs()).max(d.p.y.abs()).max(d.p.z.abs())
    }
}

impl Add for FourMomentum {
    type Output = FourMomentum;

    fn add(self, rhs: FourMomentum) -> FourMomentum {
        FourMomentum {
            e: self.e + rhs.e,
            p: self.p + rhs.p,
        }
    }
}

impl Sub for FourMomentum {
    type Output = FourMomentum;

    fn sub(self, rhs: FourMomentum) -> FourMomentum {
        FourMomentum {
            e: self.e - rhs.e,
            p: self.p - rhs.p,
        }
    }
}

impl Neg for FourMomentum {
    type Output = FourMomentum;

    fn neg(self) -> FourMomentum {
        FourMomentum {
            e: -self.e,
            p: -self.p,
        }
    }
}

/// Rotate `v`, expressed in a frame whose z axis is `new_uz`, into the lab frame.
///
/// `new_uz` must be a unit vector.
pub fn rotate_uz(new_uz: &Vector3<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    let (u1, u2, u3) = (new_uz.x, new_uz.y, new_uz.z);
    let up = u1 * u1 + u2 * u2;
    if up > 0.0 {
        let up = up.sqrt();
        Vector3::new(
            (u1 * u3 * v.x - u2 * v.y) / up + u1 * v.z,
            (u2 * u3 * v.x + u1 * v.y) / up + u2 * v.z,
            -up * v.x + u3 * v.z,
        )
    } else if u3 < 0.0 {
        // theta = pi
        Vector3::new(-v.x, v.y, -v.z)
    } else {
        *v
    }
}

/// Unit vector with polar angle `theta` and azimuth `phi` around z
pub fn direction_from_angles(theta: f64, phi: f64) -> Vector3<f64> {
    let sin_theta = theta.sin();
    Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), theta.cos())
}
