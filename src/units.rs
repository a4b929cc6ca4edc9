// Framework units and physical constants.
//
// Energies are in MeV, lengths in mm and areas in mm². Anything that talks
// to an external model in another unit system converts at its boundary.

pub const MEV: f64 = 1.0;
pub const GEV: f64 = 1.0e3 * MEV;
pub const KEV: f64 = 1.0e-3 * MEV;

pub const MM: f64 = 1.0;
pub const CM: f64 = 10.0 * MM;
pub const M: f64 = 1.0e3 * MM;

pub const MM2: f64 = MM * MM;
pub const CM2: f64 = CM * CM;
pub const CM3: f64 = CM * CM * CM;

/// 1 barn = 1e-24 cm²
pub const BARN: f64 = 1.0e-28 * M * M;
pub const MILLIBARN: f64 = 1.0e-3 * BARN;
pub const PICOBARN: f64 = 1.0e-12 * BARN;

pub const GRAM: f64 = 1.0;
pub const GRAM_PER_MOLE: f64 = GRAM;
pub const AVOGADRO: f64 = 6.02214076e23;

pub const ELECTRON_MASS: f64 = 0.51099895 * MEV;
pub const MUON_MASS: f64 = 105.6583755 * MEV;
pub const PROTON_MASS: f64 = 938.272 * MEV;
pub const NEUTRON_MASS: f64 = 939.565 * MEV;
pub const KAON_ZERO_LONG_MASS: f64 = 497.611 * MEV;

/// Electroweak coupling used by the dark brem cross section
pub const ALPHA_EW: f64 = 1.0 / 137.0;
/// Conversion of GeV⁻² into picobarn
pub const GEV2_TO_PB: f64 = 3.894e8;
