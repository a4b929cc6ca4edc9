mod data;
pub mod units;
pub mod error;
pub mod config;
pub mod four_vector;
pub mod track;
pub mod material;
pub mod utilities;
pub mod integrate;
pub mod fast_rng;
pub mod run_header;

// Dark brem physics
pub mod vertex_library;
pub mod kinematics;
pub mod xsec;
pub mod dark_photons;
pub mod model;
pub mod vertex_library_model;
pub mod analytic_model;
pub mod particle_change;
pub mod process;
pub mod process_table;

// Biasing
pub mod biasing;
pub mod bias_operators;

// Transport
pub mod bank;
pub mod simulator;

pub use config::{load_config, SimConfig};
pub use data::{find_element, ElementData};
pub use error::{BiasSetupError, ConfigError, LoadError, PhysicsError, Result, SimError};
pub use four_vector::FourMomentum;
pub use kinematics::ScalingMethod;
pub use material::Material;
pub use model::{create_model, model_names, DarkBremModel, ModelSetup};
pub use process::{DarkBremProcess, DiscreteProcess, DARK_BREM_PROCESS_NAME};
pub use process_table::ProcessTable;
pub use run_header::RunHeader;
pub use simulator::{EventSummary, InteractionRecord, Layer, RunSummary, Simulator};
pub use track::{Species, Track};
pub use utilities::interpolate_log_log;
pub use vertex_library::{LibraryCursor, VertexLibrary, VertexRecord};
