//! Error types for library loading, configuration, physics and biasing setup.
//!
//! Every fatal condition in the simulation core surfaces as a [`SimError`]
//! and propagates to the run driver; nothing is swallowed on the way.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading a dark brem vertex library.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unable to read vertex library '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed vertex library '{file}' at line {line}: {msg}")]
    Parse {
        file: String,
        line: usize,
        msg: String,
    },

    #[error("No dark brem vertices found in '{0}'")]
    Empty(PathBuf),
}

/// Bad configuration detected at setup or run start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Dark brem model named '{0}' is not known")]
    UnknownModel(String),

    #[error("Biasing operator class '{0}' is not known")]
    UnknownOperator(String),

    #[error("Invalid particle type '{0}'")]
    UnknownSpecies(String),

    #[error("Invalid value for '{key}': {msg}")]
    InvalidValue { key: String, msg: String },

    #[error("Unable to read configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, msg: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            msg: msg.into(),
        }
    }
}

/// Conditions raised while generating an interaction.
#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error(
        "Unable to find a kinematically allowed library vertex after {attempts} attempts \
         at incident energy {energy} MeV"
    )]
    KinematicsRejected { attempts: u32, energy: f64 },

    #[error("Process '{process}' received a track that isn't applicable: {species}")]
    InapplicableTrack { process: String, species: String },

    #[error("Library vertex at {energy} MeV has no centre-of-momentum vector for CM scaling")]
    MissingCenterOfMomentum { energy: f64 },

    #[error("Material '{0}' has no elements to interact with")]
    EmptyMaterial(String),
}

/// Biasing operators that cannot attach to the process list.
#[derive(Debug, Error)]
pub enum BiasSetupError {
    #[error("{process} is not found in list of biased processes for {particle}!")]
    ProcessNotBiased { process: String, particle: String },

    #[error("Invalid particle type '{0}'.")]
    InvalidParticle(String),

    #[error("Biasing factor for '{operator}' must be positive, got {factor}")]
    InvalidFactor { operator: String, factor: f64 },
}

/// Umbrella error for the simulation core.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Physics(#[from] PhysicsError),

    #[error(transparent)]
    BiasSetup(#[from] BiasSetupError),
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;
