//! JSON documents describing molecules and Psi4 runs.

mod molecule;
mod run;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::molecular_data::MolecularDataError;

pub use molecule::{ConfigAtom, ConfigMolecule};
pub use run::ConfigRun;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("atom {index} has {found} coordinates, expected 3")]
    Coordinates { index: usize, found: usize },
    #[error(transparent)]
    Molecule(#[from] MolecularDataError),
}

/// Read a JSON config document
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_owned(),
        source,
    })
}
