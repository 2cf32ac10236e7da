use std::path::PathBuf;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    atom::Atom, molecular_data::MolecularData, molecule::Molecule, periodic_table::ElementType,
};

use super::ConfigError;

/// Represents a molecule and its calculation parameters in a config file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigMolecule {
    pub geometry: Vec<ConfigAtom>,
    pub basis: String,
    #[serde(default = "singlet")]
    pub multiplicity: u32,
    #[serde(default)]
    pub charge: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub data_directory: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigAtom {
    pub element: ElementType,
    pub position: Vec<f64>,
}

fn singlet() -> u32 {
    1
}

impl TryFrom<ConfigMolecule> for MolecularData {
    type Error = ConfigError;

    fn try_from(value: ConfigMolecule) -> Result<Self, Self::Error> {
        let atoms = value
            .geometry
            .into_iter()
            .enumerate()
            .map(|(index, atom)| {
                let &[x, y, z] = atom.position.as_slice() else {
                    return Err(ConfigError::Coordinates {
                        index,
                        found: atom.position.len(),
                    });
                };
                Ok(Atom::new(atom.element, Vector3::new(x, y, z)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let molecule = MolecularData::new(
            Molecule::new(atoms),
            value.basis,
            value.multiplicity,
            value.charge,
            value.description,
        )?;

        Ok(match value.data_directory {
            Some(directory) => molecule.with_data_directory(directory),
            None => molecule,
        })
    }
}
