use std::{
    fs, io,
    path::{Path, PathBuf},
};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    conversion,
    molecular_data::MolecularData,
    operators::InteractionRdm,
    tensor::Tensor4,
};

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("failed to read psi4 results {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse psi4 results {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{field} has {found} entries, expected {expected}")]
    Shape {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{0} was reported without the number of orbitals")]
    MissingOrbitalCount(&'static str),
}

/// Spin blocks of spatial reduced density matrices, each flattened row-major
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialRdm {
    pub one_a: Vec<f64>,
    pub one_b: Vec<f64>,
    pub two_aa: Vec<f64>,
    pub two_ab: Vec<f64>,
    pub two_bb: Vec<f64>,
}

/// Everything the Psi4 template writes after a run. Every field is optional since
/// methods that were not requested, or that failed with errors tolerated, report
/// nothing. Matrices are flattened row-major; two-body integrals are in chemist
/// notation `(pq|rs)`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Psi4Results {
    pub hf_energy: Option<f64>,
    pub mp2_energy: Option<f64>,
    pub cisd_energy: Option<f64>,
    pub ccsd_energy: Option<f64>,
    pub fci_energy: Option<f64>,
    pub nuclear_repulsion: Option<f64>,
    pub n_basis: Option<usize>,
    pub n_orbitals: Option<usize>,
    pub orbital_energies: Option<Vec<f64>>,
    pub canonical_orbitals: Option<Vec<f64>>,
    pub one_body_integrals: Option<Vec<f64>>,
    pub two_body_integrals: Option<Vec<f64>>,
    pub cisd_rdm: Option<SpatialRdm>,
    pub fci_rdm: Option<SpatialRdm>,
}

impl Psi4Results {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ResultsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ResultsError::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ResultsError::Json {
            path: path.to_owned(),
            source,
        })
    }

    /// Copy every reported quantity into `molecule`, converting integrals and RDMs
    /// to the representation [`MolecularData`] stores. Quantities that were not
    /// reported keep their previous value.
    pub fn apply_to(self, molecule: &mut MolecularData) -> Result<(), ResultsError> {
        let Psi4Results {
            hf_energy,
            mp2_energy,
            cisd_energy,
            ccsd_energy,
            fci_energy,
            nuclear_repulsion,
            n_basis,
            n_orbitals,
            orbital_energies,
            canonical_orbitals,
            one_body_integrals,
            two_body_integrals,
            cisd_rdm,
            fci_rdm,
        } = self;

        let require =
            |field: &'static str| n_orbitals.ok_or(ResultsError::MissingOrbitalCount(field));

        if let (Some(energies), Some(n)) = (&orbital_energies, n_orbitals) {
            check("orbital_energies", n, energies.len())?;
        }

        let canonical_orbitals = canonical_orbitals
            .map(|data| {
                let n = require("canonical_orbitals")?;
                matrix("canonical_orbitals", n_basis.unwrap_or(n), n, data)
            })
            .transpose()?;
        let one_body_integrals = one_body_integrals
            .map(|data| {
                let n = require("one_body_integrals")?;
                matrix("one_body_integrals", n, n, data)
            })
            .transpose()?;
        let two_body_integrals = two_body_integrals
            .map(|data| {
                let eri = tensor("two_body_integrals", require("two_body_integrals")?, data)?;
                Ok::<_, ResultsError>(conversion::chemist_to_openfermion(&eri))
            })
            .transpose()?;
        let cisd_rdm = cisd_rdm
            .map(|rdm| unpack(rdm, require("cisd_rdm")?))
            .transpose()?;
        let fci_rdm = fci_rdm
            .map(|rdm| unpack(rdm, require("fci_rdm")?))
            .transpose()?;

        macro_rules! update {
            ($($field:ident),*) => {
                $(if $field.is_some() {
                    molecule.$field = $field;
                })*
            };
        }

        update!(
            hf_energy,
            mp2_energy,
            cisd_energy,
            ccsd_energy,
            fci_energy,
            nuclear_repulsion,
            orbital_energies,
            canonical_orbitals,
            one_body_integrals,
            two_body_integrals,
            cisd_rdm,
            fci_rdm
        );

        Ok(())
    }
}

fn check(field: &'static str, expected: usize, found: usize) -> Result<(), ResultsError> {
    if expected == found {
        Ok(())
    } else {
        Err(ResultsError::Shape {
            field,
            expected,
            found,
        })
    }
}

fn matrix(
    field: &'static str,
    rows: usize,
    columns: usize,
    data: Vec<f64>,
) -> Result<DMatrix<f64>, ResultsError> {
    check(field, rows * columns, data.len())?;
    Ok(DMatrix::from_row_slice(rows, columns, &data))
}

fn tensor(field: &'static str, size: usize, data: Vec<f64>) -> Result<Tensor4, ResultsError> {
    let found = data.len();
    Tensor4::from_row_major(size, data).ok_or(ResultsError::Shape {
        field,
        expected: size.pow(4),
        found,
    })
}

fn unpack(rdm: SpatialRdm, n_orbitals: usize) -> Result<InteractionRdm, ResultsError> {
    let one_a = matrix("one_a", n_orbitals, n_orbitals, rdm.one_a)?;
    let one_b = matrix("one_b", n_orbitals, n_orbitals, rdm.one_b)?;
    let two_aa = tensor("two_aa", n_orbitals, rdm.two_aa)?;
    let two_ab = tensor("two_ab", n_orbitals, rdm.two_ab)?;
    let two_bb = tensor("two_bb", n_orbitals, rdm.two_bb)?;

    let (one_body, two_body) =
        conversion::unpack_spatial_rdm(&one_a, &one_b, &two_aa, &two_ab, &two_bb);
    Ok(InteractionRdm { one_body, two_body })
}
