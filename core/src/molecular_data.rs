use std::{
    ffi::OsString,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use nalgebra::{DMatrix, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    amplitudes::CcsdAmplitudes,
    atom::Atom,
    conversion,
    molecule::Molecule,
    operators::{InteractionOperator, InteractionRdm},
    periodic_table::ElementType,
    tensor::Tensor4,
};

const MULTIPLICITY_NAMES: [&str; 12] = [
    "singlet",
    "doublet",
    "triplet",
    "quartet",
    "quintet",
    "sextet",
    "septet",
    "octet",
    "nonet",
    "dectet",
    "undectet",
    "duodectet",
];

#[derive(Debug, Error)]
pub enum MolecularDataError {
    #[error("spin multiplicity {0} is not supported (expected 1 to 12)")]
    InvalidMultiplicity(u32),
    #[error("{n_electrons} electrons cannot have spin multiplicity {multiplicity}")]
    InconsistentSpin { n_electrons: i32, multiplicity: u32 },
    #[error("molecule has no atoms")]
    NoAtoms,
    #[error("charge {0} is out of range")]
    InvalidCharge(i32),
    #[error("a ring needs at least two atoms, got {0}")]
    TooFewRingAtoms(usize),
    #[error("failed to access {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to (de)serialize {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{0} has not been computed for this molecule")]
    Missing(&'static str),
    #[error("orbital index {index} is out of range for {n_orbitals} orbitals")]
    OrbitalOutOfRange { index: usize, n_orbitals: usize },
    #[error("{0} does not produce reduced density matrices")]
    NoRdm(Method),
}

/// The electronic structure methods Psi4 is asked to run
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Scf,
    Mp2,
    Cisd,
    Ccsd,
    Fci,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Scf,
        Method::Mp2,
        Method::Cisd,
        Method::Ccsd,
        Method::Fci,
    ];
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Scf => "SCF",
            Method::Mp2 => "MP2",
            Method::Cisd => "CISD",
            Method::Ccsd => "CCSD",
            Method::Fci => "FCI",
        })
    }
}

/// A molecule together with its calculation parameters and everything Psi4 has
/// computed for it so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MolecularData {
    pub(crate) molecule: Molecule,
    pub(crate) basis: String,
    pub(crate) multiplicity: u32,
    pub(crate) charge: i32,
    pub(crate) description: String,
    /// Directory the input, output and data files of this molecule are placed in
    pub data_directory: PathBuf,

    pub hf_energy: Option<f64>,
    pub mp2_energy: Option<f64>,
    pub cisd_energy: Option<f64>,
    pub ccsd_energy: Option<f64>,
    pub fci_energy: Option<f64>,
    pub nuclear_repulsion: Option<f64>,
    /// Canonical orbital energies in ascending order
    pub orbital_energies: Option<Vec<f64>>,
    /// Molecular orbital coefficients, one orbital per column
    pub canonical_orbitals: Option<DMatrix<f64>>,
    /// Spatial one-body integrals in the molecular orbital basis
    pub one_body_integrals: Option<DMatrix<f64>>,
    /// Spatial two-body integrals `h[p, q, r, s] = (ps|qr)` in the molecular orbital basis
    pub two_body_integrals: Option<Tensor4>,
    pub cisd_rdm: Option<InteractionRdm>,
    pub fci_rdm: Option<InteractionRdm>,
    pub ccsd_amplitudes: Option<CcsdAmplitudes>,
}

impl MolecularData {
    pub fn new(
        molecule: Molecule,
        basis: impl Into<String>,
        multiplicity: u32,
        charge: i32,
        description: impl Into<String>,
    ) -> Result<Self, MolecularDataError> {
        let data = Self {
            molecule,
            basis: basis.into(),
            multiplicity,
            charge,
            description: description.into(),
            data_directory: PathBuf::from("."),
            hf_energy: None,
            mp2_energy: None,
            cisd_energy: None,
            ccsd_energy: None,
            fci_energy: None,
            nuclear_repulsion: None,
            orbital_energies: None,
            canonical_orbitals: None,
            one_body_integrals: None,
            two_body_integrals: None,
            cisd_rdm: None,
            fci_rdm: None,
            ccsd_amplitudes: None,
        };
        data.validate()?;
        Ok(data)
    }

    /// Checks the invariants every other method relies on: at least one atom, a
    /// named multiplicity, and a spin that fits the electron count.
    fn validate(&self) -> Result<(), MolecularDataError> {
        if self.molecule.atoms.is_empty() {
            return Err(MolecularDataError::NoAtoms);
        }
        if !(1..=MULTIPLICITY_NAMES.len() as u32).contains(&self.multiplicity) {
            return Err(MolecularDataError::InvalidMultiplicity(self.multiplicity));
        }

        let n_electrons = self
            .molecule
            .nuclear_charge()
            .checked_sub(self.charge)
            .ok_or(MolecularDataError::InvalidCharge(self.charge))?;
        let unpaired = self.multiplicity as i32 - 1;
        if n_electrons < unpaired || (n_electrons - unpaired) % 2 != 0 {
            return Err(MolecularDataError::InconsistentSpin {
                n_electrons,
                multiplicity: self.multiplicity,
            });
        }

        Ok(())
    }

    pub fn with_data_directory(mut self, data_directory: impl Into<PathBuf>) -> Self {
        self.data_directory = data_directory.into();
        self
    }

    pub fn molecule(&self) -> &Molecule {
        &self.molecule
    }

    pub fn basis(&self) -> &str {
        &self.basis
    }

    pub fn multiplicity(&self) -> u32 {
        self.multiplicity
    }

    pub fn charge(&self) -> i32 {
        self.charge
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Name following the OpenFermion data file convention, e.g.
    /// `H2_sto-3g_singlet_0.7414` or `H1-Li1_sto-3g_singlet_1.45`
    pub fn name(&self) -> String {
        let mut name = format!(
            "{}_{}_{}",
            self.molecule.formula_name(),
            self.basis,
            MULTIPLICITY_NAMES[self.multiplicity as usize - 1]
        );

        if self.charge > 0 {
            name.push_str(&format!("_{}+", self.charge));
        } else if self.charge < 0 {
            name.push_str(&format!("_{}-", self.charge.unsigned_abs()));
        }

        if !self.description.is_empty() {
            name.push('_');
            name.push_str(&self.description);
        }

        name
    }

    /// Path prefix of every file belonging to this molecule, without extension
    pub fn filename(&self) -> PathBuf {
        self.data_directory.join(self.name())
    }

    /// Where [`MolecularData::save`] writes this molecule
    pub fn data_file(&self) -> PathBuf {
        with_suffix(&self.filename(), ".json")
    }

    pub fn n_atoms(&self) -> usize {
        self.molecule.atoms.len()
    }

    pub fn n_electrons(&self) -> usize {
        // validated to be non-negative on construction
        (self.molecule.nuclear_charge() - self.charge) as usize
    }

    pub fn n_alpha_electrons(&self) -> usize {
        (self.n_electrons() + self.multiplicity as usize - 1) / 2
    }

    pub fn n_beta_electrons(&self) -> usize {
        (self.n_electrons() + 1 - self.multiplicity as usize) / 2
    }

    /// Number of spatial orbitals, known once integrals or orbitals have been computed
    pub fn n_orbitals(&self) -> Option<usize> {
        self.one_body_integrals
            .as_ref()
            .map(|integrals| integrals.nrows())
            .or_else(|| self.orbital_energies.as_ref().map(Vec::len))
    }

    pub fn n_qubits(&self) -> Option<usize> {
        self.n_orbitals().map(|n| 2 * n)
    }

    pub fn energy(&self, method: Method) -> Option<f64> {
        match method {
            Method::Scf => self.hf_energy,
            Method::Mp2 => self.mp2_energy,
            Method::Cisd => self.cisd_energy,
            Method::Ccsd => self.ccsd_energy,
            Method::Fci => self.fci_energy,
        }
    }

    /// Spin-orbital Hamiltonian of this molecule.
    ///
    /// `occupied` spatial orbitals are frozen (doubly occupied) and folded into the
    /// constant and one-body terms. Only `active` orbitals are kept, defaulting to all
    /// orbitals.
    pub fn molecular_hamiltonian(
        &self,
        occupied: &[usize],
        active: Option<&[usize]>,
    ) -> Result<InteractionOperator, MolecularDataError> {
        let one_body = self
            .one_body_integrals
            .as_ref()
            .ok_or(MolecularDataError::Missing("one-body integrals"))?;
        let two_body = self
            .two_body_integrals
            .as_ref()
            .ok_or(MolecularDataError::Missing("two-body integrals"))?;
        let nuclear_repulsion = self
            .nuclear_repulsion
            .ok_or(MolecularDataError::Missing("nuclear repulsion"))?;

        let n_orbitals = one_body.nrows();
        let all = (0..n_orbitals).collect::<Vec<_>>();
        let active = active.unwrap_or(&all[..]);

        if let Some(&index) = occupied
            .iter()
            .chain(active)
            .find(|&&index| index >= n_orbitals)
        {
            return Err(MolecularDataError::OrbitalOutOfRange { index, n_orbitals });
        }

        let (core_constant, one_body, two_body) =
            conversion::active_space_integrals(one_body, two_body, occupied, active);
        let (one_body, two_body) = conversion::spinorb_from_spatial(&one_body, &two_body);

        Ok(InteractionOperator::new(
            nuclear_repulsion + core_constant,
            one_body,
            two_body,
        ))
    }

    /// Spin-orbital RDMs of a correlated method
    pub fn molecular_rdm(&self, method: Method) -> Result<&InteractionRdm, MolecularDataError> {
        match method {
            Method::Cisd => self
                .cisd_rdm
                .as_ref()
                .ok_or(MolecularDataError::Missing("CISD density matrices")),
            Method::Fci => self
                .fci_rdm
                .as_ref()
                .ok_or(MolecularDataError::Missing("FCI density matrices")),
            other => Err(MolecularDataError::NoRdm(other)),
        }
    }

    /// Write this molecule to [`MolecularData::data_file`]
    pub fn save(&self) -> Result<PathBuf, MolecularDataError> {
        let path = self.data_file();
        let file = fs::File::create(&path).map_err(|source| MolecularDataError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::to_writer(io::BufWriter::new(file), self).map_err(|source| {
            MolecularDataError::Json {
                path: path.clone(),
                source,
            }
        })?;

        log::debug!("saved {} to {}", self.name(), path.display());
        Ok(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MolecularDataError> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|source| MolecularDataError::Io {
            path: path.to_owned(),
            source,
        })?;
        let data: Self = serde_json::from_reader(io::BufReader::new(file)).map_err(|source| {
            MolecularDataError::Json {
                path: path.to_owned(),
                source,
            }
        })?;
        data.validate()?;
        Ok(data)
    }

    /// Replace this molecule with the version saved at its data file, if any.
    /// Returns whether a saved version existed.
    pub fn refresh(&mut self) -> Result<bool, MolecularDataError> {
        let path = self.data_file();
        if !path.exists() {
            return Ok(false);
        }
        let data_directory = self.data_directory.clone();
        *self = Self::load(path)?;
        self.data_directory = data_directory;
        Ok(true)
    }
}

/// A single atom at the origin in its ground-state spin configuration
pub fn make_atom(
    element: ElementType,
    basis: impl Into<String>,
) -> Result<MolecularData, MolecularDataError> {
    let molecule = Molecule::new(vec![Atom::new(element, Vector3::zeros())]);
    MolecularData::new(molecule, basis, element.polarization() + 1, 0, "")
}

/// `n_atoms` atoms of one element on a ring in the xy-plane, neighbours `spacing`
/// angstrom apart.
pub fn make_atomic_ring(
    n_atoms: usize,
    spacing: f64,
    basis: impl Into<String>,
    element: ElementType,
    charge: i32,
) -> Result<MolecularData, MolecularDataError> {
    if n_atoms < 2 {
        return Err(MolecularDataError::TooFewRingAtoms(n_atoms));
    }

    let theta = 2.0 * std::f64::consts::PI / n_atoms as f64;
    let radius = spacing / (2.0 * (std::f64::consts::FRAC_PI_2 - theta / 2.0).cos());

    let atoms = (0..n_atoms)
        .map(|index| {
            let angle = index as f64 * theta;
            Atom::new(
                element,
                Vector3::new(radius * angle.cos(), radius * angle.sin(), 0.0),
            )
        })
        .collect();

    let n_electrons = n_atoms as i64 * element.atomic_number() as i64 - charge as i64;
    let multiplicity = if n_electrons % 2 != 0 { 2 } else { 1 };

    MolecularData::new(
        Molecule::new(atoms),
        basis,
        multiplicity,
        charge,
        format!("ring_{spacing}"),
    )
}

/// Two atoms on the z axis, `spacing` angstrom apart, described by their spacing
pub fn make_diatomic(
    first: ElementType,
    second: ElementType,
    spacing: f64,
    basis: impl Into<String>,
    multiplicity: u32,
    charge: i32,
) -> Result<MolecularData, MolecularDataError> {
    let molecule = Molecule::new(vec![
        Atom::new(first, Vector3::zeros()),
        Atom::new(second, Vector3::new(0.0, 0.0, spacing)),
    ]);
    MolecularData::new(molecule, basis, multiplicity, charge, spacing.to_string())
}

/// Appends `suffix` to the final path component. Unlike
/// [`Path::with_extension`] this keeps dots already in the name, which
/// descriptions such as bond lengths contain.
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
