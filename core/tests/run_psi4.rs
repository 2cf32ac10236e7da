use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use approx::assert_relative_eq;
use nalgebra::DMatrix;
use psi4_fermion::{
    batch::{self, BatchError},
    molecular_data::{make_diatomic, Method, MolecularData, MolecularDataError},
    operators::{InteractionRdm, SizeMismatch},
    periodic_table::ElementType,
    psi4::{self, Executor, RunError, RunOptions},
    tensor::Tensor4,
};
use tempfile::TempDir;

const H2_RESULTS: &str = r#"{
    "hf_energy": -1.1167593073,
    "ccsd_energy": -1.1372838344,
    "nuclear_repulsion": 0.7137539936,
    "n_basis": 2,
    "n_orbitals": 2,
    "orbital_energies": [-0.5782, 0.6703],
    "one_body_integrals": [-1.2524635735, 0.0, 0.0, -0.4759344611],
    "two_body_integrals": [0.6746, 0.0, 0.0, 0.6636,
                           0.0, 0.1813, 0.1813, 0.0,
                           0.0, 0.1813, 0.1813, 0.0,
                           0.6636, 0.0, 0.0, 0.6975]
}"#;

const H2_OUTPUT: &str = "\
    Largest TIA Amplitudes:

    Largest TIjAb Amplitudes:
      0   0   0   0        -0.1128469567

    CCSD correlation energy = -0.0205245271
";

/// Stands in for Psi4: writes the output and results files and leaves scratch
/// files behind the way Psi4 does.
struct FakePsi4 {
    results_file: PathBuf,
    results: Option<&'static str>,
    succeed: bool,
    calls: AtomicUsize,
}

impl FakePsi4 {
    fn new(molecule: &MolecularData, results: Option<&'static str>, succeed: bool) -> Self {
        Self {
            // the template always writes the results to an absolute path
            results_file: std::path::absolute(psi4::results_file(molecule)).unwrap(),
            results,
            succeed,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Executor for FakePsi4 {
    fn execute(&self, input: &Path, output: &Path, working_directory: &Path) -> Result<(), RunError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        // a child process resolves relative paths against its own directory
        let input = working_directory.join(input);
        let output = working_directory.join(output);
        assert!(input.exists(), "input {} was not written", input.display());

        fs::write(output, H2_OUTPUT).unwrap();
        fs::write(working_directory.join("timer.dat"), "").unwrap();
        fs::write(working_directory.join("psi.4242.clean"), "").unwrap();
        if let Some(results) = self.results {
            fs::write(&self.results_file, results).unwrap();
        }

        if self.succeed {
            Ok(())
        } else {
            Err(RunError::Failed { code: Some(1) })
        }
    }
}

fn setup() -> (TempDir, MolecularData, RunOptions) {
    let directory = tempfile::tempdir().unwrap();
    let molecule = make_diatomic(ElementType::H, ElementType::H, 0.7414, "sto-3g", 1, 0)
        .unwrap()
        .with_data_directory(directory.path());
    let options = RunOptions {
        run_ccsd: true,
        working_directory: Some(directory.path().to_owned()),
        ..Default::default()
    };
    (directory, molecule, options)
}

fn assert_scratch_removed(directory: &Path) {
    assert!(!directory.join("timer.dat").exists());
    assert!(!directory.join("psi.4242.clean").exists());
}

#[test]
fn successful_run_merges_results() {
    let (directory, molecule, options) = setup();
    let psi4 = FakePsi4::new(&molecule, Some(H2_RESULTS), true);

    let molecule = psi4::run_psi4(molecule, &options, &psi4).unwrap();

    assert_relative_eq!(molecule.hf_energy.unwrap(), -1.1167593073);
    assert_relative_eq!(molecule.ccsd_energy.unwrap(), -1.1372838344);
    assert_eq!(molecule.n_qubits(), Some(4));

    let amplitudes = molecule.ccsd_amplitudes.as_ref().unwrap();
    assert_relative_eq!(amplitudes.doubles[(2, 0, 3, 1)], -0.1128469567 / 2.0);

    assert_scratch_removed(directory.path());
    assert!(!psi4::input_file(&molecule).exists());
    assert!(psi4::output_file(&molecule).exists());
}

#[test]
fn hamiltonian_energy_matches_hartree_fock() {
    let (_directory, molecule, options) = setup();
    let psi4 = FakePsi4::new(&molecule, Some(H2_RESULTS), true);
    let molecule = psi4::run_psi4(molecule, &options, &psi4).unwrap();

    let hamiltonian = molecule.molecular_hamiltonian(&[], None).unwrap();
    assert_eq!(hamiltonian.n_qubits(), 4);
    assert_relative_eq!(hamiltonian.constant, 0.7137539936);
    assert_relative_eq!(hamiltonian.one_body[(1, 1)], -1.2524635735);

    // both electrons in the lowest spatial orbital
    let frozen = molecule.molecular_hamiltonian(&[0], Some(&[][..])).unwrap();
    let expected = 0.7137539936 + 2.0 * -1.2524635735 + 0.6746;
    assert_relative_eq!(frozen.constant, expected, epsilon = 1e-10);
}

#[test]
fn failed_run_is_an_error_after_clean_up() {
    let (directory, molecule, options) = setup();
    let psi4 = FakePsi4::new(&molecule, None, false);

    let result = psi4::run_psi4(molecule, &options, &psi4);

    assert!(matches!(result, Err(RunError::Failed { code: Some(1) })));
    assert_scratch_removed(directory.path());
}

#[test]
fn tolerated_failure_keeps_partial_results() {
    let (directory, molecule, mut options) = setup();
    options.tolerate_error = true;
    let psi4 = FakePsi4::new(&molecule, Some(r#"{"hf_energy": -1.1167593073}"#), false);

    let molecule = psi4::run_psi4(molecule, &options, &psi4).unwrap();

    assert_eq!(molecule.hf_energy, Some(-1.1167593073));
    assert_eq!(molecule.ccsd_energy, None);
    assert_eq!(molecule.ccsd_amplitudes, None);
    assert_scratch_removed(directory.path());
}

#[test]
fn missing_results_are_not_an_error() {
    let (_directory, molecule, options) = setup();
    let psi4 = FakePsi4::new(&molecule, None, true);

    let molecule = psi4::run_psi4(molecule, &options, &psi4).unwrap();

    assert_eq!(molecule.hf_energy, None);
    // without results the orbital count is unknown, so amplitudes are skipped
    assert_eq!(molecule.ccsd_amplitudes, None);
}

#[test]
fn saved_molecules_round_trip() {
    let (_directory, molecule, options) = setup();
    let psi4 = FakePsi4::new(&molecule, Some(H2_RESULTS), true);
    let molecule = psi4::run_psi4(molecule, &options, &psi4).unwrap();

    let path = molecule.save().unwrap();
    assert_eq!(path, molecule.data_file());

    let loaded = MolecularData::load(&path).unwrap();
    assert_eq!(loaded.name(), molecule.name());
    assert_eq!(loaded.n_orbitals(), Some(2));
    assert_relative_eq!(loaded.hf_energy.unwrap(), -1.1167593073);
    assert_relative_eq!(
        loaded.ccsd_amplitudes.unwrap().doubles[(3, 1, 2, 0)],
        -0.1128469567 / 2.0
    );
}

#[test]
fn batch_skips_computed_molecules() {
    let (_directory, molecule, options) = setup();
    let psi4 = FakePsi4::new(&molecule, Some(H2_RESULTS), true);

    let first = batch::run_batch(vec![molecule.clone()], &options, &psi4, false);
    assert!(first[0].is_ok());
    assert!(molecule.data_file().exists());
    assert_eq!(psi4.calls.load(Ordering::SeqCst), 1);

    let second = batch::run_batch(vec![molecule.clone()], &options, &psi4, false);
    assert_eq!(second[0].as_ref().unwrap().hf_energy, Some(-1.1167593073));
    assert_eq!(psi4.calls.load(Ordering::SeqCst), 1);

    let forced = batch::run_batch(vec![molecule], &options, &psi4, true);
    assert!(forced[0].is_ok());
    assert_eq!(psi4.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn psi4_finds_its_files_from_another_working_directory() {
    // a data directory given relative to the current directory
    let data_directory = tempfile::Builder::new()
        .prefix("psi4-data")
        .tempdir_in(".")
        .unwrap();
    let relative = Path::new(".").join(data_directory.path().file_name().unwrap());
    let working_directory = tempfile::tempdir().unwrap();

    let molecule = make_diatomic(ElementType::H, ElementType::H, 0.7414, "sto-3g", 1, 0)
        .unwrap()
        .with_data_directory(&relative);
    let options = RunOptions {
        run_ccsd: true,
        working_directory: Some(working_directory.path().to_owned()),
        ..Default::default()
    };
    let psi4 = FakePsi4::new(&molecule, Some(H2_RESULTS), true);

    let molecule = psi4::run_psi4(molecule, &options, &psi4).unwrap();

    assert_eq!(molecule.hf_energy, Some(-1.1167593073));
    assert!(molecule.ccsd_amplitudes.is_some());
    assert!(psi4::output_file(&molecule).exists());
    assert!(!psi4::input_file(&molecule).exists());
    assert_scratch_removed(working_directory.path());
    assert!(!working_directory
        .path()
        .join(psi4::output_file(&molecule).file_name().unwrap())
        .exists());
}

#[test]
fn input_can_be_kept_and_output_deleted() {
    let (directory, molecule, mut options) = setup();
    options.delete_input = false;
    options.delete_output = true;
    let psi4 = FakePsi4::new(&molecule, Some(H2_RESULTS), true);

    let molecule = psi4::run_psi4(molecule, &options, &psi4).unwrap();

    assert!(psi4::input_file(&molecule).exists());
    assert!(!psi4::output_file(&molecule).exists());
    assert_scratch_removed(directory.path());
    // amplitudes are read before the output is removed
    assert!(molecule.ccsd_amplitudes.is_some());
}

#[test]
fn clean_up_leaves_unrelated_files() {
    let (directory, molecule, _) = setup();
    let unrelated = directory.path().join("notes.txt");
    fs::write(&unrelated, "keep").unwrap();
    fs::write(directory.path().join("timer.dat"), "").unwrap();
    fs::write(psi4::input_file(&molecule), "").unwrap();
    fs::write(psi4::output_file(&molecule), "").unwrap();

    psi4::clean_up(&molecule, directory.path(), false, false).unwrap();

    assert!(unrelated.exists());
    assert!(psi4::input_file(&molecule).exists());
    assert!(psi4::output_file(&molecule).exists());
    assert!(!directory.path().join("timer.dat").exists());
}

#[test]
fn rdm_energy_needs_the_full_orbital_space() {
    let (_directory, molecule, options) = setup();
    let psi4 = FakePsi4::new(&molecule, Some(H2_RESULTS), true);
    let mut molecule = psi4::run_psi4(molecule, &options, &psi4).unwrap();

    molecule.fci_rdm = Some(InteractionRdm {
        one_body: DMatrix::identity(4, 4),
        two_body: Tensor4::zeros(4),
    });
    let rdm = molecule.molecular_rdm(Method::Fci).unwrap();

    let full = molecule.molecular_hamiltonian(&[], None).unwrap();
    assert!(rdm.expectation(&full).is_ok());

    let reduced = molecule.molecular_hamiltonian(&[0], Some(&[1][..])).unwrap();
    assert_eq!(
        rdm.expectation(&reduced),
        Err(SizeMismatch {
            rdm: 4,
            operator: 2
        })
    );
}

#[test]
fn corrupted_saved_molecules_do_not_reach_the_batch() {
    let (_directory, molecule, options) = setup();
    let psi4 = FakePsi4::new(&molecule, Some(H2_RESULTS), true);
    let molecule = psi4::run_psi4(molecule, &options, &psi4).unwrap();
    let path = molecule.save().unwrap();

    let saved = fs::read_to_string(&path).unwrap();
    fs::write(&path, saved.replace("\"multiplicity\":1,", "\"multiplicity\":0,")).unwrap();

    let results = batch::run_batch(vec![molecule], &options, &psi4, false);
    assert!(matches!(
        results[0],
        Err(BatchError::Data(MolecularDataError::InvalidMultiplicity(0)))
    ));
}
