use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

use thiserror::Error;

use crate::{
    amplitudes::{self, AmplitudeError, CcsdAmplitudes},
    molecular_data::{MolecularData, Method},
};

use super::{
    input::{self, InputError},
    results::Psi4Results,
    RunOptions,
};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("failed to launch {program}: {source}")]
    Launch { program: PathBuf, source: io::Error },
    #[error("psi4 exited unsuccessfully (exit code {code:?})")]
    Failed { code: Option<i32> },
    #[error("failed to determine the working directory: {0}")]
    WorkingDirectory(io::Error),
    #[error("failed to clean up {path}: {source}")]
    CleanUp { path: PathBuf, source: io::Error },
    #[error("failed to read CCSD amplitudes: {0}")]
    Amplitudes(#[from] AmplitudeError),
}

/// Runs Psi4 on an input file, writing the output file.
pub trait Executor {
    fn execute(&self, input: &Path, output: &Path, working_directory: &Path) -> Result<(), RunError>;
}

/// Launches a Psi4 executable as a child process and waits for it
#[derive(Clone, Debug)]
pub struct ProcessExecutor {
    program: PathBuf,
}

impl ProcessExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new("psi4")
    }
}

impl Executor for ProcessExecutor {
    fn execute(&self, input: &Path, output: &Path, working_directory: &Path) -> Result<(), RunError> {
        log::debug!(
            "running {} {} {}",
            self.program.display(),
            input.display(),
            output.display()
        );

        let status = Command::new(&self.program)
            .arg(input)
            .arg(output)
            .current_dir(working_directory)
            .status()
            .map_err(|source| RunError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(RunError::Failed {
                code: status.code(),
            })
        }
    }
}

/// Run the requested Psi4 calculations for `molecule` and return it updated with
/// the results.
///
/// A failed Psi4 run is an error unless `options.tolerate_error` is set, in which
/// case it is logged and whatever results were written are still loaded. Missing
/// results only produce a warning.
pub fn run_psi4(
    mut molecule: MolecularData,
    options: &RunOptions,
    executor: &impl Executor,
) -> Result<MolecularData, RunError> {
    // psi4 runs in the working directory, so it gets absolute paths
    let input_file = input::absolute(&input::generate_psi4_input(&molecule, options)?);
    let output_file = input::absolute(&input::output_file(&molecule));
    let working_directory = options
        .working_directory()
        .map_err(RunError::WorkingDirectory)?;

    log::info!("running psi4 for {}", molecule.name());
    let outcome = executor.execute(&input_file, &output_file, &working_directory);
    let results = Psi4Results::load(input::results_file(&molecule));

    // amplitudes are read before clean up may delete the output
    let amplitudes = match &outcome {
        Ok(()) => {
            let n_orbitals = results
                .as_ref()
                .ok()
                .and_then(|results| results.n_orbitals)
                .or_else(|| molecule.n_orbitals());
            read_amplitudes(&molecule, options, n_orbitals, &output_file)
        }
        Err(err) => {
            log::error!("Psi4 calculation for {} has failed: {err}", molecule.name());
            Ok(None)
        }
    };

    clean_up(
        &molecule,
        &working_directory,
        options.delete_input,
        options.delete_output,
    )?;

    if let Err(err) = outcome {
        if !options.tolerate_error {
            return Err(err);
        }
    }

    if let Err(err) = results.and_then(|results| results.apply_to(&mut molecule)) {
        log::warn!("No calculation saved. Psi4 segmentation fault possible. ({err})");
    }

    match amplitudes {
        Ok(Some(amplitudes)) => molecule.ccsd_amplitudes = Some(amplitudes),
        Ok(None) => {}
        Err(err) if options.tolerate_error => {
            log::warn!("could not read CCSD amplitudes for {}: {err}", molecule.name())
        }
        Err(err) => return Err(err),
    }

    Ok(molecule)
}

fn read_amplitudes(
    molecule: &MolecularData,
    options: &RunOptions,
    n_orbitals: Option<usize>,
    output_file: &Path,
) -> Result<Option<CcsdAmplitudes>, RunError> {
    if !options.runs(Method::Ccsd) {
        return Ok(None);
    }

    let Some(n_orbitals) = n_orbitals else {
        log::warn!("number of orbitals unknown, skipping CCSD amplitudes");
        return Ok(None);
    };

    let amplitudes = amplitudes::parse_psi4_ccsd_amplitudes(
        2 * n_orbitals,
        molecule.n_alpha_electrons(),
        molecule.n_beta_electrons(),
        output_file,
    )?;
    Ok(Some(amplitudes))
}

/// Remove scratch files Psi4 leaves in `working_directory` (`*.clean` and
/// `timer.dat`), and optionally the input and output files of `molecule`.
pub fn clean_up(
    molecule: &MolecularData,
    working_directory: &Path,
    delete_input: bool,
    delete_output: bool,
) -> Result<(), RunError> {
    let entries = fs::read_dir(working_directory).map_err(|source| RunError::CleanUp {
        path: working_directory.to_owned(),
        source,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|extension| extension == "clean") {
            remove(&path)?;
        }
    }

    remove(&working_directory.join("timer.dat"))?;
    if delete_input {
        remove(&input::input_file(molecule))?;
    }
    if delete_output {
        remove(&input::output_file(molecule))?;
    }

    Ok(())
}

fn remove(path: &Path) -> Result<(), RunError> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::trace!("removed {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(RunError::CleanUp {
            path: path.to_owned(),
            source,
        }),
    }
}
