//! Driving Psi4: rendering input files, launching the program and merging what
//! it reports back into [`MolecularData`](crate::molecular_data::MolecularData).

mod input;
mod results;
mod run;

use std::{env, io, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::molecular_data::Method;

pub use input::{
    generate_psi4_input, input_file, output_file, render_input, results_file, InputError,
    DEFAULT_TEMPLATE,
};
pub use results::{Psi4Results, ResultsError, SpatialRdm};
pub use run::{clean_up, run_psi4, Executor, ProcessExecutor, RunError};

/// What to compute and how to treat the files around a Psi4 run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    pub run_scf: bool,
    pub run_mp2: bool,
    pub run_cisd: bool,
    pub run_ccsd: bool,
    pub run_fci: bool,
    pub verbose: bool,
    pub tolerate_error: bool,
    pub delete_input: bool,
    pub delete_output: bool,
    /// Memory given to Psi4, in MB
    pub memory: u32,
    /// Custom input template; the bundled one is used when unset
    pub template_file: Option<PathBuf>,
    pub psi4_executable: PathBuf,
    /// Directory Psi4 runs in and leaves its scratch files in. Defaults to the
    /// current directory.
    pub working_directory: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_scf: true,
            run_mp2: false,
            run_cisd: false,
            run_ccsd: false,
            run_fci: false,
            verbose: false,
            tolerate_error: false,
            delete_input: true,
            delete_output: false,
            memory: 8000,
            template_file: None,
            psi4_executable: PathBuf::from("psi4"),
            working_directory: None,
        }
    }
}

impl RunOptions {
    pub fn runs(&self, method: Method) -> bool {
        match method {
            Method::Scf => self.run_scf,
            Method::Mp2 => self.run_mp2,
            Method::Cisd => self.run_cisd,
            Method::Ccsd => self.run_ccsd,
            Method::Fci => self.run_fci,
        }
    }

    /// Requested methods, in the order Psi4 runs them
    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        Method::ALL
            .into_iter()
            .filter(|&method| self.runs(method))
    }

    pub fn working_directory(&self) -> io::Result<PathBuf> {
        match &self.working_directory {
            Some(directory) => Ok(directory.clone()),
            None => env::current_dir(),
        }
    }

    /// Executor launching the configured Psi4 program
    pub fn executor(&self) -> ProcessExecutor {
        ProcessExecutor::new(&self.psi4_executable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_scf_runs_by_default() {
        let options = RunOptions::default();
        assert_eq!(options.methods().collect::<Vec<_>>(), vec![Method::Scf]);
        assert!(options.delete_input);
        assert!(!options.delete_output);
        assert_eq!(options.memory, 8000);
    }

    #[test]
    fn methods_follow_flags() {
        let options = RunOptions {
            run_scf: false,
            run_ccsd: true,
            run_fci: true,
            ..Default::default()
        };
        assert_eq!(
            options.methods().collect::<Vec<_>>(),
            vec![Method::Ccsd, Method::Fci]
        );
    }

    #[test]
    fn configured_working_directory_wins() {
        let options = RunOptions {
            working_directory: Some(PathBuf::from("/scratch")),
            ..Default::default()
        };
        assert_eq!(options.working_directory().unwrap(), PathBuf::from("/scratch"));
    }
}
