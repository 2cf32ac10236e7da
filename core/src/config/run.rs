use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::psi4::RunOptions;

/// Psi4 run settings in a config file. Every field may be left out, in which
/// case the default of [`RunOptions`] applies.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigRun {
    pub run_scf: Option<bool>,
    pub run_mp2: Option<bool>,
    pub run_cisd: Option<bool>,
    pub run_ccsd: Option<bool>,
    pub run_fci: Option<bool>,
    pub verbose: Option<bool>,
    pub tolerate_error: Option<bool>,
    pub delete_input: Option<bool>,
    pub delete_output: Option<bool>,
    pub memory: Option<u32>,
    pub template_file: Option<PathBuf>,
    pub psi4_executable: Option<PathBuf>,
    pub working_directory: Option<PathBuf>,
}

impl ConfigRun {
    /// Overwrite the fields of `options` that this config sets
    pub fn apply(self, options: RunOptions) -> RunOptions {
        RunOptions {
            run_scf: self.run_scf.unwrap_or(options.run_scf),
            run_mp2: self.run_mp2.unwrap_or(options.run_mp2),
            run_cisd: self.run_cisd.unwrap_or(options.run_cisd),
            run_ccsd: self.run_ccsd.unwrap_or(options.run_ccsd),
            run_fci: self.run_fci.unwrap_or(options.run_fci),
            verbose: self.verbose.unwrap_or(options.verbose),
            tolerate_error: self.tolerate_error.unwrap_or(options.tolerate_error),
            delete_input: self.delete_input.unwrap_or(options.delete_input),
            delete_output: self.delete_output.unwrap_or(options.delete_output),
            memory: self.memory.unwrap_or(options.memory),
            template_file: self.template_file.or(options.template_file),
            psi4_executable: self.psi4_executable.unwrap_or(options.psi4_executable),
            working_directory: self.working_directory.or(options.working_directory),
        }
    }
}

impl From<ConfigRun> for RunOptions {
    fn from(value: ConfigRun) -> Self {
        value.apply(RunOptions::default())
    }
}
