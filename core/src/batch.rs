use thiserror::Error;

use crate::{
    molecular_data::{MolecularData, MolecularDataError},
    psi4::{self, Executor, RunError, RunOptions},
};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Run(#[from] RunError),
    #[error(transparent)]
    Data(#[from] MolecularDataError),
}

/// Whether any method requested by `options` still lacks an energy on `molecule`
pub fn needs_run(molecule: &MolecularData, options: &RunOptions) -> bool {
    options
        .methods()
        .any(|method| molecule.energy(method).is_none())
}

/// Run Psi4 for every molecule and save the results next to each molecule's other
/// files.
///
/// Unless `recompute` is set, a molecule that already has a saved data file is
/// loaded from it first and only run again if a requested method is missing.
/// Results are returned in the order of `molecules`. With the `rayon` feature the
/// runs happen in parallel; parallel runs should not share a working directory
/// since clean up removes every scratch file in it.
pub fn run_batch<E>(
    molecules: Vec<MolecularData>,
    options: &RunOptions,
    executor: &E,
    recompute: bool,
) -> Vec<Result<MolecularData, BatchError>>
where
    E: Executor + Sync,
{
    log::info!("running {} molecules", molecules.len());

    #[cfg(feature = "rayon")]
    {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};

        molecules
            .into_par_iter()
            .map(|molecule| run_one(molecule, options, executor, recompute))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    {
        molecules
            .into_iter()
            .map(|molecule| run_one(molecule, options, executor, recompute))
            .collect()
    }
}

fn run_one(
    mut molecule: MolecularData,
    options: &RunOptions,
    executor: &impl Executor,
    recompute: bool,
) -> Result<MolecularData, BatchError> {
    if !recompute && molecule.refresh()? && !needs_run(&molecule, options) {
        log::info!("{} is up to date", molecule.name());
        return Ok(molecule);
    }

    let molecule = psi4::run_psi4(molecule, options, executor)?;
    molecule.save()?;
    Ok(molecule)
}

#[cfg(test)]
mod tests {
    use crate::{molecular_data::make_diatomic, periodic_table::ElementType};

    use super::*;

    #[test]
    fn requested_methods_without_energies_need_a_run() {
        let mut molecule =
            make_diatomic(ElementType::H, ElementType::H, 0.7414, "sto-3g", 1, 0).unwrap();
        let options = RunOptions {
            run_fci: true,
            ..Default::default()
        };

        assert!(needs_run(&molecule, &options));

        molecule.hf_energy = Some(-1.1167);
        assert!(needs_run(&molecule, &options));

        molecule.fci_energy = Some(-1.1373);
        assert!(!needs_run(&molecule, &options));

        let nothing = RunOptions {
            run_scf: false,
            ..Default::default()
        };
        assert!(!needs_run(&molecule, &nothing));
    }
}
