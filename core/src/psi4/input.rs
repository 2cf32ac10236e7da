use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::molecular_data::{with_suffix, MolecularData};

use super::RunOptions;

/// The template used when no custom template file is configured
pub const DEFAULT_TEMPLATE: &str = include_str!("../../data/psi4_template");

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read psi4 template {path}: {source}")]
    Template { path: PathBuf, source: io::Error },
    #[error("failed to write psi4 input {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Psi4 input file of a molecule, `<filename>.inp`
pub fn input_file(molecule: &MolecularData) -> PathBuf {
    with_suffix(&molecule.filename(), ".inp")
}

/// Psi4 output file of a molecule, `<filename>.out`
pub fn output_file(molecule: &MolecularData) -> PathBuf {
    with_suffix(&molecule.filename(), ".out")
}

/// Results written by the template, `<filename>.psi4.json`
pub fn results_file(molecule: &MolecularData) -> PathBuf {
    with_suffix(&molecule.filename(), ".psi4.json")
}

fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Fill in every placeholder of `template`.
///
/// `template_directory` replaces `&THIS_DIRECTORY`. Placeholders are substituted
/// one after another in a fixed order, so a value is never itself scanned for the
/// placeholders that precede it.
pub fn render_input(
    molecule: &MolecularData,
    options: &RunOptions,
    template: &str,
    template_directory: &Path,
) -> String {
    let filename = absolute(&molecule.filename());

    let substitutions = [
        ("&THIS_DIRECTORY", template_directory.display().to_string()),
        ("&geometry", molecule.molecule().python_literal()),
        ("&basis", molecule.basis().to_owned()),
        ("&charge", molecule.charge().to_string()),
        ("&multiplicity", molecule.multiplicity().to_string()),
        ("&description", molecule.description().to_owned()),
        ("&mol_filename", filename.display().to_string()),
        ("&geo_string", molecule.molecule().geometry_string()),
        ("&run_scf", python_bool(options.run_scf).to_owned()),
        ("&run_mp2", python_bool(options.run_mp2).to_owned()),
        ("&run_cisd", python_bool(options.run_cisd).to_owned()),
        ("&run_ccsd", python_bool(options.run_ccsd).to_owned()),
        ("&run_fci", python_bool(options.run_fci).to_owned()),
        ("&tolerate_error", python_bool(options.tolerate_error).to_owned()),
        ("&not_tolerate_error", python_bool(!options.tolerate_error).to_owned()),
        ("&verbose", python_bool(options.verbose).to_owned()),
        ("&memory", options.memory.to_string()),
    ];

    substitutions
        .iter()
        .fold(template.to_owned(), |input, (placeholder, value)| {
            input.replace(placeholder, value)
        })
}

/// Render the configured template for `molecule` and write it to its input file.
/// Returns the path of the written input.
pub fn generate_psi4_input(
    molecule: &MolecularData,
    options: &RunOptions,
) -> Result<PathBuf, InputError> {
    let content = match &options.template_file {
        Some(path) => {
            let template = fs::read_to_string(path).map_err(|source| InputError::Template {
                path: path.clone(),
                source,
            })?;
            let directory = absolute(path.parent().unwrap_or(Path::new(".")));
            render_input(molecule, options, &template, &directory)
        }
        None => render_input(
            molecule,
            options,
            DEFAULT_TEMPLATE,
            &absolute(&molecule.data_directory),
        ),
    };

    let path = input_file(molecule);
    fs::write(&path, content).map_err(|source| InputError::Write {
        path: path.clone(),
        source,
    })?;

    log::debug!("wrote psi4 input {}", path.display());
    Ok(path)
}

pub(super) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_owned())
}

#[cfg(test)]
mod tests {
    use crate::{molecular_data::make_diatomic, periodic_table::ElementType};

    use super::*;

    fn hydrogen() -> MolecularData {
        make_diatomic(ElementType::H, ElementType::H, 0.7414, "sto-3g", 1, 0)
            .unwrap()
            .with_data_directory("/tmp/psi4-fermion")
    }

    #[test]
    fn every_placeholder_is_substituted() {
        let options = RunOptions {
            run_ccsd: true,
            memory: 4000,
            ..RunOptions::default()
        };

        let input = render_input(&hydrogen(), &options, DEFAULT_TEMPLATE, Path::new("/templates"));

        assert!(!input.contains('&'), "unsubstituted placeholder in:\n{input}");
        assert!(input.contains("psi4.set_memory('4000 MB')"));
        assert!(input.contains("\n0 1\nH 0.0 0.0 0.0\nH 0.0 0.0 0.7414\n"));
        assert!(input.contains("'basis': 'sto-3g'"));
        assert!(input.contains("if True:\n    try:\n        psi4.set_options({'qc_module': 'ccenergy'})"));
        assert!(input.contains("/tmp/psi4-fermion/H2_sto-3g_singlet_0.7414.psi4.json"));
        assert!(input.contains("sys.path.insert(0, '/templates')"));
    }

    #[test]
    fn tolerance_flags_are_complementary() {
        let template = "&tolerate_error &not_tolerate_error &verbose";
        let options = RunOptions {
            tolerate_error: true,
            ..RunOptions::default()
        };

        assert_eq!(
            render_input(&hydrogen(), &options, template, Path::new(".")),
            "True False False"
        );
    }

    #[test]
    fn geometry_placeholder_is_a_python_list() {
        let input = render_input(&hydrogen(), &RunOptions::default(), "&geometry", Path::new("."));
        assert_eq!(input, "[('H', (0.0, 0.0, 0.0)), ('H', (0.0, 0.0, 0.7414))]");
    }

    #[test]
    fn file_names_keep_the_description() {
        let molecule = hydrogen();
        assert_eq!(
            input_file(&molecule),
            PathBuf::from("/tmp/psi4-fermion/H2_sto-3g_singlet_0.7414.inp")
        );
        assert_eq!(
            output_file(&molecule),
            PathBuf::from("/tmp/psi4-fermion/H2_sto-3g_singlet_0.7414.out")
        );
    }
}
