use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use psi4_fermion::{
    amplitudes, batch,
    config::{self, ConfigMolecule, ConfigRun},
    geometry,
    molecular_data::{self, MolecularData, Method},
    periodic_table::ElementType,
    psi4::{self, RunOptions},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log debug messages unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the psi4 input file for a molecule without running it
    Input {
        /// A path to the molecule config
        #[arg(long, short)]
        molecule: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run psi4 for a molecule config and save the results
    Run {
        /// A path to the molecule config
        #[arg(long, short)]
        molecule: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run psi4 for two atoms on the z axis
    Diatomic {
        #[arg(long)]
        first: ElementType,
        #[arg(long)]
        second: ElementType,
        /// Bond length in angstrom
        #[arg(long)]
        spacing: f64,
        #[command(flatten)]
        molecule: MoleculeArgs,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run psi4 for a ring of identical atoms in the xy-plane
    Ring {
        #[arg(long)]
        element: ElementType,
        #[arg(long)]
        n_atoms: usize,
        /// Distance between neighbouring atoms in angstrom
        #[arg(long)]
        spacing: f64,
        #[arg(long, default_value = "sto-3g")]
        basis: String,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        charge: i32,
        #[arg(long, default_value = ".")]
        data_directory: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run psi4 for a single atom in its ground state spin configuration
    Atom {
        #[arg(long)]
        element: ElementType,
        #[arg(long, default_value = "sto-3g")]
        basis: String,
        #[arg(long, default_value = ".")]
        data_directory: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run psi4 for a diatomic at evenly spaced bond lengths
    Series {
        #[arg(long)]
        first: ElementType,
        #[arg(long)]
        second: ElementType,
        #[arg(long)]
        start: f64,
        #[arg(long)]
        end: f64,
        #[arg(long, default_value_t = 10)]
        points: usize,
        /// Run molecules again even if their saved results are complete
        #[arg(long)]
        recompute: bool,
        #[command(flatten)]
        molecule: MoleculeArgs,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Print the spin-orbital hamiltonian of a saved molecule
    Hamiltonian {
        /// A saved molecule, `<name>.json`
        data: PathBuf,
        /// Spatial orbitals frozen as doubly occupied
        #[arg(long, value_delimiter = ',')]
        occupied: Vec<usize>,
        /// Spatial orbitals kept in the active space, all by default
        #[arg(long, value_delimiter = ',')]
        active: Option<Vec<usize>>,
        /// Also print the energy from the reduced density matrices of this method
        #[arg(long)]
        rdm: Option<RdmMethod>,
    },
    /// Print the CCSD amplitudes in a psi4 output file
    Amplitudes {
        output: PathBuf,
        #[arg(long)]
        n_spin_orbitals: usize,
        #[arg(long)]
        n_alpha: usize,
        #[arg(long)]
        n_beta: usize,
    },
    /// Print the geometry in a structure file in psi4's xyz form
    Geometry {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = GeometryFormat::Sdf)]
        format: GeometryFormat,
    },
}

#[derive(ClapArgs, Debug)]
struct MoleculeArgs {
    #[arg(long, default_value = "sto-3g")]
    basis: String,
    #[arg(long, default_value_t = 1)]
    multiplicity: u32,
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    charge: i32,
    /// Where input, output and data files are written
    #[arg(long, default_value = ".")]
    data_directory: PathBuf,
}

/// Flags given on the command line override the run config file
#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// A path to a run config
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    mp2: bool,
    #[arg(long)]
    cisd: bool,
    #[arg(long)]
    ccsd: bool,
    #[arg(long)]
    fci: bool,
    /// Load whatever psi4 managed to compute even if it fails
    #[arg(long)]
    tolerate_error: bool,
    #[arg(long)]
    keep_input: bool,
    #[arg(long)]
    delete_output: bool,
    /// Memory for psi4 in MB
    #[arg(long)]
    memory: Option<u32>,
    /// Psi4 input template to use instead of the bundled one
    #[arg(long)]
    template: Option<PathBuf>,
    /// Path of the psi4 executable
    #[arg(long)]
    psi4: Option<PathBuf>,
}

impl RunArgs {
    fn options(self) -> Result<RunOptions> {
        let mut options = match &self.config {
            Some(path) => config::load::<ConfigRun>(path)?.into(),
            None => RunOptions::default(),
        };

        options.run_mp2 |= self.mp2;
        options.run_cisd |= self.cisd;
        options.run_ccsd |= self.ccsd;
        options.run_fci |= self.fci;
        options.tolerate_error |= self.tolerate_error;
        options.delete_input &= !self.keep_input;
        options.delete_output |= self.delete_output;
        options.verbose |= log::log_enabled!(log::Level::Debug);
        if let Some(memory) = self.memory {
            options.memory = memory;
        }
        if let Some(template) = self.template {
            options.template_file = Some(template);
        }
        if let Some(psi4) = self.psi4 {
            options.psi4_executable = psi4;
        }

        Ok(options)
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RdmMethod {
    Cisd,
    Fci,
}

impl From<RdmMethod> for Method {
    fn from(value: RdmMethod) -> Self {
        match value {
            RdmMethod::Cisd => Method::Cisd,
            RdmMethod::Fci => Method::Fci,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum GeometryFormat {
    /// MDL molfile / SDF record
    Sdf,
    /// Psi4 molecule block
    Psi4,
}

fn main() -> Result<()> {
    let args: Args = Args::parse();

    let mut logger = pretty_env_logger::formatted_builder();
    logger.filter_level(if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    match args.command {
        Command::Input { molecule, run } => {
            let molecule = load_molecule(&molecule)?;
            let path = psi4::generate_psi4_input(&molecule, &run.options()?)?;
            println!("{}", path.display());
        }

        Command::Run { molecule, run } => {
            run_and_report(load_molecule(&molecule)?, run.options()?)?;
        }

        Command::Diatomic {
            first,
            second,
            spacing,
            molecule,
            run,
        } => {
            let data = molecular_data::make_diatomic(
                first,
                second,
                spacing,
                molecule.basis,
                molecule.multiplicity,
                molecule.charge,
            )?
            .with_data_directory(molecule.data_directory);
            run_and_report(data, run.options()?)?;
        }

        Command::Ring {
            element,
            n_atoms,
            spacing,
            basis,
            charge,
            data_directory,
            run,
        } => {
            let data = molecular_data::make_atomic_ring(n_atoms, spacing, basis, element, charge)?
                .with_data_directory(data_directory);
            run_and_report(data, run.options()?)?;
        }

        Command::Atom {
            element,
            basis,
            data_directory,
            run,
        } => {
            let data = molecular_data::make_atom(element, basis)?.with_data_directory(data_directory);
            run_and_report(data, run.options()?)?;
        }

        Command::Series {
            first,
            second,
            start,
            end,
            points,
            recompute,
            molecule,
            run,
        } => {
            if points < 2 {
                bail!("a series needs at least two points");
            }
            let options = run.options()?;
            let step = (end - start) / (points - 1) as f64;

            let molecules = (0..points)
                .map(|point| {
                    let spacing = start + point as f64 * step;
                    Ok(molecular_data::make_diatomic(
                        first,
                        second,
                        spacing,
                        molecule.basis.clone(),
                        molecule.multiplicity,
                        molecule.charge,
                    )?
                    .with_data_directory(&molecule.data_directory))
                })
                .collect::<Result<Vec<_>>>()?;

            let results = batch::run_batch(molecules, &options, &options.executor(), recompute);

            println!(
                "{:<30}{}",
                "molecule",
                options
                    .methods()
                    .map(|method| format!("{method:>16}"))
                    .collect::<String>()
            );
            for result in results {
                match result {
                    Ok(data) => println!(
                        "{:<30}{}",
                        data.name(),
                        options
                            .methods()
                            .map(|method| match data.energy(method) {
                                Some(energy) => format!("{energy:>16.8}"),
                                None => format!("{:>16}", "-"),
                            })
                            .collect::<String>()
                    ),
                    Err(err) => log::error!("{err}"),
                }
            }
        }

        Command::Hamiltonian {
            data,
            occupied,
            active,
            rdm,
        } => {
            let molecule = MolecularData::load(&data)?;
            let hamiltonian = molecule
                .molecular_hamiltonian(&occupied, active.as_deref())
                .with_context(|| format!("cannot build the hamiltonian of {}", molecule.name()))?;

            println!("{} qubits", hamiltonian.n_qubits());
            print!("{hamiltonian}");

            if let Some(method) = rdm {
                let method = Method::from(method);
                let rdm = molecule.molecular_rdm(method)?;
                let energy = rdm
                    .expectation(&hamiltonian)
                    .context("density matrices span every orbital, drop --occupied and --active")?;
                println!("{method} energy from RDMs: {energy:3.8}");
            }
        }

        Command::Amplitudes {
            output,
            n_spin_orbitals,
            n_alpha,
            n_beta,
        } => {
            let amplitudes =
                amplitudes::parse_psi4_ccsd_amplitudes(n_spin_orbitals, n_alpha, n_beta, &output)
                    .with_context(|| format!("cannot read amplitudes from {}", output.display()))?;

            println!("singles:");
            for ((a, i), value) in amplitudes
                .singles
                .iter()
                .enumerate()
                .filter(|(_, value)| **value != 0.0)
                .map(|(index, value)| ((index % n_spin_orbitals, index / n_spin_orbitals), value))
            {
                println!("  t1[{a}, {i}] = {value:.10}");
            }
            println!("doubles:");
            for ((a, i, b, j), value) in amplitudes.doubles.nonzero() {
                println!("  t2[{a}, {i}, {b}, {j}] = {value:.10}");
            }
        }

        Command::Geometry { file, format } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let molecule = match format {
                GeometryFormat::Sdf => geometry::parse_sdf_geometry(&content)?,
                GeometryFormat::Psi4 => geometry::parse_psi4_geometry(&content)?,
            };
            println!("{}", molecule.geometry_string());
        }
    }

    Ok(())
}

fn load_molecule(path: &Path) -> Result<MolecularData> {
    let config: ConfigMolecule = config::load(path)?;
    MolecularData::try_from(config)
        .with_context(|| format!("invalid molecule in {}", path.display()))
}

fn run_and_report(molecule: MolecularData, options: RunOptions) -> Result<()> {
    let executor = options.executor();
    let molecule = psi4::run_psi4(molecule, &options, &executor)
        .context("psi4 run failed")?;
    let path = molecule.save()?;

    println!("{}", molecule.name());
    if let Some(nuclear_repulsion) = molecule.nuclear_repulsion {
        println!("nuclear repulsion energy: {nuclear_repulsion:3.8}");
    }
    for method in options.methods() {
        match molecule.energy(method) {
            Some(energy) => println!("{method} energy: {energy:3.8}"),
            None => println!("{method} energy: not computed"),
        }
    }
    if let Some(orbital_energies) = &molecule.orbital_energies {
        println!("orbital energies: {orbital_energies:3.3?}");
    }
    println!("saved to {}", path.display());

    Ok(())
}
