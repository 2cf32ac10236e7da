//! Parsing of coupled cluster singles and doubles amplitudes from a Psi4 output
//! file. Psi4 prints the largest amplitudes of each spin block after a header
//! line; each block ends at the first blank line.

use std::{fs, io, path::Path};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tensor::Tensor4;

#[derive(Debug, Error)]
pub enum AmplitudeError {
    #[error("failed to read psi4 output file: {0}")]
    Io(#[from] io::Error),
    #[error("malformed amplitude on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("amplitude on line {line} maps to spin orbital {index}, but there are only {n_spin_orbitals}")]
    OutOfRange {
        line: usize,
        index: usize,
        n_spin_orbitals: usize,
    },
}

/// Singles (`t1[a, i]`) and doubles (`t2[a, i, b, j]`) amplitudes in spin-orbital
/// indexing. Doubles include a factor of one half.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CcsdAmplitudes {
    pub singles: DMatrix<f64>,
    pub doubles: Tensor4,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Block {
    SinglesAlpha,
    SinglesBeta,
    DoublesAlpha,
    DoublesBeta,
    DoublesMixed,
}

impl Block {
    const ALL: [Block; 5] = [
        Block::SinglesAlpha,
        Block::SinglesBeta,
        Block::DoublesAlpha,
        Block::DoublesBeta,
        Block::DoublesMixed,
    ];

    fn header(self) -> &'static str {
        match self {
            Block::SinglesAlpha => "Largest TIA Amplitudes:",
            Block::SinglesBeta => "Largest Tia Amplitudes:",
            Block::DoublesAlpha => "Largest TIJAB Amplitudes:",
            Block::DoublesBeta => "Largest Tijab Amplitudes:",
            Block::DoublesMixed => "Largest TIjAb Amplitudes:",
        }
    }

    fn n_indices(self) -> usize {
        match self {
            Block::SinglesAlpha | Block::SinglesBeta => 2,
            _ => 4,
        }
    }
}

/// One printed amplitude: orbital indices relative to the occupied / virtual
/// blocks, and the value.
struct Entry {
    line: usize,
    indices: [usize; 4],
    value: f64,
}

/// Read the file at `path` and parse it with [`parse_ccsd_amplitudes`]
pub fn parse_psi4_ccsd_amplitudes(
    n_spin_orbitals: usize,
    n_alpha_electrons: usize,
    n_beta_electrons: usize,
    path: impl AsRef<Path>,
) -> Result<CcsdAmplitudes, AmplitudeError> {
    let output = fs::read_to_string(path)?;
    parse_ccsd_amplitudes(&output, n_spin_orbitals, n_alpha_electrons, n_beta_electrons)
}

/// Parse CCSD amplitudes out of Psi4 output text.
///
/// If no beta blocks are printed the reference was closed shell, and every alpha
/// amplitude is mirrored onto the corresponding beta spin orbitals.
pub fn parse_ccsd_amplitudes(
    output: &str,
    n_spin_orbitals: usize,
    n_alpha_electrons: usize,
    n_beta_electrons: usize,
) -> Result<CcsdAmplitudes, AmplitudeError> {
    let lines = output.lines().collect::<Vec<_>>();

    // the last printed block wins
    let mut starts = [None; 5];
    for (index, line) in lines.iter().enumerate() {
        if let Some(block) = Block::ALL.iter().position(|b| line.contains(b.header())) {
            starts[block] = Some(index);
        }
    }

    let mut entries: [Vec<Entry>; 5] = Default::default();
    for (block_index, start) in starts.iter().enumerate() {
        if let Some(start) = start {
            entries[block_index] = read_block(&lines, *start, Block::ALL[block_index])?;
        }
    }

    let restricted = starts[Block::SinglesBeta as usize].is_none()
        && starts[Block::DoublesBeta as usize].is_none();
    log::debug!("parsing ccsd amplitudes, restricted reference: {restricted}");

    // saturating, so absurd printed indices end up out of range instead of wrapping
    let alpha_occupied = |i: usize| i.saturating_mul(2);
    let alpha_virtual = |a: usize| a.saturating_add(n_alpha_electrons).saturating_mul(2);
    let beta_occupied = |i: usize| i.saturating_mul(2).saturating_add(1);
    let beta_virtual =
        |a: usize| a.saturating_add(n_beta_electrons).saturating_mul(2).saturating_add(1);

    let check = |line: usize, indices: &[usize]| {
        indices
            .iter()
            .find(|&&index| index >= n_spin_orbitals)
            .map_or(Ok(()), |&index| {
                Err(AmplitudeError::OutOfRange {
                    line,
                    index,
                    n_spin_orbitals,
                })
            })
    };

    let mut singles = DMatrix::zeros(n_spin_orbitals, n_spin_orbitals);
    let mut doubles = Tensor4::zeros(n_spin_orbitals);

    let mut set_single = |line: usize, a: usize, i: usize, value: f64| {
        check(line, &[a, i])?;
        singles[(a, i)] = value;
        Ok::<_, AmplitudeError>(())
    };

    for &Entry {
        line,
        indices: [i, a, ..],
        value,
    } in &entries[Block::SinglesAlpha as usize]
    {
        set_single(line, alpha_virtual(a), alpha_occupied(i), value)?;
        if restricted {
            set_single(line, beta_virtual(a), beta_occupied(i), value)?;
        }
    }

    for &Entry {
        line,
        indices: [i, a, ..],
        value,
    } in &entries[Block::SinglesBeta as usize]
    {
        set_single(line, beta_virtual(a), beta_occupied(i), value)?;
    }

    let mut set_double = |line: usize, index: [usize; 4], value: f64| {
        check(line, &index)?;
        let [a, i, b, j] = index;
        doubles[(a, i, b, j)] = value / 2.0;
        Ok::<_, AmplitudeError>(())
    };

    for &Entry {
        line,
        indices: [i, j, a, b],
        value,
    } in &entries[Block::DoublesAlpha as usize]
    {
        let alpha = [alpha_virtual(a), alpha_occupied(i), alpha_virtual(b), alpha_occupied(j)];
        set_double(line, alpha, value)?;
        if restricted {
            let beta = [beta_virtual(a), beta_occupied(i), beta_virtual(b), beta_occupied(j)];
            set_double(line, beta, value)?;
        }
    }

    for &Entry {
        line,
        indices: [i, j, a, b],
        value,
    } in &entries[Block::DoublesBeta as usize]
    {
        let beta = [beta_virtual(a), beta_occupied(i), beta_virtual(b), beta_occupied(j)];
        set_double(line, beta, value)?;
    }

    for &Entry {
        line,
        indices: [i, j, a, b],
        value,
    } in &entries[Block::DoublesMixed as usize]
    {
        let mixed = [alpha_virtual(a), alpha_occupied(i), beta_virtual(b), beta_occupied(j)];
        set_double(line, mixed, value)?;
        if restricted {
            let mirrored = [beta_virtual(a), beta_occupied(i), alpha_virtual(b), alpha_occupied(j)];
            set_double(line, mirrored, value)?;
        }
    }

    Ok(CcsdAmplitudes { singles, doubles })
}

/// Reads the rows following the header at `start` until a blank line or the end
/// of the output
fn read_block(lines: &[&str], start: usize, block: Block) -> Result<Vec<Entry>, AmplitudeError> {
    let n_indices = block.n_indices();
    let mut entries = Vec::new();

    for (offset, line) in lines[start + 1..].iter().enumerate() {
        // 1-based line numbers for error messages
        let line_number = start + offset + 2;
        let fields = line.split_whitespace().collect::<Vec<_>>();
        if fields.is_empty() {
            break;
        }

        if fields.len() < n_indices + 1 {
            return Err(AmplitudeError::Parse {
                line: line_number,
                message: format!("expected {} fields, found {}", n_indices + 1, fields.len()),
            });
        }

        let mut indices = [0; 4];
        for (slot, field) in indices.iter_mut().zip(&fields[..n_indices]) {
            *slot = field.parse().map_err(|_| AmplitudeError::Parse {
                line: line_number,
                message: format!("'{field}' is not an orbital index"),
            })?;
        }

        let field = fields[n_indices];
        let value = field.parse().map_err(|_| AmplitudeError::Parse {
            line: line_number,
            message: format!("'{field}' is not an amplitude"),
        })?;

        entries.push(Entry {
            line: line_number,
            indices,
            value,
        });
    }

    log::trace!("read {} amplitudes after '{}'", entries.len(), block.header());
    Ok(entries)
}
