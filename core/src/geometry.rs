//! Geometry parsers for records retrieved from PubChem: MDL structure-data files
//! (the 2D/3D conformer downloads) and the geometry strings Psi4 prints for a
//! `pubchem:` molecule.

use thiserror::Error;

use crate::{molecule::Molecule, periodic_table::ElementType};

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("structure data is missing its counts line")]
    MissingCounts,
    #[error("invalid counts line '{0}'")]
    InvalidCounts(String),
    #[error("expected {expected} atoms, found {found}")]
    TooFewAtoms { expected: usize, found: usize },
    #[error("invalid atom on line {line}: {message}")]
    InvalidAtom { line: usize, message: String },
    #[error("no atoms found in geometry")]
    Empty,
}

/// Parse the atom block of an MDL molfile / SDF record. Coordinates come first,
/// followed by the element symbol: `x y z Sym ...`.
pub fn parse_sdf_geometry(record: &str) -> Result<Molecule, GeometryError> {
    let lines = record.lines().collect::<Vec<_>>();

    // three header lines, then the counts line
    let counts = lines.get(3).copied().ok_or(GeometryError::MissingCounts)?;
    let n_atoms = counts
        .get(..3)
        .unwrap_or(counts)
        .trim()
        .parse::<usize>()
        .map_err(|_| GeometryError::InvalidCounts(counts.to_string()))?;

    let atom_lines = &lines[4..];
    if atom_lines.len() < n_atoms {
        return Err(GeometryError::TooFewAtoms {
            expected: n_atoms,
            found: atom_lines.len(),
        });
    }

    let atoms = atom_lines[..n_atoms]
        .iter()
        .enumerate()
        .map(|(offset, line)| {
            let fields = line.split_whitespace().collect::<Vec<_>>();
            let line_number = offset + 5;
            let &[x, y, z, symbol, ..] = fields.as_slice() else {
                return Err(GeometryError::InvalidAtom {
                    line: line_number,
                    message: "expected coordinates followed by an element symbol".into(),
                });
            };
            parse_atom(line_number, symbol, [x, y, z])
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Molecule::from(atoms))
}

/// Parse a Psi4 geometry string. Atom lines read `Sym x y z`; directive lines such
/// as `units Angstrom` or the charge / multiplicity line are skipped.
pub fn parse_psi4_geometry(geometry: &str) -> Result<Molecule, GeometryError> {
    let mut atoms = Vec::new();

    for (index, line) in geometry.lines().enumerate() {
        let fields = line.split_whitespace().collect::<Vec<_>>();
        let Some(&symbol) = fields.first() else {
            continue;
        };
        if ElementType::from_symbol(symbol).is_err() {
            log::trace!("skipping geometry line '{line}'");
            continue;
        }

        let &[symbol, x, y, z, ..] = fields.as_slice() else {
            return Err(GeometryError::InvalidAtom {
                line: index + 1,
                message: "expected an element symbol followed by coordinates".into(),
            });
        };
        atoms.push(parse_atom(index + 1, symbol, [x, y, z])?);
    }

    if atoms.is_empty() {
        return Err(GeometryError::Empty);
    }

    Ok(Molecule::from(atoms))
}

fn parse_atom(
    line: usize,
    symbol: &str,
    coordinates: [&str; 3],
) -> Result<(ElementType, [f64; 3]), GeometryError> {
    let element = ElementType::from_symbol(symbol).map_err(|err| GeometryError::InvalidAtom {
        line,
        message: err.to_string(),
    })?;

    let mut position = [0.0; 3];
    for (slot, field) in position.iter_mut().zip(coordinates) {
        *slot = field.parse().map_err(|_| GeometryError::InvalidAtom {
            line,
            message: format!("'{field}' is not a coordinate"),
        })?;
    }

    Ok((element, position))
}
