use std::collections::BTreeMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{atom::Atom, periodic_table::ElementType};

/// Represents a molecule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    pub(crate) atoms: Vec<Atom>,
}

impl Molecule {
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self { atoms }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Total nuclear charge, i.e. the electron count of the neutral molecule
    pub fn nuclear_charge(&self) -> i32 {
        self.atoms.iter().map(Atom::nuclear_charge).sum()
    }

    /// Element counts sorted by atomic number, e.g. `H1-Li1` for lithium hydride
    pub fn formula_name(&self) -> String {
        let mut counts = BTreeMap::<ElementType, usize>::new();
        for atom in &self.atoms {
            *counts.entry(atom.element_type).or_default() += 1;
        }

        counts
            .iter()
            .map(|(element, count)| format!("{element}{count}"))
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Geometry in the plain xyz form Psi4 accepts inside a molecule block: one
    /// `symbol x y z` line per atom, without a trailing newline.
    pub fn geometry_string(&self) -> String {
        self.atoms
            .iter()
            .map(|atom| {
                let [x, y, z] = coordinates(atom);
                format!("{} {x:?} {y:?} {z:?}", atom.element_type)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Geometry as a python literal: `[('H', (0.0, 0.0, 0.0)), ...]`
    pub fn python_literal(&self) -> String {
        let atoms = self
            .atoms
            .iter()
            .map(|atom| {
                let [x, y, z] = coordinates(atom);
                format!("('{}', ({x:?}, {y:?}, {z:?}))", atom.element_type)
            })
            .collect::<Vec<_>>();

        format!("[{}]", atoms.join(", "))
    }
}

fn coordinates(atom: &Atom) -> [f64; 3] {
    [atom.position.x, atom.position.y, atom.position.z]
}

impl From<Vec<(ElementType, [f64; 3])>> for Molecule {
    fn from(value: Vec<(ElementType, [f64; 3])>) -> Self {
        let atoms = value
            .into_iter()
            .map(|(element_type, [x, y, z])| Atom::new(element_type, Vector3::new(x, y, z)))
            .collect();

        Self { atoms }
    }
}

/// Convenience wrapper around [`Molecule::geometry_string`]
pub fn create_geometry_string(molecule: &Molecule) -> String {
    molecule.geometry_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lithium_hydride() -> Molecule {
        Molecule::from(vec![
            (ElementType::Li, [0.0, 0.0, 0.0]),
            (ElementType::H, [0.0, 0.0, 1.45]),
        ])
    }

    #[test]
    fn geometry_string_has_one_line_per_atom() {
        let geometry = create_geometry_string(&lithium_hydride());
        assert_eq!(geometry, "Li 0.0 0.0 0.0\nH 0.0 0.0 1.45");
    }

    #[test]
    fn geometry_string_of_empty_molecule_is_empty() {
        assert_eq!(Molecule::new(Vec::new()).geometry_string(), "");
    }

    #[test]
    fn formula_is_sorted_by_atomic_number() {
        assert_eq!(lithium_hydride().formula_name(), "H1-Li1");

        let water = Molecule::from(vec![
            (ElementType::O, [0.0, 0.0, 0.0]),
            (ElementType::H, [0.0, 0.757, 0.587]),
            (ElementType::H, [0.0, -0.757, 0.587]),
        ]);
        assert_eq!(water.formula_name(), "H2-O1");
        assert_eq!(water.nuclear_charge(), 10);
    }

    #[test]
    fn python_literal_matches_tuple_syntax() {
        assert_eq!(
            lithium_hydride().python_literal(),
            "[('Li', (0.0, 0.0, 0.0)), ('H', (0.0, 0.0, 1.45))]"
        );
    }
}
