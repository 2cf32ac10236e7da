use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::periodic_table::ElementType;

/// Represents an atom in a molecule. Positions are in angstrom.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub(crate) element_type: ElementType,
    pub(crate) position: Vector3<f64>,
}

impl Atom {
    pub fn new(element_type: ElementType, position: Vector3<f64>) -> Self {
        Self {
            element_type,
            position,
        }
    }

    /// Returns the charge of this nucleus
    pub fn nuclear_charge(&self) -> i32 {
        self.element_type as i32
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }
}
