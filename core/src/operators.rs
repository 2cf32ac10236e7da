use std::fmt;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::tensor::Tensor4;

/// A fermionic operator of the form
/// `c + Σ h_pq a†_p a_q + Σ h_pqrs a†_p a†_q a_r a_s`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionOperator {
    pub constant: f64,
    pub one_body: DMatrix<f64>,
    pub two_body: Tensor4,
}

impl InteractionOperator {
    pub fn new(constant: f64, one_body: DMatrix<f64>, two_body: Tensor4) -> Self {
        assert_eq!(
            one_body.nrows(),
            two_body.size(),
            "one- and two-body coefficients act on different numbers of modes"
        );
        Self {
            constant,
            one_body,
            two_body,
        }
    }

    pub fn n_qubits(&self) -> usize {
        self.one_body.nrows()
    }

    /// All non-zero terms, constant first, then one-body and two-body terms in
    /// index order.
    pub fn fermion_terms(&self) -> Vec<FermionTerm> {
        let mut terms = Vec::new();

        if self.constant != 0.0 {
            terms.push(FermionTerm {
                operators: SmallVec::new(),
                coefficient: self.constant,
            });
        }

        let n = self.n_qubits();
        for (p, q) in itertools::iproduct!(0..n, 0..n) {
            let coefficient = self.one_body[(p, q)];
            if coefficient != 0.0 {
                terms.push(FermionTerm {
                    operators: SmallVec::from_slice(&[
                        LadderOperator::raise(p),
                        LadderOperator::lower(q),
                    ]),
                    coefficient,
                });
            }
        }

        terms.extend(
            self.two_body
                .nonzero()
                .map(|((p, q, r, s), coefficient)| FermionTerm {
                    operators: SmallVec::from_slice(&[
                        LadderOperator::raise(p),
                        LadderOperator::raise(q),
                        LadderOperator::lower(r),
                        LadderOperator::lower(s),
                    ]),
                    coefficient,
                }),
        );

        terms
    }
}

impl fmt::Display for InteractionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms = self.fermion_terms();
        if terms.is_empty() {
            return writeln!(f, "0");
        }
        for term in terms {
            writeln!(f, "{term}")?;
        }
        Ok(())
    }
}

/// Creation (`a†`) or annihilation (`a`) operator on a single mode
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderOperator {
    pub mode: usize,
    pub creation: bool,
}

impl LadderOperator {
    pub fn raise(mode: usize) -> Self {
        Self {
            mode,
            creation: true,
        }
    }

    pub fn lower(mode: usize) -> Self {
        Self {
            mode,
            creation: false,
        }
    }
}

/// A product of ladder operators with a coefficient, printed like `0.5 [0^ 1]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FermionTerm {
    pub operators: SmallVec<[LadderOperator; 4]>,
    pub coefficient: f64,
}

impl fmt::Display for FermionTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operators = self
            .operators
            .iter()
            .map(|op| {
                if op.creation {
                    format!("{}^", op.mode)
                } else {
                    op.mode.to_string()
                }
            })
            .collect::<Vec<_>>();

        write!(f, "{} [{}]", self.coefficient, operators.join(" "))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("density matrices on {rdm} spin orbitals cannot be contracted with an operator on {operator}")]
pub struct SizeMismatch {
    pub rdm: usize,
    pub operator: usize,
}

/// Spin-orbital reduced density matrices, two-body part in physicist ordering
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionRdm {
    pub one_body: DMatrix<f64>,
    pub two_body: Tensor4,
}

impl InteractionRdm {
    pub fn n_qubits(&self) -> usize {
        self.one_body.nrows()
    }

    /// Expectation value of `operator` in the state these RDMs were measured in.
    /// Both must act on the same spin orbitals.
    pub fn expectation(&self, operator: &InteractionOperator) -> Result<f64, SizeMismatch> {
        if self.n_qubits() != operator.n_qubits() || self.two_body.size() != self.n_qubits() {
            return Err(SizeMismatch {
                rdm: self.n_qubits(),
                operator: operator.n_qubits(),
            });
        }

        Ok(operator.constant
            + self.one_body.dot(&operator.one_body)
            + self.two_body.dot(&operator.two_body))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn two_mode_operator() -> InteractionOperator {
        let one_body = DMatrix::from_row_slice(2, 2, &[-1.0, 0.5, 0.5, 0.0]);
        let mut two_body = Tensor4::zeros(2);
        two_body[(0, 1, 1, 0)] = 0.25;
        InteractionOperator::new(0.7, one_body, two_body)
    }

    #[test]
    fn terms_are_listed_in_order() {
        let terms = two_mode_operator()
            .fermion_terms()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        assert_eq!(
            terms,
            vec![
                "0.7 []",
                "-1 [0^ 0]",
                "0.5 [0^ 1]",
                "0.5 [1^ 0]",
                "0.25 [0^ 1^ 1 0]",
            ]
        );
    }

    #[test]
    fn expectation_contracts_all_terms() {
        let operator = two_mode_operator();
        let mut two_body = Tensor4::zeros(2);
        two_body[(0, 1, 1, 0)] = 2.0;
        let rdm = InteractionRdm {
            one_body: DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]),
            two_body,
        };

        assert_relative_eq!(rdm.expectation(&operator).unwrap(), 0.7 - 1.0 + 0.5);
    }

    #[test]
    fn expectation_needs_matching_sizes() {
        let rdm = InteractionRdm {
            one_body: DMatrix::identity(4, 4),
            two_body: Tensor4::zeros(4),
        };

        assert_eq!(
            rdm.expectation(&two_mode_operator()),
            Err(SizeMismatch {
                rdm: 4,
                operator: 2
            })
        );
    }

    #[test]
    #[should_panic]
    fn mismatched_sizes_are_rejected() {
        InteractionOperator::new(0.0, DMatrix::zeros(2, 2), Tensor4::zeros(4));
    }
}
