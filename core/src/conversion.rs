//! Conversions between the spatial-orbital data Psi4 produces and spin-orbital
//! quantities. Spin orbital `2p` is the alpha (spin up) partner of spatial orbital
//! `p`, `2p + 1` the beta partner.

use nalgebra::DMatrix;

use crate::tensor::Tensor4;

/// Coefficients smaller than this are treated as zero
pub const EQ_TOLERANCE: f64 = 1e-8;

/// Convert spin-compact spatial RDM blocks to full spin-orbital RDMs.
///
/// The compact 2-RDM blocks are stored as
/// `aa[p, q, r, s] = <a†_{pα} a†_{rα} a_{qα} a_{sα}>` (likewise `bb`) and
/// `ab[p, q, r, s] = <a†_{pα} a†_{rβ} a_{qβ} a_{sα}>`.
/// The returned 2-RDM uses physicist ordering.
pub fn unpack_spatial_rdm(
    one_rdm_a: &DMatrix<f64>,
    one_rdm_b: &DMatrix<f64>,
    two_rdm_aa: &Tensor4,
    two_rdm_ab: &Tensor4,
    two_rdm_bb: &Tensor4,
) -> (DMatrix<f64>, Tensor4) {
    let n_orbitals = one_rdm_a.nrows();
    let n_qubits = 2 * n_orbitals;

    let mut one_rdm = DMatrix::zeros(n_qubits, n_qubits);
    let mut two_rdm = Tensor4::zeros(n_qubits);

    for (p, q) in itertools::iproduct!(0..n_orbitals, 0..n_orbitals) {
        one_rdm[(2 * p, 2 * q)] = one_rdm_a[(p, q)];
        one_rdm[(2 * p + 1, 2 * q + 1)] = one_rdm_b[(p, q)];

        for (r, s) in itertools::iproduct!(0..n_orbitals, 0..n_orbitals) {
            // same spin
            two_rdm[(2 * p, 2 * q, 2 * r, 2 * s)] = two_rdm_aa[(p, r, q, s)];
            two_rdm[(2 * p + 1, 2 * q + 1, 2 * r + 1, 2 * s + 1)] = two_rdm_bb[(p, r, q, s)];

            // mixed spin
            two_rdm[(2 * p, 2 * q + 1, 2 * r, 2 * s + 1)] = two_rdm_ab[(p, r, q, s)];
            two_rdm[(2 * p, 2 * q + 1, 2 * r + 1, 2 * s)] = -two_rdm_ab[(p, s, q, r)];
            two_rdm[(2 * p + 1, 2 * q, 2 * r + 1, 2 * s)] = two_rdm_ab[(q, s, p, r)];
            two_rdm[(2 * p + 1, 2 * q, 2 * r, 2 * s + 1)] = -two_rdm_ab[(q, r, p, s)];
        }
    }

    let two_rdm = two_rdm.permuted(|p, q, r, s| (p, q, s, r));
    (one_rdm, two_rdm)
}

/// Reorders chemist-notation electron repulsion integrals `(pq|rs)` into the
/// ordering used by interaction operators, `h[p, q, r, s] = (ps|qr)`.
pub fn chemist_to_openfermion(eri: &Tensor4) -> Tensor4 {
    eri.permuted(|p, q, r, s| (p, s, q, r))
}

/// Expand spatial one- and two-body integrals into spin-orbital coefficients of
/// `Σ h_pq a†_p a_q + Σ h_pqrs a†_p a†_q a_r a_s`. The two-body coefficients carry the
/// conventional factor of one half. Spatial integrals below [`EQ_TOLERANCE`] are
/// set to zero before the halving.
pub fn spinorb_from_spatial(
    one_body_integrals: &DMatrix<f64>,
    two_body_integrals: &Tensor4,
) -> (DMatrix<f64>, Tensor4) {
    let n_orbitals = one_body_integrals.nrows();
    let n_qubits = 2 * n_orbitals;

    let mut one_body = DMatrix::zeros(n_qubits, n_qubits);
    let mut two_body = Tensor4::zeros(n_qubits);

    for (p, q) in itertools::iproduct!(0..n_orbitals, 0..n_orbitals) {
        one_body[(2 * p, 2 * q)] = one_body_integrals[(p, q)];
        one_body[(2 * p + 1, 2 * q + 1)] = one_body_integrals[(p, q)];

        for (r, s) in itertools::iproduct!(0..n_orbitals, 0..n_orbitals) {
            let value = two_body_integrals[(p, q, r, s)];
            // truncated before halving
            let value = if value.abs() < EQ_TOLERANCE {
                0.0
            } else {
                value / 2.0
            };

            // mixed spin
            two_body[(2 * p, 2 * q + 1, 2 * r + 1, 2 * s)] = value;
            two_body[(2 * p + 1, 2 * q, 2 * r, 2 * s + 1)] = value;

            // same spin
            two_body[(2 * p, 2 * q, 2 * r, 2 * s)] = value;
            two_body[(2 * p + 1, 2 * q + 1, 2 * r + 1, 2 * s + 1)] = value;
        }
    }

    one_body
        .iter_mut()
        .filter(|value| value.abs() < EQ_TOLERANCE)
        .for_each(|value| *value = 0.0);

    (one_body, two_body)
}

/// Freeze the `occupied` spatial orbitals and restrict to the `active` ones.
///
/// Returns the core constant together with the one- and two-body integrals of the
/// active space. Integrals are in interaction-operator ordering.
pub fn active_space_integrals(
    one_body_integrals: &DMatrix<f64>,
    two_body_integrals: &Tensor4,
    occupied: &[usize],
    active: &[usize],
) -> (f64, DMatrix<f64>, Tensor4) {
    let mut core_constant = 0.0;
    for &i in occupied {
        core_constant += 2.0 * one_body_integrals[(i, i)];
        for &j in occupied {
            core_constant +=
                2.0 * two_body_integrals[(i, j, j, i)] - two_body_integrals[(i, j, i, j)];
        }
    }

    let one_body = DMatrix::from_fn(active.len(), active.len(), |u, v| {
        let (u, v) = (active[u], active[v]);
        let mut value = one_body_integrals[(u, v)];
        for &i in occupied {
            value += 2.0 * two_body_integrals[(i, u, v, i)] - two_body_integrals[(i, u, i, v)];
        }
        value
    });

    (core_constant, one_body, two_body_integrals.select(active))
}
