use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// A dense four-index tensor with equal side lengths, stored row-major so that the
/// last index varies fastest. Used for two-body integrals and 2-RDMs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tensor4 {
    data: Vec<f64>,
    /// side length
    size: usize,
}

impl Tensor4 {
    pub fn zeros(size: usize) -> Self {
        Self {
            data: vec![0.0; size.pow(4)],
            size,
        }
    }

    pub fn from_fn(size: usize, mut func: impl FnMut(usize, usize, usize, usize) -> f64) -> Self {
        let mut tensor = Self::zeros(size);
        for (p, q, r, s) in itertools::iproduct!(0..size, 0..size, 0..size, 0..size) {
            tensor[(p, q, r, s)] = func(p, q, r, s);
        }
        tensor
    }

    /// Builds a tensor from row-major data. Returns `None` if the data length is
    /// not `size^4`.
    pub fn from_row_major(size: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == size.pow(4)).then_some(Self { data, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline(always)]
    fn linear(&self, (p, q, r, s): (usize, usize, usize, usize)) -> usize {
        assert!(
            p < self.size && q < self.size && r < self.size && s < self.size,
            "index ({p}, {q}, {r}, {s}) out of bounds for tensor of size {}",
            self.size
        );
        ((p * self.size + q) * self.size + r) * self.size + s
    }

    /// Returns a new tensor with `out[p, q, r, s] = self[perm(p, q, r, s)]`
    pub fn permuted(
        &self,
        perm: impl Fn(usize, usize, usize, usize) -> (usize, usize, usize, usize),
    ) -> Self {
        Self::from_fn(self.size, |p, q, r, s| self[perm(p, q, r, s)])
    }

    /// Restrict every index to `indices`, in the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self::from_fn(indices.len(), |p, q, r, s| {
            self[(indices[p], indices[q], indices[r], indices[s])]
        })
    }

    /// Iterate over `((p, q, r, s), value)` for all non-zero entries
    pub fn nonzero(&self) -> impl Iterator<Item = ((usize, usize, usize, usize), f64)> + '_ {
        let n = self.size;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, value)| **value != 0.0)
            .map(move |(linear, &value)| {
                let s = linear % n;
                let r = (linear / n) % n;
                let q = (linear / n.pow(2)) % n;
                let p = linear / n.pow(3);
                ((p, q, r, s), value)
            })
    }

    /// Sum over all elements of the element-wise product
    pub fn dot(&self, other: &Tensor4) -> f64 {
        assert_eq!(self.size, other.size, "tensor sizes differ");
        self.data.iter().zip(&other.data).map(|(a, b)| a * b).sum()
    }
}

impl Index<(usize, usize, usize, usize)> for Tensor4 {
    type Output = f64;

    fn index(&self, index: (usize, usize, usize, usize)) -> &Self::Output {
        &self.data[self.linear(index)]
    }
}

impl IndexMut<(usize, usize, usize, usize)> for Tensor4 {
    fn index_mut(&mut self, index: (usize, usize, usize, usize)) -> &mut Self::Output {
        let linear = self.linear(index);
        &mut self.data[linear]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_row_major() {
        let tensor = Tensor4::from_row_major(2, (0..16).map(f64::from).collect()).unwrap();
        assert_eq!(tensor[(0, 0, 0, 1)], 1.0);
        assert_eq!(tensor[(0, 0, 1, 0)], 2.0);
        assert_eq!(tensor[(1, 0, 0, 0)], 8.0);
        assert_eq!(tensor[(1, 1, 1, 1)], 15.0);
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(Tensor4::from_row_major(2, vec![0.0; 15]).is_none());
    }

    #[test]
    fn nonzero_reports_indices() {
        let mut tensor = Tensor4::zeros(3);
        tensor[(2, 0, 1, 2)] = 4.0;
        tensor[(0, 1, 0, 0)] = -1.0;

        let entries = tensor.nonzero().collect::<Vec<_>>();
        assert_eq!(entries, vec![((0, 1, 0, 0), -1.0), ((2, 0, 1, 2), 4.0)]);
    }

    #[test]
    fn select_keeps_index_order() {
        let mut tensor = Tensor4::from_fn(3, |p, q, r, s| (p + q + r + s) as f64 * 1e-9);
        tensor[(2, 2, 2, 2)] = 1.0;
        let selected = tensor.select(&[2, 0]);
        assert_eq!(selected.size(), 2);
        assert_eq!(selected[(0, 0, 0, 0)], 1.0);
        assert_eq!(selected[(1, 1, 1, 1)], 0.0);
        assert_eq!(selected[(0, 1, 1, 1)], 2e-9);
    }
}
