/// Fourth-order elasticity tensors and equilibrium cell matrices
///
/// A cell matrix holds the three edge vectors of a nanocell as columns; in
/// practice it is diagonal with the edge lengths (dx, dy, dz).

use nalgebra::{Matrix3, Vector3};
use std::ops::{Index, IndexMut};

/// Equilibrium cell matrix of a nanocell (3×3).
pub type CellMatrix = Matrix3<f64>;

/// Number of components of a 3×3×3×3 tensor.
pub const TENSOR_COMPONENTS: usize = 81;

/// Full 3×3×3×3 elasticity tensor C_ijkl, stored row-major.
///
/// No symmetry is assumed or enforced: the tensor is carried through the
/// builder and the checkpoint exactly as supplied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticityTensor {
    components: [f64; TENSOR_COMPONENTS],
}

impl ElasticityTensor {
    pub fn zeros() -> Self {
        Self {
            components: [0.0; TENSOR_COMPONENTS],
        }
    }

    /// Build a tensor by evaluating `f(i, j, k, l)` for every index.
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize, usize) -> f64,
    {
        let mut tensor = Self::zeros();
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    for l in 0..3 {
                        tensor[(i, j, k, l)] = f(i, j, k, l);
                    }
                }
            }
        }
        tensor
    }

    /// Build a tensor from 81 row-major components.
    ///
    /// Returns `None` if the slice has the wrong length.
    pub fn from_slice(components: &[f64]) -> Option<Self> {
        let components: [f64; TENSOR_COMPONENTS] = components.try_into().ok()?;
        Some(Self { components })
    }

    /// Isotropic tensor from Lamé parameters:
    /// C_ijkl = λ δ_ij δ_kl + μ (δ_ik δ_jl + δ_il δ_jk)
    pub fn isotropic(lambda: f64, mu: f64) -> Self {
        let delta = |a: usize, b: usize| if a == b { 1.0 } else { 0.0 };
        Self::from_fn(|i, j, k, l| {
            lambda * delta(i, j) * delta(k, l)
                + mu * (delta(i, k) * delta(j, l) + delta(i, l) * delta(j, k))
        })
    }

    /// Isotropic tensor from Young's modulus E and Poisson's ratio ν.
    ///
    /// λ = E ν / ((1+ν)(1-2ν)), μ = E / (2(1+ν))
    #[allow(non_snake_case)]
    pub fn isotropic_from_engineering(youngs_modulus: f64, poisson_ratio: f64) -> Self {
        let E = youngs_modulus;
        let nu = poisson_ratio;
        let lambda = (E * nu) / ((1.0 + nu) * (1.0 - 2.0 * nu));
        let mu = E / (2.0 * (1.0 + nu));
        Self::isotropic(lambda, mu)
    }

    /// Row-major components, index ((i*3 + j)*3 + k)*3 + l.
    pub fn as_slice(&self) -> &[f64] {
        &self.components
    }

    #[inline]
    fn offset(i: usize, j: usize, k: usize, l: usize) -> usize {
        ((i * 3 + j) * 3 + k) * 3 + l
    }
}

impl Default for ElasticityTensor {
    fn default() -> Self {
        Self::zeros()
    }
}

impl Index<(usize, usize, usize, usize)> for ElasticityTensor {
    type Output = f64;

    fn index(&self, (i, j, k, l): (usize, usize, usize, usize)) -> &f64 {
        &self.components[Self::offset(i, j, k, l)]
    }
}

impl IndexMut<(usize, usize, usize, usize)> for ElasticityTensor {
    fn index_mut(&mut self, (i, j, k, l): (usize, usize, usize, usize)) -> &mut f64 {
        &mut self.components[Self::offset(i, j, k, l)]
    }
}

/// Diagonal cell matrix with edge lengths (dx, dy, dz).
pub fn diagonal_cell(dx: f64, dy: f64, dz: f64) -> CellMatrix {
    Matrix3::from_diagonal(&Vector3::new(dx, dy, dz))
}

/// Edge lengths (dx, dy, dz) read from the diagonal of a cell matrix.
pub fn cell_spacing(cell: &CellMatrix) -> Vector3<f64> {
    cell.diagonal()
}
