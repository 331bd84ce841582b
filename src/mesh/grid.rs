use std::collections::BTreeMap;

use crate::error::ConfigurationError;
use crate::materials::catalog::{TypeId, EMPTY_TYPE};

/// Labeled voxel grid of shape (nx, ny, nz)
///
/// Each voxel holds a type id, 0 meaning empty. Values are stored row-major
/// with the last axis fastest: index = (kappa * ny + lambda) * nz + mu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    shape: [usize; 3],
    data: Vec<TypeId>,
}

impl Grid {
    /// Wrap row-major voxel data. Every dimension must be at least 1.
    pub fn new(shape: [usize; 3], data: Vec<TypeId>) -> Result<Self, ConfigurationError> {
        if shape.contains(&0) || shape.iter().product::<usize>() != data.len() {
            return Err(ConfigurationError::InvalidGridShape {
                shape,
                len: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Grid with every voxel set to `id`.
    pub fn filled(shape: [usize; 3], id: TypeId) -> Self {
        Self {
            shape,
            data: vec![id; shape.iter().product()],
        }
    }

    /// Grid of empty voxels.
    pub fn empty(shape: [usize; 3]) -> Self {
        Self::filled(shape, EMPTY_TYPE)
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Total number of voxels.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[TypeId] {
        &self.data
    }

    #[inline]
    pub fn linear_index(&self, [kappa, lambda, mu]: [usize; 3]) -> usize {
        (kappa * self.shape[1] + lambda) * self.shape[2] + mu
    }

    #[inline]
    pub fn position(&self, linear: usize) -> [usize; 3] {
        let [_, ny, nz] = self.shape;
        [linear / (ny * nz), (linear / nz) % ny, linear % nz]
    }

    /// Type id at a position. Panics if the position is out of range.
    #[inline]
    pub fn get(&self, position: [usize; 3]) -> TypeId {
        self.data[self.linear_index(position)]
    }

    pub fn set(&mut self, position: [usize; 3], id: TypeId) {
        let idx = self.linear_index(position);
        self.data[idx] = id;
    }

    /// Iterate over (position, type id) in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = ([usize; 3], TypeId)> + '_ {
        self.data
            .iter()
            .enumerate()
            .map(|(linear, &id)| (self.position(linear), id))
    }

    /// Voxel count per non-empty type id.
    pub fn type_counts(&self) -> BTreeMap<TypeId, usize> {
        let mut counts = BTreeMap::new();
        for &id in self.data.iter().filter(|&&id| id != EMPTY_TYPE) {
            *counts.entry(id).or_insert(0) += 1;
        }
        counts
    }

    /// Non-empty type id with the most voxels; ties go to the smallest id.
    pub fn majority_type(&self) -> Option<TypeId> {
        let mut best: Option<(TypeId, usize)> = None;
        for (id, count) in self.type_counts() {
            // Ascending id order, so a strict comparison keeps the smallest id on ties
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((id, count));
            }
        }
        best.map(|(id, _)| id)
    }

    /// First position (row-major) holding `id`.
    pub fn first_position_of(&self, id: TypeId) -> Option<[usize; 3]> {
        self.data
            .iter()
            .position(|&v| v == id)
            .map(|linear| self.position(linear))
    }

    /// Number of non-empty voxels.
    pub fn num_occupied(&self) -> usize {
        self.data.iter().filter(|&&id| id != EMPTY_TYPE).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(Grid::new([2, 2, 2], vec![0; 8]).is_ok());
        assert_eq!(
            Grid::new([2, 2, 2], vec![0; 7]),
            Err(ConfigurationError::InvalidGridShape { shape: [2, 2, 2], len: 7 })
        );
        assert_eq!(
            Grid::new([0, 3, 3], Vec::new()),
            Err(ConfigurationError::InvalidGridShape { shape: [0, 3, 3], len: 0 })
        );
    }

    #[test]
    fn test_row_major_layout() {
        let grid = Grid::new([2, 3, 4], (0..24).collect()).unwrap();
        assert_eq!(grid.get([0, 0, 1]), 1);
        assert_eq!(grid.get([0, 1, 0]), 4);
        assert_eq!(grid.get([1, 0, 0]), 12);
        assert_eq!(grid.get([1, 2, 3]), 23);

        for linear in 0..grid.len() {
            assert_eq!(grid.linear_index(grid.position(linear)), linear);
        }
    }

    #[test]
    fn test_type_counts_skip_empty() {
        let mut grid = Grid::empty([3, 1, 1]);
        grid.set([0, 0, 0], 2);
        grid.set([2, 0, 0], 2);
        let counts = grid.type_counts();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[&2], 2);
        assert_eq!(grid.num_occupied(), 2);
    }

    #[test]
    fn test_majority_type() {
        let grid = Grid::new([1, 1, 6], vec![0, 0, 0, 3, 2, 3]).unwrap();
        assert_eq!(grid.majority_type(), Some(3));

        // Empty voxels never win, even when they dominate
        let grid = Grid::new([1, 1, 4], vec![0, 0, 0, 5]).unwrap();
        assert_eq!(grid.majority_type(), Some(5));

        // Ties resolve to the smallest id
        let grid = Grid::new([1, 1, 4], vec![4, 2, 4, 2]).unwrap();
        assert_eq!(grid.majority_type(), Some(2));

        assert_eq!(Grid::empty([2, 2, 2]).majority_type(), None);
    }

    #[test]
    fn test_first_position_of() {
        let mut grid = Grid::empty([2, 2, 2]);
        grid.set([1, 0, 1], 9);
        assert_eq!(grid.first_position_of(9), Some([1, 0, 1]));
        assert_eq!(grid.first_position_of(4), None);
    }
}
