use crate::materials::catalog::TypeId;
use crate::materials::tensor::{CellMatrix, ElasticityTensor};

/// Per-cell material data of a lattice
///
/// Every vector is indexed by cell index. The inner lists of the matrix and
/// tensor fields keep the order of the owning type's record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellFields {
    /// Grid id of each cell.
    pub type_ids: Vec<TypeId>,
    /// Equilibrium cell matrices per cell.
    pub equilibrium_cell_matrices: Vec<Vec<CellMatrix>>,
    /// Inverses of `equilibrium_cell_matrices`, element-wise.
    pub equilibrium_inv_cell_matrices: Vec<Vec<CellMatrix>>,
    /// Elasticity tensors per cell.
    pub elasticity_tensors: Vec<Vec<ElasticityTensor>>,
    /// Reference cell matrix, identical for every cell.
    pub cell_ref: Vec<CellMatrix>,
}

impl CellFields {
    pub fn with_capacity(num_cells: usize) -> Self {
        Self {
            type_ids: Vec::with_capacity(num_cells),
            equilibrium_cell_matrices: Vec::with_capacity(num_cells),
            equilibrium_inv_cell_matrices: Vec::with_capacity(num_cells),
            elasticity_tensors: Vec::with_capacity(num_cells),
            cell_ref: Vec::with_capacity(num_cells),
        }
    }

    /// Append one cell, returning its index.
    pub fn push_cell(
        &mut self,
        type_id: TypeId,
        cell_matrices: Vec<CellMatrix>,
        inv_cell_matrices: Vec<CellMatrix>,
        elasticity: Vec<ElasticityTensor>,
        cell_ref: CellMatrix,
    ) -> usize {
        let idx = self.type_ids.len();
        self.type_ids.push(type_id);
        self.equilibrium_cell_matrices.push(cell_matrices);
        self.equilibrium_inv_cell_matrices.push(inv_cell_matrices);
        self.elasticity_tensors.push(elasticity);
        self.cell_ref.push(cell_ref);
        idx
    }

    pub fn num_cells(&self) -> usize {
        self.type_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.type_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::tensor::diagonal_cell;

    #[test]
    fn test_push_cell_keeps_columns_aligned() {
        let mut fields = CellFields::with_capacity(2);
        assert!(fields.is_empty());

        let a = fields.push_cell(
            1,
            vec![diagonal_cell(2.0, 2.0, 2.0)],
            vec![diagonal_cell(0.5, 0.5, 0.5)],
            vec![ElasticityTensor::zeros()],
            diagonal_cell(1.0, 1.0, 1.0),
        );
        let b = fields.push_cell(
            3,
            vec![diagonal_cell(1.0, 1.0, 1.0); 2],
            vec![diagonal_cell(1.0, 1.0, 1.0); 2],
            vec![ElasticityTensor::zeros(); 2],
            diagonal_cell(1.0, 1.0, 1.0),
        );

        assert_eq!((a, b), (0, 1));
        assert_eq!(fields.num_cells(), 2);
        assert_eq!(fields.type_ids, vec![1, 3]);
        assert_eq!(fields.equilibrium_cell_matrices[1].len(), 2);
        assert_eq!(fields.cell_ref.len(), 2);
    }
}
