//! Lattice builder: voxel grid + Type Catalog -> node/cell lattice.
//!
//! The build runs in four passes over immutable input:
//!
//! 1. resolve and validate every type id present in the grid,
//! 2. discover nodes (any node touching at least one occupied cell),
//! 3. discover cells (every occupied voxel),
//! 4. link each cell to its eight corner nodes, accumulating 1/8 of the
//!    cell mass into each node.
//!
//! Node positions start on a rectangular lattice with the majority type's
//! spacing. Passes 2 and 4 go parallel for large grids; the links and
//! masses are always merged in cell order, so the result does not depend
//! on the path taken.

use std::collections::BTreeMap;

use nalgebra::{Matrix3, Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::ConfigurationError;
use crate::materials::catalog::{TypeCatalog, TypeId, TypeRecord, EMPTY_TYPE};
use crate::materials::tensor::{cell_spacing, CellMatrix};
use crate::mesh::fields::CellFields;
use crate::mesh::geometry::{Geometry, Lattice};
use crate::mesh::grid::Grid;
use crate::mesh::topology::{Connectivity, NodeSpace, NUM_CORNERS};

/// Index spaces larger than this are scanned with rayon.
pub const PARALLEL_THRESHOLD: usize = 32_768;

/// Share of a cell's mass given to each of its corner nodes.
const CORNER_MASS_FRACTION: f64 = 0.125;

/// Resolved type data shared by every cell of one type id.
struct CellType<'a> {
    record: &'a TypeRecord,
    inverses: Vec<CellMatrix>,
}

/// Builds a [`Lattice`] from a voxel grid.
pub struct LatticeBuilder;

impl LatticeBuilder {
    /// Build the lattice for `grid`.
    ///
    /// # Arguments
    /// * `grid` - Voxel grid of type ids (0 = empty)
    /// * `catalog` - Type Catalog resolving every non-zero id in the grid
    /// * `periodic` - Wrap adjacency across the grid faces
    ///
    /// # Errors
    /// [`ConfigurationError`] if the grid is empty, an id does not resolve,
    /// or a type record is incomplete or has a singular cell matrix.
    pub fn build(grid: &Grid, catalog: &TypeCatalog, periodic: bool) -> Result<Lattice, ConfigurationError> {
        let majority_type = grid.majority_type().ok_or(ConfigurationError::EmptyGrid)?;
        let types = Self::resolve_types(grid, catalog)?;

        // Uniform reference spacing from the majority type's first cell matrix
        let spacing = cell_spacing(&types[&majority_type].record.cell[0]);
        let cell_ref = Matrix3::from_diagonal(&spacing);

        let space = NodeSpace::new(grid.shape(), periodic);
        let node_indices = Self::discover_nodes(grid, &space);
        debug!(
            candidates = space.len(),
            nodes = node_indices.len(),
            periodic,
            "Discovered lattice nodes"
        );

        let mut node_lookup = vec![None; space.len()];
        for (node, &index) in node_indices.iter().enumerate() {
            node_lookup[space.linear_index(index)] = Some(node);
        }

        let cells: Vec<([usize; 3], TypeId)> = grid.iter().filter(|&(_, id)| id != EMPTY_TYPE).collect();
        let corners = Self::resolve_corners(&cells, &space, &node_lookup);

        let mut connectivity = Connectivity::new(cells.len(), node_indices.len());
        let mut fields = CellFields::with_capacity(cells.len());
        let mut masses = vec![0.0; node_indices.len()];

        for (cell, (&(_, type_id), cell_corners)) in cells.iter().zip(&corners).enumerate() {
            let cell_type = &types[&type_id];
            fields.push_cell(
                type_id,
                cell_type.record.cell.clone(),
                cell_type.inverses.clone(),
                cell_type.record.elasticity.clone(),
                cell_ref,
            );

            for (corner, node) in cell_corners.iter().enumerate() {
                // Corner nodes of occupied cells are always discovered
                let Some(node) = *node else { continue };
                connectivity.link(cell, node, corner);
                masses[node] += CORNER_MASS_FRACTION * cell_type.record.mass;
            }
        }

        let mut geometry = Geometry::with_capacity(node_indices.len());
        for (&index, &mass) in node_indices.iter().zip(&masses) {
            geometry.add_node(Self::lattice_position(index, &spacing), mass);
        }

        let lattice = Lattice {
            geometry,
            connectivity,
            fields,
            node_indices,
            cell_indices: cells.iter().map(|&(position, _)| position).collect(),
            majority_type,
            spacing,
            periodic,
        };

        info!(
            nodes = lattice.num_nodes(),
            cells = lattice.num_cells(),
            total_mass = lattice.total_mass(),
            majority_type,
            periodic,
            "Built lattice"
        );

        Ok(lattice)
    }

    /// Resolve and validate every non-empty id in the grid.
    fn resolve_types<'a>(
        grid: &Grid,
        catalog: &'a TypeCatalog,
    ) -> Result<BTreeMap<TypeId, CellType<'a>>, ConfigurationError> {
        let mut types = BTreeMap::new();
        for (id, count) in grid.type_counts() {
            let resolved = catalog.resolve(id).map_err(|err| match err {
                ConfigurationError::UnknownTypeId { id, .. } => ConfigurationError::UnknownTypeId {
                    id,
                    position: grid.first_position_of(id),
                },
                other => other,
            })?;
            let Some(resolved) = resolved else { continue };

            resolved.record.validate(resolved.name)?;
            let inverses = resolved.record.inverse_cell_matrices(resolved.name)?;
            debug!(
                id = resolved.id,
                name = resolved.name,
                cells = count,
                states = inverses.len(),
                "Resolved type"
            );

            types.insert(
                resolved.id,
                CellType {
                    record: resolved.record,
                    inverses,
                },
            );
        }
        Ok(types)
    }

    /// Node indices touching at least one occupied cell, in row-major order.
    fn discover_nodes(grid: &Grid, space: &NodeSpace) -> Vec<[usize; 3]> {
        let touches_material = |linear: usize| -> Option<[usize; 3]> {
            let node = space.position(linear);
            (0..NUM_CORNERS)
                .any(|corner| {
                    space
                        .neighbor_cell(node, corner)
                        .is_some_and(|cell| grid.get(cell) != EMPTY_TYPE)
                })
                .then_some(node)
        };

        if space.len() > PARALLEL_THRESHOLD {
            (0..space.len()).into_par_iter().filter_map(touches_material).collect()
        } else {
            (0..space.len()).filter_map(touches_material).collect()
        }
    }

    /// Dense node index at each corner of each cell.
    fn resolve_corners(
        cells: &[([usize; 3], TypeId)],
        space: &NodeSpace,
        node_lookup: &[Option<usize>],
    ) -> Vec<[Option<usize>; NUM_CORNERS]> {
        let corner_nodes = |&(cell, _): &([usize; 3], TypeId)| {
            let mut nodes = [None; NUM_CORNERS];
            for (corner, node) in nodes.iter_mut().enumerate() {
                *node = node_lookup[space.linear_index(space.corner_node(cell, corner))];
            }
            nodes
        };

        if cells.len() > PARALLEL_THRESHOLD {
            cells.par_iter().map(corner_nodes).collect()
        } else {
            cells.iter().map(corner_nodes).collect()
        }
    }

    /// Position of node (k, l, m) on the rectangular reference lattice.
    fn lattice_position([k, l, m]: [usize; 3], spacing: &Vector3<f64>) -> Point3<f64> {
        Point3::new(
            k as f64 * spacing.x,
            l as f64 * spacing.y,
            m as f64 * spacing.z,
        )
    }
}
