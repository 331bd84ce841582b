use nalgebra::{Point3, Vector3};

use super::fields::CellFields;
use super::topology::Connectivity;
use crate::materials::catalog::TypeId;

/// Node positions and masses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    /// Current node positions
    pub pos: Vec<Point3<f64>>,
    /// Reference node positions
    pub pos_ref: Vec<Point3<f64>>,
    /// Accumulated nodal masses
    pub masses: Vec<f64>,
}

impl Geometry {
    pub fn with_capacity(num_nodes: usize) -> Self {
        Self {
            pos: Vec::with_capacity(num_nodes),
            pos_ref: Vec::with_capacity(num_nodes),
            masses: Vec::with_capacity(num_nodes),
        }
    }

    /// Add a node at rest (current = reference), returning its index.
    pub fn add_node(&mut self, position: Point3<f64>, mass: f64) -> usize {
        let idx = self.pos.len();
        self.pos.push(position);
        self.pos_ref.push(position);
        self.masses.push(mass);
        idx
    }

    pub fn num_nodes(&self) -> usize {
        self.pos.len()
    }

    pub fn total_mass(&self) -> f64 {
        self.masses.iter().sum()
    }
}

/// Node/cell lattice built from a voxel grid
///
/// Nodes and cells are numbered densely in row-major order of their lattice
/// and grid indices respectively.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    pub geometry: Geometry,
    pub connectivity: Connectivity,
    pub fields: CellFields,
    /// Lattice index (k, l, m) of each node
    pub node_indices: Vec<[usize; 3]>,
    /// Grid index (kappa, lambda, mu) of each cell
    pub cell_indices: Vec<[usize; 3]>,
    /// Type id with the most voxels
    pub majority_type: TypeId,
    /// Uniform reference spacing (dx, dy, dz) of the majority type
    pub spacing: Vector3<f64>,
    pub periodic: bool,
}

impl Lattice {
    pub fn num_nodes(&self) -> usize {
        self.geometry.num_nodes()
    }

    pub fn num_cells(&self) -> usize {
        self.fields.num_cells()
    }

    pub fn total_mass(&self) -> f64 {
        self.geometry.total_mass()
    }

    /// One-line description for logs and reports
    pub fn summary(&self) -> String {
        format!(
            "Lattice: nodes={}, cells={}, total_mass={:.6e}, majority_type={}, spacing=({:.4}, {:.4}, {:.4}), periodic={}",
            self.num_nodes(),
            self.num_cells(),
            self.total_mass(),
            self.majority_type,
            self.spacing.x,
            self.spacing.y,
            self.spacing.z,
            self.periodic
        )
    }
}
