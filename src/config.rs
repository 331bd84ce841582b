//! Structure configuration
//!
//! Reads TOML structure files describing the Type Catalog, the voxel grid
//! and the boundary conditions used to build a lattice.
//!
//! ```toml
//! [build]
//! periodic = true
//!
//! [[types]]
//! id = 1
//! name = "fcu"
//! color = "#0000FF"
//!
//! [materials.fcu]
//! mass = 8.0
//! cell = [[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]]
//! isotropic = { youngs_modulus = 2.5, poisson_ratio = 0.25 }
//!
//! [grid]
//! shape = [4, 4, 4]
//! fill = 1
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{ConfigurationError, LoadError};
use crate::materials::catalog::{TypeCatalog, TypeId, TypeRecord, EMPTY_TYPE};
use crate::materials::tensor::{CellMatrix, ElasticityTensor};
use crate::mesh::grid::Grid;

/// Main structure configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StructureConfig {
    #[serde(default)]
    pub build: BuildConfig,
    pub types: Vec<TypeConfig>,
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialConfig>,
    pub grid: GridConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Periodic boundary conditions
    #[serde(default = "default_periodic")]
    pub periodic: bool,
}

fn default_periodic() -> bool { true }

impl Default for BuildConfig {
    fn default() -> Self {
        Self { periodic: default_periodic() }
    }
}

/// One grid id of the catalog
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TypeConfig {
    pub id: TypeId,
    pub name: String,
    pub color: String,
}

/// Isotropic shorthand for an elasticity tensor
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct IsotropicConfig {
    /// Young's modulus E
    pub youngs_modulus: f64,
    /// Poisson's ratio ν
    pub poisson_ratio: f64,
}

/// Data record of one nanocell type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MaterialConfig {
    /// Mass of one cell
    pub mass: f64,
    /// Equilibrium cell matrices, row-major
    pub cell: Vec<[[f64; 3]; 3]>,
    /// Full elasticity tensors, one per cell matrix
    #[serde(default)]
    pub elasticity: Vec<[[[[f64; 3]; 3]; 3]; 3]>,
    /// Used for every cell matrix when `elasticity` is empty
    #[serde(default)]
    pub isotropic: Option<IsotropicConfig>,
}

/// Voxel grid description
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GridConfig {
    /// Grid shape (nx, ny, nz)
    pub shape: [usize; 3],
    /// Type id of every voxel not covered by a block
    #[serde(default)]
    pub fill: TypeId,
    /// Boxes painted in order over the fill
    #[serde(default)]
    pub blocks: Vec<BlockConfig>,
}

/// Half-open box `min <= index < max`, clipped to the grid
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockConfig {
    pub min: [usize; 3],
    pub max: [usize; 3],
    pub type_id: TypeId,
}

impl MaterialConfig {
    fn to_record(&self) -> TypeRecord {
        let cell: Vec<CellMatrix> = self
            .cell
            .iter()
            .map(|rows| CellMatrix::from_fn(|i, j| rows[i][j]))
            .collect();

        let elasticity = if self.elasticity.is_empty() {
            match self.isotropic {
                Some(iso) => vec![
                    ElasticityTensor::isotropic_from_engineering(iso.youngs_modulus, iso.poisson_ratio);
                    cell.len()
                ],
                None => Vec::new(),
            }
        } else {
            self.elasticity
                .iter()
                .map(|c| ElasticityTensor::from_fn(|i, j, k, l| c[i][j][k][l]))
                .collect()
        };

        TypeRecord::new(self.mass, cell, elasticity)
    }
}

impl StructureConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(contents)?)
    }

    /// Type Catalog described by `types` and `materials`
    pub fn catalog(&self) -> TypeCatalog {
        let mut catalog = TypeCatalog::new();
        for ty in &self.types {
            catalog.insert_type(ty.id, &ty.color, &ty.name);
        }
        for (name, material) in &self.materials {
            catalog.insert_data(name, material.to_record());
        }
        catalog
    }

    /// Voxel grid with the blocks painted over the fill
    pub fn grid(&self) -> Result<Grid, ConfigurationError> {
        let shape = self.grid.shape;
        let mut grid = Grid::new(shape, vec![self.grid.fill; shape.iter().product()])?;

        for block in &self.grid.blocks {
            let max = [
                block.max[0].min(shape[0]),
                block.max[1].min(shape[1]),
                block.max[2].min(shape[2]),
            ];
            for kappa in block.min[0]..max[0] {
                for lambda in block.min[1]..max[1] {
                    for mu in block.min[2]..max[2] {
                        grid.set([kappa, lambda, mu], block.type_id);
                    }
                }
            }
        }
        Ok(grid)
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("═══════════════════════════════════════════════════════════════");
        println!("  Structure Configuration");
        println!("═══════════════════════════════════════════════════════════════");
        let [nx, ny, nz] = self.grid.shape;
        println!("Grid:");
        println!("  Shape: {} × {} × {} ({} voxels)", nx, ny, nz, nx * ny * nz);
        println!("  Fill: {}, blocks: {}", self.grid.fill, self.grid.blocks.len());
        println!("  Periodic: {}", self.build.periodic);

        println!("\nTypes:");
        for ty in &self.types {
            match self.materials.get(&ty.name) {
                Some(material) if ty.id != EMPTY_TYPE => println!(
                    "  {:>3}: {} ({}) mass = {:.4}, states = {}",
                    ty.id,
                    ty.name,
                    ty.color,
                    material.mass,
                    material.cell.len()
                ),
                _ => println!("  {:>3}: {} ({})", ty.id, ty.name, ty.color),
            }
        }
        println!("═══════════════════════════════════════════════════════════════\n");
    }
}
