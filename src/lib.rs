pub mod mesh;
pub mod materials;
pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod error;

pub use mesh::{Grid, Lattice, Geometry, Connectivity, CornerLink, CellFields, NodeSpace, NEIGHBOR_CELLS, NEIGHBOR_NODES};
pub use materials::{CellMatrix, ElasticityTensor, TypeCatalog, TypeEntry, TypeId, TypeRecord, EMPTY_TYPE};
pub use builder::LatticeBuilder;
pub use checkpoint::{FlatRecord, FlatValue, NdArray, flatten, unflatten, append_lattice, build_output};
pub use config::StructureConfig;
pub use error::{ConfigurationError, ConsistencyError, LoadError};
