pub mod grid;
pub mod topology;
pub mod geometry;
pub mod fields;

pub use grid::Grid;
pub use topology::{Connectivity, CornerLink, NodeSpace, NEIGHBOR_CELLS, NEIGHBOR_NODES};
pub use geometry::{Geometry, Lattice};
pub use fields::CellFields;
