/// Nanocell material types
///
/// This module provides:
/// - Elasticity tensors and equilibrium cell matrices
/// - The Type Catalog resolving grid ids to type records

pub mod tensor;
pub mod catalog;

pub use tensor::{CellMatrix, ElasticityTensor};
pub use catalog::{ResolvedType, TypeCatalog, TypeEntry, TypeId, TypeRecord, EMPTY_TYPE};
