//! Type Catalog: maps grid ids to named nanocell types and their data.
//!
//! The catalog is two mappings, kept separate because several ids may share
//! one type (e.g. the same material drawn in two colors):
//!
//! - `types`: grid id -> [`TypeEntry`] (color, name)
//! - `data`: type name -> [`TypeRecord`] (mass, cell matrices, elasticity)
//!
//! Id 0 is always the empty type and never carries a data record.

use std::collections::BTreeMap;

use crate::checkpoint::FlatValue;
use crate::error::ConfigurationError;
use crate::materials::tensor::{CellMatrix, ElasticityTensor};

/// Integer id stored in the voxel grid.
pub type TypeId = u32;

/// Grid id meaning "no material".
pub const EMPTY_TYPE: TypeId = 0;

/// Field names owned by the catalog itself; extra fields may not reuse them.
pub const RESERVED_FIELDS: [&str; 5] = ["name", "color", "mass", "cell", "elasticity"];

/// Display color and type name of one grid id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    pub color: String,
    pub name: String,
}

impl TypeEntry {
    pub fn new(color: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            name: name.into(),
        }
    }
}

/// Material data of one nanocell type.
///
/// `cell` and `elasticity` are ordered lists of (cell matrix, elasticity
/// tensor) pairs, one pair per discretization state. Any additional named
/// fields are kept in `extra` and only travel through the checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRecord {
    /// Mass of one full cell of this type.
    pub mass: f64,
    /// Equilibrium cell matrices.
    pub cell: Vec<CellMatrix>,
    /// Elasticity tensors, paired index-wise with `cell`.
    pub elasticity: Vec<ElasticityTensor>,
    extra: BTreeMap<String, FlatValue>,
}

impl TypeRecord {
    pub fn new(mass: f64, cell: Vec<CellMatrix>, elasticity: Vec<ElasticityTensor>) -> Self {
        Self {
            mass,
            cell,
            elasticity,
            extra: BTreeMap::new(),
        }
    }

    /// Single-state record.
    pub fn single(mass: f64, cell: CellMatrix, elasticity: ElasticityTensor) -> Self {
        Self::new(mass, vec![cell], vec![elasticity])
    }

    /// Builder-style [`insert_field`](Self::insert_field).
    pub fn with_field(mut self, name: impl Into<String>, value: FlatValue) -> Result<Self, ConfigurationError> {
        self.insert_field(name, value)?;
        Ok(self)
    }

    /// Attach an extra named field, carried verbatim through the checkpoint.
    ///
    /// Empty names and the names in [`RESERVED_FIELDS`] are rejected.
    pub fn insert_field(
        &mut self,
        name: impl Into<String>,
        value: FlatValue,
    ) -> Result<Option<FlatValue>, ConfigurationError> {
        let name = name.into();
        if name.is_empty() || RESERVED_FIELDS.contains(&name.as_str()) {
            return Err(ConfigurationError::InvalidExtraField { field: name });
        }
        Ok(self.extra.insert(name, value))
    }

    /// Extra fields, by name.
    pub fn extra(&self) -> &BTreeMap<String, FlatValue> {
        &self.extra
    }

    /// Check that the record can be used by the builder.
    pub fn validate(&self, name: &str) -> Result<(), ConfigurationError> {
        if !self.mass.is_finite() {
            return Err(ConfigurationError::MissingField {
                name: name.to_string(),
                field: "mass",
            });
        }
        if self.cell.is_empty() {
            return Err(ConfigurationError::MissingField {
                name: name.to_string(),
                field: "cell",
            });
        }
        if self.elasticity.is_empty() {
            return Err(ConfigurationError::MissingField {
                name: name.to_string(),
                field: "elasticity",
            });
        }
        if self.cell.len() != self.elasticity.len() {
            return Err(ConfigurationError::MismatchedPairs {
                name: name.to_string(),
                cells: self.cell.len(),
                tensors: self.elasticity.len(),
            });
        }
        Ok(())
    }

    /// Inverses of the equilibrium cell matrices, in order.
    pub fn inverse_cell_matrices(&self, name: &str) -> Result<Vec<CellMatrix>, ConfigurationError> {
        self.cell
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                cell.try_inverse()
                    .ok_or_else(|| ConfigurationError::SingularCellMatrix {
                        name: name.to_string(),
                        index,
                    })
            })
            .collect()
    }
}

/// A grid id resolved to its type.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedType<'a> {
    pub id: TypeId,
    pub name: &'a str,
    pub color: &'a str,
    pub record: &'a TypeRecord,
}

/// Grid id -> type mapping plus per-type data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeCatalog {
    pub types: BTreeMap<TypeId, TypeEntry>,
    pub data: BTreeMap<String, TypeRecord>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the color and type name of a grid id.
    pub fn insert_type(&mut self, id: TypeId, color: impl Into<String>, name: impl Into<String>) {
        self.types.insert(id, TypeEntry::new(color, name));
    }

    /// Register the data record of a type name.
    pub fn insert_data(&mut self, name: impl Into<String>, record: TypeRecord) {
        self.data.insert(name.into(), record);
    }

    /// Builder-style [`insert_type`](Self::insert_type).
    pub fn with_type(mut self, id: TypeId, color: impl Into<String>, name: impl Into<String>) -> Self {
        self.insert_type(id, color, name);
        self
    }

    /// Builder-style [`insert_data`](Self::insert_data).
    pub fn with_data(mut self, name: impl Into<String>, record: TypeRecord) -> Self {
        self.insert_data(name, record);
        self
    }

    /// Color and name registered for a grid id.
    pub fn entry(&self, id: TypeId) -> Option<&TypeEntry> {
        self.types.get(&id)
    }

    /// Resolve a grid id to its type record.
    ///
    /// Id 0 resolves to `None`. Any other id must have a catalog entry whose
    /// name has a data record.
    pub fn resolve(&self, id: TypeId) -> Result<Option<ResolvedType<'_>>, ConfigurationError> {
        if id == EMPTY_TYPE {
            return Ok(None);
        }
        let entry = self
            .entry(id)
            .ok_or(ConfigurationError::UnknownTypeId { id, position: None })?;
        let record = self
            .data
            .get(&entry.name)
            .ok_or_else(|| ConfigurationError::UnknownTypeName {
                id,
                name: entry.name.clone(),
            })?;
        Ok(Some(ResolvedType {
            id,
            name: &entry.name,
            color: &entry.color,
            record,
        }))
    }

    /// Number of registered grid ids (including 0 if present).
    pub fn num_types(&self) -> usize {
        self.types.len()
    }
}
