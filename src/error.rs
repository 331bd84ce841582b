//! Error types for lattice construction and checkpoint handling.

use thiserror::Error;

/// Invalid builder input: the grid, the Type Catalog, or a type record
/// cannot produce a lattice.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// The grid holds no material, so no majority type exists.
    #[error("grid contains no non-empty cells, cannot determine a majority type")]
    EmptyGrid,

    /// A grid dimension is zero or the data length does not match the shape.
    #[error("grid shape {shape:?} is degenerate or does not match {len} values")]
    InvalidGridShape {
        /// Declared shape (nx, ny, nz).
        shape: [usize; 3],
        /// Number of values supplied.
        len: usize,
    },

    /// A grid id has no entry in the id -> (color, name) mapping.
    #[error("type id {id} at grid position {position:?} has no catalog entry")]
    UnknownTypeId {
        /// The unresolved type id.
        id: u32,
        /// First grid position carrying the id, if known.
        position: Option<[usize; 3]>,
    },

    /// A catalog entry names a type with no data record.
    #[error("type id {id} refers to type '{name}' which has no data record")]
    UnknownTypeName {
        /// Catalog id.
        id: u32,
        /// Type name that failed to resolve.
        name: String,
    },

    /// A type record lacks a required field (or the field is empty).
    #[error("type '{name}' is missing required field '{field}'")]
    MissingField {
        /// Type name.
        name: String,
        /// Field name.
        field: &'static str,
    },

    /// Cell matrices and elasticity tensors do not pair up.
    #[error("type '{name}' has {cells} cell matrices but {tensors} elasticity tensors")]
    MismatchedPairs {
        /// Type name.
        name: String,
        /// Number of equilibrium cell matrices.
        cells: usize,
        /// Number of elasticity tensors.
        tensors: usize,
    },

    /// An extra type field is empty or reuses a name the catalog owns.
    #[error("'{field}' cannot be used as an extra type field name")]
    InvalidExtraField {
        /// Rejected field name.
        field: String,
    },

    /// An equilibrium cell matrix cannot be inverted.
    #[error("equilibrium cell matrix {index} of type '{name}' is singular")]
    SingularCellMatrix {
        /// Type name.
        name: String,
        /// Position in the type's cell-matrix list.
        index: usize,
    },
}

/// A flat record that cannot be turned back into builder inputs.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ConsistencyError {
    /// A required top-level key is absent.
    #[error("flat record is missing key '{0}'")]
    MissingKey(String),

    /// A key starting with `type` is not of the form `type{id}/{field}`.
    #[error("malformed type key '{0}', expected 'type<id>/<field>'")]
    MalformedTypeKey(String),

    /// A type group lacks a required field.
    #[error("type group {id} is missing field '{field}'")]
    MissingTypeField {
        /// Type id of the group.
        id: u32,
        /// Field name.
        field: &'static str,
    },

    /// A value has the wrong kind for its key.
    #[error("key '{key}' holds an unexpected value, expected {expected}")]
    UnexpectedValue {
        /// Offending key.
        key: String,
        /// Human readable description of the expected value.
        expected: &'static str,
    },

    /// An array has a shape that does not fit its key.
    #[error("key '{key}' has shape {shape:?}, expected {expected}")]
    InvalidShape {
        /// Offending key.
        key: String,
        /// Shape found in the record.
        shape: Vec<usize>,
        /// Human readable description of the expected shape.
        expected: &'static str,
    },

    /// A grid entry is not a valid type id.
    #[error("key '{key}' holds {value}, which is not a valid type id")]
    InvalidTypeId {
        /// Offending key.
        key: String,
        /// Stored value.
        value: i64,
    },
}

/// Errors from the file-facing helpers (structure config, checkpoint JSON).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// Reading or writing the file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The structure file is not valid TOML for [`crate::StructureConfig`].
    #[error("failed to parse structure config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The checkpoint is not valid JSON for [`crate::FlatRecord`].
    #[error("failed to (de)serialize checkpoint: {0}")]
    Json(#[from] serde_json::Error),

    /// A float is NaN or infinite and has no JSON representation.
    #[error("key '{key}' holds a non-finite value, which cannot be written as JSON")]
    NonFiniteValue {
        /// First offending key.
        key: String,
    },

    /// The loaded data does not describe a valid structure.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The loaded checkpoint is internally inconsistent.
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = ConfigurationError::UnknownTypeId { id: 2, position: Some([0, 1, 0]) };
        let msg = err.to_string();
        assert!(msg.contains("type id 2"));
        assert!(msg.contains("[0, 1, 0]"));

        let err = ConsistencyError::MissingTypeField { id: 3, field: "color" };
        assert_eq!(err.to_string(), "type group 3 is missing field 'color'");
    }

    #[test]
    fn test_load_error_wraps_domain_errors() {
        let err: LoadError = ConfigurationError::EmptyGrid.into();
        assert!(matches!(err, LoadError::Configuration(ConfigurationError::EmptyGrid)));
    }
}
