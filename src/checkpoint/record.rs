//! Flat, string-keyed checkpoint record.
//!
//! A [`FlatRecord`] is a depth-1 map from keys such as `type1/mass` or
//! `pos` to [`FlatValue`]s. Arrays carry an explicit shape and row-major
//! data; ragged per-cell or per-node lists are stored as sequences.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use nalgebra::{Matrix3, Point3};
use serde::{Deserialize, Serialize};

use crate::error::{ConsistencyError, LoadError};
use crate::materials::tensor::{CellMatrix, ElasticityTensor, TENSOR_COMPONENTS};

/// Dense n-dimensional array, row-major.
///
/// Deserialization rejects arrays whose data length does not match the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNdArray<T>", bound(deserialize = "T: Deserialize<'de>"))]
pub struct NdArray<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

impl<T> NdArray<T> {
    /// Wrap data, returning `None` if the shape does not match its length.
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Option<Self> {
        let array = Self { shape, data };
        array.is_consistent().then_some(array)
    }

    /// Whether `data` holds exactly the number of values `shape` calls for.
    pub fn is_consistent(&self) -> bool {
        self.shape.iter().product::<usize>() == self.data.len()
    }
}

#[derive(Deserialize)]
struct RawNdArray<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T> TryFrom<RawNdArray<T>> for NdArray<T> {
    type Error = String;

    fn try_from(raw: RawNdArray<T>) -> Result<Self, Self::Error> {
        let expected = raw.shape.iter().product::<usize>();
        let len = raw.data.len();
        Self::new(raw.shape, raw.data)
            .ok_or_else(|| format!("array shape calls for {expected} values but holds {len}"))
    }
}

/// One value of a flat record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FlatValue {
    Text(String),
    Scalar(f64),
    Array(NdArray<f64>),
    IntArray(NdArray<i64>),
    /// Ragged list, e.g. one entry per cell.
    Sequence(Vec<FlatValue>),
}

impl FlatValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// `(n, 3, 3)` array of matrices.
    pub fn from_matrices(matrices: &[Matrix3<f64>]) -> Self {
        let mut data = Vec::with_capacity(matrices.len() * 9);
        for m in matrices {
            for i in 0..3 {
                for j in 0..3 {
                    data.push(m[(i, j)]);
                }
            }
        }
        Self::Array(NdArray {
            shape: vec![matrices.len(), 3, 3],
            data,
        })
    }

    /// `(n, 3, 3, 3, 3)` array of tensors.
    pub fn from_tensors(tensors: &[ElasticityTensor]) -> Self {
        let data = tensors.iter().flat_map(|t| t.as_slice().iter().copied()).collect();
        Self::Array(NdArray {
            shape: vec![tensors.len(), 3, 3, 3, 3],
            data,
        })
    }

    /// `(n, 3)` array of points.
    pub fn from_points(points: &[Point3<f64>]) -> Self {
        let data = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
        Self::Array(NdArray {
            shape: vec![points.len(), 3],
            data,
        })
    }

    /// `(n,)` array of scalars.
    pub fn from_scalars(values: &[f64]) -> Self {
        Self::Array(NdArray {
            shape: vec![values.len()],
            data: values.to_vec(),
        })
    }

    /// `(n, 2)` integer array of pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let data: Vec<i64> = pairs
            .into_iter()
            .flat_map(|(a, b)| [a as i64, b as i64])
            .collect();
        Self::IntArray(NdArray {
            shape: vec![data.len() / 2, 2],
            data,
        })
    }

    pub fn as_text(&self, key: &str) -> Result<&str, ConsistencyError> {
        match self {
            Self::Text(s) => Ok(s),
            _ => Err(unexpected(key, "text")),
        }
    }

    pub fn as_scalar(&self, key: &str) -> Result<f64, ConsistencyError> {
        match self {
            Self::Scalar(v) => Ok(*v),
            _ => Err(unexpected(key, "scalar")),
        }
    }

    pub fn as_array(&self, key: &str) -> Result<&NdArray<f64>, ConsistencyError> {
        match self {
            Self::Array(a) => Ok(a),
            _ => Err(unexpected(key, "float array")),
        }
    }

    pub fn as_int_array(&self, key: &str) -> Result<&NdArray<i64>, ConsistencyError> {
        match self {
            Self::IntArray(a) => Ok(a),
            _ => Err(unexpected(key, "integer array")),
        }
    }

    pub fn as_sequence(&self, key: &str) -> Result<&[FlatValue], ConsistencyError> {
        match self {
            Self::Sequence(items) => Ok(items),
            _ => Err(unexpected(key, "sequence")),
        }
    }

    /// Whether every float in the value, nested ones included, is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Text(_) | Self::IntArray(_) => true,
            Self::Scalar(v) => v.is_finite(),
            Self::Array(a) => a.data.iter().all(|v| v.is_finite()),
            Self::Sequence(items) => items.iter().all(Self::is_finite),
        }
    }

    /// Inverse of [`from_matrices`](Self::from_matrices).
    pub fn to_matrices(&self, key: &str) -> Result<Vec<CellMatrix>, ConsistencyError> {
        let array = self.as_array(key)?;
        if array.shape.len() != 3 || array.shape[1..] != [3, 3] || !array.is_consistent() {
            return Err(invalid_shape(key, &array.shape, "(n, 3, 3)"));
        }
        Ok(array
            .data
            .chunks_exact(9)
            .map(|c| Matrix3::from_row_slice(c))
            .collect())
    }

    /// Inverse of [`from_tensors`](Self::from_tensors).
    pub fn to_tensors(&self, key: &str) -> Result<Vec<ElasticityTensor>, ConsistencyError> {
        let array = self.as_array(key)?;
        if array.shape.len() != 5 || array.shape[1..] != [3, 3, 3, 3] || !array.is_consistent() {
            return Err(invalid_shape(key, &array.shape, "(n, 3, 3, 3, 3)"));
        }
        array
            .data
            .chunks_exact(TENSOR_COMPONENTS)
            .map(|c| ElasticityTensor::from_slice(c).ok_or_else(|| invalid_shape(key, &array.shape, "(n, 3, 3, 3, 3)")))
            .collect()
    }
}

fn unexpected(key: &str, expected: &'static str) -> ConsistencyError {
    ConsistencyError::UnexpectedValue {
        key: key.to_string(),
        expected,
    }
}

fn invalid_shape(key: &str, shape: &[usize], expected: &'static str) -> ConsistencyError {
    ConsistencyError::InvalidShape {
        key: key.to_string(),
        shape: shape.to_vec(),
        expected,
    }
}

/// String-keyed checkpoint record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRecord {
    entries: BTreeMap<String, FlatValue>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FlatValue) -> Option<FlatValue> {
        self.entries.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&FlatValue> {
        self.entries.get(key)
    }

    /// Like [`get`](Self::get), but a missing key is an error.
    pub fn require(&self, key: &str) -> Result<&FlatValue, ConsistencyError> {
        self.entries
            .get(key)
            .ok_or_else(|| ConsistencyError::MissingKey(key.to_string()))
    }

    pub fn remove(&mut self, key: &str) -> Option<FlatValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlatValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the record as JSON.
    ///
    /// JSON has no NaN or infinity, so a record holding one is rejected
    /// before the file is created.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), LoadError> {
        if let Some((key, _)) = self.iter().find(|(_, value)| !value.is_finite()) {
            return Err(LoadError::NonFiniteValue { key: key.to_string() });
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Read a record written by [`write_json`](Self::write_json).
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::tensor::diagonal_cell;

    #[test]
    fn test_nd_array_checks_shape() {
        assert!(NdArray::new(vec![2, 3], vec![0.0; 6]).is_some());
        assert!(NdArray::new(vec![2, 3], vec![0.0; 5]).is_none());
    }

    #[test]
    fn test_matrix_layout_is_row_major() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        let value = FlatValue::from_matrices(&[m]);
        let array = value.as_array("m").unwrap();
        assert_eq!(array.shape, vec![1, 3, 3]);
        assert_eq!(array.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(value.to_matrices("m").unwrap(), vec![m]);
    }

    #[test]
    fn test_tensor_array() {
        let tensors = vec![ElasticityTensor::isotropic(1.0, 2.0), ElasticityTensor::zeros()];
        let value = FlatValue::from_tensors(&tensors);
        assert_eq!(value.as_array("c").unwrap().shape, vec![2, 3, 3, 3, 3]);
        assert_eq!(value.to_tensors("c").unwrap(), tensors);
    }

    #[test]
    fn test_wrong_kind_is_reported() {
        let value = FlatValue::Scalar(1.0);
        assert_eq!(
            value.as_text("type1/name"),
            Err(ConsistencyError::UnexpectedValue { key: "type1/name".into(), expected: "text" })
        );

        let value = FlatValue::from_scalars(&[1.0, 2.0]);
        assert!(matches!(
            value.to_matrices("type1/cell"),
            Err(ConsistencyError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_truncated_arrays_are_rejected() {
        let short = FlatValue::Array(NdArray { shape: vec![2, 3, 3], data: vec![1.0; 13] });
        assert_eq!(
            short.to_matrices("type1/cell"),
            Err(ConsistencyError::InvalidShape {
                key: "type1/cell".into(),
                shape: vec![2, 3, 3],
                expected: "(n, 3, 3)",
            })
        );

        let long = FlatValue::Array(NdArray { shape: vec![1, 3, 3, 3, 3], data: vec![0.0; 100] });
        assert!(matches!(
            long.to_tensors("type1/elasticity"),
            Err(ConsistencyError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_deserialize_checks_array_length() {
        let json = r#"{"type1/cell": {"kind": "array", "value": {"shape": [2, 3, 3], "data": [1.0, 2.0]}}}"#;
        assert!(serde_json::from_str::<FlatRecord>(json).is_err());

        let json = r#"{"grid": {"kind": "int_array", "value": {"shape": [1, 1, 2], "data": [1, 0]}}}"#;
        let record: FlatRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_write_json_rejects_non_finite_values() {
        let path = std::env::temp_dir().join(format!("voxel_lattice_{}_non_finite.json", std::process::id()));
        let mut record = FlatRecord::new();
        record.insert("type1/mass", FlatValue::Scalar(8.0));
        record.insert(
            "elasticity_tensors",
            FlatValue::Sequence(vec![FlatValue::from_scalars(&[1.0, f64::INFINITY])]),
        );

        let err = record.write_json(&path).unwrap_err();
        assert!(matches!(err, LoadError::NonFiniteValue { ref key } if key == "elasticity_tensors"));
        assert!(!path.exists());

        record.insert("elasticity_tensors", FlatValue::Scalar(f64::NAN));
        assert!(!record.get("elasticity_tensors").unwrap().is_finite());
        assert!(record.get("type1/mass").unwrap().is_finite());
    }

    #[test]
    fn test_pairs() {
        let value = FlatValue::from_pairs([(0, 4), (7, 1)]);
        let array = value.as_int_array("p").unwrap();
        assert_eq!(array.shape, vec![2, 2]);
        assert_eq!(array.data, vec![0, 4, 7, 1]);
    }

    #[test]
    fn test_require_missing_key() {
        let mut record = FlatRecord::new();
        record.insert("grid", FlatValue::from_matrices(&[diagonal_cell(1.0, 1.0, 1.0)]));
        assert!(record.require("grid").is_ok());
        assert_eq!(record.require("pos"), Err(ConsistencyError::MissingKey("pos".into())));
    }

    #[test]
    fn test_json_round_trip() {
        let mut record = FlatRecord::new();
        record.insert("type1/name", FlatValue::text("fcu"));
        record.insert("type1/mass", FlatValue::Scalar(8.0));
        record.insert(
            "surrounding_nodes",
            FlatValue::Sequence(vec![FlatValue::from_pairs([(0, 0), (1, 1)])]),
        );

        let json = serde_json::to_string(&record).unwrap();
        let back: FlatRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
