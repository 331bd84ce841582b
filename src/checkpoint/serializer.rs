//! Conversion between the Type Catalog / lattice and the flat record layout.
//!
//! Key layout:
//!
//! | key | value |
//! |---|---|
//! | `type{id}/name`, `type{id}/color` | text |
//! | `type{id}/mass` | scalar (id != 0) |
//! | `type{id}/cell` | `(n, 3, 3)` (id != 0) |
//! | `type{id}/elasticity` | `(n, 3, 3, 3, 3)` (id != 0) |
//! | `type{id}/{other}` | extra type fields, verbatim |
//! | `grid` | `(nx, ny, nz)` integers |
//! | `pos`, `pos_ref` | `(nnodes, 3)` |
//! | `cell_ref` | `(ncells, 3, 3)` |
//! | `equilibrium_cell_matrices`, `equilibrium_inv_cell_matrices` | per cell `(n, 3, 3)` |
//! | `elasticity_tensors` | per cell `(n, 3, 3, 3, 3)` |
//! | `surrounding_nodes` | per cell `(k, 2)` of (corner, node) |
//! | `surrounding_cells` | per node `(k, 2)` of (corner, cell) |
//! | `masses` | `(nnodes,)` |
//!
//! [`unflatten`] only recovers the catalog and the grid; the lattice keys
//! are ignored and can be regenerated with [`LatticeBuilder`].

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::record::{FlatRecord, FlatValue, NdArray};
use crate::builder::LatticeBuilder;
use crate::error::{ConfigurationError, ConsistencyError};
use crate::materials::catalog::{TypeCatalog, TypeId, TypeRecord, EMPTY_TYPE};
use crate::mesh::geometry::Lattice;
use crate::mesh::grid::Grid;
use crate::mesh::topology::CornerLink;

pub const GRID_KEY: &str = "grid";
pub const POS_KEY: &str = "pos";
pub const POS_REF_KEY: &str = "pos_ref";
pub const CELL_REF_KEY: &str = "cell_ref";
pub const EQUILIBRIUM_CELL_MATRICES_KEY: &str = "equilibrium_cell_matrices";
pub const EQUILIBRIUM_INV_CELL_MATRICES_KEY: &str = "equilibrium_inv_cell_matrices";
pub const ELASTICITY_TENSORS_KEY: &str = "elasticity_tensors";
pub const SURROUNDING_NODES_KEY: &str = "surrounding_nodes";
pub const SURROUNDING_CELLS_KEY: &str = "surrounding_cells";
pub const MASSES_KEY: &str = "masses";

const TYPE_PREFIX: &str = "type";
const NAME_FIELD: &str = "name";
const COLOR_FIELD: &str = "color";
const MASS_FIELD: &str = "mass";
const CELL_FIELD: &str = "cell";
const ELASTICITY_FIELD: &str = "elasticity";

/// `type{id}/{field}`
pub fn type_key(id: TypeId, field: &str) -> String {
    format!("{TYPE_PREFIX}{id}/{field}")
}

/// Split `type{id}/{field}` into its id and field.
fn parse_type_key(key: &str) -> Result<(TypeId, &str), ConsistencyError> {
    let malformed = || ConsistencyError::MalformedTypeKey(key.to_string());
    let rest = key.strip_prefix(TYPE_PREFIX).ok_or_else(malformed)?;
    let (id, field) = rest.split_once('/').ok_or_else(malformed)?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) || field.is_empty() {
        return Err(malformed());
    }
    let id = id.parse::<TypeId>().map_err(|_| malformed())?;
    Ok((id, field))
}

/// Flatten the Type Catalog and the grid.
///
/// Every catalog id contributes its name and color; ids other than 0 whose
/// type has a data record also contribute that record's fields.
pub fn flatten(catalog: &TypeCatalog, grid: &Grid) -> FlatRecord {
    let mut record = FlatRecord::new();

    for (&id, entry) in &catalog.types {
        if id != EMPTY_TYPE {
            if let Some(data) = catalog.data.get(&entry.name) {
                for (field, value) in data.extra() {
                    record.insert(type_key(id, field), value.clone());
                }
                record.insert(type_key(id, MASS_FIELD), FlatValue::Scalar(data.mass));
                record.insert(type_key(id, CELL_FIELD), FlatValue::from_matrices(&data.cell));
                record.insert(type_key(id, ELASTICITY_FIELD), FlatValue::from_tensors(&data.elasticity));
            }
        }
        record.insert(type_key(id, NAME_FIELD), FlatValue::text(&entry.name));
        record.insert(type_key(id, COLOR_FIELD), FlatValue::text(&entry.color));
    }

    let shape = grid.shape().to_vec();
    let data = grid.as_slice().iter().map(|&id| i64::from(id)).collect();
    record.insert(GRID_KEY, FlatValue::IntArray(NdArray { shape, data }));

    debug!(types = catalog.num_types(), keys = record.len(), "Flattened type catalog");
    record
}

/// Append the lattice keys to a record.
pub fn append_lattice(record: &mut FlatRecord, lattice: &Lattice) {
    let geometry = &lattice.geometry;
    let fields = &lattice.fields;
    let links = |lists: &[Vec<CornerLink>]| {
        FlatValue::Sequence(
            lists
                .iter()
                .map(|links| FlatValue::from_pairs(links.iter().map(|l| (l.corner, l.index))))
                .collect(),
        )
    };

    record.insert(POS_KEY, FlatValue::from_points(&geometry.pos));
    record.insert(POS_REF_KEY, FlatValue::from_points(&geometry.pos_ref));
    record.insert(CELL_REF_KEY, FlatValue::from_matrices(&fields.cell_ref));
    record.insert(
        EQUILIBRIUM_CELL_MATRICES_KEY,
        FlatValue::Sequence(fields.equilibrium_cell_matrices.iter().map(|m| FlatValue::from_matrices(m)).collect()),
    );
    record.insert(
        EQUILIBRIUM_INV_CELL_MATRICES_KEY,
        FlatValue::Sequence(
            fields
                .equilibrium_inv_cell_matrices
                .iter()
                .map(|m| FlatValue::from_matrices(m))
                .collect(),
        ),
    );
    record.insert(
        ELASTICITY_TENSORS_KEY,
        FlatValue::Sequence(fields.elasticity_tensors.iter().map(|t| FlatValue::from_tensors(t)).collect()),
    );
    record.insert(SURROUNDING_CELLS_KEY, links(&lattice.connectivity.surrounding_cells[..]));
    record.insert(SURROUNDING_NODES_KEY, links(&lattice.connectivity.surrounding_nodes[..]));
    record.insert(MASSES_KEY, FlatValue::from_scalars(&geometry.masses));
}

/// Build the lattice and flatten it together with its inputs.
pub fn build_output(catalog: &TypeCatalog, grid: &Grid, periodic: bool) -> Result<FlatRecord, ConfigurationError> {
    let lattice = LatticeBuilder::build(grid, catalog, periodic)?;
    let mut record = flatten(catalog, grid);
    append_lattice(&mut record, &lattice);
    info!(
        keys = record.len(),
        nodes = lattice.num_nodes(),
        cells = lattice.num_cells(),
        "Built checkpoint record"
    );
    Ok(record)
}

/// Recover the Type Catalog and the grid from a flat record.
///
/// Id 0 gets a catalog entry but never a data record. A non-zero id with
/// only `name` and `color` gets an entry without data; once any other field
/// is present, `mass`, `cell` and `elasticity` are all required.
pub fn unflatten(record: &FlatRecord) -> Result<(TypeCatalog, Grid), ConsistencyError> {
    let grid = grid_from_value(record.require(GRID_KEY)?)?;

    let mut groups: BTreeMap<TypeId, BTreeMap<&str, &FlatValue>> = BTreeMap::new();
    for (key, value) in record.iter() {
        if key.starts_with(TYPE_PREFIX) {
            let (id, field) = parse_type_key(key)?;
            groups.entry(id).or_default().insert(field, value);
        }
    }

    let mut catalog = TypeCatalog::new();
    for (id, mut fields) in groups {
        let name = take_field(&mut fields, id, NAME_FIELD)?.as_text(&type_key(id, NAME_FIELD))?.to_string();
        let color = take_field(&mut fields, id, COLOR_FIELD)?.as_text(&type_key(id, COLOR_FIELD))?.to_string();

        if id != EMPTY_TYPE && !fields.is_empty() {
            let data = record_from_fields(id, fields)?;
            catalog.insert_data(name.clone(), data);
        }
        catalog.insert_type(id, color, name);
    }

    debug!(types = catalog.num_types(), records = catalog.data.len(), "Recovered type catalog");
    Ok((catalog, grid))
}

fn take_field<'a>(
    fields: &mut BTreeMap<&str, &'a FlatValue>,
    id: TypeId,
    field: &'static str,
) -> Result<&'a FlatValue, ConsistencyError> {
    fields
        .remove(field)
        .ok_or(ConsistencyError::MissingTypeField { id, field })
}

fn record_from_fields(id: TypeId, mut fields: BTreeMap<&str, &FlatValue>) -> Result<TypeRecord, ConsistencyError> {
    let mass = take_field(&mut fields, id, MASS_FIELD)?.as_scalar(&type_key(id, MASS_FIELD))?;
    let cell = take_field(&mut fields, id, CELL_FIELD)?.to_matrices(&type_key(id, CELL_FIELD))?;
    let elasticity = take_field(&mut fields, id, ELASTICITY_FIELD)?.to_tensors(&type_key(id, ELASTICITY_FIELD))?;

    let mut record = TypeRecord::new(mass, cell, elasticity);
    for (field, value) in fields {
        record
            .insert_field(field, value.clone())
            .map_err(|_| ConsistencyError::MalformedTypeKey(type_key(id, field)))?;
    }
    Ok(record)
}

fn grid_from_value(value: &FlatValue) -> Result<Grid, ConsistencyError> {
    let array = value.as_int_array(GRID_KEY)?;
    let invalid_shape = || ConsistencyError::InvalidShape {
        key: GRID_KEY.to_string(),
        shape: array.shape.clone(),
        expected: "(nx, ny, nz)",
    };

    let shape: [usize; 3] = array.shape.as_slice().try_into().map_err(|_| invalid_shape())?;
    let data = array
        .data
        .iter()
        .map(|&v| {
            TypeId::try_from(v).map_err(|_| ConsistencyError::InvalidTypeId {
                key: GRID_KEY.to_string(),
                value: v,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Grid::new(shape, data).map_err(|_| invalid_shape())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::tensor::{diagonal_cell, ElasticityTensor};

    fn catalog() -> TypeCatalog {
        TypeCatalog::new()
            .with_type(0, "#FFFFFF", "empty")
            .with_type(1, "#0000FF", "fcu")
            .with_type(2, "#FF0000", "reo")
            .with_data(
                "fcu",
                TypeRecord::single(8.0, diagonal_cell(1.0, 1.0, 1.0), ElasticityTensor::isotropic(1.0, 2.0)),
            )
            .with_data(
                "reo",
                TypeRecord::new(
                    4.0,
                    vec![diagonal_cell(1.0, 1.1, 0.9), diagonal_cell(1.2, 1.0, 1.0)],
                    vec![ElasticityTensor::isotropic(0.5, 0.5), ElasticityTensor::isotropic(0.7, 0.2)],
                )
                .with_field("free_energy", FlatValue::from_scalars(&[0.0, 0.3]))
                .unwrap(),
            )
    }

    #[test]
    fn test_parse_type_key() {
        assert_eq!(parse_type_key("type12/mass"), Ok((12, "mass")));
        assert_eq!(parse_type_key("type0/name"), Ok((0, "name")));
        for bad in ["type/mass", "typex/mass", "type1", "type1/", "type-1/mass", "type+1/mass"] {
            assert_eq!(parse_type_key(bad), Err(ConsistencyError::MalformedTypeKey(bad.to_string())));
        }
    }

    #[test]
    fn test_flatten_keys() {
        let grid = Grid::filled([2, 1, 1], 1);
        let record = flatten(&catalog(), &grid);

        assert_eq!(record.get("type0/name"), Some(&FlatValue::text("empty")));
        assert_eq!(record.get("type1/color"), Some(&FlatValue::text("#0000FF")));
        assert_eq!(record.get("type1/mass"), Some(&FlatValue::Scalar(8.0)));
        assert!(record.contains_key("type2/free_energy"));
        // The empty type never carries data fields
        assert_eq!(record.keys().filter(|k| k.starts_with("type0/")).count(), 2);

        let grid_value = record.get(GRID_KEY).unwrap().as_int_array(GRID_KEY).unwrap();
        assert_eq!(grid_value.shape, vec![2, 1, 1]);
        assert_eq!(grid_value.data, vec![1, 1]);
    }

    #[test]
    fn test_round_trip() {
        let mut grid = Grid::filled([3, 2, 2], 1);
        grid.set([0, 0, 0], 0);
        grid.set([2, 1, 1], 2);
        let catalog = catalog();

        let record = build_output(&catalog, &grid, true).unwrap();
        let (catalog_back, grid_back) = unflatten(&record).unwrap();

        assert_eq!(catalog_back, catalog);
        assert_eq!(grid_back, grid);
    }

    #[test]
    fn test_entry_without_data_round_trips() {
        // Id 3 is drawn but never used in the grid, and has no data record
        let catalog = catalog().with_type(3, "#00FF00", "mil53");
        let grid = Grid::filled([1, 1, 1], 1);

        let (catalog_back, _) = unflatten(&flatten(&catalog, &grid)).unwrap();
        assert_eq!(catalog_back, catalog);
        assert!(catalog_back.resolve(3).is_err());
    }

    #[test]
    fn test_lattice_keys() {
        let grid = Grid::filled([1, 1, 1], 1);
        let record = build_output(&catalog(), &grid, false).unwrap();

        for key in [
            POS_KEY,
            POS_REF_KEY,
            CELL_REF_KEY,
            EQUILIBRIUM_CELL_MATRICES_KEY,
            EQUILIBRIUM_INV_CELL_MATRICES_KEY,
            ELASTICITY_TENSORS_KEY,
            SURROUNDING_NODES_KEY,
            SURROUNDING_CELLS_KEY,
            MASSES_KEY,
        ] {
            assert!(record.contains_key(key), "missing {key}");
        }

        let pos = record.get(POS_KEY).unwrap().as_array(POS_KEY).unwrap();
        assert_eq!(pos.shape, vec![8, 3]);
        let masses = record.get(MASSES_KEY).unwrap().as_array(MASSES_KEY).unwrap();
        assert_eq!(masses.data, vec![1.0; 8]);

        let nodes = record.get(SURROUNDING_NODES_KEY).unwrap().as_sequence(SURROUNDING_NODES_KEY).unwrap();
        assert_eq!(nodes.len(), 1);
        let pairs = nodes[0].as_int_array(SURROUNDING_NODES_KEY).unwrap();
        assert_eq!(pairs.shape, vec![8, 2]);
        // Nodes are numbered row-major: (0,0,0)=0, (0,0,1)=1, (0,1,0)=2, ... (1,1,1)=7
        assert_eq!(pairs.data, vec![0, 0, 1, 4, 2, 2, 3, 1, 4, 6, 5, 5, 6, 3, 7, 7]);
    }

    #[test]
    fn test_unflatten_ignores_lattice_keys() {
        let grid = Grid::filled([2, 2, 2], 1);
        let catalog = catalog();
        let mut record = build_output(&catalog, &grid, true).unwrap();
        record.remove(POS_KEY);
        record.insert(MASSES_KEY, FlatValue::text("not an array"));

        let (catalog_back, grid_back) = unflatten(&record).unwrap();
        assert_eq!(catalog_back, catalog);
        assert_eq!(grid_back, grid);
    }

    #[test]
    fn test_unflatten_missing_grid() {
        let mut record = flatten(&catalog(), &Grid::filled([1, 1, 1], 1));
        record.remove(GRID_KEY);
        assert_eq!(unflatten(&record), Err(ConsistencyError::MissingKey("grid".into())));
    }

    #[test]
    fn test_unflatten_missing_required_fields() {
        let base = flatten(&catalog(), &Grid::filled([1, 1, 1], 1));

        let mut record = base.clone();
        record.remove("type1/color");
        assert_eq!(
            unflatten(&record).unwrap_err(),
            ConsistencyError::MissingTypeField { id: 1, field: "color" }
        );

        let mut record = base.clone();
        record.remove("type2/mass");
        assert_eq!(
            unflatten(&record).unwrap_err(),
            ConsistencyError::MissingTypeField { id: 2, field: "mass" }
        );

        let mut record = base;
        record.insert("typeX/name", FlatValue::text("bad"));
        assert_eq!(
            unflatten(&record).unwrap_err(),
            ConsistencyError::MalformedTypeKey("typeX/name".into())
        );
    }

    #[test]
    fn test_unflatten_rejects_truncated_type_arrays() {
        let mut record = flatten(&catalog(), &Grid::filled([1, 1, 1], 1));
        record.insert(
            "type2/cell",
            FlatValue::Array(NdArray { shape: vec![2, 3, 3], data: vec![1.0; 13] }),
        );
        assert_eq!(
            unflatten(&record).unwrap_err(),
            ConsistencyError::InvalidShape {
                key: "type2/cell".into(),
                shape: vec![2, 3, 3],
                expected: "(n, 3, 3)",
            }
        );
    }

    #[test]
    fn test_unflatten_rejects_negative_grid_ids() {
        let mut record = flatten(&catalog(), &Grid::filled([1, 1, 2], 1));
        record.insert(
            GRID_KEY,
            FlatValue::IntArray(NdArray { shape: vec![1, 1, 2], data: vec![1, -1] }),
        );
        assert_eq!(
            unflatten(&record).unwrap_err(),
            ConsistencyError::InvalidTypeId { key: "grid".into(), value: -1 }
        );

        record.insert(
            GRID_KEY,
            FlatValue::IntArray(NdArray { shape: vec![2, 1], data: vec![1, 1] }),
        );
        assert!(matches!(unflatten(&record), Err(ConsistencyError::InvalidShape { .. })));
    }
}
