pub mod record;
pub mod serializer;

pub use record::{FlatRecord, FlatValue, NdArray};
pub use serializer::{append_lattice, build_output, flatten, type_key, unflatten};
