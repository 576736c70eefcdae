//! # qsar-io
//!
//! Loading of pre-featurized molecule datasets.
//!
//! Molecules arrive as dense `(atom, atom, channel)` tensors in a JSON
//! document (see [`dataset`]). [`JsonDatasetLoader`] shuffles them with a
//! seeded RNG, optionally truncates, and partitions them into train /
//! validation / test splits ([`split`]).

pub mod dataset;
pub mod split;

pub use dataset::{read_molecules, write_molecules, DatasetFile, JsonDatasetLoader, MoleculeRecord};
pub use split::{partition, split_bounds, SplitBounds};
