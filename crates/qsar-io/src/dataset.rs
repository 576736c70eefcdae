//! JSON dataset files of pre-featurized molecules.
//!
//! ## File Format
//! ```json
//! { "molecules": [
//!     { "id": "m1", "smiles": "CCO", "target": [-0.77],
//!       "features": { "shape": [3, 3, 39], "values": [0.0, 1.0, ...] } }
//! ] }
//! ```
//!
//! `values` is the row-major flattening of the `(atom, atom, channel)`
//! tensor.

use crate::split::partition;
use ndarray::Array3;
use qsar_core::{
    DataSettings, Dataset, DatasetLoader, Molecule, QsarError, Result, ATTRIBUTE_VECTOR_SIZE,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Flattened tensor as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorRecord {
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

/// One molecule as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoleculeRecord {
    pub id: String,
    #[serde(default)]
    pub smiles: Option<String>,
    pub target: Vec<f32>,
    pub features: TensorRecord,
}

/// Top-level dataset document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetFile {
    pub molecules: Vec<MoleculeRecord>,
}

impl MoleculeRecord {
    /// Encodes a molecule for writing.
    pub fn from_molecule(molecule: &Molecule) -> Self {
        Self {
            id: molecule.id.clone(),
            smiles: molecule.smiles.clone(),
            target: molecule.target.clone(),
            features: TensorRecord {
                shape: molecule.tensor.shape().to_vec(),
                values: molecule.tensor.iter().copied().collect(),
            },
        }
    }

    /// Decodes and validates the tensor.
    pub fn into_molecule(self) -> Result<Molecule> {
        let shape = self.features.shape.as_slice();
        let &[rows, cols, channels] = shape else {
            return Err(QsarError::dataset(format!(
                "molecule '{}': expected 3-D features, got shape {:?}",
                self.id, shape
            )));
        };
        if rows != cols {
            return Err(QsarError::dataset(format!(
                "molecule '{}': atom axes must be square, got {}x{}",
                self.id, rows, cols
            )));
        }
        let expected = rows * cols * channels;
        if self.features.values.len() != expected {
            return Err(QsarError::dataset(format!(
                "molecule '{}': shape {:?} needs {} values, found {}",
                self.id,
                shape,
                expected,
                self.features.values.len()
            )));
        }
        if self.target.is_empty() {
            return Err(QsarError::dataset(format!("molecule '{}': empty target", self.id)));
        }

        let tensor = Array3::from_shape_vec((rows, cols, channels), self.features.values)
            .map_err(|e| QsarError::dataset(format!("molecule '{}': {}", self.id, e)))?;

        Ok(Molecule {
            id: self.id,
            smiles: self.smiles,
            tensor,
            target: self.target,
        })
    }
}

/// Reads every molecule from a dataset file, in file order.
pub fn read_molecules<P: AsRef<Path>>(path: P) -> Result<Vec<Molecule>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        QsarError::dataset(format!("failed to read dataset '{}': {}", path.display(), e))
    })?;
    let file: DatasetFile = serde_json::from_str(&content)?;

    file.molecules
        .into_iter()
        .map(MoleculeRecord::into_molecule)
        .collect()
}

/// Writes molecules in the dataset file format.
pub fn write_molecules<P: AsRef<Path>>(path: P, molecules: &[Molecule]) -> Result<()> {
    let file = DatasetFile {
        molecules: molecules.iter().map(MoleculeRecord::from_molecule).collect(),
    };
    fs::write(path, serde_json::to_string(&file)?)?;
    Ok(())
}

/// Loads `DATA.data_fpath`, shuffles, truncates and splits.
#[derive(Debug, Clone, Default)]
pub struct JsonDatasetLoader {
    /// Overrides `DATA.data_fpath` when set
    path: Option<PathBuf>,
}

impl JsonDatasetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader bound to a fixed file regardless of settings.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    fn resolve_path<'a>(&'a self, options: &'a DataSettings) -> Result<&'a Path> {
        self.path
            .as_deref()
            .or(options.data_fpath.as_deref())
            .ok_or_else(|| QsarError::config_key("DATA", "data_fpath"))
    }
}

impl DatasetLoader for JsonDatasetLoader {
    fn load(&self, options: &DataSettings) -> Result<Dataset> {
        let path = self.resolve_path(options)?;
        let mut molecules = read_molecules(path)?;

        if options.molecular_attributes {
            if let Some(narrow) = molecules
                .iter()
                .find(|m| m.num_channels() < ATTRIBUTE_VECTOR_SIZE)
            {
                return Err(QsarError::dataset(format!(
                    "molecule '{}' has {} channels; molecular attributes need {}",
                    narrow.id,
                    narrow.num_channels(),
                    ATTRIBUTE_VECTOR_SIZE
                )));
            }
        }

        let mut rng = StdRng::seed_from_u64(options.shuffle_seed);
        molecules.shuffle(&mut rng);

        if let Some(limit) = options.truncate_to {
            if limit < molecules.len() {
                log::debug!("Truncating dataset from {} to {} molecules", molecules.len(), limit);
                molecules.truncate(limit);
            }
        }

        let dataset = partition(molecules, options.training_ratio, options.cv_folds);
        log::info!(
            "Loaded {}: {} train / {} val / {} test (ratio {}, folds {})",
            path.display(),
            dataset.train.len(),
            dataset.val.len(),
            dataset.test.len(),
            options.training_ratio,
            options.cv_folds
        );

        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, shape: Vec<usize>, values: Vec<f32>) -> MoleculeRecord {
        MoleculeRecord {
            id: id.to_string(),
            smiles: None,
            target: vec![1.0],
            features: TensorRecord { shape, values },
        }
    }

    #[test]
    fn test_record_decodes_row_major() {
        let values: Vec<f32> = (0..8).map(|v| v as f32).collect();
        let molecule = record("m", vec![2, 2, 2], values).into_molecule().unwrap();
        assert_eq!(molecule.tensor[[0, 0, 1]], 1.0);
        assert_eq!(molecule.tensor[[0, 1, 0]], 2.0);
        assert_eq!(molecule.tensor[[1, 1, 1]], 7.0);
    }

    #[test]
    fn test_record_rejects_bad_shapes() {
        assert!(record("a", vec![2, 2], vec![0.0; 4]).into_molecule().is_err());
        assert!(record("b", vec![2, 3, 1], vec![0.0; 6]).into_molecule().is_err());

        let err = record("c", vec![2, 2, 2], vec![0.0; 7]).into_molecule().unwrap_err();
        assert!(err.to_string().contains("'c'"));
    }

    #[test]
    fn test_record_rejects_empty_target() {
        let mut r = record("d", vec![1, 1, 1], vec![0.0]);
        r.target.clear();
        assert!(r.into_molecule().is_err());
    }

    #[test]
    fn test_record_roundtrip_preserves_tensor() {
        let molecule = record("m", vec![1, 1, 3], vec![0.5, 0.0, 2.0])
            .into_molecule()
            .unwrap();
        let back = MoleculeRecord::from_molecule(&molecule).into_molecule().unwrap();
        assert_eq!(back, molecule);
    }

    #[test]
    fn test_loader_requires_a_path() {
        let options = DataSettings {
            data_fpath: None,
            molecular_attributes: false,
            shuffle_seed: 0,
            truncate_to: None,
            training_ratio: 1.0,
            cv_folds: Default::default(),
        };
        let err = JsonDatasetLoader::new().load(&options).unwrap_err();
        assert!(matches!(err, QsarError::ConfigKey { .. }));
    }
}
