//! Integration tests for the JSON dataset loader.

use ndarray::Array3;
use qsar_core::{CvFolds, DataSettings, DatasetLoader, Molecule, QsarError, ATTRIBUTE_VECTOR_SIZE};
use qsar_io::{write_molecules, JsonDatasetLoader};
use std::path::Path;
use tempfile::TempDir;

fn molecules(n: usize, channels: usize) -> Vec<Molecule> {
    (0..n)
        .map(|i| {
            let mut tensor = Array3::zeros((2, 2, channels));
            tensor[[0, 0, 0]] = i as f32;
            Molecule::new(format!("mol-{}", i), tensor, vec![i as f32])
        })
        .collect()
}

fn options(path: &Path) -> DataSettings {
    DataSettings {
        data_fpath: Some(path.to_path_buf()),
        molecular_attributes: true,
        shuffle_seed: 42,
        truncate_to: None,
        training_ratio: 1.0,
        cv_folds: CvFolds::SINGLE,
    }
}

fn ids(dataset: &qsar_core::Dataset) -> Vec<String> {
    dataset
        .splits()
        .flat_map(|(_, split)| split.molecules.iter().map(|m| m.id.clone()))
        .collect()
}

#[test]
fn full_dataset_load_keeps_every_molecule_in_train() {
    env_logger::try_init().ok();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");
    write_molecules(&path, &molecules(12, ATTRIBUTE_VECTOR_SIZE)).unwrap();

    let dataset = JsonDatasetLoader::new().load(&options(&path)).unwrap();
    assert_eq!(dataset.train.len(), 12);
    assert!(dataset.val.is_empty());
    assert!(dataset.test.is_empty());
}

#[test]
fn same_seed_gives_same_order_and_fresh_copies() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");
    write_molecules(&path, &molecules(20, ATTRIBUTE_VECTOR_SIZE)).unwrap();

    let loader = JsonDatasetLoader::new();
    let mut first = loader.load(&options(&path)).unwrap();
    let second = loader.load(&options(&path)).unwrap();
    assert_eq!(ids(&first), ids(&second));

    // Mutating one load must not leak into the next
    for tensor in first.mols_mut() {
        tensor.fill(9.0);
    }
    let third = loader.load(&options(&path)).unwrap();
    assert_eq!(third, second);

    let mut other_seed = options(&path);
    other_seed.shuffle_seed = 7;
    let reshuffled = loader.load(&other_seed).unwrap();
    assert_ne!(ids(&reshuffled), ids(&second));
}

#[test]
fn truncation_and_ratio_shape_the_splits() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");
    write_molecules(&path, &molecules(30, ATTRIBUTE_VECTOR_SIZE)).unwrap();

    let mut opts = options(&path);
    opts.truncate_to = Some(20);
    opts.training_ratio = 0.5;
    opts.cv_folds = CvFolds { fold: 1, folds: 2 };

    let dataset = JsonDatasetLoader::new().load(&opts).unwrap();
    assert_eq!(dataset.len(), 20);
    assert_eq!(dataset.train.len(), 5);
    assert_eq!(dataset.val.len(), 5);
    assert_eq!(dataset.test.len(), 10);
}

#[test]
fn molecular_attributes_require_full_width() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("narrow.json");
    write_molecules(&path, &molecules(3, 4)).unwrap();

    let err = JsonDatasetLoader::new().load(&options(&path)).unwrap_err();
    assert!(matches!(err, QsarError::Dataset(_)));

    let mut opts = options(&path);
    opts.molecular_attributes = false;
    assert_eq!(JsonDatasetLoader::new().load(&opts).unwrap().len(), 3);
}

#[test]
fn explicit_path_overrides_settings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");
    write_molecules(&path, &molecules(2, ATTRIBUTE_VECTOR_SIZE)).unwrap();

    let mut opts = options(Path::new("/nonexistent.json"));
    opts.data_fpath = None;
    let dataset = JsonDatasetLoader::with_path(&path).load(&opts).unwrap();
    assert_eq!(dataset.len(), 2);
}

#[test]
fn malformed_json_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ \"molecules\": [ { \"id\": 1 } ] }").unwrap();

    let err = JsonDatasetLoader::new().load(&options(&path)).unwrap_err();
    assert!(matches!(err, QsarError::Serialization(_)));
}
