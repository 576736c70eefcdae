//! All 18 conditions over a dataset file on disk.

use ndarray::{array, Array1, Array3};
use qsar_ablation::{AblationDriver, AblationSummary, CONDITIONS};
use qsar_core::{
    read_config, AblationSettings, DataSettings, Dataset, DatasetLoader, EvaluationReport,
    Evaluator, Model, Molecule, MoleculeTensor, RegressionMetrics, Result, SplitKind,
    ATTRIBUTE_VECTOR_SIZE,
};
use qsar_io::{write_molecules, JsonDatasetLoader};
use std::cell::Cell;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Counts loads and delegates to the JSON loader.
struct Counting {
    inner: JsonDatasetLoader,
    loads: Cell<usize>,
}

impl DatasetLoader for Counting {
    fn load(&self, options: &DataSettings) -> Result<Dataset> {
        self.loads.set(self.loads.get() + 1);
        self.inner.load(options)
    }
}

/// Scores the total of channel 23 so the ring condition is visible.
struct RingCount;

impl Model for RingCount {
    fn predict(&self, tensor: &MoleculeTensor) -> Result<Array1<f32>> {
        Ok(array![tensor.slice(ndarray::s![.., .., 23]).sum()])
    }

    fn output_size(&self) -> usize {
        1
    }

    fn feature_width(&self) -> usize {
        ATTRIBUTE_VECTOR_SIZE
    }
}

/// MSE of the model output against the target over the train split.
#[derive(Default)]
struct TrainMse {
    labels: Vec<String>,
    molecules: Vec<usize>,
}

impl Evaluator for TrainMse {
    fn evaluate<M: Model + ?Sized>(
        &mut self,
        model: &M,
        data: &Dataset,
        _fpath: &Path,
        label: &str,
        _batch_size: usize,
    ) -> Result<EvaluationReport> {
        self.labels.push(label.to_string());
        self.molecules.push(data.len());

        let mut squared = 0.0;
        for molecule in &data.train.molecules {
            let y = model.predict(&molecule.tensor)?[0] as f64;
            squared += (y - molecule.target[0] as f64).powi(2);
        }
        let mse = squared / data.train.len() as f64;

        let mut report = EvaluationReport::new(label);
        report.splits.insert(
            SplitKind::Train,
            RegressionMetrics {
                count: data.train.len(),
                mse,
                rmse: mse.sqrt(),
                mae: 0.0,
                r2: None,
            },
        );
        Ok(report)
    }
}

/// Ring atoms carry 1.0 on channel 23; each molecule's target is its ring count.
fn molecule(i: usize) -> Molecule {
    let atoms = 3;
    let mut tensor = Array3::zeros((atoms, atoms, ATTRIBUTE_VECTOR_SIZE));
    let mut rings = 0.0;
    for k in 0..atoms {
        tensor[[k, k, k % 11]] = 1.0;
        if (i + k) % 2 == 0 {
            tensor[[k, k, 23]] = 1.0;
            rings += 1.0;
        }
    }
    tensor[[0, 1, 32]] = 1.0;
    tensor[[1, 0, 32]] = 1.0;
    Molecule::new(format!("mol{}", i), tensor, vec![rings])
}

fn write_fixture(dir: &Path) -> AblationSettings {
    let molecules: Vec<Molecule> = (0..6).map(molecule).collect();
    let data_fpath = dir.join("data.json");
    write_molecules(&data_fpath, &molecules).unwrap();

    let cfg = dir.join("settings.cfg");
    fs::write(
        &cfg,
        format!(
            "[IO]\nmodel_fpath = {}\nuse_existing_weights = true\n\n\
             [DATA]\ndata_fpath = {}\nmolecular_attributes = true\nshuffle_seed = 3\n\
             training_ratio = 0.5\n",
            dir.join("model").display(),
            data_fpath.display()
        ),
    )
    .unwrap();
    AblationSettings::resolve(&read_config(&cfg).unwrap()).unwrap()
}

#[test]
fn test_runs_every_condition_on_fresh_full_data() {
    env_logger::try_init().ok();
    let dir = TempDir::new().unwrap();
    let settings = write_fixture(dir.path());

    let loader = Counting {
        inner: JsonDatasetLoader::new(),
        loads: Cell::new(0),
    };
    let mut driver = AblationDriver::new(loader, TrainMse::default());
    let results = driver.run(&RingCount, &settings).unwrap();

    assert_eq!(results.len(), CONDITIONS.len());
    assert_eq!(driver.loader().loads.get(), 18);

    let labels: Vec<String> = CONDITIONS.iter().map(|c| c.label()).collect();
    assert_eq!(driver.evaluator().labels, labels);
    // training_ratio 0.5 in the file is overridden: all 6 molecules every time
    assert!(driver.evaluator().molecules.iter().all(|&n| n == 6));

    // The model reads channel 23 only, so only "reset [23]" moves the error
    let baseline = results[0].report.metrics(SplitKind::Train).unwrap().mse;
    assert!(baseline.abs() < 1e-9);
    for result in &results[1..] {
        let mse = result.report.metrics(SplitKind::Train).unwrap().mse;
        if result.label == "reset [23]" {
            assert!(mse > 0.1);
        } else {
            assert!(mse.abs() < 1e-9, "{} changed the error", result.label);
        }
    }

    let summary = AblationSummary::from_results(settings.fpath(), &results).unwrap();
    assert_eq!(summary.conditions.len(), 17);
    assert_eq!(summary.ranked()[0].label, "reset [23]");
    summary.log_table();
}

#[test]
fn test_average_matches_diagonal_mean() {
    env_logger::try_init().ok();
    let dir = TempDir::new().unwrap();
    let settings = write_fixture(dir.path());

    let mut driver = AblationDriver::new(JsonDatasetLoader::new(), TrainMse::default());
    let ring = CONDITIONS.iter().find(|c| c.channels == [23]).unwrap();
    let result = driver.run_condition(&RingCount, &settings, ring).unwrap();

    // 18 diagonal cells, 9 of them ring atoms
    assert_eq!(result.outcome.samples, 18);
    let average = result.outcome.average.unwrap();
    assert!((average[0] - 0.5).abs() < 1e-6);
    assert_eq!(result.outcome.cells_reset, 9);

    // Bond channels: averaged from zero diagonals, both bond cells per molecule reset
    let bonds = CONDITIONS.iter().find(|c| c.channels.first() == Some(&32)).unwrap();
    let result = driver.run_condition(&RingCount, &settings, bonds).unwrap();
    assert_eq!(result.outcome.average.unwrap(), Array1::<f32>::zeros(4));
    assert_eq!(result.outcome.cells_reset, 12);
}
