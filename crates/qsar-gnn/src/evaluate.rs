//! Scores a dataset and persists per-condition results.
//!
//! ## Output Files
//! - `<fpath>.ablation.jsonl`: one JSON record per evaluated condition
//! - `<fpath>.<slug>.predictions.csv`: `split,id,target,prediction` rows

use crate::metrics::regression_metrics;
use ndarray::Array1;
use qsar_core::{
    append_suffix, DataSplit, Dataset, EvaluationReport, Evaluator, Model, QsarError, Result,
    SplitKind,
};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Suffix of the per-condition metrics log.
pub const RECORD_SUFFIX: &str = ".ablation.jsonl";

/// File-name-safe form of a condition label.
///
/// Runs of non-alphanumeric characters collapse to one `_`, with none at
/// either end: `"reset [32 33 34 35]"` becomes `reset_32_33_34_35`.
pub fn label_slug(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending = false;
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            if pending && !slug.is_empty() {
                slug.push('_');
            }
            pending = false;
            slug.push(c);
        } else {
            pending = true;
        }
    }
    slug
}

/// Path of the metrics log for `fpath`.
pub fn record_path(fpath: &Path) -> PathBuf {
    append_suffix(fpath, RECORD_SUFFIX)
}

/// Path of the prediction table for one condition.
pub fn predictions_path(fpath: &Path, label: &str) -> PathBuf {
    append_suffix(fpath, &format!(".{}.predictions.csv", label_slug(label)))
}

/// Regression evaluator writing JSONL metrics and CSV predictions.
#[derive(Debug, Clone)]
pub struct RegressionEvaluator {
    write_artifacts: bool,
}

impl Default for RegressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl RegressionEvaluator {
    pub fn new() -> Self {
        Self {
            write_artifacts: true,
        }
    }

    /// Scores only; nothing is written to disk.
    pub fn in_memory() -> Self {
        Self {
            write_artifacts: false,
        }
    }
}

/// One predicted molecule.
struct Scored<'a> {
    split: SplitKind,
    id: &'a str,
    target: &'a [f32],
    prediction: Array1<f32>,
}

fn predict_split<'a, M: Model + ?Sized>(
    model: &M,
    kind: SplitKind,
    split: &'a DataSplit,
    batch_size: usize,
) -> Result<Vec<Scored<'a>>> {
    let mut scored = Vec::with_capacity(split.len());

    for (b, batch) in split.molecules.chunks(batch_size.max(1)).enumerate() {
        log::trace!("{} batch {} ({} molecules)", kind, b, batch.len());
        for molecule in batch {
            let prediction = model.predict(&molecule.tensor)?;
            if prediction.len() != molecule.target.len() {
                return Err(QsarError::evaluation(format!(
                    "molecule '{}': model predicts {} outputs, target has {}",
                    molecule.id,
                    prediction.len(),
                    molecule.target.len()
                )));
            }
            scored.push(Scored {
                split: kind,
                id: &molecule.id,
                target: &molecule.target,
                prediction,
            });
        }
    }

    Ok(scored)
}

fn append_record(fpath: &Path, report: &EvaluationReport) -> Result<()> {
    let record = serde_json::json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "label": report.label,
        "splits": report.splits,
    });

    let path = record_path(fpath);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?
        .write_all(format!("{}\n", record).as_bytes())?;

    log::debug!("Metrics appended to {}", path.display());
    Ok(())
}

/// One row of the prediction table.
#[derive(Debug, Serialize)]
struct PredictionRow<'a> {
    split: SplitKind,
    id: &'a str,
    target: f32,
    prediction: f32,
}

const PREDICTION_HEADER: [&str; 4] = ["split", "id", "target", "prediction"];

fn write_predictions(path: &Path, rows: &[Scored<'_>]) -> Result<()> {
    let table_err = |e: csv::Error| {
        QsarError::evaluation(format!("prediction table {}: {}", path.display(), e))
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(table_err)?;
    writer.write_record(PREDICTION_HEADER).map_err(table_err)?;

    for row in rows {
        for (&target, &prediction) in row.target.iter().zip(row.prediction.iter()) {
            writer
                .serialize(PredictionRow {
                    split: row.split,
                    id: row.id,
                    target,
                    prediction,
                })
                .map_err(table_err)?;
        }
    }
    writer.flush()?;
    Ok(())
}

impl Evaluator for RegressionEvaluator {
    fn evaluate<M: Model + ?Sized>(
        &mut self,
        model: &M,
        data: &Dataset,
        fpath: &Path,
        label: &str,
        batch_size: usize,
    ) -> Result<EvaluationReport> {
        log::info!("...testing model");
        let mut report = EvaluationReport::new(label);
        let mut rows = Vec::new();

        for (kind, split) in data.splits() {
            if split.is_empty() {
                continue;
            }
            let scored = predict_split(model, kind, split, batch_size)?;
            let pairs: Vec<(f64, f64)> = scored
                .iter()
                .flat_map(|s| {
                    s.target
                        .iter()
                        .zip(s.prediction.iter())
                        .map(|(&t, &p)| (t as f64, p as f64))
                })
                .collect();
            let metrics = regression_metrics(split.len(), &pairs)?;

            log::info!(
                "{} [{}] n={} mse={:.4} rmse={:.4} mae={:.4} r2={}",
                label,
                kind,
                metrics.count,
                metrics.mse,
                metrics.rmse,
                metrics.mae,
                metrics.r2.map_or_else(|| "n/a".to_string(), |r| format!("{:.4}", r))
            );
            report.splits.insert(kind, metrics);
            rows.extend(scored);
        }

        if report.splits.is_empty() {
            return Err(QsarError::evaluation(format!("{}: dataset has no molecules", label)));
        }

        if self.write_artifacts {
            if let Some(parent) = fpath.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            append_record(fpath, &report)?;
            write_predictions(&predictions_path(fpath, label), &rows)?;
        }

        log::info!("...tested model");
        Ok(report)
    }
}
