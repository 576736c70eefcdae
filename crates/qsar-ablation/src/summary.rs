//! Performance change of every condition relative to the baseline.

use crate::driver::ConditionResult;
use qsar_core::{append_suffix, QsarError, RegressionMetrics, Result, SplitKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of the summary document written next to the model stem.
pub const SUMMARY_SUFFIX: &str = ".ablation_summary.json";

/// Metrics of one ablated condition and their change against baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDelta {
    pub label: String,
    pub group: String,
    pub channels: Vec<usize>,
    pub metrics: RegressionMetrics,
    pub delta_mse: f64,
    pub delta_rmse: f64,
    pub delta_mae: f64,
    /// `None` if either side has no R²
    pub delta_r2: Option<f64>,
}

/// Summary document for one ablation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AblationSummary {
    pub generated_at: String,
    pub model_fpath: PathBuf,
    /// Split the deltas are computed on
    pub reference_split: SplitKind,
    pub baseline: RegressionMetrics,
    pub conditions: Vec<ConditionDelta>,
}

impl AblationSummary {
    /// Compares every non-baseline result against the baseline result.
    ///
    /// ## Errors
    /// `Evaluation` if there is no baseline, the baseline scored no split, or
    /// a condition lacks metrics on the reference split.
    pub fn from_results(model_fpath: &Path, results: &[ConditionResult]) -> Result<Self> {
        let baseline = results
            .iter()
            .find(|r| r.condition.is_baseline())
            .ok_or_else(|| QsarError::evaluation("no baseline condition was evaluated"))?;
        let (reference_split, baseline_metrics) = baseline
            .report
            .reference()
            .map(|(kind, m)| (kind, *m))
            .ok_or_else(|| QsarError::evaluation("baseline produced no metrics"))?;

        let conditions = results
            .iter()
            .filter(|r| !r.condition.is_baseline())
            .map(|r| {
                let metrics = *r.report.metrics(reference_split).ok_or_else(|| {
                    QsarError::evaluation(format!("{}: no {} metrics", r.label, reference_split))
                })?;
                Ok(ConditionDelta {
                    label: r.label.clone(),
                    group: r.condition.name.to_string(),
                    channels: r.condition.channels.to_vec(),
                    metrics,
                    delta_mse: metrics.mse - baseline_metrics.mse,
                    delta_rmse: metrics.rmse - baseline_metrics.rmse,
                    delta_mae: metrics.mae - baseline_metrics.mae,
                    delta_r2: metrics.r2.zip(baseline_metrics.r2).map(|(a, b)| a - b),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            model_fpath: model_fpath.to_path_buf(),
            reference_split,
            baseline: baseline_metrics,
            conditions,
        })
    }

    /// `<model_fpath>.ablation_summary.json`
    pub fn default_path(model_fpath: &Path) -> PathBuf {
        append_suffix(model_fpath, SUMMARY_SUFFIX)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Ablation summary written to {}", path.display());
        Ok(())
    }

    /// Conditions ordered by RMSE increase, largest first.
    pub fn ranked(&self) -> Vec<&ConditionDelta> {
        let mut ranked: Vec<&ConditionDelta> = self.conditions.iter().collect();
        ranked.sort_by(|a, b| b.delta_rmse.total_cmp(&a.delta_rmse));
        ranked
    }

    /// Logs the delta table in condition order.
    pub fn log_table(&self) {
        log::info!("=== Ablation Summary ===");
        log::info!(
            "Ablation vs baseline ({}): mse={:.4} rmse={:.4} mae={:.4}",
            self.reference_split,
            self.baseline.mse,
            self.baseline.rmse,
            self.baseline.mae
        );
        log::info!("{:<28} {:>10} {:>10} {:>10} {:>10}", "condition", "ΔMSE", "ΔRMSE", "ΔMAE", "ΔR²");
        for c in &self.conditions {
            log::info!(
                "{:<28} {:>+10.4} {:>+10.4} {:>+10.4} {:>10}",
                c.label,
                c.delta_mse,
                c.delta_rmse,
                c.delta_mae,
                c.delta_r2.map_or_else(|| "n/a".to_string(), |d| format!("{:+.4}", d))
            );
        }
        if let Some(top) = self.ranked().first() {
            log::info!("Largest RMSE increase: {} ({})", top.label, top.group);
        }
        log::info!("═══════════════════════════════════════════════════════════");
    }
}
