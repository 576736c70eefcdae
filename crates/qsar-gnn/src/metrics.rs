//! Regression metrics over flattened output components.

use qsar_core::{QsarError, RegressionMetrics, Result};

/// Computes MSE / RMSE / MAE / R² over `(target, prediction)` pairs.
///
/// `count` is the number of molecules behind the pairs; multi-output models
/// contribute one pair per output component. R² is `None` when the targets
/// have zero variance.
pub fn regression_metrics(count: usize, pairs: &[(f64, f64)]) -> Result<RegressionMetrics> {
    if pairs.is_empty() {
        return Err(QsarError::evaluation("no predictions to score"));
    }

    let n = pairs.len() as f64;
    let mut squared = 0.0;
    let mut absolute = 0.0;
    for &(target, prediction) in pairs {
        let residual = target - prediction;
        squared += residual * residual;
        absolute += residual.abs();
    }

    let mean_target = pairs.iter().map(|&(t, _)| t).sum::<f64>() / n;
    let total: f64 = pairs.iter().map(|&(t, _)| (t - mean_target).powi(2)).sum();

    let mse = squared / n;
    Ok(RegressionMetrics {
        count,
        mse,
        rmse: mse.sqrt(),
        mae: absolute / n,
        r2: (total > 0.0).then(|| 1.0 - squared / total),
    })
}
