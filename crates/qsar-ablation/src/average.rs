//! Incremental vector mean.

use ndarray::{Array1, ArrayView1};
use qsar_core::{QsarError, Result};

/// Running mean over equally weighted vector samples.
///
/// The first sample is assigned; each later one is folded in as
/// `mean = (mean * n + sample) / (n + 1)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningAverage {
    mean: Option<Array1<f32>>,
    count: usize,
}

impl RunningAverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one sample into the mean.
    ///
    /// ## Errors
    /// `ShapeMismatch` if the sample length differs from earlier samples.
    pub fn push(&mut self, sample: ArrayView1<f32>) -> Result<()> {
        let Some(mean) = self.mean.as_mut() else {
            self.mean = Some(sample.to_owned());
            self.count = 1;
            return Ok(());
        };
        if mean.len() != sample.len() {
            return Err(QsarError::shape(format!(
                "running average has length {}, sample has {}",
                mean.len(),
                sample.len()
            )));
        }
        let n = self.count as f32;
        mean.zip_mut_with(&sample, |m, &s| *m = (*m * n + s) / (n + 1.0));
        self.count += 1;
        Ok(())
    }

    /// `None` until the first sample.
    pub fn mean(&self) -> Option<&Array1<f32>> {
        self.mean.as_ref()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn into_mean(self) -> Option<Array1<f32>> {
        self.mean
    }
}
