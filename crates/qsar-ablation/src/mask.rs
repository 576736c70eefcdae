//! Corpus averages and channel masking over molecule tensors.
//!
//! The average for a channel subset is sampled from diagonal (atom) cells
//! only, but masking applies to every cell whose selected sub-vector is
//! non-zero, bond cells included. Diagonal samples of bond channels are
//! normally zero, so bond cells end up reset to a near-zero average.

use crate::average::RunningAverage;
use ndarray::{Array1, Axis};
use qsar_core::{Dataset, MoleculeTensor, QsarError, Result};

/// Result of ablating one channel subset over a dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AblationOutcome {
    /// Corpus average of the selected channels; `None` when nothing was sampled
    pub average: Option<Array1<f32>>,
    /// Diagonal cells folded into the average
    pub samples: usize,
    /// Cells overwritten with the average
    pub cells_reset: usize,
}

fn check_channels(tensor: &MoleculeTensor, channels: &[usize]) -> Result<()> {
    let width = tensor.len_of(Axis(2));
    match channels.iter().find(|&&c| c >= width) {
        Some(c) => Err(QsarError::shape(format!(
            "channel {} is out of range for a tensor with {} channels",
            c, width
        ))),
        None => Ok(()),
    }
}

/// Running average of `tensor[k, k, channels]` over every diagonal cell of
/// every tensor, in iteration order.
pub fn diagonal_average<'a, I>(tensors: I, channels: &[usize]) -> Result<RunningAverage>
where
    I: IntoIterator<Item = &'a MoleculeTensor>,
{
    let mut average = RunningAverage::new();
    if channels.is_empty() {
        return Ok(average);
    }

    for tensor in tensors {
        check_channels(tensor, channels)?;
        let atoms = tensor.len_of(Axis(0)).min(tensor.len_of(Axis(1)));
        for k in 0..atoms {
            let sample: Array1<f32> = channels.iter().map(|&c| tensor[[k, k, c]]).collect();
            average.push(sample.view())?;
        }
    }
    Ok(average)
}

/// Overwrites each cell's selected sub-vector with `average` unless the
/// sub-vector is entirely zero. Returns the number of cells overwritten.
pub fn reset_channels<'a, I>(tensors: I, channels: &[usize], average: &Array1<f32>) -> Result<usize>
where
    I: IntoIterator<Item = &'a mut MoleculeTensor>,
{
    if average.len() != channels.len() {
        return Err(QsarError::shape(format!(
            "average has {} values for {} channels",
            average.len(),
            channels.len()
        )));
    }

    let mut reset = 0;
    for tensor in tensors {
        check_channels(tensor, channels)?;
        for mut cell in tensor.lanes_mut(Axis(2)) {
            if channels.iter().all(|&c| cell[c] == 0.0) {
                continue;
            }
            for (&c, &value) in channels.iter().zip(average.iter()) {
                cell[c] = value;
            }
            reset += 1;
        }
    }
    Ok(reset)
}

/// Averages then masks `channels` across all three splits of `data`.
///
/// An empty channel list leaves the data untouched.
pub fn ablate(data: &mut Dataset, channels: &[usize]) -> Result<AblationOutcome> {
    if channels.is_empty() {
        return Ok(AblationOutcome::default());
    }

    let average = diagonal_average(data.mols(), channels)?;
    let samples = average.count();
    let Some(average) = average.into_mean() else {
        return Ok(AblationOutcome::default());
    };
    let cells_reset = reset_channels(data.mols_mut(), channels, &average)?;

    Ok(AblationOutcome {
        average: Some(average),
        samples,
        cells_reset,
    })
}
