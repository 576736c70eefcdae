//! Collaborator traits for the ablation pipeline.
//!
//! The driver only sees these seams; `qsar-gnn` and `qsar-io` provide the
//! shipped implementations.

use crate::errors::Result;
use crate::settings::{ArchitectureSettings, DataSettings};
use crate::types::{Dataset, EvaluationReport, MoleculeTensor};
use ndarray::Array1;
use std::path::Path;

/// A trained regression model, used read-only.
pub trait Model {
    /// Predicts the output vector for one molecule tensor.
    ///
    /// ## Errors
    /// Returns `QsarError::ShapeMismatch` if the tensor's channel axis does
    /// not match [`Model::feature_width`].
    fn predict(&self, tensor: &MoleculeTensor) -> Result<Array1<f32>>;

    /// Length of the prediction vector.
    fn output_size(&self) -> usize;

    /// Channels expected on the tensor's last axis.
    fn feature_width(&self) -> usize;
}

/// Builds an untrained model from architecture hyperparameters.
pub trait ModelBuilder {
    type Model: Model;

    fn build(&self, architecture: &ArchitectureSettings) -> Result<Self::Model>;
}

/// Restores trained parameters into a built model.
pub trait WeightLoader<M: Model> {
    fn load_weights(&self, model: &mut M, path: &Path) -> Result<()>;
}

/// Produces train/val/test splits of featurized molecules.
pub trait DatasetLoader {
    fn load(&self, options: &DataSettings) -> Result<Dataset>;
}

/// Scores a dataset against a model and persists results under `fpath`.
pub trait Evaluator {
    /// ## Parameters
    /// - `fpath`: output path stem for result artifacts
    /// - `label`: condition label (`baseline`, `reset [23]`, ...)
    /// - `batch_size`: molecules per prediction batch
    fn evaluate<M: Model + ?Sized>(
        &mut self,
        model: &M,
        data: &Dataset,
        fpath: &Path,
        label: &str,
        batch_size: usize,
    ) -> Result<EvaluationReport>;
}
