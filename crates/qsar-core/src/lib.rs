//! # qsar-core
//!
//! Core types, settings and traits for feature ablation of pretrained
//! molecular graph-convolution models.
//!
//! - **Config**: sectioned `key = value` settings files ([`cfg`]) resolved
//!   into typed [`AblationSettings`]
//! - **Types**: molecule tensors, dataset splits, evaluation reports
//! - **Traits**: `Model`, `ModelBuilder`, `WeightLoader`, `DatasetLoader`,
//!   `Evaluator`, the seams between the ablation driver and its collaborators
//! - **Errors**: unified [`QsarError`]
//!
//! ## Architecture
//! ```text
//! ┌───────────────┐
//! │  qsar-core    │  ← types / traits / settings
//! └───────────────┘
//!     ▲       ▲
//! ┌───┴────┐ ┌┴─────────┐
//! │qsar-io │ │ qsar-gnn │   loader / model, weights, evaluator
//! └───┬────┘ └┬─────────┘
//!     └──┬────┘
//! ┌──────▼────────┐
//! │ qsar-ablation │  ← averaging + masking driver
//! └──────┬────────┘
//!   ┌────▼─────┐
//!   │ qsar-cli │
//!   └──────────┘
//! ```

pub mod cfg;
pub mod errors;
pub mod settings;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use cfg::{read_config, ConfigFile};
pub use errors::{QsarError, Result};
pub use settings::{
    append_suffix, default_weights_path, AblationSettings, ArchitectureSettings, CvFolds,
    DataSettings, IoSettings, TrainingSettings,
};
pub use traits::{DatasetLoader, Evaluator, Model, ModelBuilder, WeightLoader};
pub use types::{
    DataSplit, Dataset, EvaluationReport, Molecule, MoleculeTensor, RegressionMetrics, SplitKind,
    ATTRIBUTE_VECTOR_SIZE,
};
