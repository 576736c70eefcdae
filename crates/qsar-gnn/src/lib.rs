//! # qsar-gnn
//!
//! Shipped model-side collaborators for feature ablation:
//!
//! - [`GraphConvModel`] / [`GraphConvBuilder`]: neural-fingerprint graph
//!   convolution over `(atom, atom, channel)` tensors, inference only
//! - [`weights`]: JSON weight files, with HDF5 payloads refused
//! - [`RegressionEvaluator`]: per-split regression metrics, JSONL record log
//!   and CSV predictions

pub mod evaluate;
pub mod metrics;
pub mod model;
pub mod weights;

pub use evaluate::{label_slug, predictions_path, record_path, RegressionEvaluator};
pub use metrics::regression_metrics;
pub use model::{Dense, GraphConvBuilder, GraphConvLayers, GraphConvModel};
pub use weights::{load_weights, save_weights, JsonWeightLoader, WeightsFile};
