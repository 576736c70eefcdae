//! # qsar-ablation
//!
//! Feature-channel ablation of a pretrained model: for each channel group,
//! replace the group's values with their corpus average and re-evaluate.
//!
//! ## Flow
//! ```text
//! for condition in CONDITIONS:
//!     data    = loader.load(full dataset)        // fresh every time
//!     average = mean of diagonal cells [channels]
//!     every non-zero cell[channels] = average
//!     evaluator.evaluate(model, data, label)
//! summary = deltas vs baseline
//! ```

pub mod average;
pub mod conditions;
pub mod driver;
pub mod mask;
pub mod summary;

pub use average::RunningAverage;
pub use conditions::{condition_label, FeatureCondition, CONDITIONS};
pub use driver::{AblationDriver, ConditionResult};
pub use mask::{ablate, diagonal_average, reset_channels, AblationOutcome};
pub use summary::{AblationSummary, ConditionDelta};
