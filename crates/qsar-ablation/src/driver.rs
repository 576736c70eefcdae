//! Runs every ablation condition against one loaded model.

use crate::conditions::{FeatureCondition, CONDITIONS};
use crate::mask::{ablate, AblationOutcome};
use qsar_core::{AblationSettings, DatasetLoader, EvaluationReport, Evaluator, Model, Result};

/// Everything recorded for one evaluated condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionResult {
    pub condition: FeatureCondition,
    pub label: String,
    pub outcome: AblationOutcome,
    pub report: EvaluationReport,
}

/// Loops the condition list: reload, average, mask, evaluate.
///
/// Each condition starts from a freshly loaded dataset, so perturbations
/// never carry over between conditions.
pub struct AblationDriver<L, E> {
    loader: L,
    evaluator: E,
    conditions: Vec<FeatureCondition>,
}

impl<L: DatasetLoader, E: Evaluator> AblationDriver<L, E> {
    /// Driver over the standard 18 conditions.
    pub fn new(loader: L, evaluator: E) -> Self {
        Self {
            loader,
            evaluator,
            conditions: CONDITIONS.to_vec(),
        }
    }

    pub fn with_conditions(mut self, conditions: Vec<FeatureCondition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn conditions(&self) -> &[FeatureCondition] {
        &self.conditions
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Evaluates every condition in order; the first error aborts the run.
    pub fn run<M: Model + ?Sized>(
        &mut self,
        model: &M,
        settings: &AblationSettings,
    ) -> Result<Vec<ConditionResult>> {
        let conditions = self.conditions.clone();
        let mut results = Vec::with_capacity(conditions.len());

        for (i, condition) in conditions.iter().enumerate() {
            log::debug!("Condition {}/{}: {}", i + 1, conditions.len(), condition);
            results.push(self.run_condition(model, settings, condition)?);
        }

        log::info!("Completed {} ablation conditions", results.len());
        Ok(results)
    }

    /// Reloads the full dataset, masks `condition` and evaluates it.
    pub fn run_condition<M: Model + ?Sized>(
        &mut self,
        model: &M,
        settings: &AblationSettings,
        condition: &FeatureCondition,
    ) -> Result<ConditionResult> {
        log::info!("REMOVING: {:?}", condition.channels);

        let mut data = self.loader.load(&settings.data.full_dataset())?;
        let outcome = ablate(&mut data, condition.channels)?;

        match &outcome.average {
            Some(average) => log::info!("Average: {}", average),
            None => log::info!("Average: none"),
        }
        log::info!(
            "Reset {} cells ({} diagonal samples averaged)",
            outcome.cells_reset,
            outcome.samples
        );

        let label = condition.label();
        let report = self.evaluator.evaluate(
            model,
            &data,
            settings.fpath(),
            &label,
            settings.batch_size(),
        )?;

        Ok(ConditionResult {
            condition: *condition,
            label,
            outcome,
            report,
        })
    }
}
