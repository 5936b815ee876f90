//! Canned "AI" suggestions shown beside each step.

use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use super::progress::{run_plan, ProgressPlan, SimContext, SimError};
use crate::wizard::steps::StepId;

pub const ANALYSIS_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Tip,
    Warning,
    Optimization,
    Insight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: u32,
    pub kind: SuggestionKind,
    pub title: String,
    pub description: String,
    pub confidence: u8,
    pub impact: Impact,
    pub category: String,
    pub action: Option<String>,
}

impl Suggestion {
    pub fn actionable(&self) -> bool {
        self.action.is_some()
    }
}

type Row = (u32, SuggestionKind, &'static str, &'static str, u8, Impact, &'static str, Option<&'static str>);

fn rows(step: StepId) -> [Row; 2] {
    use Impact::*;
    use SuggestionKind::*;
    match step {
        StepId::Upload => [
            (1, Tip, "Dataset Quality Assessment",
             "Your heart disease dataset shows excellent quality with no missing values. Consider feature engineering for better model performance.",
             95, High, "Data Quality", Some("Run feature engineering analysis")),
            (2, Optimization, "Data Augmentation Opportunity",
             "With 1,025 samples, your dataset is well-sized. Consider SMOTE for class balancing if needed.",
             88, Medium, "Data Enhancement", Some("Apply SMOTE balancing")),
        ],
        StepId::Preprocessing => [
            (3, Insight, "Optimal Preprocessing Strategy",
             "Based on your dataset characteristics, standard scaling is recommended for numerical features. One-hot encoding works well for categorical variables.",
             92, High, "Preprocessing", None),
            (4, Warning, "Outlier Detection",
             "Some features like \"chol\" and \"trestbps\" may have outliers. Consider robust scaling methods.",
             85, Medium, "Data Quality", Some("Review outlier handling")),
        ],
        StepId::FeatureSelection => [
            (5, Optimization, "Feature Importance Analysis",
             "Based on domain knowledge, \"thalach\" and \"oldpeak\" are likely the most predictive features for heart disease.",
             90, High, "Feature Engineering", Some("Prioritize these features")),
            (6, Tip, "Feature Interaction",
             "Consider creating interaction features between age and other variables for better model performance.",
             78, Medium, "Feature Engineering", Some("Create interaction features")),
        ],
        StepId::Training => [
            (7, Insight, "Model Selection Strategy",
             "For heart disease classification, ensemble methods like LightGBM and XGBoost typically perform best. Consider stacking for optimal results.",
             94, High, "Model Selection", None),
            (8, Optimization, "Cross-Validation Setup",
             "Use stratified 5-fold CV to ensure balanced representation of both classes in each fold.",
             89, High, "Model Validation", Some("Configure stratified CV")),
        ],
        StepId::Tuning => [
            (9, Optimization, "Hyperparameter Search Strategy",
             "Bayesian optimization is ideal for this dataset size. Focus on learning_rate, max_depth, and n_estimators for tree-based models.",
             91, High, "Hyperparameter Tuning", Some("Optimize key parameters")),
            (10, Tip, "Early Stopping",
             "Implement early stopping to prevent overfitting and reduce training time.",
             87, Medium, "Training Optimization", Some("Enable early stopping")),
        ],
        StepId::Results => [
            (11, Insight, "Performance Analysis",
             "Your 99.12% accuracy is excellent! The model shows strong generalization with consistent precision and recall.",
             96, High, "Model Performance", None),
            (12, Optimization, "Model Deployment Strategy",
             "Consider A/B testing with different model versions in production. Monitor for data drift over time.",
             88, High, "Deployment", Some("Plan deployment strategy")),
        ],
        StepId::Monitoring => [
            (13, Tip, "Monitoring Setup",
             "Set up automated monitoring for model performance, data drift, and prediction confidence scores.",
             93, High, "Monitoring", Some("Configure monitoring alerts")),
            (14, Warning, "Model Retraining",
             "Plan for regular model retraining every 3-6 months to maintain performance as new data becomes available.",
             85, Medium, "Model Maintenance", Some("Schedule retraining")),
        ],
    }
}

pub fn suggestions_for(step: StepId) -> Vec<Suggestion> {
    rows(step)
        .into_iter()
        .map(|(id, kind, title, description, confidence, impact, category, action)| Suggestion {
            id,
            kind,
            title: title.to_string(),
            description: description.to_string(),
            confidence,
            impact,
            category: category.to_string(),
            action: action.map(str::to_string),
        })
        .collect()
}

/// Pretend to analyse the step, then return its suggestions.
pub async fn analyze(step: StepId, ctx: &SimContext) -> Result<Vec<Suggestion>, SimError> {
    let plan = ProgressPlan::Delay { duration: ANALYSIS_DELAY };
    run_plan(&plan, "suggestions", ctx, &mut ctx.rng(3)).await?;
    Ok(suggestions_for(step))
}
