//! Simulated dataset upload and the canned data-quality report.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::time::Duration;

use super::progress::{run_plan, ProgressPlan, SimContext, SimError};
use super::StepSimulator;
use crate::wizard::steps::StepId;

pub const UPLOAD_TICK: Duration = Duration::from_millis(200);
pub const UPLOAD_MAX_INCREMENT: f64 = 15.0;

pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["csv", "xls", "xlsx", "json", "parquet"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub kind: IssueKind,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub file_name: String,
    pub file_size: u64,
    pub rows: u64,
    pub columns: u32,
    pub missing_values: u64,
    pub duplicates: u64,
    pub issues: Vec<QualityIssue>,
    pub pros: Vec<String>,
    pub recommendations: Vec<String>,
    pub preview: Vec<Map<String, Value>>,
}

fn issue(kind: IssueKind, message: &str, severity: Severity) -> QualityIssue {
    QualityIssue {
        kind,
        message: message.to_string(),
        severity,
    }
}

fn preview_row(values: [f64; 14]) -> Map<String, Value> {
    const COLUMNS: [&str; 14] = [
        "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
        "slope", "ca", "thal", "target",
    ];
    COLUMNS
        .iter()
        .zip(values)
        .map(|(c, v)| {
            let v = if v.fract() == 0.0 { json!(v as i64) } else { json!(v) };
            (c.to_string(), v)
        })
        .collect()
}

impl QualityReport {
    /// The report every upload produces, whatever the file holds.
    pub fn canned(file_name: &str, file_size: u64) -> Self {
        Self {
            file_name: file_name.to_string(),
            file_size,
            rows: 1024,
            columns: 13,
            missing_values: 5,
            duplicates: 2,
            issues: vec![
                issue(IssueKind::Warning, "5 missing values in age column (0.5%)", Severity::Medium),
                issue(IssueKind::Warning, "2 duplicate rows found (0.2%)", Severity::Low),
                issue(IssueKind::Info, "Dataset contains mixed data types", Severity::Info),
            ],
            pros: vec![
                "Dataset contains 1,024 rows and 13 columns".to_string(),
                "Target column is present and well-distributed".to_string(),
                "No infinite values detected".to_string(),
                "Data types are consistent".to_string(),
                "File format is optimized for ML processing".to_string(),
            ],
            recommendations: vec![
                "Consider imputing missing values in age column".to_string(),
                "Remove duplicate rows to improve model performance".to_string(),
                "Feature scaling may be beneficial for numerical columns".to_string(),
            ],
            preview: vec![
                preview_row([63.0, 1.0, 3.0, 145.0, 233.0, 1.0, 0.0, 150.0, 0.0, 2.3, 0.0, 0.0, 1.0, 0.0]),
                preview_row([37.0, 1.0, 2.0, 130.0, 250.0, 0.0, 1.0, 187.0, 0.0, 3.5, 0.0, 0.0, 2.0, 1.0]),
                preview_row([41.0, 0.0, 1.0, 130.0, 204.0, 0.0, 0.0, 172.0, 0.0, 1.4, 2.0, 0.0, 2.0, 0.0]),
            ],
        }
    }
}

pub fn is_supported_file(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct UploadSimulator {
    pub file_name: String,
    pub file_size: u64,
}

impl UploadSimulator {
    pub fn new(file_name: &str, file_size: u64) -> Self {
        Self {
            file_name: file_name.to_string(),
            file_size,
        }
    }
}

impl Default for UploadSimulator {
    fn default() -> Self {
        Self::new("heart.csv", 38_114)
    }
}

#[async_trait]
impl StepSimulator for UploadSimulator {
    fn step(&self) -> StepId {
        StepId::Upload
    }

    async fn simulate(&self, ctx: &SimContext) -> Result<Value, SimError> {
        let plan = ProgressPlan::Jittered {
            max_increment: UPLOAD_MAX_INCREMENT,
            tick: UPLOAD_TICK,
        };
        let mut rng = ctx.rng(0);
        run_plan(&plan, &self.file_name, ctx, &mut rng).await?;
        let report = QualityReport::canned(&self.file_name, self.file_size);
        Ok(json!({
            "file": self.file_name,
            "supported": is_supported_file(&self.file_name),
            "quality_report": report,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_report_shape() {
        let r = QualityReport::canned("heart.csv", 10);
        assert_eq!((r.rows, r.columns, r.missing_values, r.duplicates), (1024, 13, 5, 2));
        assert_eq!(r.issues.len(), 3);
        assert_eq!(r.pros.len(), 5);
        assert_eq!(r.recommendations.len(), 3);
        assert_eq!(r.preview[0]["age"], 63);
        assert_eq!(r.preview[1]["oldpeak"], 3.5);
        assert_eq!(r.preview[2].len(), 14);
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_file("heart.csv"));
        assert!(is_supported_file("HEART.XLSX"));
        assert!(!is_supported_file("heart.txt"));
        assert!(!is_supported_file("heart"));
    }

    #[tokio::test]
    async fn test_upload_payload_carries_report() {
        let sim = UploadSimulator::default();
        let ctx = SimContext::new(StepId::Upload, 0.0).with_seed(Some(7));
        let payload = sim.simulate(&ctx).await.unwrap();
        assert_eq!(payload["file"], "heart.csv");
        assert_eq!(payload["quality_report"]["rows"], 1024);
        assert_eq!(payload["quality_report"]["issues"][0]["severity"], "medium");
    }
}
