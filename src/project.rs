use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_NAME_LEN: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemType {
    Classification,
    Regression,
    Clustering,
}

impl ProblemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::Classification => "classification",
            ProblemType::Regression => "regression",
            ProblemType::Clustering => "clustering",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "classification" => Some(ProblemType::Classification),
            "regression" => Some(ProblemType::Regression),
            "clustering" => Some(ProblemType::Clustering),
            _ => None,
        }
    }
}

/// The user-facing unit of work. The simulated pipeline never writes back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub problem_type: ProblemType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields submitted by the project form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub problem_type: ProblemType,
}

impl ProjectDraft {
    pub fn new(name: &str, problem_type: ProblemType) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            problem_type,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Trimmed name and description, or an error naming the bad field.
    pub fn validated(&self) -> Result<ProjectDraft> {
        let name = self.name.trim();
        if name.is_empty() {
            bail!("project name must not be empty");
        }
        if name.chars().count() > MAX_NAME_LEN {
            bail!("project name exceeds {} characters", MAX_NAME_LEN);
        }
        Ok(ProjectDraft {
            name: name.to_string(),
            description: self.description.trim().to_string(),
            problem_type: self.problem_type,
        })
    }
}

impl Project {
    pub fn from_draft(draft: &ProjectDraft) -> Result<Self> {
        let draft = draft.validated()?;
        let now = Utc::now();
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: draft.name,
            description: draft.description,
            problem_type: draft.problem_type,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply an edited draft, keeping id and creation time.
    pub fn apply(&mut self, draft: &ProjectDraft) -> Result<()> {
        let draft = draft.validated()?;
        self.name = draft.name;
        self.description = draft.description;
        self.problem_type = draft.problem_type;
        self.updated_at = Utc::now().max(self.created_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_trims_and_accepts() {
        let draft = ProjectDraft::new("  Heart Disease Prediction ", ProblemType::Classification)
            .with_description(" uci heart ");
        let project = Project::from_draft(&draft).unwrap();
        assert_eq!(project.name, "Heart Disease Prediction");
        assert_eq!(project.description, "uci heart");
        assert_eq!(project.created_at, project.updated_at);
        assert_eq!(project.id.len(), 36);
    }

    #[test]
    fn test_draft_rejects_blank_name() {
        let draft = ProjectDraft::new("   ", ProblemType::Regression);
        assert!(Project::from_draft(&draft).is_err());
    }

    #[test]
    fn test_draft_rejects_long_name() {
        let draft = ProjectDraft::new(&"x".repeat(MAX_NAME_LEN + 1), ProblemType::Clustering);
        assert!(draft.validated().is_err());
    }

    #[test]
    fn test_problem_type_serde_lowercase() {
        let s = serde_json::to_string(&ProblemType::Clustering).unwrap();
        assert_eq!(s, "\"clustering\"");
        assert_eq!(ProblemType::parse("Regression"), Some(ProblemType::Regression));
        assert_eq!(ProblemType::parse("ranking"), None);
    }

    #[test]
    fn test_apply_keeps_identity() {
        let mut project =
            Project::from_draft(&ProjectDraft::new("a", ProblemType::Classification)).unwrap();
        let id = project.id.clone();
        project
            .apply(&ProjectDraft::new("b", ProblemType::Regression))
            .unwrap();
        assert_eq!(project.id, id);
        assert_eq!(project.name, "b");
        assert!(project.updated_at >= project.created_at);
    }
}
