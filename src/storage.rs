use std::collections::HashMap;

use anyhow::{anyhow, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::project::{ProblemType, Project, ProjectDraft};

/// Project CRUD. The only piece of the placeholder backend given a local home.
pub trait ProjectStore: Send {
    fn create(&mut self, draft: &ProjectDraft) -> Result<Project>;
    fn get(&self, id: &str) -> Result<Option<Project>>;
    /// Ordered by creation time, oldest first.
    fn list(&self) -> Result<Vec<Project>>;
    fn update(&mut self, id: &str, draft: &ProjectDraft) -> Result<Project>;
    /// Returns false when no project had that id.
    fn delete(&mut self, id: &str) -> Result<bool>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Sqlite(String),
}

impl StoreKind {
    pub fn from_path(path: Option<&str>) -> Self {
        match path {
            Some(p) if !p.trim().is_empty() => StoreKind::Sqlite(p.to_string()),
            _ => StoreKind::Memory,
        }
    }

    pub fn build(self) -> Result<Box<dyn ProjectStore>> {
        match self {
            StoreKind::Memory => Ok(Box::new(MemoryProjectStore::new())),
            StoreKind::Sqlite(path) => {
                let mut store = SqliteProjectStore::new(&path)?;
                store.init()?;
                Ok(Box::new(store))
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: HashMap<String, Project>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectStore for MemoryProjectStore {
    fn create(&mut self, draft: &ProjectDraft) -> Result<Project> {
        let project = Project::from_draft(draft)?;
        self.projects.insert(project.id.clone(), project.clone());
        Ok(project)
    }

    fn get(&self, id: &str) -> Result<Option<Project>> {
        Ok(self.projects.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Project>> {
        let mut out: Vec<Project> = self.projects.values().cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    fn update(&mut self, id: &str, draft: &ProjectDraft) -> Result<Project> {
        let project = self
            .projects
            .get_mut(id)
            .ok_or_else(|| anyhow!("project {} not found", id))?;
        project.apply(draft)?;
        Ok(project.clone())
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        Ok(self.projects.remove(id).is_some())
    }
}

pub struct SqliteProjectStore {
    conn: Connection,
}

impl SqliteProjectStore {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self { conn: Connection::open(path)? })
    }

    pub fn in_memory() -> Result<Self> {
        let mut store = Self { conn: Connection::open_in_memory()? };
        store.init()?;
        Ok(store)
    }

    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                problem_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }

    fn insert(&mut self, project: &Project) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO projects (id, name, description, problem_type, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.id,
                project.name,
                project.description,
                project.problem_type.as_str(),
                fmt_ts(&project.created_at),
                fmt_ts(&project.updated_at),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}

// Fixed-width so lexical order matches time order.
fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

struct RawProject {
    id: String,
    name: String,
    description: String,
    problem_type: String,
    created_at: String,
    updated_at: String,
}

impl RawProject {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            problem_type: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_project(self) -> Result<Project> {
        let problem_type = ProblemType::parse(&self.problem_type)
            .ok_or_else(|| anyhow!("unknown problem type {:?}", self.problem_type))?;
        Ok(Project {
            id: self.id,
            name: self.name,
            description: self.description,
            problem_type,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, name, description, problem_type, created_at, updated_at FROM projects";

impl ProjectStore for SqliteProjectStore {
    fn create(&mut self, draft: &ProjectDraft) -> Result<Project> {
        let project = Project::from_draft(draft)?;
        self.insert(&project)?;
        Ok(project)
    }

    fn get(&self, id: &str) -> Result<Option<Project>> {
        let raw = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                RawProject::from_row,
            )
            .optional()?;
        raw.map(RawProject::into_project).transpose()
    }

    fn list(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY created_at ASC, id ASC", SELECT_COLUMNS))?;
        let rows = stmt.query_map([], RawProject::from_row)?;
        let mut out = Vec::new();
        for raw in rows {
            out.push(raw?.into_project()?);
        }
        Ok(out)
    }

    fn update(&mut self, id: &str, draft: &ProjectDraft) -> Result<Project> {
        let mut project = self
            .get(id)?
            .ok_or_else(|| anyhow!("project {} not found", id))?;
        project.apply(draft)?;
        self.conn.execute(
            "UPDATE projects SET name = ?2, description = ?3, problem_type = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                project.id,
                project.name,
                project.description,
                project.problem_type.as_str(),
                fmt_ts(&project.updated_at),
            ],
        )?;
        Ok(project)
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        let n = self.conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &mut dyn ProjectStore) {
        let a = store
            .create(&ProjectDraft::new("Heart Disease Prediction", ProblemType::Classification))
            .unwrap();
        let b = store
            .create(&ProjectDraft::new("House Prices", ProblemType::Regression))
            .unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(store.get(&a.id).unwrap().unwrap().name, "Heart Disease Prediction");

        let updated = store
            .update(&b.id, &ProjectDraft::new("Segments", ProblemType::Clustering))
            .unwrap();
        assert_eq!(updated.problem_type, ProblemType::Clustering);
        assert_eq!(updated.created_at, b.created_at);
        assert_eq!(store.get(&b.id).unwrap().unwrap().name, "Segments");

        assert!(store.delete(&a.id).unwrap());
        assert!(!store.delete(&a.id).unwrap());
        assert!(store.get(&a.id).unwrap().is_none());
        assert!(store.update("missing", &ProjectDraft::new("x", ProblemType::Regression)).is_err());
        assert!(store.create(&ProjectDraft::new("", ProblemType::Regression)).is_err());
    }

    #[test]
    fn test_memory_store_crud() {
        exercise(&mut MemoryProjectStore::new());
    }

    #[test]
    fn test_sqlite_store_crud() {
        exercise(&mut SqliteProjectStore::in_memory().unwrap());
    }

    #[test]
    fn test_store_kind_from_path() {
        assert_eq!(StoreKind::from_path(None), StoreKind::Memory);
        assert_eq!(StoreKind::from_path(Some(" ")), StoreKind::Memory);
        assert_eq!(
            StoreKind::from_path(Some("./projects.sqlite")),
            StoreKind::Sqlite("./projects.sqlite".to_string())
        );
    }
}
