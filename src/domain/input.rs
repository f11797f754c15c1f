//! Typed operation payloads
//!
//! One explicit input type per mutating operation. Field-level validation
//! runs before any entity is read, so malformed input never reaches the
//! business logic and a `Validation` error can never follow a state check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{entity::SubmissionStatus, error::MarketError};

const TITLE_MIN: usize = 4;
const TITLE_MAX: usize = 120;
const DESCRIPTION_MIN: usize = 30;
const DESCRIPTION_MAX: usize = 5000;
const SKILL_MIN: usize = 2;
const SKILL_MAX: usize = 30;
const SKILLS_MAX: usize = 20;

fn check_title(title: &str) -> Result<(), MarketError> {
    if title.chars().count() < TITLE_MIN {
        return Err(MarketError::Validation(format!("Title must be at least {} characters", TITLE_MIN)));
    }
    if title.chars().count() > TITLE_MAX {
        return Err(MarketError::Validation(format!("Title must be at most {} characters", TITLE_MAX)));
    }
    Ok(())
}

fn check_description(description: &str) -> Result<(), MarketError> {
    if description.chars().count() < DESCRIPTION_MIN {
        return Err(MarketError::Validation(format!("Description must be at least {} characters", DESCRIPTION_MIN)));
    }
    if description.chars().count() > DESCRIPTION_MAX {
        return Err(MarketError::Validation(format!("Description must be at most {} characters", DESCRIPTION_MAX)));
    }
    Ok(())
}

fn check_skills(skills: &[String]) -> Result<(), MarketError> {
    if skills.is_empty() {
        return Err(MarketError::Validation("At least one skill is required".to_string()));
    }
    if skills.len() > SKILLS_MAX {
        return Err(MarketError::Validation(format!("At most {} skills are allowed", SKILLS_MAX)));
    }
    for skill in skills {
        if skill.chars().count() < SKILL_MIN || skill.chars().count() > SKILL_MAX {
            return Err(MarketError::Validation(format!(
                "Skill must be between {} and {} characters",
                SKILL_MIN, SKILL_MAX
            )));
        }
    }
    Ok(())
}

fn check_id(id: &str, name: &str) -> Result<(), MarketError> {
    if id.trim().is_empty() {
        return Err(MarketError::Validation(format!("{} is required", name)));
    }
    Ok(())
}

/// Payload for `ProjectService::create_project`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub title:           String,
    pub description:     String,
    pub skills_required: Vec<String>,
    pub budget:          Option<u64>,
    pub deadline:        Option<DateTime<Utc>>
}

impl CreateProjectInput {
    pub fn validate(&self) -> Result<(), MarketError> {
        check_title(&self.title)?;
        check_description(&self.description)?;
        check_skills(&self.skills_required)?;
        Ok(())
    }
}

/// Payload for `ProjectService::update_project`
///
/// All fields optional; `title`, `skills_required` and `budget` are core
/// fields frozen once the project leaves OPEN.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectInput {
    pub title:           Option<String>,
    pub description:     Option<String>,
    pub skills_required: Option<Vec<String>>,
    pub budget:          Option<u64>,
    pub deadline:        Option<DateTime<Utc>>
}

impl UpdateProjectInput {
    pub fn validate(&self) -> Result<(), MarketError> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(description) = &self.description {
            check_description(description)?;
        }
        if let Some(skills) = &self.skills_required {
            check_skills(skills)?;
        }
        Ok(())
    }

    /// Whether the payload touches a field frozen outside OPEN
    pub fn touches_core_fields(&self) -> bool {
        self.title.is_some() || self.skills_required.is_some() || self.budget.is_some()
    }
}

/// Payload for `WorkRequestService::request_work`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestWorkInput {
    pub project_id: String,
    pub proposal:   Option<String>
}

impl RequestWorkInput {
    pub fn validate(&self) -> Result<(), MarketError> {
        check_id(&self.project_id, "Project ID")
    }
}

/// Payload for `TaskService::create_task`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub project_id:  String,
    pub title:       String,
    pub description: String,
    pub deadline:    Option<DateTime<Utc>>
}

impl CreateTaskInput {
    pub fn validate(&self) -> Result<(), MarketError> {
        check_id(&self.project_id, "Project ID")?;
        if self.title.trim().is_empty() {
            return Err(MarketError::Validation("Title is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(MarketError::Validation("Description is required".to_string()));
        }
        Ok(())
    }
}

/// Payload for `TaskService::submit_task`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTaskInput {
    pub task_id:       String,
    /// Durable reference produced by blob storage
    pub artifact_ref:  String,
    pub artifact_name: Option<String>
}

impl SubmitTaskInput {
    pub fn validate(&self) -> Result<(), MarketError> {
        check_id(&self.task_id, "Task ID")?;
        check_id(&self.artifact_ref, "Artifact reference")?;
        Ok(())
    }
}

/// Review verdict for the latest submission of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewDecision {
    #[serde(rename = "ACCEPTED")]
    Accepted,
    #[serde(rename = "REJECTED")]
    Rejected
}

impl ReviewDecision {
    pub fn submission_status(&self) -> SubmissionStatus {
        match self {
            ReviewDecision::Accepted => SubmissionStatus::Accepted,
            ReviewDecision::Rejected => SubmissionStatus::Rejected
        }
    }
}

/// Payload for `TaskService::review_task`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewTaskInput {
    pub task_id:  String,
    pub decision: ReviewDecision,
    pub comments: Option<String>
}

impl ReviewTaskInput {
    pub fn validate(&self) -> Result<(), MarketError> {
        check_id(&self.task_id, "Task ID")?;
        if self.decision == ReviewDecision::Rejected
            && self.comments.as_deref().map(str::trim).unwrap_or("").is_empty()
        {
            return Err(MarketError::Validation(
                "Review comments are required when rejecting a submission".to_string()
            ));
        }
        Ok(())
    }
}

/// Bounded page request for list queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    pub page:  usize,
    pub limit: usize
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl Page {
    /// Clamp to sane bounds and compute the skip offset
    pub fn normalized(&self, max_limit: usize) -> (usize, usize) {
        let page = self.page.max(1);
        let limit = self.limit.clamp(1, max_limit);
        ((page - 1) * limit, limit)
    }
}

/// Page metadata echoed back with list results
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageMeta {
    pub page:  usize,
    pub limit: usize,
    pub total: usize
}

/// A page of results plus its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paged<T> {
    pub meta: PageMeta,
    pub data: Vec<T>
}
