//! Access policy - the single authorization entry point
//!
//! Every operation calls `authorize` before touching entity state, and the
//! broadcast hub applies the same `ViewActivity` rule before delivering a
//! ledger entry to a live session. The policy is a pure decision function
//! over an immutable resource snapshot; it owns no state.
//!
//! The policy decides role and ownership. Entity-state preconditions (an
//! already-assigned project, a task that is not reviewable) are the services'
//! concern and surface as `Conflict`, which is why ADMIN can bypass ownership
//! here but never skips a state check.

use std::fmt::{self, Display};

use crate::domain::{
    entity::{Project, Task},
    error::MarketError,
    identity::{Actor, Role}
};

/// Named permission checked before a mutation or a feed delivery proceeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    CreateProject,
    /// Owner-scoped project management: updates, cancellation, request lists
    ManageProject,
    RequestProject,
    AcceptRequest,
    CreateTask,
    SubmitTask,
    ReviewTask,
    ViewActivity
}

impl Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let capability = match self {
            Capability::CreateProject => "CREATE_PROJECT",
            Capability::ManageProject => "MANAGE_PROJECT",
            Capability::RequestProject => "REQUEST_PROJECT",
            Capability::AcceptRequest => "ACCEPT_REQUEST",
            Capability::CreateTask => "CREATE_TASK",
            Capability::SubmitTask => "SUBMIT_TASK",
            Capability::ReviewTask => "REVIEW_TASK",
            Capability::ViewActivity => "VIEW_ACTIVITY"
        };
        write!(f, "{}", capability)
    }
}

/// Immutable view of the resource an operation targets
///
/// `CreateProject` needs no resource at all; task-scoped capabilities carry
/// the task alongside its project.
#[derive(Debug, Clone, Copy, Default)]
pub struct Snapshot<'a> {
    pub project: Option<&'a Project>,
    pub task:    Option<&'a Task>
}

impl<'a> Snapshot<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn project(project: &'a Project) -> Self {
        Self { project: Some(project), task: None }
    }

    pub fn task(project: &'a Project, task: &'a Task) -> Self {
        Self { project: Some(project), task: Some(task) }
    }
}

/// The minimal per-project access facts needed to evaluate `ViewActivity`
///
/// Captured inside the originating transaction and carried along with each
/// published ledger entry so feed filtering never re-reads the store.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProjectAccess {
    pub buyer_id:           String,
    pub assigned_solver_id: Option<String>
}

impl ProjectAccess {
    pub fn of(project: &Project) -> Self {
        Self { buyer_id: project.buyer_id.clone(), assigned_solver_id: project.assigned_solver_id.clone() }
    }

    /// The `ViewActivity` ownership rule: buyer, assigned solver, or admin
    pub fn grants_view(&self, actor: &Actor) -> bool {
        actor.role == Role::Admin
            || self.buyer_id == actor.id
            || self.assigned_solver_id.as_deref() == Some(actor.id.as_str())
    }
}

/// Authorize `actor` to exercise `capability` against `snapshot`
///
/// Denial is always an explicit `Forbidden` naming the failed capability,
/// never a silent no-op.
pub fn authorize(actor: &Actor, capability: Capability, snapshot: Snapshot<'_>) -> Result<(), MarketError> {
    let allowed = match capability {
        Capability::CreateProject => actor.role == Role::Buyer,
        Capability::ManageProject => {
            actor.role == Role::Admin || snapshot.project.is_some_and(|p| p.buyer_id == actor.id)
        }
        Capability::RequestProject => actor.role == Role::Solver,
        Capability::AcceptRequest => {
            actor.role == Role::Admin || snapshot.project.is_some_and(|p| p.buyer_id == actor.id)
        }
        Capability::CreateTask => {
            actor.role == Role::Admin || snapshot.project.is_some_and(|p| p.is_assigned_to(&actor.id))
        }
        Capability::SubmitTask => actor.role == Role::Admin || snapshot.task.is_some_and(|t| t.solver_id == actor.id),
        Capability::ReviewTask => {
            actor.role == Role::Admin || snapshot.project.is_some_and(|p| p.buyer_id == actor.id)
        }
        Capability::ViewActivity => snapshot.project.is_some_and(|p| ProjectAccess::of(p).grants_view(actor))
    };

    if allowed {
        Ok(())
    } else {
        Err(MarketError::Forbidden(format!("{} denied for actor {}", capability, actor.id)))
    }
}
