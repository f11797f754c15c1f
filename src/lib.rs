//! # Marketplace Workflow Core
//!
//! A library coordinating the multi-party freelance marketplace workflow:
//! buyers post projects, solvers request and are assigned to them, solvers
//! decompose assigned work into tasks and submit deliverables, and buyers
//! review them.
//!
//! This crate provides:
//! - The workflow state machine governing the Project, WorkRequest, Task and
//!   Submission lifecycles, with every multi-entity transition applied as one
//!   atomic batch under a project-scoped lock
//! - An append-only activity ledger that is both the audit trail and the
//!   source of the live feed
//! - A single access-policy entry point authorizing both mutations and feed
//!   delivery
//! - A broadcast hub fanning committed ledger entries out to live subscriber
//!   sessions, filtered by role and project ownership
//!
//! Transport framing, credential verification, blob storage internals and
//! notification delivery are presentation/infrastructure concerns behind the
//! ports in [`port`].

// Public API modules
pub mod adapter;
pub mod broadcast;
pub mod config;
pub mod container;
pub mod domain;
pub mod port;
pub mod service;

// Re-export commonly used types
pub use broadcast::{EventBroadcaster, SubscriberSession};
pub use config::Settings;
pub use container::Container;
pub use domain::{
    Actor, ActivityAction, ActivityEntry, Capability, CreateProjectInput, CreateTaskInput, MarketError, Page,
    Paged, Project, ProjectAccess, ProjectStatus, RequestStatus, RequestWorkInput, ReviewDecision,
    ReviewTaskInput, Role, Submission, SubmissionStatus, SubmitTaskInput, Task, TaskStatus, UpdateProjectInput,
    WorkRequest
};
pub use service::{ActivityService, ProjectLifecycle, ProjectService, TaskService, WorkRequestService};
