//! HR approval requests: leave, expenses, reviews and the other actions that
//! need sign-off before they take effect.

mod desk;

use chrono::{DateTime, Utc};
use platform_authz::{ActionType, Denial, Role};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use desk::ApprovalDesk;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HrError {
    #[error("approval request {0} not found")]
    NotFound(Uuid),
    #[error("{action} requests from {requester} have no approval workflow")]
    NoWorkflow { action: ActionType, requester: Role },
    #[error("{action} requests must state an amount")]
    AmountRequired { action: ActionType },
    #[error("no approver in the {action} chain may approve {amount_cents}")]
    AmountOverAuthority {
        action: ActionType,
        amount_cents: u64,
    },
    #[error("approval request {id} is already {status}")]
    NotPending { id: Uuid, status: RequestStatus },
    #[error("only the requester may cancel approval request {0}")]
    NotRequester(Uuid),
    #[error("not authorized: {0}")]
    Forbidden(Denial),
}

pub type HrResult<T> = Result<T, HrError>;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user acting on the desk.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmitRequest {
    pub requester: Actor,
    pub action: ActionType,
    pub amount_cents: Option<u64>,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Decision {
    pub step: u32,
    pub approver: Actor,
    pub outcome: Outcome,
    pub note: Option<String>,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub requester: Actor,
    pub action: ActionType,
    pub amount_cents: Option<u64>,
    pub summary: String,
    pub status: RequestStatus,
    /// Step waiting for a decision; `None` once the request is closed.
    pub current_step: Option<u32>,
    pub awaiting: Option<Role>,
    pub decisions: Vec<Decision>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}
