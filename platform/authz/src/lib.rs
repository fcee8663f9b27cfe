//! Authorization primitives for the HR suite.
//!
//! A [`PolicyTable`] maps every [`Role`] to the permissions it holds and to
//! the approval chains its requests travel through. The table is built once,
//! validated, and shared read-only behind a [`PolicyEngine`].

mod action;
mod constraints;
mod defaults;
mod error;
mod permission;
mod role;
mod table;
mod workflow;

use std::{path::Path, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use action::ActionType;
pub use constraints::{Limit, RoleConstraints};
pub use error::{AuthzError, Denial, IdentifierKind, PolicyError, UnknownIdentifier, Violation};
pub use permission::{Permission, PermissionCategory};
pub use role::Role;
pub use table::{PolicyDocument, PolicyTable, RolePolicy};
pub use workflow::{ApprovalRoute, ApprovalStep, WorkflowEntry};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PolicyContext {
    /// Role identifier of the caller, e.g. `HR_MANAGER`.
    pub subject: String,
    /// Permission identifier, e.g. `employee:create`.
    pub action: String,
    pub resource: String,
}

/// Shared handle over an immutable [`PolicyTable`].
#[derive(Clone, Debug)]
pub struct PolicyEngine {
    table: Arc<PolicyTable>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(PolicyTable::default_policy())
    }
}

impl PolicyEngine {
    pub fn new(table: PolicyTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Loads and validates a JSON policy document.
    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        PolicyTable::load_json(path).map(Self::new)
    }

    pub fn table(&self) -> &PolicyTable {
        &self.table
    }

    /// String-keyed permission query. Unknown role or permission identifiers
    /// fail closed.
    pub fn has_permission(&self, role: &str, permission: &str) -> bool {
        let parsed = role
            .parse::<Role>()
            .and_then(|role| permission.parse::<Permission>().map(|p| (role, p)));
        match parsed {
            Ok((role, permission)) => self.table.has_permission(role, permission),
            Err(err) => {
                debug!(error = %err, "permission query with unknown identifier");
                false
            }
        }
    }

    pub fn check(&self, ctx: &PolicyContext) -> Result<(), AuthzError> {
        if self.has_permission(&ctx.subject, &ctx.action) {
            Ok(())
        } else {
            Err(AuthzError::Denied {
                action: ctx.action.clone(),
                resource: ctx.resource.clone(),
            })
        }
    }

    /// Approval check that reports the denial reason. An approver role that
    /// is not in the table is reported as [`Denial::UnknownRole`].
    pub fn authorize_approval(
        &self,
        approver: Role,
        action: ActionType,
        requester: Role,
        step: u32,
        amount_cents: Option<u64>,
    ) -> Result<ApprovalStep, AuthzError> {
        if self.table.role_policy(approver).is_none() {
            return Err(AuthzError::Approval(Denial::UnknownRole {
                role: approver.to_string(),
            }));
        }
        self.table
            .authorize_approval(approver, action, requester, step, amount_cents)
            .copied()
            .map_err(AuthzError::Approval)
    }

    pub fn can_approve(
        &self,
        approver: Role,
        action: ActionType,
        requester: Role,
        step: u32,
        amount_cents: Option<u64>,
    ) -> bool {
        self.table
            .can_approve(approver, action, requester, step, amount_cents)
    }

    pub fn next_approval_step(
        &self,
        action: ActionType,
        requester: Role,
        completed_step: u32,
    ) -> Option<ApprovalStep> {
        self.table
            .next_approval_step(action, requester, completed_step)
            .copied()
    }

    pub fn constraints(&self, role: Role) -> RoleConstraints {
        self.table.constraints(role)
    }
}
