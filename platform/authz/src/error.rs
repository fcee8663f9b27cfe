use std::{fmt, path::PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::{action::ActionType, role::Role};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IdentifierKind {
    Role,
    Permission,
    Action,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdentifierKind::Role => "role",
            IdentifierKind::Permission => "permission",
            IdentifierKind::Action => "action type",
        })
    }
}

/// A string that names no member of a closed set.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownIdentifier {
    pub kind: IdentifierKind,
    pub value: String,
}

impl UnknownIdentifier {
    pub(crate) fn role(value: &str) -> Self {
        Self {
            kind: IdentifierKind::Role,
            value: value.to_string(),
        }
    }

    pub(crate) fn permission(value: &str) -> Self {
        Self {
            kind: IdentifierKind::Permission,
            value: value.to_string(),
        }
    }

    pub(crate) fn action(value: &str) -> Self {
        Self {
            kind: IdentifierKind::Action,
            value: value.to_string(),
        }
    }
}

/// Reason an approval was not authorized. These are ordinary outcomes, not
/// faults: boolean queries collapse every variant to `false`.
#[derive(Debug, Clone, Error, Eq, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Denial {
    #[error("role is not present in the policy table")]
    UnknownRole { role: String },
    #[error("no approval workflow for {action} requested by {requester}")]
    NoWorkflow { action: ActionType, requester: Role },
    #[error("workflow has no step {step}")]
    UnknownWorkflowStep { step: u32 },
    #[error("step requires {required}, not {actual}")]
    RoleMismatch { required: Role, actual: Role },
    #[error("amount {amount_cents} exceeds the step ceiling of {ceiling_cents}")]
    AmountExceedsCeiling { amount_cents: u64, ceiling_cents: u64 },
    #[error("step has a ceiling of {ceiling_cents} but no amount was supplied")]
    AmountRequired { ceiling_cents: u64 },
}

impl Denial {
    pub fn code(&self) -> &'static str {
        match self {
            Denial::UnknownRole { .. } => "UNKNOWN_ROLE",
            Denial::NoWorkflow { .. } => "NO_WORKFLOW",
            Denial::UnknownWorkflowStep { .. } => "UNKNOWN_WORKFLOW_STEP",
            Denial::RoleMismatch { .. } => "ROLE_MISMATCH",
            Denial::AmountExceedsCeiling { .. } => "AMOUNT_EXCEEDS_CEILING",
            Denial::AmountRequired { .. } => "AMOUNT_REQUIRED",
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("permission {action} denied for resource {resource}")]
    Denied { action: String, resource: String },
    #[error("approval denied: {0}")]
    Approval(Denial),
}

/// One broken policy-authoring rule.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    MissingRolePolicy { role: Role },
    StepNumbering {
        action: ActionType,
        requester: Role,
        position: usize,
        found: u32,
    },
    DecreasingCeiling {
        action: ActionType,
        requester: Role,
        step: u32,
    },
    TerminatorWorkflow { action: ActionType, requester: Role },
    DuplicateWorkflow { action: ActionType, requester: Role },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingRolePolicy { role } => write!(f, "{role} has no role policy"),
            Violation::StepNumbering {
                action,
                requester,
                position,
                found,
            } => write!(
                f,
                "{action}/{requester}: step at position {position} is numbered {found}, \
                 expected {}",
                position + 1
            ),
            Violation::DecreasingCeiling {
                action,
                requester,
                step,
            } => write!(
                f,
                "{action}/{requester}: step {step} lowers the ceiling of the previous step"
            ),
            Violation::TerminatorWorkflow { action, requester } => write!(
                f,
                "{action}/{requester}: chain-terminating roles must not have approval steps"
            ),
            Violation::DuplicateWorkflow { action, requester } => {
                write!(f, "{action}/{requester}: workflow declared more than once")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy is invalid: {}", render_violations(.0))]
    Invalid(Vec<Violation>),
    #[error("failed to read policy file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse policy document")]
    Parse(#[from] serde_json::Error),
}

impl PolicyError {
    pub fn violations(&self) -> &[Violation] {
        match self {
            PolicyError::Invalid(violations) => violations,
            _ => &[],
        }
    }
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
