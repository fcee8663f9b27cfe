use async_graphql::{ID, InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use platform_authz::{
    ApprovalRoute, ApprovalStep, Denial, Limit, Permission, RoleConstraints,
};
use products_hr::{ApprovalRequest, Decision};

fn cents_out(cents: u64) -> i64 {
    i64::try_from(cents).unwrap_or(i64::MAX)
}

#[derive(Clone, Debug, SimpleObject)]
pub struct HealthPayload {
    pub ok: bool,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ApprovalCheckPayload {
    pub allowed: bool,
    /// Denial code such as `ROLE_MISMATCH`; absent when allowed.
    pub reason: Option<String>,
    pub message: Option<String>,
}

impl ApprovalCheckPayload {
    pub fn granted() -> Self {
        Self {
            allowed: true,
            reason: None,
            message: None,
        }
    }

    pub fn refused(denial: &Denial) -> Self {
        Self {
            allowed: false,
            reason: Some(denial.code().to_string()),
            message: Some(denial.to_string()),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct StepPayload {
    pub step: i32,
    pub approver: String,
    pub optional: bool,
    pub max_amount_cents: Option<i64>,
}

impl From<&ApprovalStep> for StepPayload {
    fn from(value: &ApprovalStep) -> Self {
        Self {
            step: i32::try_from(value.step).unwrap_or(i32::MAX),
            approver: value.approver.to_string(),
            optional: value.optional,
            max_amount_cents: value.max_amount_cents.map(cents_out),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct WorkflowPayload {
    /// `SELF_APPROVED`, `CHAIN` or `UNCONFIGURED`.
    pub route: String,
    pub needs_approval: bool,
    pub steps: Vec<StepPayload>,
}

impl From<ApprovalRoute<'_>> for WorkflowPayload {
    fn from(value: ApprovalRoute<'_>) -> Self {
        let (route, steps) = match value {
            ApprovalRoute::SelfApproved => ("SELF_APPROVED", Vec::new()),
            ApprovalRoute::Chain(steps) => ("CHAIN", steps.iter().map(StepPayload::from).collect()),
            ApprovalRoute::Unconfigured => ("UNCONFIGURED", Vec::new()),
        };
        Self {
            route: route.into(),
            needs_approval: value.needs_approval(),
            steps,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct LimitPayload {
    pub unlimited: bool,
    pub up_to_cents: Option<i64>,
}

impl From<Limit> for LimitPayload {
    fn from(value: Limit) -> Self {
        match value {
            Limit::Unlimited => Self {
                unlimited: true,
                up_to_cents: None,
            },
            Limit::UpTo(cents) => Self {
                unlimited: false,
                up_to_cents: Some(cents_out(cents)),
            },
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ConstraintsPayload {
    pub expense_limit: Option<LimitPayload>,
    pub salary_visibility: Option<LimitPayload>,
    pub department_only: bool,
    pub team_only: bool,
    /// True when the role carries no limits or scoping at all.
    pub unconstrained: bool,
}

impl From<RoleConstraints> for ConstraintsPayload {
    fn from(value: RoleConstraints) -> Self {
        Self {
            unconstrained: value.is_unconstrained(),
            expense_limit: value.expense_limit.map(LimitPayload::from),
            salary_visibility: value.salary_visibility.map(LimitPayload::from),
            department_only: value.department_only,
            team_only: value.team_only,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PermissionPayload {
    pub id: String,
    pub category: String,
}

impl From<Permission> for PermissionPayload {
    fn from(value: Permission) -> Self {
        Self {
            id: value.as_str().to_string(),
            category: value.category().as_str().to_string(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct DecisionPayload {
    pub step: i32,
    pub approver_id: ID,
    pub approver_role: String,
    pub outcome: String,
    pub note: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl From<&Decision> for DecisionPayload {
    fn from(value: &Decision) -> Self {
        Self {
            step: i32::try_from(value.step).unwrap_or(i32::MAX),
            approver_id: ID(value.approver.id.to_string()),
            approver_role: value.approver.role.to_string(),
            outcome: match value.outcome {
                products_hr::Outcome::Approved => "APPROVED".into(),
                products_hr::Outcome::Rejected => "REJECTED".into(),
            },
            note: value.note.clone(),
            decided_at: value.decided_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct RequestPayload {
    pub id: ID,
    pub requester_id: ID,
    pub requester_role: String,
    pub action: String,
    pub amount_cents: Option<i64>,
    pub summary: String,
    pub status: String,
    pub current_step: Option<i32>,
    pub awaiting: Option<String>,
    pub decisions: Vec<DecisionPayload>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ApprovalRequest> for RequestPayload {
    fn from(value: &ApprovalRequest) -> Self {
        Self {
            id: ID(value.id.to_string()),
            requester_id: ID(value.requester.id.to_string()),
            requester_role: value.requester.role.to_string(),
            action: value.action.to_string(),
            amount_cents: value.amount_cents.map(cents_out),
            summary: value.summary.clone(),
            status: value.status.to_string(),
            current_step: value
                .current_step
                .map(|step| i32::try_from(step).unwrap_or(i32::MAX)),
            awaiting: value.awaiting.map(|role| role.to_string()),
            decisions: value.decisions.iter().map(DecisionPayload::from).collect(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct SubmitApprovalInput {
    pub action: String,
    pub amount_cents: Option<i64>,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_authz::{ActionType, PolicyTable, Role};

    #[test]
    fn check_payload_constructors() {
        let granted = ApprovalCheckPayload::granted();
        assert!(granted.allowed);
        assert_eq!(granted.reason, None);

        let refused = ApprovalCheckPayload::refused(&Denial::AmountRequired {
            ceiling_cents: 100_000,
        });
        assert!(!refused.allowed);
        assert_eq!(refused.reason.as_deref(), Some("AMOUNT_REQUIRED"));
    }

    #[test]
    fn workflow_payload_flags_chains() {
        let table = PolicyTable::default_policy();
        let chain = WorkflowPayload::from(table.route(ActionType::LeaveRequest, Role::Intern));
        assert!(chain.needs_approval);
        assert_eq!(chain.steps.len(), 2);

        let top = WorkflowPayload::from(table.route(ActionType::Promotion, Role::Director));
        assert_eq!(top.route, "SELF_APPROVED");
        assert!(!top.needs_approval);
    }

    #[test]
    fn constraints_payload_reports_unconstrained_roles() {
        assert!(ConstraintsPayload::from(RoleConstraints::default()).unconstrained);
        let limited = RoleConstraints {
            expense_limit: Some(Limit::UpTo(0)),
            ..RoleConstraints::default()
        };
        assert!(!ConstraintsPayload::from(limited).unconstrained);
    }
}
