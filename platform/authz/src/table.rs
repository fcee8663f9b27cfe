use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    action::ActionType,
    constraints::RoleConstraints,
    error::{Denial, PolicyError, Violation},
    permission::Permission,
    role::Role,
    workflow::{ApprovalRoute, ApprovalStep, WorkflowEntry, check_steps},
};

/// Permissions and constraints held by one role.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct RolePolicy {
    #[serde(default, serialize_with = "serialize_sorted")]
    pub permissions: HashSet<Permission>,
    #[serde(default)]
    pub constraints: RoleConstraints,
}

impl RolePolicy {
    pub fn new(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            permissions: permissions.into_iter().collect(),
            constraints: RoleConstraints::default(),
        }
    }

    pub fn with_constraints(mut self, constraints: RoleConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Permissions in identifier order, for stable listings.
    pub fn sorted_permissions(&self) -> Vec<Permission> {
        let mut permissions: Vec<Permission> = self.permissions.iter().copied().collect();
        permissions.sort_by_key(|permission| permission.as_str());
        permissions
    }
}

fn serialize_sorted<S>(permissions: &HashSet<Permission>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let mut ids: Vec<&'static str> = permissions.iter().map(|p| p.as_str()).collect();
    ids.sort_unstable();
    serializer.collect_seq(ids)
}

/// Serializable form of a [`PolicyTable`].
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub roles: BTreeMap<Role, RolePolicy>,
    #[serde(default)]
    pub workflows: Vec<WorkflowEntry>,
}

/// Role policies and approval workflows, built once and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    roles: HashMap<Role, RolePolicy>,
    workflows: HashMap<(ActionType, Role), Vec<ApprovalStep>>,
    duplicates: Vec<(ActionType, Role)>,
}

impl PolicyTable {
    /// Assembles a table without checking the authoring rules. Use
    /// [`PolicyTable::from_document`] for anything loaded from outside.
    pub fn from_parts(
        roles: impl IntoIterator<Item = (Role, RolePolicy)>,
        workflows: impl IntoIterator<Item = WorkflowEntry>,
    ) -> Self {
        let mut table = Self {
            roles: roles.into_iter().collect(),
            ..Self::default()
        };
        for entry in workflows {
            let key = (entry.action, entry.requester);
            if table.workflows.insert(key, entry.steps).is_some() {
                table.duplicates.push(key);
            }
        }
        table
    }

    pub fn from_document(document: PolicyDocument) -> Result<Self, PolicyError> {
        let table = Self::from_parts(document.roles, document.workflows);
        table.validate()?;
        Ok(table)
    }

    pub fn from_json(raw: &str) -> Result<Self, PolicyError> {
        let document: PolicyDocument = serde_json::from_str(raw)?;
        Self::from_document(document)
    }

    pub fn load_json(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json(&raw)?;
        debug!(path = %path.display(), "policy document loaded");
        Ok(table)
    }

    pub fn to_document(&self) -> PolicyDocument {
        let roles = self
            .roles
            .iter()
            .map(|(role, policy)| (*role, policy.clone()))
            .collect();
        let mut workflows: Vec<WorkflowEntry> = self
            .workflows
            .iter()
            .map(|((action, requester), steps)| WorkflowEntry {
                action: *action,
                requester: *requester,
                steps: steps.clone(),
            })
            .collect();
        workflows.sort_by_key(|entry| (entry.action, entry.requester));
        PolicyDocument { roles, workflows }
    }

    /// Checks every authoring rule and reports all violations at once.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let mut violations = Vec::new();

        for role in Role::ALL {
            if !self.roles.contains_key(&role) {
                violations.push(Violation::MissingRolePolicy { role });
            }
        }

        let mut duplicates = self.duplicates.clone();
        duplicates.sort();
        duplicates.dedup();
        for (action, requester) in duplicates {
            violations.push(Violation::DuplicateWorkflow { action, requester });
        }

        let mut keys: Vec<&(ActionType, Role)> = self.workflows.keys().collect();
        keys.sort();
        for key in keys {
            let (action, requester) = *key;
            check_steps(action, requester, &self.workflows[key], &mut violations);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(PolicyError::Invalid(violations))
        }
    }

    pub fn role_policy(&self, role: Role) -> Option<&RolePolicy> {
        self.roles.get(&role)
    }

    pub fn has_permission(&self, role: Role, permission: Permission) -> bool {
        self.roles
            .get(&role)
            .is_some_and(|policy| policy.permissions.contains(&permission))
    }

    /// Constraint record for `role`; an unmapped role yields the empty record.
    pub fn constraints(&self, role: Role) -> RoleConstraints {
        self.roles
            .get(&role)
            .map(|policy| policy.constraints.clone())
            .unwrap_or_default()
    }

    pub fn workflow(&self, action: ActionType, requester: Role) -> Option<&[ApprovalStep]> {
        self.workflows
            .get(&(action, requester))
            .map(Vec::as_slice)
    }

    pub fn route(&self, action: ActionType, requester: Role) -> ApprovalRoute<'_> {
        if requester.is_chain_terminator() {
            return ApprovalRoute::SelfApproved;
        }
        match self.workflow(action, requester) {
            None => ApprovalRoute::Unconfigured,
            Some([]) => ApprovalRoute::SelfApproved,
            Some(steps) => ApprovalRoute::Chain(steps),
        }
    }

    /// Decides whether `approver` may act on a request sitting at `step`.
    ///
    /// The amount only matters for amount-gated actions, and there only when
    /// the step declares a ceiling. Role and amount are independent
    /// conditions: holding the right role never lifts the ceiling.
    #[instrument(level = "trace", skip(self))]
    pub fn authorize_approval(
        &self,
        approver: Role,
        action: ActionType,
        requester: Role,
        step: u32,
        amount_cents: Option<u64>,
    ) -> Result<&ApprovalStep, Denial> {
        let steps = self
            .workflow(action, requester)
            .filter(|steps| !steps.is_empty())
            .ok_or(Denial::NoWorkflow { action, requester })?;

        let current = steps
            .iter()
            .find(|candidate| candidate.step == step)
            .ok_or(Denial::UnknownWorkflowStep { step })?;

        if current.approver != approver {
            return Err(Denial::RoleMismatch {
                required: current.approver,
                actual: approver,
            });
        }

        if action.is_amount_gated() {
            if let Some(ceiling_cents) = current.max_amount_cents {
                match amount_cents {
                    None => return Err(Denial::AmountRequired { ceiling_cents }),
                    Some(amount_cents) if amount_cents > ceiling_cents => {
                        return Err(Denial::AmountExceedsCeiling {
                            amount_cents,
                            ceiling_cents,
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(current)
    }

    pub fn can_approve(
        &self,
        approver: Role,
        action: ActionType,
        requester: Role,
        step: u32,
        amount_cents: Option<u64>,
    ) -> bool {
        match self.authorize_approval(approver, action, requester, step, amount_cents) {
            Ok(_) => true,
            Err(denial) => {
                debug!(
                    %approver,
                    %action,
                    %requester,
                    step,
                    reason = denial.code(),
                    "approval denied"
                );
                false
            }
        }
    }

    /// The step after `completed_step`, or `None` once the chain is done.
    pub fn next_approval_step(
        &self,
        action: ActionType,
        requester: Role,
        completed_step: u32,
    ) -> Option<&ApprovalStep> {
        let next = completed_step.checked_add(1)?;
        self.workflow(action, requester)?
            .iter()
            .find(|candidate| candidate.step == next)
    }

    /// Where a new request should start. Expense requests skip leading steps
    /// whose ceiling is below the amount; everything else starts at step 1.
    pub fn entry_step(
        &self,
        action: ActionType,
        requester: Role,
        amount_cents: Option<u64>,
    ) -> Option<&ApprovalStep> {
        let steps = self.workflow(action, requester)?;
        match (action.is_amount_gated(), amount_cents) {
            (true, Some(amount)) => steps.iter().find(|candidate| candidate.covers(amount)),
            _ => steps.first(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Limit;

    fn small_table() -> PolicyTable {
        PolicyTable::from_parts(
            [
                (
                    Role::Supervisor,
                    RolePolicy::new([Permission::LeaveApproveTeam]).with_constraints(
                        RoleConstraints {
                            expense_limit: Some(Limit::UpTo(100_000)),
                            team_only: true,
                            ..RoleConstraints::default()
                        },
                    ),
                ),
                (Role::Employee, RolePolicy::new([Permission::LeaveRequest])),
            ],
            [WorkflowEntry {
                action: ActionType::ExpenseApproval,
                requester: Role::Employee,
                steps: vec![
                    ApprovalStep::new(1, Role::Supervisor).capped_at(100_000),
                    ApprovalStep::new(2, Role::Director),
                ],
            }],
        )
    }

    #[test]
    fn unmapped_role_has_no_permissions() {
        let table = small_table();
        assert!(table.has_permission(Role::Supervisor, Permission::LeaveApproveTeam));
        assert!(!table.has_permission(Role::Intern, Permission::LeaveRequest));
        assert!(table.constraints(Role::Intern).is_unconstrained());
        assert!(table.constraints(Role::Supervisor).team_only);
    }

    #[test]
    fn partial_table_fails_validation() {
        let err = small_table().validate().unwrap_err();
        let missing = err
            .violations()
            .iter()
            .filter(|v| matches!(v, Violation::MissingRolePolicy { .. }))
            .count();
        assert_eq!(missing, Role::ALL.len() - 2);
    }

    #[test]
    fn amount_is_required_against_a_ceiling() {
        let table = small_table();
        let expense = ActionType::ExpenseApproval;
        let denial = table
            .authorize_approval(Role::Supervisor, expense, Role::Employee, 1, None)
            .unwrap_err();
        assert_eq!(denial, Denial::AmountRequired { ceiling_cents: 100_000 });
        assert!(
            table
                .authorize_approval(Role::Director, expense, Role::Employee, 2, None)
                .is_ok()
        );
    }

    #[test]
    fn entry_step_skips_tiers_without_authority() {
        let table = small_table();
        let entry = table
            .entry_step(ActionType::ExpenseApproval, Role::Employee, Some(250_000))
            .unwrap();
        assert_eq!(entry.step, 2);
        let entry = table
            .entry_step(ActionType::ExpenseApproval, Role::Employee, Some(10_000))
            .unwrap();
        assert_eq!(entry.step, 1);
    }

    #[test]
    fn duplicate_workflows_are_reported() {
        let entry = WorkflowEntry {
            action: ActionType::LeaveRequest,
            requester: Role::Employee,
            steps: vec![ApprovalStep::new(1, Role::Supervisor)],
        };
        let table = PolicyTable::from_parts([], [entry.clone(), entry]);
        let err = table.validate().unwrap_err();
        assert!(err.violations().contains(&Violation::DuplicateWorkflow {
            action: ActionType::LeaveRequest,
            requester: Role::Employee,
        }));
    }

    #[test]
    fn next_step_saturates_at_u32_max() {
        assert!(
            small_table()
                .next_approval_step(ActionType::ExpenseApproval, Role::Employee, u32::MAX)
                .is_none()
        );
    }
}
