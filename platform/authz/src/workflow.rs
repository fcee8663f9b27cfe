use serde::{Deserialize, Serialize};

use crate::{action::ActionType, error::Violation, role::Role};

/// One link in an approval chain.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub struct ApprovalStep {
    pub step: u32,
    pub approver: Role,
    #[serde(default)]
    pub optional: bool,
    /// Ceiling in cents. Only consulted for amount-gated actions; `None`
    /// means the step may approve any amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount_cents: Option<u64>,
}

impl ApprovalStep {
    pub fn new(step: u32, approver: Role) -> Self {
        Self {
            step,
            approver,
            optional: false,
            max_amount_cents: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn capped_at(mut self, max_amount_cents: u64) -> Self {
        self.max_amount_cents = Some(max_amount_cents);
        self
    }

    pub fn covers(&self, amount_cents: u64) -> bool {
        self.max_amount_cents
            .is_none_or(|ceiling| amount_cents <= ceiling)
    }
}

/// A workflow as it appears in a policy document.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct WorkflowEntry {
    pub action: ActionType,
    pub requester: Role,
    #[serde(default)]
    pub steps: Vec<ApprovalStep>,
}

/// How a request of a given type from a given role is handled.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ApprovalRoute<'a> {
    /// Nobody else signs off: the requester terminates chains or the
    /// configured workflow is empty.
    SelfApproved,
    Chain(&'a [ApprovalStep]),
    /// No workflow is declared for this pair.
    Unconfigured,
}

impl ApprovalRoute<'_> {
    pub fn needs_approval(&self) -> bool {
        matches!(self, ApprovalRoute::Chain(_))
    }
}

/// Checks the authoring rules that apply to a single step list.
pub(crate) fn check_steps(
    action: ActionType,
    requester: Role,
    steps: &[ApprovalStep],
    violations: &mut Vec<Violation>,
) {
    if requester.is_chain_terminator() && !steps.is_empty() {
        violations.push(Violation::TerminatorWorkflow { action, requester });
    }

    for (position, step) in steps.iter().enumerate() {
        if step.step as usize != position + 1 {
            violations.push(Violation::StepNumbering {
                action,
                requester,
                position,
                found: step.step,
            });
        }
    }

    if action.is_amount_gated() {
        for pair in steps.windows(2) {
            let lowered = match (pair[0].max_amount_cents, pair[1].max_amount_cents) {
                (None, Some(_)) => true,
                (Some(previous), Some(next)) => next < previous,
                _ => false,
            };
            if lowered {
                violations.push(Violation::DecreasingCeiling {
                    action,
                    requester,
                    step: pair[1].step,
                });
            }
        }
    }
}
