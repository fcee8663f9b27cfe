use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownIdentifier;

/// Kinds of request that travel through an approval workflow.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    LeaveRequest,
    ExpenseApproval,
    DisciplinaryAction,
    Termination,
    PerformanceReview,
    SalaryChange,
    Promotion,
}

impl ActionType {
    pub const ALL: [ActionType; 7] = [
        ActionType::LeaveRequest,
        ActionType::ExpenseApproval,
        ActionType::DisciplinaryAction,
        ActionType::Termination,
        ActionType::PerformanceReview,
        ActionType::SalaryChange,
        ActionType::Promotion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::LeaveRequest => "LEAVE_REQUEST",
            ActionType::ExpenseApproval => "EXPENSE_APPROVAL",
            ActionType::DisciplinaryAction => "DISCIPLINARY_ACTION",
            ActionType::Termination => "TERMINATION",
            ActionType::PerformanceReview => "PERFORMANCE_REVIEW",
            ActionType::SalaryChange => "SALARY_CHANGE",
            ActionType::Promotion => "PROMOTION",
        }
    }

    /// Only expense approvals gate authority on the requested amount.
    pub fn is_amount_gated(self) -> bool {
        matches!(self, ActionType::ExpenseApproval)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = UnknownIdentifier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        ActionType::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| UnknownIdentifier::action(value))
    }
}
