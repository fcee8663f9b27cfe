use serde::{Deserialize, Serialize};

/// A monetary ceiling in cents.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    Unlimited,
    UpTo(u64),
}

/// Numeric and scoping limits attached to a role.
///
/// `None` on a limit means the role carries no such constraint at all, which
/// is not the same as `Some(Limit::UpTo(0))`. The engine never enforces these
/// values itself; callers read them through
/// [`PolicyTable::constraints`](crate::PolicyTable::constraints).
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct RoleConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_limit: Option<Limit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_visibility: Option<Limit>,
    #[serde(default)]
    pub department_only: bool,
    #[serde(default)]
    pub team_only: bool,
}

impl RoleConstraints {
    pub fn is_unconstrained(&self) -> bool {
        *self == RoleConstraints::default()
    }
}
