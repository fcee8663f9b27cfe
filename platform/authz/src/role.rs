use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownIdentifier;

/// Organizational rank used as the key for every authorization decision.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Director,
    HrManager,
    DepartmentManager,
    Supervisor,
    SeniorEmployee,
    Employee,
    Intern,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::SuperAdmin,
        Role::Director,
        Role::HrManager,
        Role::DepartmentManager,
        Role::Supervisor,
        Role::SeniorEmployee,
        Role::Employee,
        Role::Intern,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Director => "DIRECTOR",
            Role::HrManager => "HR_MANAGER",
            Role::DepartmentManager => "DEPARTMENT_MANAGER",
            Role::Supervisor => "SUPERVISOR",
            Role::SeniorEmployee => "SENIOR_EMPLOYEE",
            Role::Employee => "EMPLOYEE",
            Role::Intern => "INTERN",
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Role::SuperAdmin => 8,
            Role::Director => 7,
            Role::HrManager => 6,
            Role::DepartmentManager => 5,
            Role::Supervisor => 4,
            Role::SeniorEmployee => 3,
            Role::Employee => 2,
            Role::Intern => 1,
        }
    }

    /// Roles whose own requests terminate approval chains instead of
    /// entering one.
    pub fn is_chain_terminator(self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Director)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownIdentifier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownIdentifier::role(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names_case_insensitively() {
        assert_eq!("hr_manager".parse::<Role>().unwrap(), Role::HrManager);
        assert_eq!(" INTERN ".parse::<Role>().unwrap(), Role::Intern);
        assert!("CEO".parse::<Role>().is_err());
    }

    #[test]
    fn levels_are_strictly_ranked() {
        let levels: Vec<u8> = Role::ALL.iter().map(|role| role.level()).collect();
        assert!(levels.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn only_top_two_roles_terminate_chains() {
        let terminators: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|role| role.is_chain_terminator())
            .collect();
        assert_eq!(terminators, vec![Role::SuperAdmin, Role::Director]);
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&Role::DepartmentManager).unwrap();
        assert_eq!(json, "\"DEPARTMENT_MANAGER\"");
    }
}
