use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownIdentifier;

/// Functional grouping of permissions. Used for listings only; it plays no
/// part in authorization.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    Employee,
    Leave,
    Performance,
    Payroll,
    Disciplinary,
    Termination,
    Recruitment,
    Documents,
    Finance,
    Admin,
    Reporting,
}

impl PermissionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionCategory::Employee => "employee",
            PermissionCategory::Leave => "leave",
            PermissionCategory::Performance => "performance",
            PermissionCategory::Payroll => "payroll",
            PermissionCategory::Disciplinary => "disciplinary",
            PermissionCategory::Termination => "termination",
            PermissionCategory::Recruitment => "recruitment",
            PermissionCategory::Documents => "documents",
            PermissionCategory::Finance => "finance",
            PermissionCategory::Admin => "admin",
            PermissionCategory::Reporting => "reporting",
        }
    }
}

/// A named capability. The string form (`category:verb`) is the stable
/// identifier used by policy documents and API callers.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Permission {
    EmployeeCreate,
    EmployeeRead,
    EmployeeReadAll,
    EmployeeUpdate,
    EmployeeDelete,

    LeaveRequest,
    LeaveApproveTeam,
    LeaveApproveDepartment,
    LeaveApproveAll,

    PerformanceReviewSelf,
    PerformanceReviewTeam,
    PerformanceReviewDepartment,
    PerformanceReviewAll,

    PayrollViewOwn,
    PayrollViewAll,
    PayrollManage,
    SalaryChangePropose,
    SalaryChangeApprove,

    DisciplinaryIssue,
    DisciplinaryApprove,

    TerminationInitiate,
    TerminationApprove,

    RecruitmentView,
    RecruitmentManage,
    RecruitmentHire,

    DocumentsViewOwn,
    DocumentsViewAll,
    DocumentsManage,

    ExpenseSubmit,
    ExpenseApprove,
    FinanceReports,
    BudgetManage,

    AdminUsers,
    AdminRoles,
    AdminSettings,
    AdminAudit,

    ReportsTeam,
    ReportsDepartment,
    ReportsCompany,
}

impl Permission {
    pub const ALL: [Permission; 39] = [
        Permission::EmployeeCreate,
        Permission::EmployeeRead,
        Permission::EmployeeReadAll,
        Permission::EmployeeUpdate,
        Permission::EmployeeDelete,
        Permission::LeaveRequest,
        Permission::LeaveApproveTeam,
        Permission::LeaveApproveDepartment,
        Permission::LeaveApproveAll,
        Permission::PerformanceReviewSelf,
        Permission::PerformanceReviewTeam,
        Permission::PerformanceReviewDepartment,
        Permission::PerformanceReviewAll,
        Permission::PayrollViewOwn,
        Permission::PayrollViewAll,
        Permission::PayrollManage,
        Permission::SalaryChangePropose,
        Permission::SalaryChangeApprove,
        Permission::DisciplinaryIssue,
        Permission::DisciplinaryApprove,
        Permission::TerminationInitiate,
        Permission::TerminationApprove,
        Permission::RecruitmentView,
        Permission::RecruitmentManage,
        Permission::RecruitmentHire,
        Permission::DocumentsViewOwn,
        Permission::DocumentsViewAll,
        Permission::DocumentsManage,
        Permission::ExpenseSubmit,
        Permission::ExpenseApprove,
        Permission::FinanceReports,
        Permission::BudgetManage,
        Permission::AdminUsers,
        Permission::AdminRoles,
        Permission::AdminSettings,
        Permission::AdminAudit,
        Permission::ReportsTeam,
        Permission::ReportsDepartment,
        Permission::ReportsCompany,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::EmployeeCreate => "employee:create",
            Permission::EmployeeRead => "employee:read",
            Permission::EmployeeReadAll => "employee:read_all",
            Permission::EmployeeUpdate => "employee:update",
            Permission::EmployeeDelete => "employee:delete",
            Permission::LeaveRequest => "leave:request",
            Permission::LeaveApproveTeam => "leave:approve_team",
            Permission::LeaveApproveDepartment => "leave:approve_department",
            Permission::LeaveApproveAll => "leave:approve_all",
            Permission::PerformanceReviewSelf => "performance:review_self",
            Permission::PerformanceReviewTeam => "performance:review_team",
            Permission::PerformanceReviewDepartment => "performance:review_department",
            Permission::PerformanceReviewAll => "performance:review_all",
            Permission::PayrollViewOwn => "payroll:view_own",
            Permission::PayrollViewAll => "payroll:view_all",
            Permission::PayrollManage => "payroll:manage",
            Permission::SalaryChangePropose => "payroll:salary_change_propose",
            Permission::SalaryChangeApprove => "payroll:salary_change_approve",
            Permission::DisciplinaryIssue => "disciplinary:issue",
            Permission::DisciplinaryApprove => "disciplinary:approve",
            Permission::TerminationInitiate => "termination:initiate",
            Permission::TerminationApprove => "termination:approve",
            Permission::RecruitmentView => "recruitment:view",
            Permission::RecruitmentManage => "recruitment:manage",
            Permission::RecruitmentHire => "recruitment:hire",
            Permission::DocumentsViewOwn => "documents:view_own",
            Permission::DocumentsViewAll => "documents:view_all",
            Permission::DocumentsManage => "documents:manage",
            Permission::ExpenseSubmit => "finance:expense_submit",
            Permission::ExpenseApprove => "finance:expense_approve",
            Permission::FinanceReports => "finance:reports",
            Permission::BudgetManage => "finance:budget_manage",
            Permission::AdminUsers => "admin:users",
            Permission::AdminRoles => "admin:roles",
            Permission::AdminSettings => "admin:settings",
            Permission::AdminAudit => "admin:audit",
            Permission::ReportsTeam => "reporting:team",
            Permission::ReportsDepartment => "reporting:department",
            Permission::ReportsCompany => "reporting:company",
        }
    }

    pub fn category(self) -> PermissionCategory {
        use PermissionCategory as C;
        match self {
            Permission::EmployeeCreate
            | Permission::EmployeeRead
            | Permission::EmployeeReadAll
            | Permission::EmployeeUpdate
            | Permission::EmployeeDelete => C::Employee,
            Permission::LeaveRequest
            | Permission::LeaveApproveTeam
            | Permission::LeaveApproveDepartment
            | Permission::LeaveApproveAll => C::Leave,
            Permission::PerformanceReviewSelf
            | Permission::PerformanceReviewTeam
            | Permission::PerformanceReviewDepartment
            | Permission::PerformanceReviewAll => C::Performance,
            Permission::PayrollViewOwn
            | Permission::PayrollViewAll
            | Permission::PayrollManage
            | Permission::SalaryChangePropose
            | Permission::SalaryChangeApprove => C::Payroll,
            Permission::DisciplinaryIssue | Permission::DisciplinaryApprove => C::Disciplinary,
            Permission::TerminationInitiate | Permission::TerminationApprove => C::Termination,
            Permission::RecruitmentView
            | Permission::RecruitmentManage
            | Permission::RecruitmentHire => C::Recruitment,
            Permission::DocumentsViewOwn
            | Permission::DocumentsViewAll
            | Permission::DocumentsManage => C::Documents,
            Permission::ExpenseSubmit
            | Permission::ExpenseApprove
            | Permission::FinanceReports
            | Permission::BudgetManage => C::Finance,
            Permission::AdminUsers
            | Permission::AdminRoles
            | Permission::AdminSettings
            | Permission::AdminAudit => C::Admin,
            Permission::ReportsTeam
            | Permission::ReportsDepartment
            | Permission::ReportsCompany => C::Reporting,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = UnknownIdentifier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Permission::ALL
            .into_iter()
            .find(|permission| permission.as_str() == trimmed)
            .ok_or_else(|| UnknownIdentifier::permission(value))
    }
}

impl TryFrom<String> for Permission {
    type Error = UnknownIdentifier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for &'static str {
    fn from(value: Permission) -> Self {
        value.as_str()
    }
}
