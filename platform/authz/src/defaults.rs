//! Built-in HR policy used when no policy document is supplied.

use crate::{
    action::ActionType,
    constraints::{Limit, RoleConstraints},
    permission::Permission::{self, *},
    role::Role::{self, *},
    table::{PolicyTable, RolePolicy},
    workflow::{ApprovalStep, WorkflowEntry},
};

const INTERN_EXPENSE_CENTS: u64 = 50_000;
const SUPERVISOR_EXPENSE_CENTS: u64 = 100_000;
const MANAGER_EXPENSE_CENTS: u64 = 500_000;

impl PolicyTable {
    /// The default organization policy. Always satisfies
    /// [`PolicyTable::validate`].
    pub fn default_policy() -> Self {
        Self::from_parts(role_policies(), workflows())
    }
}

fn role_policies() -> Vec<(Role, RolePolicy)> {
    let everything = Permission::ALL;
    let director = Permission::ALL
        .into_iter()
        .filter(|p| !matches!(p, AdminRoles | AdminSettings));

    vec![
        (
            SuperAdmin,
            RolePolicy::new(everything).with_constraints(RoleConstraints {
                expense_limit: Some(Limit::Unlimited),
                salary_visibility: Some(Limit::Unlimited),
                ..RoleConstraints::default()
            }),
        ),
        (
            Director,
            RolePolicy::new(director).with_constraints(RoleConstraints {
                expense_limit: Some(Limit::Unlimited),
                salary_visibility: Some(Limit::Unlimited),
                ..RoleConstraints::default()
            }),
        ),
        (
            HrManager,
            RolePolicy::new([
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
                ReportsTeam,
                ReportsDepartment,
                ReportsCompany,
                AdminAudit,
            ])
            .with_constraints(RoleConstraints {
                expense_limit: Some(Limit::UpTo(MANAGER_EXPENSE_CENTS)),
                salary_visibility: Some(Limit::Unlimited),
                ..RoleConstraints::default()
            }),
        ),
        (
            DepartmentManager,
            RolePolicy::new([
                EmployeeRead,
                EmployeeUpdate,
                LeaveRequest,
                LeaveApproveTeam,
                LeaveApproveDepartment,
                PerformanceReviewSelf,
                PerformanceReviewTeam,
                PerformanceReviewDepartment,
                PayrollViewOwn,
                SalaryChangePropose,
                DisciplinaryIssue,
                TerminationInitiate,
                RecruitmentView,
                RecruitmentManage,
                DocumentsViewOwn,
                ExpenseSubmit,
                ExpenseApprove,
                FinanceReports,
                ReportsTeam,
                ReportsDepartment,
            ])
            .with_constraints(RoleConstraints {
                expense_limit: Some(Limit::UpTo(MANAGER_EXPENSE_CENTS)),
                salary_visibility: Some(Limit::UpTo(12_000_000)),
                department_only: true,
                team_only: false,
            }),
        ),
        (
            Supervisor,
            RolePolicy::new([
                EmployeeRead,
                LeaveRequest,
                LeaveApproveTeam,
                PerformanceReviewSelf,
                PerformanceReviewTeam,
                PayrollViewOwn,
                DisciplinaryIssue,
                RecruitmentView,
                DocumentsViewOwn,
                ExpenseSubmit,
                ExpenseApprove,
                ReportsTeam,
            ])
            .with_constraints(RoleConstraints {
                expense_limit: Some(Limit::UpTo(SUPERVISOR_EXPENSE_CENTS)),
                salary_visibility: Some(Limit::UpTo(8_000_000)),
                department_only: true,
                team_only: true,
            }),
        ),
        (
            SeniorEmployee,
            RolePolicy::new([
                EmployeeRead,
                LeaveRequest,
                PerformanceReviewSelf,
                PayrollViewOwn,
                RecruitmentView,
                DocumentsViewOwn,
                ExpenseSubmit,
            ])
            .with_constraints(RoleConstraints {
                team_only: true,
                ..RoleConstraints::default()
            }),
        ),
        (
            Employee,
            RolePolicy::new([
                EmployeeRead,
                LeaveRequest,
                PerformanceReviewSelf,
                PayrollViewOwn,
                DocumentsViewOwn,
                ExpenseSubmit,
            ])
            .with_constraints(RoleConstraints {
                team_only: true,
                ..RoleConstraints::default()
            }),
        ),
        (
            Intern,
            RolePolicy::new([
                EmployeeRead,
                LeaveRequest,
                PerformanceReviewSelf,
                DocumentsViewOwn,
                ExpenseSubmit,
            ])
            .with_constraints(RoleConstraints {
                expense_limit: Some(Limit::UpTo(0)),
                team_only: true,
                ..RoleConstraints::default()
            }),
        ),
    ]
}

fn chain(approvers: &[Role]) -> Vec<ApprovalStep> {
    approvers
        .iter()
        .zip(1..)
        .map(|(approver, step)| ApprovalStep::new(step, *approver))
        .collect()
}

fn entry(action: ActionType, requester: Role, steps: Vec<ApprovalStep>) -> WorkflowEntry {
    WorkflowEntry {
        action,
        requester,
        steps,
    }
}

fn expense_chain(requester: Role) -> Vec<ApprovalStep> {
    let first_ceiling_cents = match requester {
        Supervisor => {
            return vec![
                ApprovalStep::new(1, DepartmentManager).capped_at(MANAGER_EXPENSE_CENTS),
                ApprovalStep::new(2, Director),
            ];
        }
        DepartmentManager | HrManager => return vec![ApprovalStep::new(1, Director)],
        Intern => INTERN_EXPENSE_CENTS,
        _ => SUPERVISOR_EXPENSE_CENTS,
    };
    vec![
        ApprovalStep::new(1, Supervisor).capped_at(first_ceiling_cents),
        ApprovalStep::new(2, DepartmentManager).capped_at(MANAGER_EXPENSE_CENTS),
        ApprovalStep::new(3, Director),
    ]
}

fn workflows() -> Vec<WorkflowEntry> {
    use ActionType as A;

    let mut entries = Vec::new();

    // Chain terminators are listed with empty workflows so that every
    // requester role is accounted for.
    for action in ActionType::ALL {
        for requester in [SuperAdmin, Director] {
            entries.push(entry(action, requester, Vec::new()));
        }
    }

    entries.extend([
        entry(A::LeaveRequest, Intern, chain(&[Supervisor, HrManager])),
        entry(
            A::LeaveRequest,
            Employee,
            vec![
                ApprovalStep::new(1, Supervisor),
                ApprovalStep::new(2, DepartmentManager).optional(),
            ],
        ),
        entry(A::LeaveRequest, SeniorEmployee, chain(&[Supervisor])),
        entry(A::LeaveRequest, Supervisor, chain(&[DepartmentManager])),
        entry(A::LeaveRequest, DepartmentManager, chain(&[HrManager])),
        entry(A::LeaveRequest, HrManager, chain(&[Director])),
    ]);

    for requester in [
        Intern,
        Employee,
        SeniorEmployee,
        Supervisor,
        DepartmentManager,
        HrManager,
    ] {
        entries.push(entry(A::ExpenseApproval, requester, expense_chain(requester)));
    }

    for requester in [Intern, Employee, SeniorEmployee, Supervisor] {
        entries.push(entry(
            A::DisciplinaryAction,
            requester,
            chain(&[DepartmentManager, HrManager]),
        ));
    }
    entries.extend([
        entry(A::DisciplinaryAction, DepartmentManager, chain(&[HrManager, Director])),
        entry(A::DisciplinaryAction, HrManager, chain(&[Director])),
    ]);

    entries.push(entry(A::Termination, Intern, chain(&[HrManager])));
    for requester in [Employee, SeniorEmployee, Supervisor] {
        entries.push(entry(
            A::Termination,
            requester,
            chain(&[DepartmentManager, HrManager, Director]),
        ));
    }
    entries.extend([
        entry(A::Termination, DepartmentManager, chain(&[HrManager, Director])),
        entry(A::Termination, HrManager, chain(&[Director])),
    ]);

    for requester in [Intern, Employee, SeniorEmployee] {
        entries.push(entry(
            A::PerformanceReview,
            requester,
            vec![
                ApprovalStep::new(1, Supervisor),
                ApprovalStep::new(2, DepartmentManager).optional(),
            ],
        ));
    }
    entries.extend([
        entry(A::PerformanceReview, Supervisor, chain(&[DepartmentManager])),
        entry(A::PerformanceReview, DepartmentManager, chain(&[Director])),
        entry(A::PerformanceReview, HrManager, chain(&[Director])),
    ]);

    for requester in [Intern, Employee, SeniorEmployee, Supervisor] {
        entries.push(entry(
            A::SalaryChange,
            requester,
            chain(&[DepartmentManager, HrManager, Director]),
        ));
    }
    entries.extend([
        entry(A::SalaryChange, DepartmentManager, chain(&[HrManager, Director])),
        entry(A::SalaryChange, HrManager, chain(&[Director])),
    ]);

    for requester in [Intern, Employee, SeniorEmployee] {
        entries.push(entry(
            A::Promotion,
            requester,
            chain(&[Supervisor, DepartmentManager, HrManager]),
        ));
    }
    entries.extend([
        entry(A::Promotion, Supervisor, chain(&[DepartmentManager, HrManager, Director])),
        entry(A::Promotion, DepartmentManager, chain(&[HrManager, Director])),
        entry(A::Promotion, HrManager, chain(&[Director])),
    ]);

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        PolicyTable::default_policy().validate().unwrap();
    }

    #[test]
    fn every_pair_has_a_workflow() {
        let table = PolicyTable::default_policy();
        for action in ActionType::ALL {
            for requester in Role::ALL {
                assert!(
                    table.workflow(action, requester).is_some(),
                    "{action}/{requester} missing"
                );
            }
        }
    }

    #[test]
    fn approvers_outrank_requesters() {
        let table = PolicyTable::default_policy();
        for action in ActionType::ALL {
            for requester in Role::ALL {
                for step in table.workflow(action, requester).unwrap_or_default() {
                    assert!(
                        step.approver.level() > requester.level(),
                        "{action}/{requester} step {} routed to {}",
                        step.step,
                        step.approver
                    );
                }
            }
        }
    }

    #[test]
    fn chain_helper_numbers_from_one() {
        let steps = chain(&[Supervisor, HrManager]);
        assert_eq!(steps[0].step, 1);
        assert_eq!(steps[1].step, 2);
        assert_eq!(steps[1].approver, HrManager);
    }
}
