use std::collections::HashMap;

use chrono::Utc;
use platform_authz::{ApprovalRoute, AuthzError, Denial, PolicyEngine, Role};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    Actor, ApprovalRequest, Decision, HrError, HrResult, Outcome, RequestStatus, SubmitRequest,
};

/// In-memory register of approval requests. Each call is one independent
/// update; sharing across tasks is the caller's concern.
#[derive(Debug, Default)]
pub struct ApprovalDesk {
    engine: PolicyEngine,
    requests: HashMap<Uuid, ApprovalRequest>,
}

impl ApprovalDesk {
    pub fn new(engine: PolicyEngine) -> Self {
        Self {
            engine,
            requests: HashMap::new(),
        }
    }

    #[instrument(
        name = "hr.submit",
        skip_all,
        fields(action = %input.action, requester = %input.requester.role)
    )]
    pub fn submit(&mut self, input: SubmitRequest) -> HrResult<ApprovalRequest> {
        let action = input.action;
        let requester_role = input.requester.role;
        let table = self.engine.table();

        let route = table.route(action, requester_role);
        if route == ApprovalRoute::Unconfigured {
            return Err(HrError::NoWorkflow {
                action,
                requester: requester_role,
            });
        }

        let entry = if route.needs_approval() {
            if action.is_amount_gated() && input.amount_cents.is_none() {
                return Err(HrError::AmountRequired { action });
            }
            let step = table
                .entry_step(action, requester_role, input.amount_cents)
                .ok_or(HrError::AmountOverAuthority {
                    action,
                    amount_cents: input.amount_cents.unwrap_or_default(),
                })?;
            Some(*step)
        } else {
            None
        };

        let now = Utc::now();
        let request = ApprovalRequest {
            id: Uuid::new_v4(),
            requester: input.requester,
            action,
            amount_cents: input.amount_cents,
            summary: input.summary,
            status: if entry.is_some() {
                RequestStatus::Pending
            } else {
                RequestStatus::Approved
            },
            current_step: entry.map(|step| step.step),
            awaiting: entry.map(|step| step.approver),
            decisions: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        info!(
            id = %request.id,
            status = %request.status,
            step = ?request.current_step,
            "approval request submitted"
        );
        self.requests.insert(request.id, request.clone());
        Ok(request)
    }

    #[instrument(name = "hr.approve", skip(self, note))]
    pub fn approve(
        &mut self,
        id: Uuid,
        approver: Actor,
        note: Option<String>,
    ) -> HrResult<ApprovalRequest> {
        let engine = self.engine.clone();
        let request = self.pending_mut(id)?;
        let step = authorize(&engine, request, approver)?;

        let now = Utc::now();
        request.decisions.push(Decision {
            step,
            approver,
            outcome: Outcome::Approved,
            note,
            decided_at: now,
        });
        request.updated_at = now;

        match engine.next_approval_step(request.action, request.requester.role, step) {
            Some(next) => {
                request.current_step = Some(next.step);
                request.awaiting = Some(next.approver);
                info!(%id, step = next.step, awaiting = %next.approver, "approval advanced");
            }
            None => {
                close(request, RequestStatus::Approved);
                info!(%id, "approval request approved");
            }
        }
        Ok(request.clone())
    }

    #[instrument(name = "hr.reject", skip(self, reason))]
    pub fn reject(
        &mut self,
        id: Uuid,
        approver: Actor,
        reason: Option<String>,
    ) -> HrResult<ApprovalRequest> {
        let engine = self.engine.clone();
        let request = self.pending_mut(id)?;
        let step = authorize(&engine, request, approver)?;

        let now = Utc::now();
        request.decisions.push(Decision {
            step,
            approver,
            outcome: Outcome::Rejected,
            note: reason,
            decided_at: now,
        });
        request.updated_at = now;
        close(request, RequestStatus::Rejected);
        info!(%id, step, "approval request rejected");
        Ok(request.clone())
    }

    #[instrument(name = "hr.cancel", skip(self))]
    pub fn cancel(&mut self, id: Uuid, requester_id: Uuid) -> HrResult<ApprovalRequest> {
        let request = self.pending_mut(id)?;
        if request.requester.id != requester_id {
            return Err(HrError::NotRequester(id));
        }
        request.updated_at = Utc::now();
        close(request, RequestStatus::Cancelled);
        info!(%id, "approval request cancelled");
        Ok(request.clone())
    }

    pub fn get(&self, id: Uuid) -> HrResult<&ApprovalRequest> {
        self.requests.get(&id).ok_or(HrError::NotFound(id))
    }

    /// Pending requests whose current step waits on `role`, oldest first.
    pub fn pending_for(&self, role: Role) -> Vec<&ApprovalRequest> {
        let mut pending: Vec<&ApprovalRequest> = self
            .requests
            .values()
            .filter(|request| request.is_pending() && request.awaiting == Some(role))
            .collect();
        pending.sort_by_key(|request| request.created_at);
        pending
    }

    pub fn submitted_by(&self, requester_id: Uuid) -> Vec<&ApprovalRequest> {
        let mut mine: Vec<&ApprovalRequest> = self
            .requests
            .values()
            .filter(|request| request.requester.id == requester_id)
            .collect();
        mine.sort_by_key(|request| request.created_at);
        mine
    }

    fn pending_mut(&mut self, id: Uuid) -> HrResult<&mut ApprovalRequest> {
        let request = self.requests.get_mut(&id).ok_or(HrError::NotFound(id))?;
        if request.status.is_terminal() {
            return Err(HrError::NotPending {
                id,
                status: request.status,
            });
        }
        Ok(request)
    }
}

fn authorize(engine: &PolicyEngine, request: &ApprovalRequest, approver: Actor) -> HrResult<u32> {
    let step = request
        .current_step
        .ok_or(HrError::Forbidden(Denial::UnknownWorkflowStep { step: 0 }))?;
    engine
        .authorize_approval(
            approver.role,
            request.action,
            request.requester.role,
            step,
            request.amount_cents,
        )
        .map(|approved| approved.step)
        .map_err(|err| match err {
            AuthzError::Approval(denial) => HrError::Forbidden(denial),
            AuthzError::Denied { .. } => HrError::Forbidden(Denial::UnknownRole {
                role: approver.role.to_string(),
            }),
        })
}

fn close(request: &mut ApprovalRequest, status: RequestStatus) {
    request.status = status;
    request.current_step = None;
    request.awaiting = None;
}

#[cfg(test)]
mod tests {
    use platform_authz::ActionType;

    use super::*;

    fn actor(role: Role) -> Actor {
        Actor::new(Uuid::new_v4(), role)
    }

    fn submit(
        desk: &mut ApprovalDesk,
        requester: Actor,
        action: ActionType,
        amount_cents: Option<u64>,
    ) -> HrResult<ApprovalRequest> {
        desk.submit(SubmitRequest {
            requester,
            action,
            amount_cents,
            summary: "test".into(),
        })
    }

    #[test]
    fn leave_request_walks_every_step() {
        let mut desk = ApprovalDesk::default();
        let intern = actor(Role::Intern);
        let request = submit(&mut desk, intern, ActionType::LeaveRequest, None).unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.awaiting, Some(Role::Supervisor));

        let after_first = desk.approve(request.id, actor(Role::Supervisor), None).unwrap();
        assert_eq!(after_first.current_step, Some(2));
        assert_eq!(after_first.awaiting, Some(Role::HrManager));

        let done = desk
            .approve(request.id, actor(Role::HrManager), Some("enjoy".into()))
            .unwrap();
        assert_eq!(done.status, RequestStatus::Approved);
        assert_eq!(done.current_step, None);
        assert_eq!(done.decisions.len(), 2);
    }

    #[test]
    fn wrong_role_cannot_approve() {
        let mut desk = ApprovalDesk::default();
        let request =
            submit(&mut desk, actor(Role::Employee), ActionType::LeaveRequest, None).unwrap();
        let err = desk
            .approve(request.id, actor(Role::HrManager), None)
            .unwrap_err();
        assert_eq!(
            err,
            HrError::Forbidden(Denial::RoleMismatch {
                required: Role::Supervisor,
                actual: Role::HrManager,
            })
        );
        assert!(desk.get(request.id).unwrap().is_pending());
    }

    #[test]
    fn director_requests_are_self_approved() {
        let mut desk = ApprovalDesk::default();
        let request = submit(
            &mut desk,
            actor(Role::Director),
            ActionType::ExpenseApproval,
            Some(9_000_000),
        )
        .unwrap();
        assert_eq!(request.status, RequestStatus::Approved);
        assert!(request.awaiting.is_none());
    }

    #[test]
    fn large_expense_starts_above_supervisor() {
        let mut desk = ApprovalDesk::default();
        let request = submit(
            &mut desk,
            actor(Role::Employee),
            ActionType::ExpenseApproval,
            Some(150_000),
        )
        .unwrap();
        assert_eq!(request.current_step, Some(2));
        assert_eq!(request.awaiting, Some(Role::DepartmentManager));
        assert!(desk.pending_for(Role::Supervisor).is_empty());
        assert_eq!(desk.pending_for(Role::DepartmentManager).len(), 1);
    }

    #[test]
    fn expense_without_amount_is_refused() {
        let mut desk = ApprovalDesk::default();
        let err = submit(&mut desk, actor(Role::Employee), ActionType::ExpenseApproval, None)
            .unwrap_err();
        assert_eq!(
            err,
            HrError::AmountRequired {
                action: ActionType::ExpenseApproval
            }
        );
    }

    #[test]
    fn unconfigured_pair_is_refused() {
        let engine = PolicyEngine::new(platform_authz::PolicyTable::from_parts([], []));
        let mut desk = ApprovalDesk::new(engine);
        let err = submit(&mut desk, actor(Role::Employee), ActionType::Promotion, None)
            .unwrap_err();
        assert!(matches!(err, HrError::NoWorkflow { .. }));
    }

    #[test]
    fn rejection_closes_the_request() {
        let mut desk = ApprovalDesk::default();
        let request =
            submit(&mut desk, actor(Role::Supervisor), ActionType::Promotion, None).unwrap();
        let rejected = desk
            .reject(request.id, actor(Role::DepartmentManager), Some("not yet".into()))
            .unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.decisions[0].outcome, Outcome::Rejected);

        let err = desk
            .approve(request.id, actor(Role::DepartmentManager), None)
            .unwrap_err();
        assert_eq!(
            err,
            HrError::NotPending {
                id: request.id,
                status: RequestStatus::Rejected,
            }
        );
    }

    #[test]
    fn only_requester_may_cancel() {
        let mut desk = ApprovalDesk::default();
        let employee = actor(Role::Employee);
        let request = submit(&mut desk, employee, ActionType::SalaryChange, None).unwrap();
        assert_eq!(
            desk.cancel(request.id, Uuid::new_v4()).unwrap_err(),
            HrError::NotRequester(request.id)
        );
        let cancelled = desk.cancel(request.id, employee.id).unwrap();
        assert_eq!(cancelled.status, RequestStatus::Cancelled);
        assert_eq!(desk.submitted_by(employee.id).len(), 1);
        assert!(desk.pending_for(Role::DepartmentManager).is_empty());
    }

    #[test]
    fn unknown_request_is_not_found() {
        let mut desk = ApprovalDesk::default();
        let id = Uuid::new_v4();
        assert_eq!(desk.cancel(id, id).unwrap_err(), HrError::NotFound(id));
    }
}
