mod payloads;

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, ErrorExtensions, ID, Object, Schema};
use platform_api::{ApiError, ApiResult, internal_error};
use platform_authz::{ActionType, Denial, Permission, PolicyContext, PolicyEngine, Role};
use products_hr::{Actor, ApprovalDesk, ApprovalRequest, HrResult, SubmitRequest};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

pub use payloads::*;

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;
pub type SharedDesk = Arc<RwLock<ApprovalDesk>>;

#[derive(Clone)]
pub struct GraphqlData {
    pub engine: PolicyEngine,
    pub desk: SharedDesk,
}

impl GraphqlData {
    pub fn new(engine: PolicyEngine) -> Self {
        let desk = ApprovalDesk::new(engine.clone());
        Self {
            engine,
            desk: Arc::new(RwLock::new(desk)),
        }
    }
}

/// Identity of the caller, attached per request by the HTTP layer.
#[derive(Clone, Copy, Debug)]
pub struct RequestActor(pub Actor);

pub fn build_schema(data: GraphqlData) -> SchemaType {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(data)
        .finish()
}

#[derive(Default)]
pub struct QueryRoot;

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> HealthPayload {
        HealthPayload { ok: true }
    }

    async fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    /// Unknown roles or permissions answer `false`.
    #[instrument(name = "graphql.has_permission", skip(self, ctx))]
    async fn has_permission(
        &self,
        ctx: &Context<'_>,
        role: String,
        permission: String,
    ) -> async_graphql::Result<bool> {
        let data = graphql_data(ctx)?;
        Ok(data.engine.has_permission(&role, &permission))
    }

    #[instrument(name = "graphql.can_approve", skip(self, ctx))]
    async fn can_approve(
        &self,
        ctx: &Context<'_>,
        approver: String,
        action: String,
        requester: String,
        step: i32,
        amount_cents: Option<i64>,
    ) -> async_graphql::Result<ApprovalCheckPayload> {
        let data = graphql_data(ctx)?;
        let action = parse_action(&action).map_err(|e| e.extend())?;
        let step = parse_step(step).map_err(|e| e.extend())?;
        let amount_cents = parse_amount(amount_cents).map_err(|e| e.extend())?;
        let (approver, requester) = match (approver.parse::<Role>(), requester.parse::<Role>()) {
            (Ok(approver), Ok(requester)) => (approver, requester),
            (Err(err), _) | (_, Err(err)) => {
                return Ok(ApprovalCheckPayload::refused(&Denial::UnknownRole {
                    role: err.value,
                }));
            }
        };
        Ok(
            match data
                .engine
                .authorize_approval(approver, action, requester, step, amount_cents)
            {
                Ok(_) => ApprovalCheckPayload::granted(),
                Err(platform_authz::AuthzError::Approval(denial)) => {
                    ApprovalCheckPayload::refused(&denial)
                }
                Err(err) => return Err(internal_error(err)),
            },
        )
    }

    #[instrument(name = "graphql.next_approval_step", skip(self, ctx))]
    async fn next_approval_step(
        &self,
        ctx: &Context<'_>,
        action: String,
        requester: String,
        completed_step: i32,
    ) -> async_graphql::Result<Option<StepPayload>> {
        let data = graphql_data(ctx)?;
        let action = parse_action(&action).map_err(|e| e.extend())?;
        let completed = u32::try_from(completed_step)
            .map_err(|_| invalid("completedStep must not be negative").extend())?;
        let Ok(requester) = requester.parse::<Role>() else {
            return Ok(None);
        };
        Ok(data
            .engine
            .next_approval_step(action, requester, completed)
            .as_ref()
            .map(StepPayload::from))
    }

    /// Constraint record for a role; unknown roles get the empty record.
    async fn constraints(
        &self,
        ctx: &Context<'_>,
        role: String,
    ) -> async_graphql::Result<ConstraintsPayload> {
        let data = graphql_data(ctx)?;
        let constraints = role
            .parse::<Role>()
            .map(|role| data.engine.constraints(role))
            .unwrap_or_default();
        Ok(constraints.into())
    }

    async fn workflow(
        &self,
        ctx: &Context<'_>,
        action: String,
        requester: String,
    ) -> async_graphql::Result<WorkflowPayload> {
        let data = graphql_data(ctx)?;
        let action = parse_action(&action).map_err(|e| e.extend())?;
        let requester = requester
            .parse::<Role>()
            .map_err(|e| ApiError::from(e).extend())?;
        Ok(data.engine.table().route(action, requester).into())
    }

    async fn role_permissions(
        &self,
        ctx: &Context<'_>,
        role: String,
    ) -> async_graphql::Result<Vec<PermissionPayload>> {
        let data = graphql_data(ctx)?;
        let Ok(role) = role.parse::<Role>() else {
            return Ok(Vec::new());
        };
        Ok(data
            .engine
            .table()
            .role_policy(role)
            .map(|policy| {
                policy
                    .sorted_permissions()
                    .into_iter()
                    .map(PermissionPayload::from)
                    .collect()
            })
            .unwrap_or_default())
    }

    #[instrument(name = "graphql.approval_request", skip(self, ctx))]
    async fn approval_request(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<Option<RequestPayload>> {
        let actor = require_actor(ctx).map_err(|e| e.extend())?;
        let data = graphql_data(ctx)?;
        let id = parse_id(&id).map_err(|e| e.extend())?;
        let desk = data.desk.read().await;
        let Ok(request) = desk.get(id) else {
            return Ok(None);
        };
        Ok(can_view(&data.engine, request, actor).then(|| RequestPayload::from(request)))
    }

    /// Requests waiting on the caller's role.
    async fn pending_approvals(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Vec<RequestPayload>> {
        let actor = require_actor(ctx).map_err(|e| e.extend())?;
        let data = graphql_data(ctx)?;
        let desk = data.desk.read().await;
        Ok(desk
            .pending_for(actor.role)
            .into_iter()
            .map(RequestPayload::from)
            .collect())
    }

    async fn my_requests(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<RequestPayload>> {
        let actor = require_actor(ctx).map_err(|e| e.extend())?;
        let data = graphql_data(ctx)?;
        let desk = data.desk.read().await;
        Ok(desk
            .submitted_by(actor.id)
            .into_iter()
            .map(RequestPayload::from)
            .collect())
    }
}

#[Object]
impl MutationRoot {
    #[instrument(name = "graphql.submit_approval", skip(self, ctx, input))]
    async fn submit_approval(
        &self,
        ctx: &Context<'_>,
        input: SubmitApprovalInput,
    ) -> async_graphql::Result<RequestPayload> {
        submit(ctx, input).await.map_err(|e| e.extend())
    }

    async fn approve_request(
        &self,
        ctx: &Context<'_>,
        id: ID,
        note: Option<String>,
    ) -> async_graphql::Result<RequestPayload> {
        decide(ctx, &id, |desk, id, actor| desk.approve(id, actor, note))
            .await
            .map_err(|e| e.extend())
    }

    async fn reject_request(
        &self,
        ctx: &Context<'_>,
        id: ID,
        reason: Option<String>,
    ) -> async_graphql::Result<RequestPayload> {
        decide(ctx, &id, |desk, id, actor| desk.reject(id, actor, reason))
            .await
            .map_err(|e| e.extend())
    }

    async fn cancel_request(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<RequestPayload> {
        decide(ctx, &id, |desk, id, actor| desk.cancel(id, actor.id))
            .await
            .map_err(|e| e.extend())
    }
}

async fn submit(ctx: &Context<'_>, input: SubmitApprovalInput) -> ApiResult<RequestPayload> {
    let actor = require_actor(ctx)?;
    let data = shared_data(ctx)?;
    let action = parse_action(&input.action)?;
    let amount_cents = parse_amount(input.amount_cents)?;
    let summary = input.summary.trim().to_string();
    if summary.is_empty() {
        return Err(invalid("summary must not be empty"));
    }
    let mut desk = data.desk.write().await;
    let request = desk.submit(SubmitRequest {
        requester: actor,
        action,
        amount_cents,
        summary,
    })?;
    Ok(RequestPayload::from(&request))
}

async fn decide<F>(ctx: &Context<'_>, id: &ID, apply: F) -> ApiResult<RequestPayload>
where
    F: FnOnce(&mut ApprovalDesk, Uuid, Actor) -> HrResult<ApprovalRequest>,
{
    let actor = require_actor(ctx)?;
    let data = shared_data(ctx)?;
    let id = parse_id(id)?;
    let mut desk = data.desk.write().await;
    let request = apply(&mut *desk, id, actor)?;
    Ok(RequestPayload::from(&request))
}

fn shared_data<'a>(ctx: &'a Context<'_>) -> ApiResult<&'a GraphqlData> {
    ctx.data::<GraphqlData>()
        .map_err(|_| ApiError::internal(anyhow::anyhow!("missing graphql data")))
}

fn graphql_data<'a>(ctx: &'a Context<'_>) -> async_graphql::Result<&'a GraphqlData> {
    shared_data(ctx).map_err(|e| e.extend())
}

/// Parties to a request may read it; anyone else needs `employee:read_all`.
fn can_view(engine: &PolicyEngine, request: &ApprovalRequest, actor: Actor) -> bool {
    if request.requester.id == actor.id
        || request.awaiting == Some(actor.role)
        || request.decisions.iter().any(|d| d.approver.id == actor.id)
    {
        return true;
    }
    let ctx = PolicyContext {
        subject: actor.role.to_string(),
        action: Permission::EmployeeReadAll.to_string(),
        resource: format!("approval/{}", request.id),
    };
    match engine.check(&ctx) {
        Ok(()) => true,
        Err(err) => {
            debug!(actor = %actor.id, error = %err, "approval request hidden");
            false
        }
    }
}

fn require_actor(ctx: &Context<'_>) -> ApiResult<Actor> {
    ctx.data_opt::<RequestActor>()
        .map(|actor| actor.0)
        .ok_or(ApiError::Unauthorized)
}

fn invalid(message: &str) -> ApiError {
    ApiError::InvalidInput(message.to_string())
}

fn parse_action(raw: &str) -> ApiResult<ActionType> {
    raw.parse::<ActionType>().map_err(ApiError::from)
}

fn parse_step(step: i32) -> ApiResult<u32> {
    u32::try_from(step).map_err(|_| invalid("step must not be negative"))
}

fn parse_amount(amount_cents: Option<i64>) -> ApiResult<Option<u64>> {
    amount_cents
        .map(|cents| u64::try_from(cents).map_err(|_| invalid("amountCents must not be negative")))
        .transpose()
}

fn parse_id(id: &ID) -> ApiResult<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| invalid("invalid ID"))
}
