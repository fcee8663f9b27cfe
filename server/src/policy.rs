use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use platform_authz::{
    ActionType, AuthzError, Denial, PolicyEngine, PolicyError, PolicyTable, Role,
};
use serde_json::{Value, json};
use tracing::{info, warn};

/// Offline policy commands. Every command prints one JSON document.
#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    #[command(flatten)]
    Query(PolicyQuery),
    /// Validate a policy document (defaults to the active one).
    Validate { file: Option<PathBuf> },
}

/// Commands answered from a loaded policy.
#[derive(Subcommand, Debug)]
pub enum PolicyQuery {
    /// Does a role hold a permission?
    Check {
        role: String,
        permission: String,
    },
    /// May an approver act on a workflow step?
    CanApprove(CanApproveArgs),
    /// Step that follows a completed one.
    NextStep(NextStepArgs),
    /// Constraint record for a role.
    Constraints { role: String },
    /// Print the active policy as a JSON document.
    Print,
}

#[derive(Args, Debug)]
pub struct CanApproveArgs {
    #[arg(long)]
    approver: String,
    #[arg(long)]
    action: ActionType,
    #[arg(long)]
    requester: String,
    #[arg(long)]
    step: u32,
    #[arg(long)]
    amount_cents: Option<u64>,
}

#[derive(Args, Debug)]
pub struct NextStepArgs {
    #[arg(long)]
    action: ActionType,
    #[arg(long)]
    requester: String,
    #[arg(long, default_value_t = 0)]
    completed: u32,
}

pub fn run(command: PolicyCommand, active: Option<&Path>) -> Result<()> {
    let output = match command {
        PolicyCommand::Validate { file } => {
            let target = file.as_deref().or(active);
            let report = validate(target)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report["valid"] != Value::Bool(true) {
                bail!("policy document has violations");
            }
            return Ok(());
        }
        PolicyCommand::Query(query) => {
            let engine = match active {
                Some(path) => PolicyEngine::from_file(path)?,
                None => PolicyEngine::default(),
            };
            evaluate(query, &engine)?
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn evaluate(query: PolicyQuery, engine: &PolicyEngine) -> Result<Value> {
    Ok(match query {
        PolicyQuery::Check { role, permission } => json!({
            "role": role,
            "permission": permission,
            "granted": engine.has_permission(&role, &permission),
        }),
        PolicyQuery::CanApprove(args) => {
            let outcome = match (args.approver.parse::<Role>(), args.requester.parse::<Role>()) {
                (Ok(approver), Ok(requester)) => engine
                    .authorize_approval(
                        approver,
                        args.action,
                        requester,
                        args.step,
                        args.amount_cents,
                    )
                    .map(|_| ()),
                (Err(err), _) | (_, Err(err)) => {
                    Err(AuthzError::Approval(Denial::UnknownRole { role: err.value }))
                }
            };
            match outcome {
                Ok(()) => json!({ "allowed": true }),
                Err(AuthzError::Approval(denial)) => json!({
                    "allowed": false,
                    "denial": denial,
                    "message": denial.to_string(),
                }),
                Err(err) => return Err(err.into()),
            }
        }
        PolicyQuery::NextStep(args) => {
            let next = args
                .requester
                .parse::<Role>()
                .ok()
                .and_then(|requester| {
                    engine.next_approval_step(args.action, requester, args.completed)
                });
            json!({ "next": next })
        }
        PolicyQuery::Constraints { role } => {
            let constraints = role
                .parse::<Role>()
                .map(|role| engine.constraints(role))
                .unwrap_or_default();
            serde_json::to_value(constraints)?
        }
        PolicyQuery::Print => serde_json::to_value(engine.table().to_document())?,
    })
}

/// Unreadable or malformed files are errors; rule violations are reported.
fn validate(path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        PolicyTable::default_policy().validate()?;
        return Ok(json!({ "source": "built-in", "valid": true, "violations": [] }));
    };
    let source = path.display().to_string();
    match PolicyTable::load_json(path) {
        Ok(_) => {
            info!(path = %source, "policy document is valid");
            Ok(json!({ "source": source, "valid": true, "violations": [] }))
        }
        Err(PolicyError::Invalid(violations)) => {
            warn!(path = %source, count = violations.len(), "policy document has violations");
            let messages: Vec<String> = violations.iter().map(ToString::to_string).collect();
            Ok(json!({
                "source": source,
                "valid": false,
                "violations": violations,
                "messages": messages,
            }))
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn engine() -> PolicyEngine {
        PolicyEngine::default()
    }

    #[test]
    fn check_fails_closed_on_unknown_names() {
        let out = evaluate(
            PolicyQuery::Check {
                role: "ceo".into(),
                permission: "employee:create".into(),
            },
            &engine(),
        )
        .unwrap();
        assert_eq!(out["granted"], false);

        let out = evaluate(
            PolicyQuery::Check {
                role: "hr_manager".into(),
                permission: "employee:create".into(),
            },
            &engine(),
        )
        .unwrap();
        assert_eq!(out["granted"], true);
    }

    #[test]
    fn can_approve_reports_denial() {
        let args = CanApproveArgs {
            approver: "SUPERVISOR".into(),
            action: ActionType::ExpenseApproval,
            requester: "EMPLOYEE".into(),
            step: 1,
            amount_cents: Some(150_000),
        };
        let out = evaluate(PolicyQuery::CanApprove(args), &engine()).unwrap();
        assert_eq!(out["allowed"], false);
        assert_eq!(out["denial"]["reason"], "AMOUNT_EXCEEDS_CEILING");
    }

    #[test]
    fn next_step_is_null_past_the_chain() {
        let args = NextStepArgs {
            action: ActionType::LeaveRequest,
            requester: "DEPARTMENT_MANAGER".into(),
            completed: 1,
        };
        let out = evaluate(PolicyQuery::NextStep(args), &engine()).unwrap();
        assert_eq!(out, json!({ "next": null }));
    }

    #[test]
    fn print_round_trips_through_the_loader() {
        let printed = evaluate(PolicyQuery::Print, &engine()).unwrap();
        let table = PolicyTable::from_json(&printed.to_string()).unwrap();
        assert_eq!(table.to_document(), engine().table().to_document());
    }

    #[test]
    fn validate_reports_violations_without_failing() {
        let mut document = engine().table().to_document();
        document.roles.remove(&Role::Intern);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&document).unwrap()).unwrap();

        let report = validate(Some(file.path())).unwrap();
        assert_eq!(report["valid"], false);
        assert_eq!(report["violations"][0]["rule"], "missing_role_policy");
    }

    #[test]
    fn validate_errors_on_unreadable_file() {
        assert!(validate(Some(Path::new("/nonexistent/policy.json"))).is_err());
        assert_eq!(validate(None).unwrap()["valid"], true);
    }
}
