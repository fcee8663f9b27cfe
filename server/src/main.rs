mod config;
mod graphql;
mod http;
mod policy;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use platform_obs::{ObsConfig, init_tracing};
use tracing::info;

use crate::{
    config::AppConfig,
    graphql::GraphqlData,
    http::{AppState, ServeConfig},
    policy::PolicyCommand,
};

#[derive(Parser, Debug)]
#[command(name = "hr-policy", version, about = "HR role and approval policy engine")]
struct Cli {
    /// JSON policy document; the built-in policy is used when absent.
    #[arg(long, global = true, value_name = "FILE", env = "POLICY_FILE")]
    policy: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Query or validate the policy without starting a server.
    #[command(subcommand)]
    Policy(PolicyCommand),
    /// Print the GraphQL schema in SDL form.
    #[command(name = "schema:print")]
    SchemaPrint {
        #[arg(long, value_name = "FILE", help = "Destination file path")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

impl From<ServeCommand> for ServeConfig {
    fn from(value: ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app_config = AppConfig::load()?.with_policy_override(cli.policy);

    let obs = ObsConfig::for_service(app_config.service_name.clone());
    match cli.command {
        Command::Serve(cmd) => {
            init_tracing(obs)?;
            run_server(cmd, Arc::new(app_config)).await
        }
        Command::Policy(cmd) => {
            init_tracing(obs.compact())?;
            policy::run(cmd, app_config.policy_file.as_deref())
        }
        Command::SchemaPrint { output } => {
            init_tracing(obs.compact())?;
            schema_print(output)
        }
    }
}

fn schema_print(path: Option<PathBuf>) -> Result<()> {
    let schema = graphql::build_schema(GraphqlData::new(Default::default()));
    let sdl = schema.sdl();
    match path {
        Some(path) => {
            std::fs::write(&path, sdl)
                .with_context(|| format!("writing schema to {}", path.display()))?;
            info!(path = %path.display(), "schema snapshot written");
        }
        None => println!("{sdl}"),
    }
    Ok(())
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let engine = config.policy_engine()?;
    let schema = graphql::build_schema(GraphqlData::new(engine));
    let state = AppState {
        schema,
        config: config.clone(),
    };
    info!(service = %config.service_name, "starting policy server");
    http::serve(cmd.into(), state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyQuery;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn policy_flag_is_global() {
        let cli = Cli::try_parse_from([
            "hr-policy",
            "policy",
            "check",
            "INTERN",
            "employee:read_own",
            "--policy",
            "custom.json",
        ])
        .unwrap();
        assert_eq!(cli.policy, Some(PathBuf::from("custom.json")));
        assert!(matches!(
            cli.command,
            Command::Policy(PolicyCommand::Query(PolicyQuery::Check { .. }))
        ));
    }

    #[test]
    fn validate_is_dispatched_apart_from_queries() {
        let cli = Cli::try_parse_from(["hr-policy", "policy", "validate", "draft.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Policy(PolicyCommand::Validate { file: Some(ref file) })
                if file == &PathBuf::from("draft.json")
        ));

        let cli = Cli::try_parse_from(["hr-policy", "policy", "print"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Policy(PolicyCommand::Query(PolicyQuery::Print))
        ));
    }

    #[test]
    fn can_approve_parses_action_names() {
        let cli = Cli::try_parse_from([
            "hr-policy",
            "policy",
            "can-approve",
            "--approver",
            "SUPERVISOR",
            "--action",
            "expense_approval",
            "--requester",
            "EMPLOYEE",
            "--step",
            "1",
            "--amount-cents",
            "99900",
        ]);
        assert!(cli.is_ok());

        let bad = Cli::try_parse_from([
            "hr-policy",
            "policy",
            "next-step",
            "--action",
            "OVERTIME",
            "--requester",
            "EMPLOYEE",
        ]);
        assert!(bad.is_err());
    }
}
