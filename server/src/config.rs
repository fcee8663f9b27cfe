use std::path::PathBuf;

use anyhow::{Context, Result};
use platform_authz::PolicyEngine;
use tracing::info;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub service_name: String,
    pub policy_file: Option<PathBuf>,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let service_name =
            std::env::var("SERVICE_NAME").unwrap_or_else(|_| "hr-policy-server".into());

        let policy_file = std::env::var("POLICY_FILE")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        let cors_allowed_origins = parse_origins(
            &std::env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        Ok(Self {
            service_name,
            policy_file,
            cors_allowed_origins,
        })
    }

    /// A `--policy` flag takes precedence over `POLICY_FILE`.
    pub fn with_policy_override(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.policy_file = path;
        }
        self
    }

    pub fn policy_engine(&self) -> Result<PolicyEngine> {
        match &self.policy_file {
            Some(path) => {
                let engine = PolicyEngine::from_file(path)
                    .with_context(|| format!("loading policy from {}", path.display()))?;
                info!(path = %path.display(), "policy document loaded");
                Ok(engine)
            }
            None => {
                info!("using built-in default policy");
                Ok(PolicyEngine::default())
            }
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_skip_blanks() {
        assert_eq!(
            parse_origins(" https://a.example , ,https://b.example,"),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn override_replaces_env_policy() {
        let config = AppConfig {
            service_name: "test".into(),
            policy_file: Some(PathBuf::from("env.json")),
            cors_allowed_origins: Vec::new(),
        };
        let kept = config.clone().with_policy_override(None);
        assert_eq!(kept.policy_file, Some(PathBuf::from("env.json")));
        let replaced = config.with_policy_override(Some(PathBuf::from("cli.json")));
        assert_eq!(replaced.policy_file, Some(PathBuf::from("cli.json")));
    }

    #[test]
    fn missing_policy_file_is_an_error() {
        let config = AppConfig {
            service_name: "test".into(),
            policy_file: Some(PathBuf::from("/nonexistent/policy.json")),
            cors_allowed_origins: Vec::new(),
        };
        let err = config.policy_engine().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/policy.json"));
    }
}
