use std::sync::Arc;

use async_graphql::{Error, ErrorExtensions};
use platform_authz::{Denial, UnknownIdentifier};
use products_hr::HrError;
use thiserror::Error;
use tracing::warn;

/// Shared GraphQL result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(Denial),
    /// Identified caller acting on something that is not theirs.
    #[error("forbidden: {0}")]
    NotPermitted(String),
    #[error("resource not found")]
    NotFound,
    #[error("bad request: {0}")]
    InvalidInput(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Forbidden(_) | ApiError::NotPermitted(_) => "FORBIDDEN",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal(Arc::new(err))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value)
    }
}

impl From<UnknownIdentifier> for ApiError {
    fn from(value: UnknownIdentifier) -> Self {
        Self::InvalidInput(value.to_string())
    }
}

impl From<HrError> for ApiError {
    fn from(value: HrError) -> Self {
        match value {
            HrError::NotFound(_) => ApiError::NotFound,
            HrError::Forbidden(denial) => ApiError::Forbidden(denial),
            HrError::NotRequester(_) => ApiError::NotPermitted(value.to_string()),
            HrError::NotPending { .. } => ApiError::Conflict(value.to_string()),
            HrError::NoWorkflow { .. }
            | HrError::AmountRequired { .. }
            | HrError::AmountOverAuthority { .. } => ApiError::InvalidInput(value.to_string()),
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> Error {
        let mut err = Error::new(self.to_string());
        err = err.extend_with(|_err, e| {
            e.set("code", self.code());
        });
        match self {
            ApiError::InvalidInput(_) => {
                err = err.extend_with(|_err, e| {
                    e.set("type", "BAD_REQUEST");
                });
            }
            ApiError::Forbidden(denial) => {
                let reason = denial.code();
                err = err.extend_with(|_err, e| {
                    e.set("reason", reason);
                });
            }
            ApiError::Internal(inner) => {
                warn!(error = %inner, "internal error masked from client");
            }
            _ => {}
        }
        err
    }
}

/// Convert any error into a GraphQL error payload while hiding internals.
pub fn internal_error(err: impl Into<anyhow::Error>) -> Error {
    ApiError::internal(err.into()).extend()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::Value;
    use platform_authz::Role;
    use uuid::Uuid;

    fn extension(err: &Error, key: &str) -> Option<Value> {
        err.extensions
            .as_ref()
            .and_then(|map| map.get(key))
            .cloned()
    }

    #[test]
    fn internal_errors_are_masked() {
        let err = internal_error(anyhow::anyhow!("boom"));
        assert_eq!(err.message, "internal server error");
        assert_eq!(extension(&err, "code"), Some(Value::from("INTERNAL")));
    }

    #[test]
    fn denials_surface_their_reason() {
        let err = ApiError::Forbidden(Denial::RoleMismatch {
            required: Role::Supervisor,
            actual: Role::Employee,
        })
        .extend();
        assert_eq!(extension(&err, "code"), Some(Value::from("FORBIDDEN")));
        assert_eq!(extension(&err, "reason"), Some(Value::from("ROLE_MISMATCH")));
        assert_eq!(err.message, "forbidden: step requires SUPERVISOR, not EMPLOYEE");
    }

    #[test]
    fn hr_errors_map_to_api_codes() {
        let id = Uuid::new_v4();
        assert!(matches!(ApiError::from(HrError::NotFound(id)), ApiError::NotFound));
        assert!(matches!(
            ApiError::from(HrError::NotPending {
                id,
                status: products_hr::RequestStatus::Approved,
            }),
            ApiError::Conflict(_)
        ));
        let err = ApiError::from(HrError::NotRequester(id)).extend();
        assert_eq!(extension(&err, "code"), Some(Value::from("FORBIDDEN")));
        assert_eq!(extension(&err, "reason"), None);
        let unknown = "CEO".parse::<Role>().unwrap_err();
        let err = ApiError::from(unknown).extend();
        assert_eq!(extension(&err, "type"), Some(Value::from("BAD_REQUEST")));
    }
}
