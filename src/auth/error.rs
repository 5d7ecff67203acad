use thiserror::Error;

/// Category of an [`Error`], stripped of its diagnostic context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidCredentials,
    InvalidAppId,
    UserAlreadyExists,
    Internal,
}

/// Failure of an auth operation.
///
/// Every variant carries the operation that produced it (`auth.login`,
/// `auth.register`, `auth.is_admin`). The operation is for logs only and is
/// never sent to clients.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{op}: invalid credentials")]
    InvalidCredentials { op: &'static str },
    #[error("{op}: invalid app id")]
    InvalidAppId { op: &'static str },
    #[error("{op}: user already exists")]
    UserAlreadyExists { op: &'static str },
    #[error("{op}: {source:#}")]
    Internal {
        op: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    pub(crate) fn internal(op: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            op,
            source: source.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials { .. } => ErrorKind::InvalidCredentials,
            Self::InvalidAppId { .. } => ErrorKind::InvalidAppId,
            Self::UserAlreadyExists { .. } => ErrorKind::UserAlreadyExists,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    #[must_use]
    pub const fn op(&self) -> &'static str {
        match self {
            Self::InvalidCredentials { op }
            | Self::InvalidAppId { op }
            | Self::UserAlreadyExists { op }
            | Self::Internal { op, .. } => op,
        }
    }
}

/// Outcome reported by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("user not found")]
    UserNotFound,
    #[error("app not found")]
    AppNotFound,
    #[error("user already exists")]
    UserExists,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum HashError {
    #[error("invalid hash parameters: {0}")]
    Params(String),
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("stored password hash is malformed")]
    MalformedHash,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("app {0} has no signing secret")]
    EmptySecret(i32),
    #[error("token ttl out of range")]
    InvalidTtl,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_op_follow_variant() {
        let err = Error::InvalidAppId { op: "auth.login" };
        assert_eq!(err.kind(), ErrorKind::InvalidAppId);
        assert_eq!(err.op(), "auth.login");
        assert_eq!(err.to_string(), "auth.login: invalid app id");
    }

    #[test]
    fn internal_keeps_source_chain() {
        let err = Error::internal(
            "auth.register",
            StorageError::Backend(anyhow::anyhow!("pool timed out")),
        );
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("pool timed out"));
    }
}
