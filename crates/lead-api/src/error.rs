use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("server returned HTTP {status}")]
    Status { status: u16 },
    #[error("invalid response: {0}")]
    Decode(String),
    /// Message reported by the server, surfaced verbatim.
    #[error("{0}")]
    Rejected(String),
}

impl ApiError {
    /// Everything except a server-reported rejection.
    pub fn is_transport(&self) -> bool {
        !matches!(self, ApiError::Rejected(_))
    }

    pub fn rejection(&self) -> Option<&str> {
        match self {
            ApiError::Rejected(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Status {
                status: status.as_u16(),
            }
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rejections_carry_a_user_message() {
        let rejected = ApiError::Rejected("ID 5 already exists!".to_string());
        assert!(!rejected.is_transport());
        assert_eq!(rejected.rejection(), Some("ID 5 already exists!"));
        assert_eq!(rejected.to_string(), "ID 5 already exists!");

        let status = ApiError::Status { status: 500 };
        assert!(status.is_transport());
        assert_eq!(status.rejection(), None);
    }
}
