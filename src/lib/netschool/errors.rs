use reqwest::StatusCode;

/// Everything that can go wrong while talking to NetSchool.
#[derive(Debug, thiserror::Error)]
pub enum NetSchoolError {
    /// Bad credentials, a login answer without a token, or a request that needs
    /// authorization made before `login`.
    #[error("authorization failed: {0}")]
    Auth(String),
    /// No school's short name matches the given name exactly.
    #[error("school {0:?} was not found")]
    SchoolNotFound(String),
    /// The request timeout elapsed before the server answered.
    #[error("no response from server")]
    NoResponseFromServer,
    /// A mapped response misses a required field or has a malformed one.
    #[error("cannot deserialize response: {0}")]
    Deserialization(String),
    /// Any other non-2xx and non-3xx answer.
    #[error("server answered with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid server url {0:?}")]
    InvalidUrl(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NetSchoolError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, NetSchoolError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            NetSchoolError::Status { status, .. } => Some(*status),
            NetSchoolError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for NetSchoolError {
    fn from(err: serde_json::Error) -> Self {
        NetSchoolError::Deserialization(err.to_string())
    }
}
