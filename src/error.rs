use serde_json::Value;

/// Failure of a single API call.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The request never got an answer: refused connection, DNS, timeout.
    #[error("could not reach server: {message}")]
    Connectivity { message: String, timed_out: bool },
    /// The server answered with a non-success status.
    #[error("server responded with {status}")]
    Status { status: u16, body: Option<Value> },
    /// The server answered 2xx but the body was not what we expected.
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    Build(String),
}

/// Coarse buckets the views pick messages from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connectivity,
    ClientInput,
    ServerFault,
    Unknown,
}

impl RequestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::Connectivity { .. } => ErrorKind::Connectivity,
            RequestError::Status { status, .. } if (400..500).contains(status) => {
                ErrorKind::ClientInput
            }
            RequestError::Status { status, .. } if (500..600).contains(status) => {
                ErrorKind::ServerFault
            }
            _ => ErrorKind::Unknown,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The `error` string the API puts in its failure bodies, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            RequestError::Status {
                body: Some(body), ..
            } => body
                .get("error")
                .and_then(Value::as_str)
                .filter(|msg| !msg.trim().is_empty()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        RequestError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            RequestError::Build(err.to_string())
        } else if let Some(status) = err.status() {
            RequestError::Status {
                status: status.as_u16(),
                body: None,
            }
        } else if err.is_decode() {
            RequestError::Decode(err.to_string())
        } else {
            RequestError::Connectivity {
                timed_out: err.is_timeout(),
                message: err.to_string(),
            }
        }
    }
}
