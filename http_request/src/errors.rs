use crate::response::Response;
use errs::BoxError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid {what} header value")]
    InvalidHeader {
        what: &'static str,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },

    #[error("sending request")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Status(#[from] HttpError),

    /// Raised by a custom error checker.
    #[error("response rejected")]
    Rejected(#[source] BoxError),

    #[error("encoding request body")]
    Encode(#[source] serde_json::Error),

    #[error("unmarshaling response body")]
    Decode(#[source] BoxError),
}

impl RequestError {
    /// Status of the response behind a [`RequestError::Status`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestError::Status(e) => Some(e.status),
            _ => None,
        }
    }
}

/// Non-2xx response, kept whole so callers can read its body.
#[derive(Debug, Error)]
#[error("http status {}", .status.as_u16())]
pub struct HttpError {
    pub status: StatusCode,
    pub response: Response,
}

impl HttpError {
    pub fn new(response: Response) -> Self {
        Self {
            status: response.status,
            response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;

    #[test]
    fn http_error_message_carries_the_code() {
        let response = Response {
            status: StatusCode::NOT_FOUND,
            headers: HeaderMap::new(),
            body: b"missing".to_vec(),
        };
        let err = RequestError::from(HttpError::new(response));

        assert_eq!(err.to_string(), "http status 404");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }
}
