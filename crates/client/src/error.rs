use api_types::envelope::ApiErrorResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("category in use: {0}")]
    CategoryInUse(String),
    #[error("rate limited, retry later")]
    RateLimited,
    #[error("server error: {0}")]
    Server(String),
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Map a failed response to an error, preferring the envelope code over
    /// the HTTP status.
    pub(crate) fn from_response(status: u16, body: Option<ApiErrorResponse>) -> Self {
        let (code, message) = match body {
            Some(body) => (body.error.code, body.error.message),
            None => (String::new(), format!("unexpected status {status}")),
        };

        match code.as_str() {
            "VALIDATION_ERROR" | "INVALID_QUERY" => Self::Validation(message),
            "BAD_REQUEST" => Self::BadRequest(message),
            "NOT_FOUND" => Self::NotFound(message),
            "CONFLICT" => Self::Conflict(message),
            "CATEGORY_IN_USE" => Self::CategoryInUse(message),
            "RATE_LIMITED" => Self::RateLimited,
            _ => match status {
                400 => Self::BadRequest(message),
                404 => Self::NotFound(message),
                409 => Self::Conflict(message),
                429 => Self::RateLimited,
                _ => Self::Server(message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_code_wins_over_status() {
        let body = ApiErrorResponse::new("CATEGORY_IN_USE", "Food has 3 transactions");
        let err = ClientError::from_response(409, Some(body));
        assert!(matches!(err, ClientError::CategoryInUse(msg) if msg == "Food has 3 transactions"));

        let body = ApiErrorResponse::new("INVALID_QUERY", "unknown field");
        assert!(matches!(
            ClientError::from_response(400, Some(body)),
            ClientError::Validation(_)
        ));
    }

    #[test]
    fn status_used_without_envelope() {
        assert!(matches!(
            ClientError::from_response(404, None),
            ClientError::NotFound(_)
        ));
        assert!(matches!(
            ClientError::from_response(429, None),
            ClientError::RateLimited
        ));
        assert!(matches!(
            ClientError::from_response(502, None),
            ClientError::Server(msg) if msg == "unexpected status 502"
        ));
    }
}
