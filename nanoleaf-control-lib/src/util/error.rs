use thiserror::Error;

/// Result type for device operations.
pub type Result<T> = std::result::Result<T, NanoleafError>;

/// Every way a request to a controller can fail.
///
/// The HTTP status kinds mirror what the controller firmware actually answers with.
/// Note that the firmware answers `403` for malformed requests, which is why
/// [`NanoleafError::BadRequest`] is the kind for that status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NanoleafError {
    /// The request never completed (connection refused, timeout, DNS failure).
    #[error("device unreachable: {0}")]
    Unreachable(String),

    /// `401`: the token is invalid or was revoked for this device.
    #[error("not authorized, the token is invalid for this device")]
    Unauthorized,

    /// `403`: the request was malformed or refused.
    #[error("bad request")]
    BadRequest,

    /// `404`: the addressed resource does not exist.
    #[error("resource not found")]
    NotFound,

    /// `422`: the request body was semantically invalid.
    #[error("unprocessable entity")]
    Unprocessable,

    /// `500`: the device hit an internal fault.
    #[error("internal error on the device")]
    ServerFault,

    /// Any status code the device is not documented to send.
    #[error("unknown status code {0}")]
    Unknown(u16),

    /// A success status arrived, but the body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Random effect selection had nothing left to choose from.
    #[error("no alternative effect available")]
    NoAlternative,
}

impl NanoleafError {
    /// Maps an HTTP status code to its error kind.
    ///
    /// Returns `None` for the two success codes, `200` and `204`.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200 | 204 => None,
            401 => Some(NanoleafError::Unauthorized),
            403 => Some(NanoleafError::BadRequest),
            404 => Some(NanoleafError::NotFound),
            422 => Some(NanoleafError::Unprocessable),
            500 => Some(NanoleafError::ServerFault),
            other => Some(NanoleafError::Unknown(other)),
        }
    }

    /// The HTTP status this error was mapped from, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            NanoleafError::Unauthorized => Some(401),
            NanoleafError::BadRequest => Some(403),
            NanoleafError::NotFound => Some(404),
            NanoleafError::Unprocessable => Some(422),
            NanoleafError::ServerFault => Some(500),
            NanoleafError::Unknown(code) => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_codes_are_not_errors() {
        assert_eq!(NanoleafError::from_status(200), None);
        assert_eq!(NanoleafError::from_status(204), None);
    }

    #[test]
    fn test_documented_codes() {
        assert_eq!(
            NanoleafError::from_status(401),
            Some(NanoleafError::Unauthorized)
        );
        assert_eq!(
            NanoleafError::from_status(403),
            Some(NanoleafError::BadRequest)
        );
        assert_eq!(NanoleafError::from_status(404), Some(NanoleafError::NotFound));
        assert_eq!(
            NanoleafError::from_status(422),
            Some(NanoleafError::Unprocessable)
        );
        assert_eq!(
            NanoleafError::from_status(500),
            Some(NanoleafError::ServerFault)
        );
    }

    #[test]
    fn test_unknown_code_keeps_raw_status() {
        let error = NanoleafError::from_status(418).unwrap();
        assert_eq!(error, NanoleafError::Unknown(418));
        assert_eq!(error.status(), Some(418));
        assert!(error.to_string().contains("418"));
    }

    #[test]
    fn test_messages_name_the_kind() {
        assert!(NanoleafError::BadRequest.to_string().contains("bad request"));
        assert!(NanoleafError::Unauthorized
            .to_string()
            .contains("not authorized"));
    }
}
