use log::debug;
use serde::Deserialize;

use crate::util::diagnostics::{Diagnostic, DiagnosticSink, LogSink};
use crate::util::error::NanoleafError;
use crate::util::transport::{HttpTransport, Method, ReqwestTransport};

/// Port of the controller's HTTP API.
pub const API_PORT: u16 = 16021;

#[derive(Deserialize, Debug)]
struct NewTokenResponse {
    auth_token: String,
}

pub struct Auth;

impl Auth {
    pub fn pairing_url(address: &str) -> String {
        format!("http://{}:{}/api/v1/new", address, API_PORT)
    }

    /// Asks the controller at `address` for a new auth token.
    ///
    /// The power button on the controller must be held for 5-7 seconds first,
    /// until the light starts flashing; the device only hands out tokens for a
    /// short while after that. Not retried.
    pub async fn pair(address: &str) -> Option<String> {
        Self::pair_with(&ReqwestTransport::new(), &LogSink, address).await
    }

    pub async fn pair_with(
        transport: &dyn HttpTransport,
        sink: &dyn DiagnosticSink,
        address: &str,
    ) -> Option<String> {
        match Self::request_token(transport, address).await {
            Ok(token) => {
                sink.emit(Diagnostic::Paired {
                    address: address.to_string(),
                });
                Some(token)
            }
            Err(error) => {
                sink.emit(Diagnostic::PairingFailed {
                    address: address.to_string(),
                    error,
                });
                None
            }
        }
    }

    async fn request_token(
        transport: &dyn HttpTransport,
        address: &str,
    ) -> Result<String, NanoleafError> {
        let response = transport
            .send(Method::Post, &Self::pairing_url(address), None)
            .await
            .map_err(|e| NanoleafError::Unreachable(format!("{:#}", e)))?;

        if response.status != 200 {
            return Err(NanoleafError::from_status(response.status)
                .unwrap_or(NanoleafError::Unknown(response.status)));
        }

        debug!("Pairing response from {}: {}", address, response.body);
        let token: NewTokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| NanoleafError::InvalidResponse(e.to_string()))?;
        Ok(token.auth_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::diagnostics::CollectingSink;
    use crate::util::transport::mock::MockTransport;

    const ADDRESS: &str = "192.168.1.20";

    #[test]
    fn test_pairing_url() {
        assert_eq!(
            Auth::pairing_url(ADDRESS),
            "http://192.168.1.20:16021/api/v1/new"
        );
    }

    #[tokio::test]
    async fn test_pair_returns_token() {
        let transport = MockTransport::new();
        transport.respond(
            Method::Post,
            &Auth::pairing_url(ADDRESS),
            200,
            r#"{"auth_token":"0123456789abcdef"}"#,
        );
        let sink = CollectingSink::new();

        let token = Auth::pair_with(&transport, &sink, ADDRESS).await;

        assert_eq!(token.as_deref(), Some("0123456789abcdef"));
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body, None);
        assert_eq!(
            sink.diagnostics(),
            vec![Diagnostic::Paired {
                address: ADDRESS.to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_pair_forbidden_asks_to_hold_button() {
        let transport = MockTransport::new();
        transport.respond(Method::Post, &Auth::pairing_url(ADDRESS), 403, "");
        let sink = CollectingSink::new();

        assert_eq!(Auth::pair_with(&transport, &sink, ADDRESS).await, None);

        let diagnostics = sink.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].error(), Some(&NanoleafError::BadRequest));
        assert!(diagnostics[0].to_string().contains("Press and hold"));
        // One attempt only.
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_pair_distinguishes_unauthorized_and_unprocessable() {
        for (status, expected) in [
            (401, NanoleafError::Unauthorized),
            (422, NanoleafError::Unprocessable),
            (500, NanoleafError::ServerFault),
        ] {
            let transport = MockTransport::new();
            transport.respond(Method::Post, &Auth::pairing_url(ADDRESS), status, "");
            let sink = CollectingSink::new();

            assert_eq!(Auth::pair_with(&transport, &sink, ADDRESS).await, None);
            assert_eq!(sink.errors(), vec![expected]);
        }
    }

    #[tokio::test]
    async fn test_pair_unreachable_device() {
        let transport = MockTransport::new();
        let sink = CollectingSink::new();

        assert_eq!(Auth::pair_with(&transport, &sink, ADDRESS).await, None);
        assert!(matches!(
            sink.errors().as_slice(),
            [NanoleafError::Unreachable(_)]
        ));
    }

    #[tokio::test]
    async fn test_pair_with_unexpected_body() {
        let transport = MockTransport::new();
        transport.respond(Method::Post, &Auth::pairing_url(ADDRESS), 200, "{}");
        let sink = CollectingSink::new();

        assert_eq!(Auth::pair_with(&transport, &sink, ADDRESS).await, None);
        assert!(matches!(
            sink.errors().as_slice(),
            [NanoleafError::InvalidResponse(_)]
        ));
    }
}
