use std::fmt;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;

/// HTTP methods used against the controller API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method_str = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        write!(f, "{}", method_str)
    }
}

/// A response as it came off the wire, before any status normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        RawResponse {
            status,
            body: body.into(),
        }
    }
}

/// The HTTP capability the device client and the pairing call run on.
///
/// An `Err` means the request never completed. Any response that did arrive,
/// whatever its status, is an `Ok`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> anyhow::Result<RawResponse>;
}

/// Default transport, backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        ReqwestTransport {
            client: Client::new(),
        }
    }

    /// Bounds every single request to `timeout`.
    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ReqwestTransport { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> anyhow::Result<RawResponse> {
        let request = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };

        debug!("{} {}", method, url);
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to {}", method, url))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::Value;

    use super::{HttpTransport, Method, RawResponse};

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct RecordedRequest {
        pub method: Method,
        pub url: String,
        pub body: Option<Value>,
    }

    /// Scripted transport: answers by method and URL, records every request.
    ///
    /// The last scripted answer for a route repeats; an unscripted route fails
    /// like a refused connection.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        routes: Mutex<HashMap<(Method, String), VecDeque<RawResponse>>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl MockTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn respond(&self, method: Method, url: &str, status: u16, body: &str) -> &Self {
            self.routes
                .lock()
                .unwrap()
                .entry((method, url.to_string()))
                .or_default()
                .push_back(RawResponse::new(status, body));
            self
        }

        pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn requests_with(&self, method: Method) -> Vec<RecordedRequest> {
            self.requests()
                .into_iter()
                .filter(|request| request.method == method)
                .collect()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(
            &self,
            method: Method,
            url: &str,
            body: Option<&Value>,
        ) -> anyhow::Result<RawResponse> {
            self.requests.lock().unwrap().push(RecordedRequest {
                method,
                url: url.to_string(),
                body: body.cloned(),
            });

            let mut routes = self.routes.lock().unwrap();
            let queue = routes
                .get_mut(&(method, url.to_string()))
                .ok_or_else(|| anyhow!("connection refused: {} {}", method, url))?;
            let response = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            response.ok_or_else(|| anyhow!("connection refused: {} {}", method, url))
        }
    }
}
