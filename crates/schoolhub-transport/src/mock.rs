//! Scripted in-memory transport.
//!
//! Tests register outcomes per `(method, path)` and then inspect which
//! requests were actually sent. Unscripted routes answer `404`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use schoolhub_protocol::{Endpoint, Method};

use crate::{ApiRequest, ApiResponse, Transport, TransportError};

/// What a scripted route does with the next request.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Answer immediately.
    Respond(ApiResponse),
    /// Answer after the given delay (Tokio time, so paused clocks apply).
    RespondAfter(Duration, ApiResponse),
    /// Fail without a response.
    Fail(TransportError),
    /// Never answer.
    Hang,
}

impl Scripted {
    pub fn json(status: u16, body: &str) -> Self {
        Self::Respond(ApiResponse::new(status, body.as_bytes().to_vec()))
    }

    pub fn status(status: u16) -> Self {
        Self::Respond(ApiResponse::new(status, Vec::new()))
    }

    pub fn unreachable() -> Self {
        Self::Fail(TransportError::Unreachable("connection refused".into()))
    }
}

#[derive(Default)]
struct Route {
    queue: VecDeque<Scripted>,
    fallback: Option<Scripted>,
}

#[derive(Default)]
struct Inner {
    routes: HashMap<(Method, String), Route>,
    requests: Vec<ApiRequest>,
}

/// A [`Transport`] that replays scripted outcomes and records requests.
///
/// Clones share the same script and request log, so a test can hand one
/// clone to the client and keep another for assertions.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a one-shot outcome for the endpoint. Queued outcomes are
    /// consumed in order before the fallback is used.
    pub fn push(&self, endpoint: &Endpoint, outcome: Scripted) -> &Self {
        self.lock()
            .routes
            .entry((endpoint.method, endpoint.path.clone()))
            .or_default()
            .queue
            .push_back(outcome);
        self
    }

    /// Sets the outcome used once the queue for the endpoint is empty.
    pub fn always(&self, endpoint: &Endpoint, outcome: Scripted) -> &Self {
        self.lock()
            .routes
            .entry((endpoint.method, endpoint.path.clone()))
            .or_default()
            .fallback = Some(outcome);
        self
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// Number of requests sent to the endpoint.
    pub fn count(&self, endpoint: &Endpoint) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == endpoint.method && r.path == endpoint.path)
            .count()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let outcome = {
            let mut inner = self.lock();
            let key = (request.method, request.path.clone());
            inner.requests.push(request);
            inner.routes.get_mut(&key).and_then(|route| {
                route.queue.pop_front().or_else(|| route.fallback.clone())
            })
        };

        match outcome.unwrap_or_else(|| Scripted::status(404)) {
            Scripted::Respond(response) => Ok(response),
            Scripted::RespondAfter(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Scripted::Fail(error) => Err(error),
            Scripted::Hang => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_queue_then_fallback() {
        let ep = Endpoint::club_list();
        let transport = ScriptedTransport::new();
        transport
            .push(&ep, Scripted::status(500))
            .always(&ep, Scripted::json(200, "[]"));

        let first = transport.send(ApiRequest::new(&ep)).await.unwrap();
        let second = transport.send(ApiRequest::new(&ep)).await.unwrap();
        let third = transport.send(ApiRequest::new(&ep)).await.unwrap();

        assert_eq!(first.status, 500);
        assert_eq!(second.status, 200);
        assert_eq!(third.status, 200);
        assert_eq!(transport.count(&ep), 3);
    }

    #[tokio::test]
    async fn test_unscripted_route_returns_404() {
        let transport = ScriptedTransport::new();
        let response = transport
            .send(ApiRequest::new(&Endpoint::profile()))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_clones_share_request_log() {
        let transport = ScriptedTransport::new();
        let handle = transport.clone();
        let _ = transport.send(ApiRequest::new(&Endpoint::profile())).await;
        assert_eq!(handle.requests().len(), 1);
    }
}
