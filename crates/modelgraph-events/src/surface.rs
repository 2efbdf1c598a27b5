use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-request correlation token shared by a request and its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(pub Uuid);

impl Nonce {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Nonce {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRequest {
    pub nonce: Nonce,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceResponse {
    pub nonce: Nonce,
    #[serde(default)]
    pub result: Value,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("Rendering surface is disconnected")]
    Disconnected,
    #[error("Request {0} was abandoned before a response arrived")]
    Abandoned(Nonce),
}

type PendingMap = Arc<Mutex<HashMap<Nonce, oneshot::Sender<Value>>>>;

/// Message bridge to a rendering surface running in an isolated context.
///
/// Requests are queued on a channel the surface drains; each carries a fresh [`Nonce`] and is
/// resolved by the [`SurfaceResponse`] with the same nonce. There is no timeout: a request the
/// surface never answers stays pending, and [`SurfaceBridge::pending_requests`] reports how many
/// are outstanding.
#[derive(Clone)]
pub struct SurfaceBridge {
    request_tx: Sender<SurfaceRequest>,
    pending: PendingMap,
}

impl SurfaceBridge {
    /// A bridge and the receiver the surface side drains requests from. Once every clone of the
    /// receiver is dropped, new requests fail with [`SurfaceError::Disconnected`].
    pub fn new() -> (Self, Receiver<SurfaceRequest>) {
        let (request_tx, request_rx) = unbounded();
        let bridge = Self {
            request_tx,
            pending: Arc::default(),
        };
        (bridge, request_rx)
    }

    pub fn request(
        &self,
        method: impl Into<String>,
        params: Value,
    ) -> Result<PendingResponse, SurfaceError> {
        let nonce = Nonce::new();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(nonce, tx);

        let request = SurfaceRequest {
            nonce,
            method: method.into(),
            params,
        };
        if self.request_tx.send(request).is_err() {
            self.pending.lock().remove(&nonce);
            return Err(SurfaceError::Disconnected);
        }
        debug!(%nonce, "surface request sent");
        Ok(PendingResponse { nonce, rx })
    }

    /// Resolve the request matching `response.nonce`. Returns false for unknown nonces.
    pub fn respond(&self, response: SurfaceResponse) -> bool {
        let Some(tx) = self.pending.lock().remove(&response.nonce) else {
            warn!(nonce = %response.nonce, "dropping surface response with unknown nonce");
            return false;
        };
        if tx.send(response.result).is_err() {
            debug!(nonce = %response.nonce, "surface response arrived after the caller gave up");
        }
        true
    }

    /// Requests sent but not yet answered.
    pub fn pending_requests(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Future of a surface request; resolves once the matching response arrives.
#[derive(Debug)]
pub struct PendingResponse {
    nonce: Nonce,
    rx: oneshot::Receiver<Value>,
}

impl PendingResponse {
    pub fn nonce(&self) -> Nonce {
        self.nonce
    }
}

impl Future for PendingResponse {
    type Output = Result<Value, SurfaceError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let nonce = self.nonce;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| SurfaceError::Abandoned(nonce)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[tokio::test]
    async fn test_responses_resolve_by_nonce_out_of_order() -> Result<()> {
        let (bridge, requests) = SurfaceBridge::new();

        let first = bridge.request("getLayout", json!({ "diagram": 1 }))?;
        let second = bridge.request("getLayout", json!({ "diagram": 2 }))?;
        assert_eq!(bridge.pending_requests(), 2);

        let sent_first = requests.try_recv()?;
        let sent_second = requests.try_recv()?;
        assert_eq!(sent_first.nonce, first.nonce());

        assert!(bridge.respond(SurfaceResponse {
            nonce: sent_second.nonce,
            result: json!("two"),
        }));
        assert!(bridge.respond(SurfaceResponse {
            nonce: sent_first.nonce,
            result: json!("one"),
        }));

        assert_eq!(second.await?, json!("two"));
        assert_eq!(first.await?, json!("one"));
        assert_eq!(bridge.pending_requests(), 0);
        Ok(())
    }

    #[test]
    fn test_unknown_nonce_is_dropped() {
        let (bridge, _requests) = SurfaceBridge::new();
        assert!(!bridge.respond(SurfaceResponse {
            nonce: Nonce::new(),
            result: Value::Null,
        }));
    }

    #[test]
    fn test_unanswered_request_stays_pending() -> Result<()> {
        let (bridge, _requests) = SurfaceBridge::new();
        let pending = bridge.request("confirmPlacement", Value::Null)?;
        drop(pending);
        assert_eq!(bridge.pending_requests(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_abandoned_request_reports_error() -> Result<()> {
        let (bridge, _requests) = SurfaceBridge::new();
        let pending = bridge.request("confirmPlacement", Value::Null)?;
        let nonce = pending.nonce();
        bridge.pending.lock().clear();
        assert_eq!(pending.await, Err(SurfaceError::Abandoned(nonce)));
        Ok(())
    }

    #[test]
    fn test_request_fails_once_surface_hangs_up() {
        let (bridge, requests) = SurfaceBridge::new();
        drop(requests);
        assert!(matches!(
            bridge.request("getLayout", Value::Null),
            Err(SurfaceError::Disconnected)
        ));
        assert_eq!(bridge.pending_requests(), 0);
    }
}
