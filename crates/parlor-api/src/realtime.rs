//! Realtime upload events.
//!
//! The channel protocol is tiny: a client asks for a token with
//! `upload:auth` and keeps it alive with `upload:ping`. Dispatch is
//! transport-agnostic; the WebSocket session loop drives it in production
//! and tests drive it directly.

use serde_json::Value;

use crate::tokens::UploadTokenStore;

/// Sent by a client to request a token; echoed back with the token attached.
pub const EVENT_UPLOAD_AUTH: &str = "upload:auth";
/// Sent by a client to keep a pending token alive.
pub const EVENT_UPLOAD_PING: &str = "upload:ping";

/// Outbound events for one connected session.
pub trait EventSink: Sync {
    fn emit(&self, event: &str, payload: Value);
}

/// Handle one inbound event from an authenticated session. Events that
/// don't parse into something actionable are dropped without an answer.
pub async fn dispatch(
    tokens: &UploadTokenStore,
    owner: &str,
    event: &str,
    payload: Option<&Value>,
    sink: &dyn EventSink,
) {
    match event {
        EVENT_UPLOAD_AUTH => {
            let token = tokens.issue(owner).await;
            sink.emit(EVENT_UPLOAD_AUTH, Value::String(token));
        }
        EVENT_UPLOAD_PING => {
            // Only a string payload names a token; anything else is noise.
            if let Some(Value::String(token)) = payload {
                tokens.ping(token).await;
            }
        }
        _ => {
            tracing::trace!(event, "Ignoring unknown event");
        }
    }
}
