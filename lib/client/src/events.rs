//! Execution event channel.
//!
//! The runner pushes [`ExecutionEvent`]s for every execution over one
//! WebSocket. After connecting, the client subscribes to a single
//! execution; events for other executions are dropped. The stream ends
//! after the execution's terminal event or when the socket closes.

use crate::config::ServiceEndpoints;
use crate::error::ClientError;
use classflow_core::ExecutionId;
use classflow_graph::ExecutionEvent;
use futures::stream::{self, BoxStream};
use futures::{SinkExt, StreamExt};
use rootcause::Report;
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, instrument};

/// Stream of events for one execution.
pub type EventStream = BoxStream<'static, Result<ExecutionEvent, Report<ClientError>>>;

/// Connects to the runner's event channel.
#[derive(Debug, Clone)]
pub struct EventsClient {
    url: String,
}

impl EventsClient {
    #[must_use]
    pub fn new(endpoints: &ServiceEndpoints) -> Self {
        Self {
            url: endpoints.runner_ws_url.clone(),
        }
    }

    /// Subscribes to the events of `execution_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be opened or the subscription
    /// cannot be sent.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn watch(&self, execution_id: ExecutionId) -> Result<EventStream, Report<ClientError>> {
        let (mut socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ClientError::Connection {
                details: e.to_string(),
            })?;

        let subscribe = json!({
            "event": "subscribe",
            "data": { "executionId": execution_id },
        });
        socket
            .send(Message::text(subscribe.to_string()))
            .await
            .map_err(|e| ClientError::Connection {
                details: e.to_string(),
            })?;
        debug!(%execution_id, "subscribed to execution events");

        let events = stream::unfold(Some(socket), move |socket| {
            let execution_id = execution_id.clone();
            async move {
                let mut socket = socket?;
                loop {
                    let message = match socket.next().await {
                        None => return None,
                        Some(Err(e)) => {
                            let err = ClientError::Connection {
                                details: e.to_string(),
                            };
                            return Some((Err(Report::from(err)), None));
                        }
                        Some(Ok(message)) => message,
                    };
                    let text = match message {
                        Message::Text(text) => text,
                        Message::Close(_) => return None,
                        _ => continue,
                    };
                    let Some(event) = decode_event(text.as_str(), &execution_id) else {
                        continue;
                    };
                    let next = if event.is_terminal() { None } else { Some(socket) };
                    return Some((Ok(event), next));
                }
            }
        });

        Ok(events.boxed())
    }
}

/// Parses one channel message, keeping only events for `execution_id`.
///
/// Messages that are not execution events are skipped.
pub fn decode_event(text: &str, execution_id: &ExecutionId) -> Option<ExecutionEvent> {
    match serde_json::from_str::<ExecutionEvent>(text) {
        Ok(event) if event.execution_id() == execution_id => Some(event),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "ignoring unrecognized event message");
            None
        }
    }
}
