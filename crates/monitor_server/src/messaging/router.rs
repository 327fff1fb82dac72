//! Routing of subscriber control messages to the store.

use crate::messaging::{ControlReply, SubscriberCommand};
use monitor_events::MonitorStore;
use tracing::{debug, trace};

/// Parses a text frame from a subscriber and applies it to the store.
///
/// Unknown or malformed frames produce a [`ControlReply::Error`]; they never
/// close the connection.
pub async fn route_subscriber_message(text: &str, store: &MonitorStore) -> ControlReply {
    let command: SubscriberCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            trace!("❌ Unrecognized subscriber message: {}", e);
            return ControlReply::Error {
                message: format!("unrecognized command: {e}"),
            };
        }
    };

    debug!("Subscriber command: {:?}", command);
    let status = match command {
        SubscriberCommand::Pause => store.pause_with_status().await,
        SubscriberCommand::Resume => store.resume_with_status().await.1,
        SubscriberCommand::TogglePause => store.toggle_pause().await,
        SubscriberCommand::Status => store.pause_status().await,
    };

    ControlReply::PauseStatus(status)
}
