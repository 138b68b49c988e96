//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol for following an import's progress.
//!
//! The feed is one-way: the server pushes a status frame whenever the job
//! changes and closes the socket after the final one. Text frames sent by the
//! client are ignored.

use serde::Serialize;

use crate::web::jobs::JobStatus;

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The current state of the import. The last one has `state: finished`.
    Status { status: JobStatus },

    /// Reports a fatal error to the client, which should display an error message.
    Error { message: String },
}

impl ServerMessage {
    pub fn to_json(&self) -> String {
        // Only plain data is serialized, so this cannot fail in practice.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"{}"}}"#, e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_tagged_by_type() {
        let json = ServerMessage::Error {
            message: "Import not found".to_string(),
        }
        .to_json();
        assert_eq!(json, r#"{"type":"error","message":"Import not found"}"#);
    }
}
