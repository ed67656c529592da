use serde::{Deserialize, Serialize};

use crate::types::GuildId;

/// Messages a dashboard client may send after connecting.
///
/// Anything that fails to parse into this enum is dropped without a reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        #[serde(rename = "guildId")]
        guild_id: GuildId,
    },
}

/// Messages sent to dashboard clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once, immediately after a successful handshake
    Connected,
    SongPlayed {
        title: String,
        artist: String,
    },
    QueueUpdate {
        #[serde(rename = "queueLength")]
        queue_length: u32,
    },
    VoiceUpdate {
        #[serde(rename = "activeListeners")]
        active_listeners: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_wire_shape() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","guildId":"g42"}"#).unwrap();
        let ClientMessage::Subscribe { guild_id } = msg;
        assert_eq!(guild_id, "g42");
    }

    #[test]
    fn test_unrecognized_client_messages_fail_to_parse() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"unsubscribe"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"guildId":"g42"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>("not json").is_err());
    }

    #[test]
    fn test_server_message_wire_shapes() {
        assert_eq!(
            serde_json::to_value(ServerMessage::Connected).unwrap(),
            json!({"type": "connected"})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::SongPlayed {
                title: "Clair de Lune".to_string(),
                artist: "Debussy".to_string(),
            })
            .unwrap(),
            json!({"type": "song_played", "title": "Clair de Lune", "artist": "Debussy"})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::QueueUpdate { queue_length: 7 }).unwrap(),
            json!({"type": "queue_update", "queueLength": 7})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::VoiceUpdate {
                active_listeners: 3
            })
            .unwrap(),
            json!({"type": "voice_update", "activeListeners": 3})
        );
    }
}
