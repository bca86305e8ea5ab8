//! Delivery destinations.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Where a purchased asset is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Destination {
    /// A direct message to the given user.
    DirectMessage(UserId),

    /// A designated channel on the chat platform.
    Channel(String),
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectMessage(user) => write!(f, "dm:{user}"),
            Self::Channel(channel) => write!(f, "channel:{channel}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_json_shape() {
        let dm = Destination::DirectMessage(UserId::new(9));
        assert_eq!(
            serde_json::to_value(&dm).unwrap(),
            serde_json::json!({ "type": "direct_message", "id": 9 })
        );
        let channel: Destination =
            serde_json::from_str(r#"{"type":"channel","id":"555"}"#).unwrap();
        assert_eq!(channel, Destination::Channel("555".into()));
    }
}
