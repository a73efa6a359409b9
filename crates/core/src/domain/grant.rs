use std::fmt;

use serde::{Deserialize, Serialize};

/// Fallback origin for stored grants written before `channel_id` was recorded.
pub const FALLBACK_CHANNEL: &str = "general";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Slack mention markup, e.g. `<@U123>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn mention(&self) -> String {
        format!("<#{}>", self.0)
    }

    fn fallback() -> Self {
        Self(FALLBACK_CHANNEL.to_owned())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One kudos given by `from` to `to`. Immutable once appended to the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrantRecord {
    pub from: UserId,
    pub to: UserId,
    pub reason: String,
    /// Local calendar date of creation, `YYYY-MM-DD`.
    pub date: String,
    /// Creation instant in Unix seconds.
    pub ts: f64,
    #[serde(default = "ChannelId::fallback")]
    pub channel_id: ChannelId,
}

impl GrantRecord {
    pub fn is_self_grant(&self) -> bool {
        self.from == self.to
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelId, GrantRecord, UserId};

    #[test]
    fn stored_document_without_channel_reads_back_as_general() {
        let record: GrantRecord = serde_json::from_str(
            r#"{"from":"U1","to":"U2","reason":"thanks","date":"2026-10-01","ts":1790000000.5}"#,
        )
        .expect("decode grant");

        assert_eq!(record.channel_id, ChannelId::new("general"));
        assert_eq!(record.from, UserId::new("U1"));
    }

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let record = GrantRecord {
            from: UserId::new("U1"),
            to: UserId::new("U2"),
            reason: "shipped it".to_owned(),
            date: "2026-10-19".to_owned(),
            ts: 1.0,
            channel_id: ChannelId::new("C9"),
        };

        let json = serde_json::to_value(&record).expect("encode grant");
        assert_eq!(json["from"], "U1");
        assert_eq!(json["channel_id"], "C9");
        assert!(!record.is_self_grant());
    }

    #[test]
    fn mentions_use_slack_markup() {
        assert_eq!(UserId::new("U7").mention(), "<@U7>");
        assert_eq!(ChannelId::new("C7").mention(), "<#C7>");
    }
}
