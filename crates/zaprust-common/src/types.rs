//! Common types for ZapRust

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for accounts
pub type AccountId = Uuid;

/// Unique identifier for scheduled jobs
pub type JobId = Uuid;

/// Unique identifier for campaigns
pub type CampaignId = Uuid;

/// Unique identifier for campaign items
pub type CampaignItemId = Uuid;

/// Unique identifier for reply rules
pub type ReplyRuleId = Uuid;

/// Unique identifier for activity log entries
pub type ActivityLogId = Uuid;

/// Phone number, normalized to bare digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub digits: String,
}

impl PhoneNumber {
    /// Create a phone number from an already-normalized digit string
    pub fn new(digits: impl Into<String>) -> Self {
        Self {
            digits: digits.into(),
        }
    }

    /// Parse a phone number from free-form input, stripping formatting
    pub fn parse(s: &str) -> Option<Self> {
        let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            None
        } else {
            Some(Self { digits })
        }
    }

    /// Parse the user part of a chat address like `5511999990000@c.us`
    pub fn from_chat_address(s: &str) -> Option<Self> {
        let user = s.split('@').next().unwrap_or(s);
        Self::parse(user)
    }

    /// Render as a direct-chat address on the messaging network
    pub fn to_chat_address(&self) -> String {
        format!("{}@c.us", self.digits)
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digits)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::Error::Validation("Invalid phone number".to_string()))
    }
}

/// Connection status of an account's session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    QrPending,
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::QrPending => write!(f, "qr_pending"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}

impl std::str::FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disconnected" => Ok(ConnectionStatus::Disconnected),
            "qr_pending" => Ok(ConnectionStatus::QrPending),
            "connected" => Ok(ConnectionStatus::Connected),
            _ => Err(format!("Invalid connection status: {}", s)),
        }
    }
}

/// Severity of a notification or activity entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Timestamp wrapper
pub type Timestamp = DateTime<Utc>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_number_parse() {
        let phone = PhoneNumber::parse("+55 (11) 99999-0000").unwrap();
        assert_eq!(phone.digits, "5511999990000");
        assert_eq!(phone.to_chat_address(), "5511999990000@c.us");
    }

    #[test]
    fn test_phone_number_invalid() {
        assert!(PhoneNumber::parse("").is_none());
        assert!(PhoneNumber::parse("no digits here").is_none());
    }

    #[test]
    fn test_phone_number_from_chat_address() {
        let phone = PhoneNumber::from_chat_address("5511999990000@c.us").unwrap();
        assert_eq!(phone.digits, "5511999990000");
    }

    #[test]
    fn test_connection_status_display() {
        assert_eq!(ConnectionStatus::QrPending.to_string(), "qr_pending");
        assert_eq!(
            "connected".parse::<ConnectionStatus>(),
            Ok(ConnectionStatus::Connected)
        );
    }
}
