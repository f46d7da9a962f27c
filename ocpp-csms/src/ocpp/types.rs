//! OCPP 1.6 payload types
//!
//! Only the confirmations the central system actually produces are modelled.
//! Request payloads are kept as raw JSON since routing happens on the action
//! name alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registration status returned in confirmations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RegistrationStatus {
    Accepted,
    Pending,
    Rejected,
}

/// BootNotification.conf
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootNotificationConf {
    pub status: RegistrationStatus,
    pub current_time: DateTime<Utc>,
    pub interval: u32,
}

/// StatusNotification.conf
///
/// OCPP 1.6 defines an empty confirmation here; the central system also
/// reports its clock and the advisory heartbeat interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusNotificationConf {
    pub status: RegistrationStatus,
    pub current_time: DateTime<Utc>,
    pub heartbeat_interval: u32,
}

/// Payload sent back for actions the central system does not handle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedConf {
    pub status: RegistrationStatus,
    pub current_time: DateTime<Utc>,
    pub heartbeat_interval: u32,
}
