//! Normalized shipment status.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Shipment status shared by every carrier.
///
/// No progress order is implied: a carrier may report any code after any
/// other. Only `Delivered` is special, and only for polling purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    /// Label exists, carrier has not scanned the parcel yet.
    Created,
    InTransit,
    OutForDelivery,
    Delivered,
    /// Carrier reported a problem (failed delivery attempt, damage, return).
    Exception,
    #[default]
    Unknown,
}

impl TrackingStatus {
    /// All statuses, in declaration order.
    pub const ALL: [TrackingStatus; 6] = [
        TrackingStatus::Created,
        TrackingStatus::InTransit,
        TrackingStatus::OutForDelivery,
        TrackingStatus::Delivered,
        TrackingStatus::Exception,
        TrackingStatus::Unknown,
    ];

    /// Returns true if polling the carrier again is pointless.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackingStatus::Delivered)
    }

    /// Returns the status code as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::Created => "created",
            TrackingStatus::InTransit => "in_transit",
            TrackingStatus::OutForDelivery => "out_for_delivery",
            TrackingStatus::Delivered => "delivered",
            TrackingStatus::Exception => "exception",
            TrackingStatus::Unknown => "unknown",
        }
    }

    /// Returns a default human-readable label.
    pub fn default_label(&self) -> &'static str {
        match self {
            TrackingStatus::Created => "Label created",
            TrackingStatus::InTransit => "In transit",
            TrackingStatus::OutForDelivery => "Out for delivery",
            TrackingStatus::Delivered => "Delivered",
            TrackingStatus::Exception => "Delivery exception",
            TrackingStatus::Unknown => "Status unknown",
        }
    }
}

impl std::fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TrackingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::UnknownTrackingStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_delivered_is_terminal() {
        for status in TrackingStatus::ALL {
            assert_eq!(status.is_terminal(), status == TrackingStatus::Delivered);
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "out_for_delivery".parse::<TrackingStatus>(),
            Ok(TrackingStatus::OutForDelivery)
        );
        assert_eq!(
            "lost".parse::<TrackingStatus>(),
            Err(DomainError::UnknownTrackingStatus("lost".to_string()))
        );
    }

    #[test]
    fn test_serialization_matches_as_str() {
        for status in TrackingStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
