//! Domain types shared by the planner, orchestrator, and stores.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use geoverify_api::{AddGeoTagRequest, CustomerRecord, OrganisationConfig};
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Server-issued cadence rules.
///
/// Both values are clamped to be non-negative; NaN counts as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrgPolicy {
    polling_interval_hours: f64,
    session_timeout_days: i64,
}

impl OrgPolicy {
    pub fn new(polling_interval_hours: f64, session_timeout_days: i64) -> Self {
        let polling_interval_hours = if polling_interval_hours.is_finite() {
            polling_interval_hours.max(0.0)
        } else if polling_interval_hours == f64::INFINITY {
            f64::INFINITY
        } else {
            0.0
        };
        Self {
            polling_interval_hours,
            session_timeout_days: session_timeout_days.max(0),
        }
    }

    pub fn polling_interval_hours(&self) -> f64 {
        self.polling_interval_hours
    }

    pub fn session_timeout_days(&self) -> i64 {
        self.session_timeout_days
    }

    /// Gap between captures, or `None` when the policy means "capture once".
    ///
    /// Rounded to whole milliseconds. Intervals that round to zero count as
    /// "capture once"; intervals too large for a [`TimeDelta`] saturate.
    pub fn step(&self) -> Option<TimeDelta> {
        let millis = (self.polling_interval_hours * 3_600_000.0).round();
        if millis < 1.0 {
            return None;
        }
        // `as` saturates at i64::MAX for out-of-range floats.
        let millis = millis as i64;
        Some(TimeDelta::try_milliseconds(millis).unwrap_or(TimeDelta::MAX))
    }

    /// How long a session lasts past its anchor.
    pub fn session_length(&self) -> TimeDelta {
        TimeDelta::try_days(self.session_timeout_days).unwrap_or(TimeDelta::MAX)
    }
}

impl From<&OrganisationConfig> for OrgPolicy {
    fn from(config: &OrganisationConfig) -> Self {
        Self::new(
            config.geotagging_polling_interval,
            config.geotagging_session_timeout,
        )
    }
}

/// Status of a verification case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
    /// A status this agent does not know; never tracked.
    Other(String),
}

impl VerificationStatus {
    /// Parses a server status, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "verified" => Self::Verified,
            "rejected" => Self::Rejected,
            _ => Self::Other(raw.to_owned()),
        }
    }
}

/// A geotag the backend already holds for a record.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoSample {
    pub address: String,
    pub coordinates: Coordinates,
    pub timestamp: DateTime<Utc>,
}

/// The customer's address-verification case.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRecord {
    pub id: String,
    pub status: VerificationStatus,
    /// Prior samples with a parseable timestamp, in server order.
    pub samples: Vec<GeoSample>,
}

impl VerificationRecord {
    /// Only pending records are tracked.
    pub fn is_pending(&self) -> bool {
        self.status == VerificationStatus::Pending
    }

    /// Most recent sample timestamp, used as the schedule anchor.
    pub fn latest_sample_at(&self) -> Option<DateTime<Utc>> {
        self.samples.iter().map(|s| s.timestamp).max()
    }
}

impl From<CustomerRecord> for VerificationRecord {
    fn from(record: CustomerRecord) -> Self {
        let samples = record
            .metadata
            .locations
            .into_iter()
            .filter_map(|loc| {
                let timestamp = DateTime::parse_from_rfc3339(&loc.timestamp)
                    .map_err(|e| {
                        tracing::debug!(timestamp = %loc.timestamp, "ignoring sample: {e}");
                    })
                    .ok()?
                    .with_timezone(&Utc);
                Some(GeoSample {
                    address: loc.address,
                    coordinates: Coordinates::new(loc.latitude, loc.longitude),
                    timestamp,
                })
            })
            .collect();
        Self {
            id: record.id,
            status: VerificationStatus::parse(&record.verification_status),
            samples,
        }
    }
}

/// One observed location submission. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoTagEvent {
    address: String,
    latitude: f64,
    longitude: f64,
    device_timestamp: DateTime<Utc>,
}

/// A [`GeoTagEvent`] waiting in the offline cache.
pub type CachedGeoTag = GeoTagEvent;

impl GeoTagEvent {
    pub fn new(
        address: impl Into<String>,
        coordinates: Coordinates,
        device_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            address: address.into(),
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            device_timestamp,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn device_timestamp(&self) -> DateTime<Utc> {
        self.device_timestamp
    }

    /// Wire body for `customer/add-geotag`.
    pub fn to_request(&self) -> AddGeoTagRequest {
        AddGeoTagRequest {
            address: self.address.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            device_timestamp: self
                .device_timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
