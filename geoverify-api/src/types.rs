//! Wire types for the verification backend.
//!
//! Field names follow the service's camelCase JSON. Decoding is lenient:
//! optional members default instead of failing, because the history
//! endpoint in particular returns records in several shapes depending on
//! how far a verification has progressed.

use serde::{Deserialize, Serialize};

/// Standard response envelope: `{data, status, statusCode, message}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// Payload. Absent on most error responses.
    pub data: Option<T>,
    /// Human-readable server message.
    #[serde(default)]
    pub message: String,
    /// Application-level success flag. Missing means success.
    #[serde(default = "default_status")]
    pub status: bool,
    /// Application-level status code, mirrored from HTTP by most endpoints.
    #[serde(default)]
    pub status_code: Option<u16>,
}

fn default_status() -> bool {
    true
}

/// `data` of `GET organization/address-verification-config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrganisationConfig {
    /// Allowed distance between claimed and observed address, in metres.
    pub distance_tolerance: f64,
    /// Hours between geotag captures (fractional allowed).
    pub geotagging_polling_interval: f64,
    /// Days a tracking session lasts after the last capture.
    pub geotagging_session_timeout: i64,
}

/// One entry of `GET customer/address-history`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerRecord {
    /// Record identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Customer identifier the record belongs to.
    pub customer: String,
    /// Owning organisation.
    pub organization: String,
    /// Client-supplied reference.
    pub reference: String,
    /// `pending`, `verified`, `rejected`, or a value this client does not know.
    pub verification_status: String,
    /// When the record was verified, if it has been.
    pub verified_at: Option<String>,
    /// Address claim plus the geotags collected so far.
    pub metadata: RecordMetadata,
}

/// Address claim and collected samples of a [`CustomerRecord`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordMetadata {
    /// First line of the claimed address.
    pub address_line_one: String,
    /// Kind of address (residential, business, ...).
    pub address_type: String,
    /// Latitude of the claimed address.
    pub latitude: f64,
    /// Longitude of the claimed address.
    pub longitude: f64,
    /// Geotags already delivered for this record, oldest first.
    pub locations: Vec<GeoLocation>,
    /// Date after which the verification closes.
    pub verification_end_date: Option<String>,
}

/// A geotag the backend has already accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoLocation {
    /// Reverse-geocoded address.
    pub address: String,
    /// Observed latitude.
    pub latitude: f64,
    /// Observed longitude.
    pub longitude: f64,
    /// Device timestamp, ISO 8601.
    pub timestamp: String,
}

/// Body of `POST customer/add-geotag`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddGeoTagRequest {
    /// Reverse-geocoded address.
    pub address: String,
    /// Observed latitude.
    pub latitude: f64,
    /// Observed longitude.
    pub longitude: f64,
    /// Capture time on the device, ISO 8601.
    pub device_timestamp: String,
}

/// Body of `POST customer/refresh-token`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Rotated token pair returned by `POST customer/refresh-token`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// New `x-auth-token`.
    pub token: String,
    /// New refresh token (the old one is consumed).
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// The refresh endpoint answers with a bare pair; some deployments wrap it
/// in the standard envelope.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum RefreshTokenBody {
    Bare(TokenPair),
    Wrapped { data: TokenPair },
}

impl RefreshTokenBody {
    pub(crate) fn into_pair(self) -> TokenPair {
        match self {
            Self::Bare(pair) | Self::Wrapped { data: pair } => pair,
        }
    }
}
