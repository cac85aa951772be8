//! # geoverify-api
//!
//! Typed HTTP client for the address-verification backend (`/v1/api`).
//!
//! This crate only speaks the wire protocol: it builds requests with the
//! `x-api-key` / `x-auth-token` headers, decodes the standard response
//! envelope, and maps failures onto [`ApiError`]. It holds no credentials
//! of its own; callers pass keys and tokens on every call and decide what
//! to do with an [`ApiError::Unauthorized`] (typically refresh and retry).
//!
//! ## Endpoints
//!
//! | Operation | Method | Path |
//! |-----------|--------|------|
//! | [`ApiClient::organization_config`] | GET | `organization/address-verification-config` |
//! | [`ApiClient::customer_history`] | GET | `customer/address-history` |
//! | [`ApiClient::add_geotag`] | POST | `customer/add-geotag` |
//! | [`ApiClient::refresh_token`] | POST | `customer/refresh-token` |

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use types::{
    AddGeoTagRequest, CustomerRecord, GeoLocation, OrganisationConfig, RecordMetadata, TokenPair,
};
