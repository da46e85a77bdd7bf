//! Client configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

use std::time::Duration;

/// Site the client talks to when nothing else is configured.
pub const DEFAULT_SITE_URL: &str = "http://localhost:8080";

/// REST namespace of the builder plugin, relative to the site root.
pub const API_NAMESPACE: &str = "wp-json/unicorn-builder/v1";

/// Header carrying the anti-forgery token on every request (`X-WP-Nonce`).
pub const NONCE_HEADER: &str = "x-wp-nonce";

/// Upper bound for any single remote call. A hung request fails with
/// `ApiError::Timeout` instead of leaving the UI pending forever.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// How long a closing modal stays rendered for its exit animation.
pub const MODAL_CLOSE_DELAY: Duration = Duration::from_millis(400);

/// Pointer travel required before a press turns into a drag.
pub const DRAG_ACTIVATION_DISTANCE: f32 = 8.0;

/// How many times a load refetches when local mutations settled while it was
/// in flight, before giving up and reporting itself superseded.
pub const MAX_LOAD_ATTEMPTS: usize = 3;

/// Environment variables read by [`ClientConfig::apply_env`](crate::ClientConfig::apply_env).
pub const ENV_PAGE_ID: &str = "UBR_PAGE_ID";
pub const ENV_NONCE: &str = "UBR_NONCE";
pub const ENV_SITE: &str = "UBR_SITE";
pub const ENV_API_BASE: &str = "UBR_API_BASE";
pub const ENV_TIMEOUT_SECS: &str = "UBR_TIMEOUT_SECS";
