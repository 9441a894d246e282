//! # gaia_hr environment state
//!
//! This module defines [`crate::env_state::HrEnv`], the **shared environment object** handed
//! to the remote catalog clients. It owns a persistent [`ureq::Agent`] configured with a global
//! timeout so that every query made through it either completes or fails within a bounded time.
//!
//! ## Structure
//!
//! ```text
//! HrEnv
//! ├── http_client  (ureq::Agent)
//! └── timeout      (std::time::Duration)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use gaia_hr::env_state::HrEnv;
//!
//! // 10 minutes is a sensible budget for dense globular-cluster queries
//! let env = HrEnv::with_timeout(Duration::from_secs(600));
//! assert_eq!(env.timeout(), Duration::from_secs(600));
//! ```
//!
//! ## Notes
//!
//! - [`HrEnv`] is cheaply cloneable (the agent shares its connection pool), so one instance can
//!   back several clients running on different threads.
//! - Non-2xx responses surface as [`ureq::Error::StatusCode`] wrapped into
//!   [`HrError::UreqHttpError`](crate::hr_errors::HrError::UreqHttpError).
use std::{fmt::Debug, time::Duration};

use ureq::Agent;

use crate::constants::{DEFAULT_HTTP_TIMEOUT_SECS, MAX_RESPONSE_BYTES};
use crate::hr_errors::HrError;

/// This object is passed to the remote catalog clients
/// to provide access to the HTTP session
///
/// # Fields
///
/// * `http_client` - A ureq agent used to make HTTP requests
/// * `timeout` - The global timeout applied to each request
#[derive(Debug, Clone)]
pub struct HrEnv {
    pub http_client: Agent,
    timeout: Duration,
}

impl Default for HrEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl HrEnv {
    /// Create a new environment with the default timeout
    /// ([`DEFAULT_HTTP_TIMEOUT_SECS`]).
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// Create a new environment whose HTTP agent aborts any request lasting longer than `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        let agent: Agent = config.into();

        HrEnv {
            http_client: agent,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Submit an `application/x-www-form-urlencoded` POST and return the response body.
    ///
    /// Arguments
    /// -----------------
    /// * `url`: the endpoint
    /// * `form`: the key/value pairs to encode in the body
    ///
    /// Return
    /// ----------
    /// * The body as text, or an [`HrError::UreqHttpError`] on transport failure, timeout,
    ///   non-2xx status, or a body larger than [`MAX_RESPONSE_BYTES`].
    pub(crate) fn post_form<I, K, V>(&self, url: &str, form: I) -> Result<String, HrError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut response = self.http_client.post(url).send_form(form)?;
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_string()?;
        Ok(body)
    }
}
