//! Retry logic with exponential backoff
//!
//! Catalog requests go through [`with_retry`] so that a rate-limited or briefly
//! unreachable API does not abort playlist loading. The per-song search/fetch
//! attempts of the downloader are a separate mechanism with their own bound.
//!
//! # Example
//!
//! ```no_run
//! use playlist_dl::retry::{IsRetryable, with_retry};
//! use playlist_dl::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let result = with_retry(&config, || async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{CatalogError, Error, FetchError, SearchError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, refused connections, rate limiting, server errors)
/// should return `true`. Permanent failures (bad credentials, malformed data) should
/// return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

fn is_transient_io(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::Interrupted
    )
}

impl IsRetryable for reqwest::Error {
    fn is_retryable(&self) -> bool {
        self.is_timeout()
            || self.is_connect()
            || self.status().is_some_and(|s| is_transient_status(s.as_u16()))
    }
}

impl IsRetryable for CatalogError {
    fn is_retryable(&self) -> bool {
        match self {
            CatalogError::UnexpectedStatus { status, .. } => is_transient_status(*status),
            // Rate limiting on the token endpoint
            CatalogError::Authentication { status } => *status == 429,
            CatalogError::MissingCredentials(_)
            | CatalogError::InvalidSongsFile { .. }
            | CatalogError::InvalidRecord { .. } => false,
        }
    }
}

impl IsRetryable for SearchError {
    fn is_retryable(&self) -> bool {
        match self {
            SearchError::Request(e) => e.is_retryable(),
            SearchError::UnexpectedStatus { status } => is_transient_status(*status),
            SearchError::Decode(_) => false,
        }
    }
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_retryable(),
            FetchError::Io(e) => is_transient_io(e.kind()),
            FetchError::Timeout { .. } => true,
            FetchError::InvalidLink { .. }
            | FetchError::Unavailable { .. }
            | FetchError::NoAudioStream { .. } => false,
        }
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_retryable(),
            Error::Io(e) => is_transient_io(e.kind()),
            Error::Catalog(e) => e.is_retryable(),
            Error::Search(e) => e.is_retryable(),
            Error::Fetch(e) => e.is_retryable(),
            // Configuration, data and unknown errors are permanent
            Error::Config { .. }
            | Error::InvalidSong(_)
            | Error::Serialization(_)
            | Error::Other(_) => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (max attempts, delays, backoff multiplier, jitter)
/// * `operation` - Async closure that returns Result<T, E> where E implements IsRetryable
///
/// # Returns
///
/// Returns the successful result or the last error after all retry attempts are exhausted.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };
                tokio::time::sleep(jittered_delay).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
