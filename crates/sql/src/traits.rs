//! # Backend traits
//!
//! Traits implemented by concrete storage backends so callers can connect to
//! them from explicit options or from the environment.

use anyhow::Result;

/// Implemented by backend resources to allow the backend to be opened from
/// connection options.
pub trait Backend: Sized {
    /// The options used to connect to the backend.
    type ConnectOptions: FromEnv;

    /// Connect to the resource using options read from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be loaded or the connection
    /// cannot be opened.
    fn connect() -> Result<Self> {
        Self::connect_with(Self::ConnectOptions::from_env()?)
    }

    /// Connect to the resource with the specified options.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be opened.
    fn connect_with(options: Self::ConnectOptions) -> Result<Self>;
}

/// Trait for creating connection options from environment variables.
pub trait FromEnv: Sized {
    /// Create connection options from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    fn from_env() -> Result<Self>;
}
