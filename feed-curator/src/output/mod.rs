pub mod api;
pub mod json_path;
pub mod local;
pub mod template;

use std::fmt;

use tracing::warn;

pub use crate::traits::Dispatcher;
pub use api::ApiPusher;
pub use local::{sanitize_filename, LocalWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMethod {
    Api,
    Local,
}

impl OutputMethod {
    /// Case-insensitive; unrecognized values warn and fall back to `Api`.
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "api" => OutputMethod::Api,
            "local" => OutputMethod::Local,
            other => {
                warn!("Invalid output method '{}' configured. Defaulting to 'api'.", other);
                OutputMethod::Api
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMethod::Api => "api",
            OutputMethod::Local => "local",
        }
    }
}

impl fmt::Display for OutputMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub success: bool,
    /// `"API"` for remote pushes, the file path for local writes.
    pub destination: String,
}

impl DispatchOutcome {
    pub fn ok(destination: impl Into<String>) -> Self {
        Self { success: true, destination: destination.into() }
    }

    pub fn failed(destination: impl Into<String>) -> Self {
        Self { success: false, destination: destination.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_method_falls_back_to_api() {
        assert_eq!(OutputMethod::parse_or_default("LOCAL"), OutputMethod::Local);
        assert_eq!(OutputMethod::parse_or_default("ftp"), OutputMethod::Api);
    }
}
