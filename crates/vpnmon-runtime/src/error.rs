use miette::Diagnostic;
use thiserror::Error;

/// Runtime error type for fetching, probing and reporting
#[derive(Error, Debug, Diagnostic)]
pub enum MonitorError {
    /// Node list source could not be reached
    #[error("Transport failure talking to {endpoint}: {message}")]
    #[diagnostic(
        code(vpnmon::runtime::transport),
        help("Check network connectivity to the VPN manager API and that the URL is correct")
    )]
    Transport {
        #[allow(unused)]
        endpoint: String,
        #[allow(unused)]
        message: String,
    },

    /// API answered with a non-success status
    #[error("API request to {endpoint} failed with status {status}")]
    #[diagnostic(
        code(vpnmon::runtime::api_request_failed),
        help("Response body: {body}. A 401/403 usually means the token in the credentials file is wrong or expired")
    )]
    ApiRequestFailed {
        #[allow(unused)]
        endpoint: String,
        #[allow(unused)]
        status: u16,
        #[allow(unused)]
        body: String,
    },

    /// Node list fetch gave up after the configured number of attempts
    #[error("Failed to fetch node list after {attempts} attempt(s): {last_error}")]
    #[diagnostic(
        code(vpnmon::runtime::fetch_exhausted),
        help("The API stayed unreachable for the whole retry budget. Raise --fetch-attempts or --fetch-interval, or check the API host")
    )]
    FetchExhausted {
        #[allow(unused)]
        attempts: u32,
        #[allow(unused)]
        last_error: String,
    },

    /// Command execution failed
    #[error("Command '{command}' failed with exit code {exit_code}")]
    #[diagnostic(code(vpnmon::runtime::command_failed), help("stderr: {stderr}"))]
    CommandFailed {
        #[allow(unused)]
        command: String,
        #[allow(unused)]
        exit_code: i32,
        #[allow(unused)]
        stderr: String,
    },

    /// Raw probe log could not be opened or written
    #[error("Failed to write probe log '{path}': {message}")]
    #[diagnostic(
        code(vpnmon::runtime::log_write_failed),
        help("Make sure the directory exists and is writable, or point --log-path somewhere else")
    )]
    LogWriteFailed {
        #[allow(unused)]
        path: String,
        #[allow(unused)]
        message: String,
    },

    /// Credentials file could not be loaded
    #[error("Failed to load credentials from '{path}': {message}")]
    #[diagnostic(
        code(vpnmon::runtime::credentials),
        help("The credentials file must be JSON of the form {{\"url\": \"https://...\", \"token\": \"...\"}}")
    )]
    Credentials {
        #[allow(unused)]
        path: String,
        #[allow(unused)]
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(vpnmon::runtime::invalid_config), help("{suggestion}"))]
    InvalidConfig {
        #[allow(unused)]
        message: String,
        #[allow(unused)]
        suggestion: String,
    },

    /// Core library error
    #[error(transparent)]
    #[diagnostic(transparent)]
    CoreError(#[from] vpnmon_core::CoreError),

    /// Internal error
    #[error("Internal runtime error: {message}")]
    #[diagnostic(
        code(vpnmon::runtime::internal_error),
        help("This is likely a bug in vpnmon-runtime. Please report it with the full error details")
    )]
    InternalError {
        #[allow(unused)]
        message: String,
    },
}

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn api_request_failed(
        endpoint: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::ApiRequestFailed {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        }
    }

    pub fn fetch_exhausted(attempts: u32, last_error: impl Into<String>) -> Self {
        Self::FetchExhausted {
            attempts,
            last_error: last_error.into(),
        }
    }

    pub fn command_failed(
        command: impl Into<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    pub fn log_write_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LogWriteFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn credentials(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Credentials {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
