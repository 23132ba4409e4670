// Consistent exit codes for the backfill CLI.
//
//   0  = success
//   1  = general error
//   2  = configuration/usage error
//   11 = authentication error
//   13 = network error
//   14 = git error
//   15 = malformed remote response

use std::process;

use backfill_engine::config::ConfigError;
use backfill_engine::git::history::HistoryError;
use backfill_engine::git::worker::GitWorkerError;
use backfill_engine::gitlab::FetchError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    Auth = 11,
    Network = 13,
    Git = 14,
    Malformed = 15,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Stable machine-readable label used in JSON error output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Error => "ERROR",
            Self::Usage => "CONFIG_ERROR",
            Self::Auth => "AUTH_FAILURE",
            Self::Network => "NETWORK_ERROR",
            Self::Git => "GIT_ERROR",
            Self::Malformed => "MALFORMED_RESPONSE",
        }
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.downcast_ref::<ConfigError>().is_some() {
                return Self::Usage;
            }
            if let Some(fetch) = cause.downcast_ref::<FetchError>() {
                return Self::from_fetch_error(fetch);
            }
            if let Some(history) = cause.downcast_ref::<HistoryError>() {
                return match history {
                    HistoryError::Parse { .. } => Self::Error,
                    _ => Self::Git,
                };
            }
            if cause.downcast_ref::<GitWorkerError>().is_some() {
                return Self::Git;
            }
        }

        Self::Error
    }

    pub fn from_fetch_error(err: &FetchError) -> Self {
        match err {
            FetchError::Unauthorized { .. } => Self::Auth,
            FetchError::Transport { .. } | FetchError::Status { .. } => Self::Network,
            FetchError::MalformedResponse { .. } => Self::Malformed,
            FetchError::InvalidUrl(_) | FetchError::InvalidToken => Self::Usage,
            FetchError::Client(_) => Self::Error,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}
