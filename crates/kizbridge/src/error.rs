//! Daemon error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use kizbridge_core::CoreError;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Configuration file not found")]
    #[diagnostic(
        code(kizbridge::no_config),
        help(
            "Create one at {path} or point at it with --config.\n\
             See config-example.toml for the expected layout."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(kizbridge::config))]
    Config(Box<figment::Error>),

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(kizbridge::validation))]
    Validation { field: String, reason: String },

    #[error("Bridge session failed")]
    #[diagnostic(
        code(kizbridge::session),
        help(
            "A liveness timeout or an unrecoverable cloud API error ended the session.\n\
             Check credentials and connectivity, then restart the daemon."
        )
    )]
    Session {
        #[source]
        source: CoreError,
    },
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl From<CoreError> for CliError {
    fn from(source: CoreError) -> Self {
        Self::Session { source }
    }
}

impl From<overkiz_api::Error> for CliError {
    fn from(err: overkiz_api::Error) -> Self {
        Self::Session { source: err.into() }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    ///
    /// Clean stops (maintenance, rate limit) never reach this type;
    /// everything that does is a failure.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
