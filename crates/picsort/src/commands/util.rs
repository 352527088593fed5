//! Shared helpers for command handlers.

use std::future::Future;
use std::time::Duration;

use picsort_core::{CoreError, LinkState, Session, SessionConfig};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Everything a server-bound command needs: the session plus how to
/// report on it.
pub struct Ctx {
    pub session: Session,
    pub format: OutputFormat,
    pub color: bool,
    timeout: Duration,
}

impl Ctx {
    pub fn new(config: SessionConfig, format: OutputFormat, color: bool) -> Result<Self, CliError> {
        let timeout = config.timeout;
        let server = config.server.to_string();
        let session = Session::new(config)
            .map_err(|e| CliError::from(e).in_context(&server, timeout.as_secs()))?;
        Ok(Self {
            session,
            format,
            color,
            timeout,
        })
    }

    /// Convert a core error, filling in the server address and timeout.
    pub fn fail(&self, err: CoreError) -> CliError {
        CliError::from(err).in_context(self.session.config().server.as_str(), self.timeout.as_secs())
    }

    /// Start the session and wait until the event channel is up, so that
    /// outbound messages are not dropped.
    pub async fn connect(&self) -> Result<(), CliError> {
        self.session.connect().await.map_err(|e| self.fail(e))?;

        let Some(mut state) = self.session.link_state() else {
            return Err(self.fail(CoreError::NotConnected));
        };
        let connected = tokio::time::timeout(
            self.timeout,
            state.wait_for(|s| *s == LinkState::Connected),
        )
        .await;
        match connected {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) | Err(_) => Err(self.fail(CoreError::NotConnected)),
        }
    }

    /// Await `fut` for at most the configured timeout.
    pub async fn within<T>(&self, waiting_for: &str, fut: impl Future<Output = T>) -> Result<T, CliError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| CliError::Timeout {
                seconds: self.timeout.as_secs(),
                waiting_for: waiting_for.to_owned(),
            })
    }
}
