//! Connection abstraction used by samplers

use crate::client::ObdClient;
use crate::error::ObdError;
use crate::pid::{Pid, PidResponse};
use tokio::io::{AsyncRead, AsyncWrite};

/// A long-lived link to the vehicle that answers one PID at a time
#[allow(async_fn_in_trait)]
pub trait ObdConnection {
    /// Query one PID. `Ok(None)` is an expected absence, not a failure.
    async fn query(&mut self, pid: Pid) -> Result<Option<PidResponse>, ObdError>;

    /// Release the link. Calling it again after success is a no-op.
    async fn close(&mut self) -> Result<(), ObdError>;
}

impl<S> ObdConnection for ObdClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn query(&mut self, pid: Pid) -> Result<Option<PidResponse>, ObdError> {
        self.query_pid(pid).await
    }

    async fn close(&mut self) -> Result<(), ObdError> {
        self.disconnect().await
    }
}
