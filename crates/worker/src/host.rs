//! Control signals exposed by the hosting environment.

use async_trait::async_trait;

use intercache_core::Error;

/// The control capability: lifecycle signals the engine sends back to
/// whatever registered it.
#[async_trait]
pub trait HostControl: Send + Sync {
    /// Skip the waiting period after a successful install, so the new
    /// generation becomes the active candidate without every existing
    /// client closing first.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Take control of all currently open clients after activation, so
    /// the new interception policy applies to already-open pages.
    async fn claim_clients(&self) -> Result<(), Error>;
}

/// Host that accepts every signal and does nothing. For hosting
/// environments without a waiting/claim protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

#[async_trait]
impl HostControl for NoopHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        Ok(())
    }
}
