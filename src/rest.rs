use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RestError;
use crate::session::HostSession;

/// The host's REST call-back, handed to a function set at `init`.
#[async_trait]
pub trait RestCall: Send + Sync {
    async fn call(
        &self,
        category: &str,
        command: &str,
        argument: Option<&str>,
    ) -> Result<Value, RestError>;
}

/// What the host passes to `init`.
#[derive(Clone)]
pub struct HostContext {
    /// `None` when no radio is connected.
    pub session: Option<Arc<dyn HostSession>>,
    pub rest: Arc<dyn RestCall>,
}

impl HostContext {
    pub fn new(session: Option<Arc<dyn HostSession>>, rest: Arc<dyn RestCall>) -> Self {
        Self { session, rest }
    }

    pub fn disconnected(rest: Arc<dyn RestCall>) -> Self {
        Self {
            session: None,
            rest,
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("session", &self.has_session())
            .finish_non_exhaustive()
    }
}
