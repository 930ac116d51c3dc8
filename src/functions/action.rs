use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::channel::Channel;
use crate::error::{FunctionError, Result};
use crate::functions::item::FunctionItem;
use crate::rest::RestCall;
use crate::session::HostSession;

/// A single dispatch as seen by an action.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Position of the invoked item in the registry.
    pub index: usize,
    pub channel: Option<Channel>,
    pub args: Vec<Value>,
}

impl Invocation {
    pub fn called_by_rest(&self) -> bool {
        self.channel.is_some_and(Channel::is_rest)
    }
}

/// State an action may read or mutate while it runs.
#[derive(Clone)]
pub struct FunctionContext {
    pub(crate) items: Arc<[FunctionItem]>,
    pub(crate) session: Option<Arc<dyn HostSession>>,
    pub(crate) rest: Arc<dyn RestCall>,
}

impl FunctionContext {
    pub fn items(&self) -> &[FunctionItem] {
        &self.items
    }

    pub fn session(&self) -> Option<&Arc<dyn HostSession>> {
        self.session.as_ref()
    }

    /// Returns the session or a `PreconditionMissing` naming `needed_by`.
    pub fn require_session(&self, needed_by: &'static str) -> Result<&Arc<dyn HostSession>> {
        self.session
            .as_ref()
            .ok_or(FunctionError::PreconditionMissing(needed_by))
    }

    pub async fn rest_call(
        &self,
        category: &str,
        command: &str,
        argument: Option<&str>,
    ) -> Result<Value> {
        Ok(self.rest.call(category, command, argument).await?)
    }
}

/// Behaviour attached to a [`FunctionItem`].
///
/// Implementations must not block the calling thread for long; slow work
/// belongs behind an `.await` or in a spawned task.
#[async_trait]
pub trait Action: Send + Sync {
    async fn invoke(&self, ctx: &FunctionContext, call: &Invocation) -> Result<Value>;
}
