//! Custom functions for FRStack's menu, hotkeys and REST API.
//!
//! A [`FunctionRegistry`] owns an ordered list of [`FunctionItem`]s, each an
//! asynchronous [`Action`] with `enabled`/`hidden` display state. The host
//! drives it through `init`, `poll`, `dispatch` and `cleanup`, supplying an
//! optional live [`HostSession`] and a [`RestCall`] call-back.

pub mod channel;
pub mod config;
pub mod error;
pub mod functions;
pub mod host;
pub mod rest;
pub mod session;

pub use channel::Channel;
pub use error::{ErrorKind, FunctionError, RestError};
pub use functions::{
    Action, FunctionContext, FunctionItem, FunctionRegistry, FunctionSet, Invocation, ItemView,
    RegistryState, SampleFunctions,
};
pub use rest::{HostContext, RestCall};
pub use session::{EventKind, HostSession, SessionEvent, SliceRef, Subscription};
