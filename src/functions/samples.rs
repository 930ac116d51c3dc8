//! The sample function set shipped with FRStack custom functions.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::functions::action::{Action, FunctionContext, Invocation};
use crate::functions::item::FunctionItem;
use crate::functions::registry::FunctionSet;
use crate::rest::HostContext;

/// Builds the five sample items in menu order.
#[derive(Debug, Default, Clone, Copy)]
pub struct SampleFunctions;

impl FunctionSet for SampleFunctions {
    fn name(&self) -> &str {
        "sample"
    }

    fn build(&self, host: &HostContext) -> Vec<FunctionItem> {
        let no_radio = !host.has_session();

        vec![
            FunctionItem::new("Say _Hello", SayHello),
            FunctionItem::new("_Disable toggle menu items", ToggleEnabled),
            FunctionItem::new("Toggle _MOX", ToggleTransmit).hidden(no_radio),
            FunctionItem::new("Rest Radio Info", RadioInfo).hidden(no_radio),
            FunctionItem::new(
                "SPE Amp Window Toggle",
                RestCommand::new("FRStack", "SPEWINDOW", Some("2")),
            ),
        ]
    }
}

/// Answers `"Hello"`.
#[derive(Debug, Clone, Copy)]
pub struct SayHello;

#[async_trait]
impl Action for SayHello {
    async fn invoke(&self, _ctx: &FunctionContext, _call: &Invocation) -> Result<Value> {
        Ok(Value::from("Hello"))
    }
}

/// Flips `enabled` on every visible item except the one invoking it.
#[derive(Debug, Clone, Copy)]
pub struct ToggleEnabled;

#[async_trait]
impl Action for ToggleEnabled {
    async fn invoke(&self, ctx: &FunctionContext, call: &Invocation) -> Result<Value> {
        let mut flipped = 0usize;
        for (index, item) in ctx.items().iter().enumerate() {
            if index == call.index || item.is_hidden() {
                continue;
            }
            item.toggle_enabled();
            flipped += 1;
        }

        debug!(flipped, "toggled enabled flags");
        Ok(Value::from(""))
    }
}

/// Flips the radio's MOX (transmit) flag.
#[derive(Debug, Clone, Copy)]
pub struct ToggleTransmit;

#[async_trait]
impl Action for ToggleTransmit {
    async fn invoke(&self, ctx: &FunctionContext, _call: &Invocation) -> Result<Value> {
        let on = ctx.require_session("Toggle MOX")?.toggle_transmit();
        debug!(mox = on, "toggled transmit");
        Ok(Value::from(""))
    }
}

/// Fetches `RADIO INFO` over REST and formats it for the calling channel.
///
/// REST callers get the raw object. Menu and hotkey callers get JSON text
/// for a message box.
#[derive(Debug, Clone, Copy)]
pub struct RadioInfo;

#[async_trait]
impl Action for RadioInfo {
    async fn invoke(&self, ctx: &FunctionContext, call: &Invocation) -> Result<Value> {
        let info = ctx.rest_call("RADIO", "INFO", None).await?;

        if call.called_by_rest() {
            return Ok(info);
        }

        Ok(Value::String(serde_json::to_string(&info)?))
    }
}

/// Forwards a fixed REST command and returns its result untouched.
#[derive(Debug, Clone)]
pub struct RestCommand {
    category: String,
    command: String,
    argument: Option<String>,
}

impl RestCommand {
    pub fn new(category: &str, command: &str, argument: Option<&str>) -> Self {
        Self {
            category: category.to_string(),
            command: command.to_string(),
            argument: argument.map(str::to_string),
        }
    }
}

#[async_trait]
impl Action for RestCommand {
    async fn invoke(&self, ctx: &FunctionContext, _call: &Invocation) -> Result<Value> {
        ctx.rest_call(&self.category, &self.command, self.argument.as_deref())
            .await
    }
}
