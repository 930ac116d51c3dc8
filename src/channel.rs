use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::FunctionError;

/// Where an invocation came from. Actions use it to pick an output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    /// Host menu entry, result shown in a message box.
    Menu,
    /// Bound hotkey, result shown in a message box.
    Hotkey,
    /// Host REST API, result returned to the HTTP caller as-is.
    Rest,
}

impl Channel {
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Menu => "Menu",
            Channel::Hotkey => "Hotkey",
            Channel::Rest => "Rest",
        }
    }

    /// Reads the channel tag from element 0 of an argument vector.
    ///
    /// An empty vector means "untagged" and yields `None`. A present tag that
    /// is not one of the known channel names is rejected.
    pub fn from_args(args: &[Value]) -> Result<Option<Self>, FunctionError> {
        let Some(first) = args.first() else {
            return Ok(None);
        };

        match first {
            Value::String(tag) => tag.parse().map(Some),
            Value::Null => Ok(None),
            other => Err(FunctionError::InvalidChannel(other.to_string())),
        }
    }

    pub fn is_rest(self) -> bool {
        matches!(self, Channel::Rest)
    }
}

impl FromStr for Channel {
    type Err = FunctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        [Channel::Menu, Channel::Hotkey, Channel::Rest]
            .into_iter()
            .find(|channel| channel.label().eq_ignore_ascii_case(tag))
            .ok_or_else(|| FunctionError::InvalidChannel(tag.to_string()))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
