use frstack_functions::{Channel, FunctionError};
use serde_json::Value;

/// All possible messages that drive the host loop.
#[derive(Debug)]
pub enum Msg {
    // -- Input events (raw)
    Line(String),

    // -- Function results
    FunctionDone {
        index: usize,
        channel: Channel,
        result: Result<Value, FunctionError>,
    },

    // -- System
    Tick,
    Quit,
}
