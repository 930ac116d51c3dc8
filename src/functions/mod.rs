pub mod action;
pub mod item;
pub mod registry;
pub mod samples;

pub use action::{Action, FunctionContext, Invocation};
pub use item::{FunctionItem, ItemView};
pub use registry::{ActivitySnapshot, FunctionRegistry, FunctionSet, RegistryState};
pub use samples::SampleFunctions;
