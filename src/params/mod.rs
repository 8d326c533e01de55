//! Typed parameters for traces and trace sets.

pub mod defs;
pub mod key;
pub mod map;
pub mod types;
pub mod value;

pub use defs::{ParameterDefinition, TraceParameterDefinitions};
pub use key::{Element, ParameterData, TypedKey};
pub use map::{TraceParameterMap, TraceSetParameterMap};
pub use types::ElementType;
pub use value::{Parameter, ParameterValue};
