//! Value and type system

pub mod data_type;
pub mod value;

pub use data_type::{DataType, Signature, render_call, select_overload};
pub use value::{Interval, Row, Value};
