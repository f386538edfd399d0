//! Host functions available outside a single invocation kind: GAS, FETCH, LOOKUP, READ, WRITE,
//! INFO and LOG. Each is generic over the context accessor trait it needs.

pub mod fetch;
mod gas;
mod info;
mod log;
mod lookup;
mod read;
mod write;

pub use fetch::{FetchData, FetchHostFunction};
pub use gas::GasHostFunction;
pub use info::{encode_info, InfoHostFunction};
pub use log::{emit as emit_log, LogHostFunction};
pub use lookup::LookupHostFunction;
pub use read::ReadHostFunction;
pub use write::WriteHostFunction;
