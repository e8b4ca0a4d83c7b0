//! Order Value Objects
//!
//! Commands, sides, instructions and trigger price rules.

mod command;
mod instructions;
mod side;
mod stops;

pub use command::{AmendSpec, CancelSpec, OrderCommand, OrderKind, OrderSpec};
pub use instructions::{ExecInstructions, PriceSource};
pub use side::OrderSide;
pub use stops::default_stop_price;
