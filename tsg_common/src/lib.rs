pub mod helpers;
mod money;
pub mod op;
mod secret;

pub use money::{MinorUnits, MoneyConversionError};
pub use secret::Secret;
