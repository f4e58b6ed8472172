pub mod helpers;
mod money;

pub mod op;
mod secret;
pub mod signature;

pub use money::{MinorUnits, MinorUnitsError};
pub use secret::Secret;
