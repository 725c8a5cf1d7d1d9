//! Fixed-point decimal and coin multiset arithmetic.

mod coins;
mod dec;

pub use coins::{serde_amount, Coins};
pub use dec::{Dec, MathError, PRECISION};
