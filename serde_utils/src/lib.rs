pub use crate::prefixed_hex_quantity::Quantity;

pub mod prefixed_hex_bytes;
pub mod prefixed_hex_quantity;

mod shared;
