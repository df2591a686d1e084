//! # etherpipe-core
//!
//! Core types for etherpipe: the hex quantity codec, account records and
//! client configuration.

pub mod config;
pub mod quantity;
pub mod types;

pub use quantity::{Quantity, QuantityError, WEI_DECIMALS};
pub use types::AccountInfo;
