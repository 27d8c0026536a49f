//! Core SMTP types.

mod address;
mod extension;
mod reply;

pub use address::{Address, is_valid_address};
pub use extension::{AuthMechanism, Extension};
pub use reply::{Reply, ReplyCode};
