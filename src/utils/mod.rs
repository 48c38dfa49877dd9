pub mod sanitize;

pub use sanitize::{mask_address, mask_password};
