//! Market data feeds: token prices and wallet holdings.

pub mod error;
pub mod oracle;
pub mod wallet;

pub use error::*;
pub use oracle::*;
pub use wallet::*;
