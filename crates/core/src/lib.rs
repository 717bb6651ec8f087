//! Core data types for the wallet alert bot.

pub mod alert;
pub mod conversation;
pub mod ids;
pub mod token;
pub mod wallet;

pub use alert::*;
pub use conversation::*;
pub use ids::*;
pub use token::*;
pub use wallet::*;
