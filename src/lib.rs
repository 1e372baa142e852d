pub mod calls;
pub mod chats;
pub mod config;
pub mod directory;
pub mod error;
pub mod history;
pub mod logging;
pub mod status;

pub use error::{Error, Result};
