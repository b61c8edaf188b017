pub mod cli;
pub mod audio;
pub mod playback;
pub mod config;
pub mod error;
pub mod models;
pub mod logging;


pub use error::*;
pub use models::*;
