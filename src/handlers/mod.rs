pub mod config;
pub mod sentiment;
pub mod transcribe;

pub use config::*;
pub use sentiment::*;
pub use transcribe::*;
