pub mod config;
pub mod doctor;
pub mod engine;

pub use config::*;
pub use doctor::*;
pub use engine::*;
