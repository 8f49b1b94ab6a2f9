// Library exports for testing
// The binary (main.rs) imports these as well

pub mod error;
pub mod logger;


pub const APP_NAME: &str = "presence-bridge";
