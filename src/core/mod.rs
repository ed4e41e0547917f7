pub mod clip;
pub mod config;
pub mod time;
pub mod timeline;

pub use clip::*;
pub use config::*;
pub use timeline::*;
