pub mod core;
pub mod video;
