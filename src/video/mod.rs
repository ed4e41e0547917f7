pub mod compositor;
pub mod orchestrator;
pub mod player;
pub mod probe;
pub mod resolver;
pub mod surface;


pub use compositor::*;
pub use orchestrator::*;
pub use player::*;
pub use probe::*;
pub use resolver::*;
pub use surface::*;
