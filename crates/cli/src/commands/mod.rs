pub mod create;
pub mod flash_map;
pub mod inputs;
pub mod util;
pub mod verify;

pub use create::*;
pub use flash_map::*;
pub use inputs::*;
pub use util::*;
pub use verify::*;
