pub mod enums;
pub mod extraction;
pub mod proposal;

pub use enums::*;
pub use extraction::*;
pub use proposal::*;
