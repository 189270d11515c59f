pub mod extraction_field;
pub mod proposal;

pub use extraction_field::*;
pub use proposal::*;
