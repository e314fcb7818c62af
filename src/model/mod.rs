pub mod document;
pub mod task;

pub use document::*;
pub use task::*;
