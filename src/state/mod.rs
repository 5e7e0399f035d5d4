pub mod context;
pub mod history;
pub mod stats;

pub use context::*;
pub use history::*;
pub use stats::*;
