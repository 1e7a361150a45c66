pub mod executor;
pub mod result;
pub mod runner;
pub mod tool;

pub use executor::*;
pub use result::*;
pub use runner::*;
pub use tool::*;
