pub mod dataset;
pub mod navigation;
pub mod table;

pub use dataset::*;
pub use navigation::*;
pub use table::*;
