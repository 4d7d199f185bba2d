pub mod compile;
pub mod describe;
pub mod dimensions;
pub mod intent;
pub mod values;

pub use compile::{compile, compile_all, Compiled, SelectionExpr};
pub use dimensions::{DimensionChoice, DimensionSelector};
pub use intent::{RawSelection, SelectionIntent};
pub use values::ValueSelector;
