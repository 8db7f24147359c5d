//! 공통 타입 정의.

pub mod date;
pub mod identifier;
pub mod instrument;
pub mod record;
pub mod table;

pub use date::*;
pub use identifier::*;
pub use instrument::*;
pub use record::*;
pub use table::*;
