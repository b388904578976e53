//! Schema model types.
//!
//! Everything here is an immutable value description. The same types describe
//! a schema declared by the application and one read back from a database.

mod column;
mod constraint;
mod default;
mod index;
mod schema;
mod sequence;
mod table;
mod types;

pub use column::*;
pub use constraint::*;
pub use default::*;
pub use index::*;
pub use schema::*;
pub use sequence::*;
pub use table::*;
pub use types::*;
