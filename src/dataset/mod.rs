//! Dataset module: extracted records and their final tabular form
//!
//! - `Record`: one catalog item as extracted from its detail page
//! - `assemble`: stamps sequential ids and projects records into the
//!   fixed column order handed to persistence

mod assembler;
mod record;

pub use assembler::{assemble, Dataset, DatasetRow};
pub use record::{Rating, Record};
