//! Search statement construction and execution.
//!
//! - [`builder`] turns raw user input into a parameterized union query
//! - [`executor`] runs it against a snapshot with a per-call connection

pub mod builder;
pub mod executor;

pub use builder::{build, tokenize, Branch, BuiltQuery, Keyword, QueryBuilder};
pub use executor::{execute, execute_at, RawRow};
