//! Batch Configuration Module
//!
//! Describes batches of tasks in YAML and turns them into runnable work.
//!
//! # Structure
//!
//! - [`model`]: Batch and task entry data structures
//! - [`parser`]: YAML loading
//! - [`validator`]: Validation rules

pub mod model;
pub mod parser;
pub mod validator;

pub use model::{BatchConfig, PoolFlavor, TaskEntry};
pub use parser::{load_batch, parse_batch};
pub use validator::{validate_batch, ValidationError};
