//! OneBot v11 data model.
//!
//! - [`segment`] - message segments
//! - [`event`] - raw event shapes
//! - [`types`] - shared protocol types

pub mod event;
pub mod segment;
pub mod types;

pub use event::*;
pub use segment::*;
pub use types::*;
