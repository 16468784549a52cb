//! Core data types: the persisted [`Record`], its codec, and [`Side`].

pub mod enums;
pub mod record;

pub use enums::*;
pub use record::*;
