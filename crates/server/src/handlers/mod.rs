//! HTTP request handlers.

pub mod sites;
pub mod track;

pub use sites::*;
pub use track::*;
