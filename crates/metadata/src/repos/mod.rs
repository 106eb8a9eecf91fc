//! Repository traits for site metadata operations.

pub mod sites;

pub use sites::SiteRepo;
