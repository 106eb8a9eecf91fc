//! Ingestion-time admission control for Waypost.
//!
//! Every incoming tracking request consults this crate before any event is
//! processed:
//! - [`SiteConfigCache`] answers per-site policy questions (public
//!   visibility, user-id salting, bot blocking, domain list) without
//!   touching the database.
//! - [`OriginAllowList`] decides whether a request's `Origin` header is
//!   permitted to submit events at all.
//!
//! Both components bulk-load from the site repository and are rebuilt by a
//! periodic refresh; administrative write paths additionally push targeted
//! updates into the cache so it never lags the database by more than the
//! write request itself. All lookups are synchronous, non-blocking and free
//! of I/O.

pub mod allowlist;
pub mod error;
pub mod site_cache;

#[cfg(test)]
pub(crate) mod testing;

pub use allowlist::{AllowListStats, OriginAllowList};
pub use error::LoadError;
pub use site_cache::{SiteConfigCache, SiteConfigEntry, SiteConfigUpdate};
