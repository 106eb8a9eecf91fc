//! Database models mapping to the site schema.

use sqlx::FromRow;
use time::OffsetDateTime;

/// Tenant site record.
///
/// `domains` is stored as a JSON array string; the first element is the
/// site's primary domain. Use [`SiteRow::domain_list`] to decode it.
#[derive(Debug, Clone, FromRow)]
pub struct SiteRow {
    pub site_id: i64,
    pub name: String,
    pub public: bool,
    pub salt_user_ids: bool,
    pub block_bots: bool,
    pub domains: String, // JSON array
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl SiteRow {
    /// Decode the JSON domain list. A malformed column value decodes to an
    /// empty list rather than failing a whole bulk load.
    pub fn domain_list(&self) -> Vec<String> {
        serde_json::from_str(&self.domains).unwrap_or_default()
    }

    /// Encode a domain list for storage.
    pub fn encode_domains(domains: &[String]) -> String {
        serde_json::to_string(domains).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Fields for creating a new site; the repository assigns the site id.
#[derive(Debug, Clone)]
pub struct NewSite {
    pub name: String,
    pub public: bool,
    pub salt_user_ids: bool,
    pub block_bots: bool,
    pub domains: Vec<String>,
}

impl Default for NewSite {
    fn default() -> Self {
        Self {
            name: String::new(),
            public: false,
            salt_user_ids: false,
            block_bots: true,
            domains: Vec::new(),
        }
    }
}
