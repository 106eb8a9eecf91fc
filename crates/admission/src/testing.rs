//! Test doubles for the admission components.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;
use waypost_metadata::error::{MetadataError, MetadataResult};
use waypost_metadata::models::{NewSite, SiteRow};
use waypost_metadata::repos::SiteRepo;
use waypost_metadata::store::MetadataStore;

/// Build a site row for tests.
pub(crate) fn site_row(
    site_id: i64,
    public: bool,
    salt_user_ids: bool,
    block_bots: bool,
    domains: &[&str],
) -> SiteRow {
    let now = OffsetDateTime::now_utc();
    SiteRow {
        site_id,
        name: format!("site-{site_id}"),
        public,
        salt_user_ids,
        block_bots,
        domains: SiteRow::encode_domains(
            &domains.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
        ),
        created_at: now,
        updated_at: now,
    }
}

/// In-memory `MetadataStore` stub with call counting, optional failure
/// injection and an optional per-call delay for concurrency tests.
pub(crate) struct StubStore {
    /// Datasets served by successive `list_sites` calls; the last one repeats.
    datasets: Mutex<VecDeque<Vec<SiteRow>>>,
    list_calls: AtomicUsize,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl StubStore {
    pub fn empty() -> Arc<Self> {
        Self::with_sites(Vec::new())
    }

    pub fn with_sites(sites: Vec<SiteRow>) -> Arc<Self> {
        Self::sequence(vec![sites])
    }

    pub fn sequence(datasets: Vec<Vec<SiteRow>>) -> Arc<Self> {
        Arc::new(Self {
            datasets: Mutex::new(datasets.into()),
            list_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            delay: Mutex::new(None),
        })
    }

    /// Make subsequent `list_sites` calls fail.
    pub fn fail_next_loads(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Delay each `list_sites` call, keeping loads in flight long enough for
    /// concurrent callers to pile up.
    pub fn delay_loads(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SiteRepo for StubStore {
    async fn create_site(&self, _site: &NewSite) -> MetadataResult<SiteRow> {
        Err(MetadataError::Internal(
            "create_site not supported by stub".to_string(),
        ))
    }

    async fn get_site(&self, _site_id: i64) -> MetadataResult<Option<SiteRow>> {
        Ok(None)
    }

    async fn list_sites(&self) -> MetadataResult<Vec<SiteRow>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(MetadataError::Internal(
                "stub repository failure".to_string(),
            ));
        }

        let mut datasets = self.datasets.lock().unwrap();
        let sites = if datasets.len() > 1 {
            datasets.pop_front().unwrap_or_default()
        } else {
            datasets.front().cloned().unwrap_or_default()
        };
        Ok(sites)
    }

    async fn update_site(&self, _site: &SiteRow) -> MetadataResult<()> {
        Ok(())
    }

    async fn delete_site(&self, _site_id: i64) -> MetadataResult<()> {
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for StubStore {
    async fn migrate(&self) -> MetadataResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        Ok(())
    }
}
