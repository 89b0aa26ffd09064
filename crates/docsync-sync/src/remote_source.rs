//! Remote change source
//!
//! Decides, at the start of each pass, how remote state reaches the
//! reconciler: an incremental change-log slice, a full crawl, or nothing
//! at all when the stored token already matches the server.
//!
//! A crawl substitutes for the change log whenever the incremental feed
//! cannot be trusted: on the first pass for a root (no stored token), when
//! the server reports the stored token expired, when the repository does
//! not advertise change-log support, and periodically as a safety net
//! against missed events. The periodic interval stretches with the poll
//! interval so slow pollers do not crawl disproportionately often.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use docsync_core::domain::{ChangeLogToken, RemoteChangeEvent};
use docsync_core::ports::{ILocalIndex, IRemoteRepository, RemoteError};

/// Events requested per change-log page
const DEFAULT_PAGE_SIZE: u32 = 100;

/// How the remote side of a pass should be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemotePlan {
    /// The stored token matches the server; nothing to apply
    NoOp,
    /// Apply these change events, then persist `token`
    ChangeLog {
        events: Vec<RemoteChangeEvent>,
        token: ChangeLogToken,
    },
    /// Walk the whole remote tree; persist `token` afterwards when present
    Crawl { token: Option<ChangeLogToken> },
}

/// Chooses between change-log consumption and full crawls
///
/// Owns the forced-crawl counter, which advances once per call to
/// [`plan`](RemoteChangeSource::plan) and resets whenever any crawl is
/// scheduled.
pub struct RemoteChangeSource {
    remote: Arc<dyn IRemoteRepository + Send + Sync>,
    page_size: u32,
    crawl_interval: u32,
    passes_since_crawl: AtomicU32,
}

impl RemoteChangeSource {
    pub fn new(remote: Arc<dyn IRemoteRepository + Send + Sync>, poll_interval_secs: u64) -> Self {
        Self::with_intervals(
            remote,
            forced_crawl_interval(poll_interval_secs),
            DEFAULT_PAGE_SIZE,
        )
    }

    pub fn with_intervals(
        remote: Arc<dyn IRemoteRepository + Send + Sync>,
        crawl_interval: u32,
        page_size: u32,
    ) -> Self {
        Self {
            remote,
            page_size,
            crawl_interval,
            passes_since_crawl: AtomicU32::new(0),
        }
    }

    /// Chooses the remote plan for the next pass
    ///
    /// # Errors
    /// Returns an error when the remote session or the index cannot be
    /// consulted at all; the pass aborts and retries later.
    pub async fn plan(&self, index: &dyn ILocalIndex) -> Result<RemotePlan> {
        let supported = self
            .remote
            .supports_change_log()
            .await
            .context("Querying change-log capability")?;
        if !supported {
            debug!("Repository has no change log, crawling");
            return Ok(RemotePlan::Crawl { token: None });
        }

        let pass_number = self.passes_since_crawl.fetch_add(1, Ordering::SeqCst) + 1;
        if pass_number >= self.crawl_interval {
            self.passes_since_crawl.store(0, Ordering::SeqCst);
            info!(interval = self.crawl_interval, "Periodic full crawl due");
            return self.crawl_plan().await;
        }

        let stored = index
            .change_log_token()
            .await
            .context("Reading stored change-log token")?;
        let Some(stored) = stored else {
            info!("No stored change-log token, first crawl for this root");
            self.passes_since_crawl.store(0, Ordering::SeqCst);
            return self.crawl_plan().await;
        };

        let server = self
            .remote
            .change_log_token()
            .await
            .context("Fetching server change-log token")?;
        if server == stored {
            debug!("Change-log token unchanged, nothing to pull");
            return Ok(RemotePlan::NoOp);
        }

        self.collect_events(stored).await
    }

    /// Pages through the change log from `stored` to the head
    async fn collect_events(&self, stored: ChangeLogToken) -> Result<RemotePlan> {
        let mut events = Vec::new();
        let mut position = stored;

        loop {
            match self.remote.content_changes(&position, self.page_size).await {
                Ok(page) => {
                    events.extend(page.events);
                    position = page.next_token;
                    if !page.has_more {
                        break;
                    }
                }
                Err(RemoteError::InvalidToken) => {
                    warn!("Stored change-log token expired, falling back to crawl");
                    self.passes_since_crawl.store(0, Ordering::SeqCst);
                    return self.crawl_plan().await;
                }
                Err(e) => {
                    return Err(e).context("Fetching change-log page");
                }
            }
        }

        debug!(events = events.len(), "Change-log slice collected");
        Ok(RemotePlan::ChangeLog {
            events,
            token: position,
        })
    }

    async fn crawl_plan(&self) -> Result<RemotePlan> {
        // The head token is captured before the crawl so events arriving
        // during the crawl are replayed by the next incremental pass.
        let token = self
            .remote
            .change_log_token()
            .await
            .context("Fetching server change-log token before crawl")?;
        Ok(RemotePlan::Crawl { token: Some(token) })
    }
}

/// Passes between forced crawls, stretched by the polling interval
///
/// Roughly 2240 passes at a 1-second poll, 1796 at 30 seconds, 724 at
/// 248 seconds; slower pollers re-verify the whole tree less often in
/// wall-clock-proportional terms.
fn forced_crawl_interval(poll_interval_secs: u64) -> u32 {
    (1 + 263_907 / (poll_interval_secs + 117)) as u32
}

#[cfg(test)]
mod tests {
    use docsync_core::domain::ChangeKind;
    use docsync_core::ports::ILocalIndex;
    use docsync_index::{IndexPool, SqliteLocalIndex};

    use crate::testing::InMemoryRemote;

    use super::*;

    async fn index() -> SqliteLocalIndex {
        let pool = IndexPool::in_memory().await.unwrap();
        SqliteLocalIndex::new(pool.pool().clone())
    }

    #[test]
    fn test_forced_crawl_interval_formula() {
        assert_eq!(forced_crawl_interval(1), 2237);
        assert_eq!(forced_crawl_interval(30), 1796);
        assert!(forced_crawl_interval(3600) < forced_crawl_interval(30));
    }

    #[tokio::test]
    async fn test_unsupported_change_log_always_crawls() {
        let remote = Arc::new(InMemoryRemote::without_change_log());
        let source = RemoteChangeSource::new(remote, 30);
        let idx = index().await;

        assert_eq!(
            source.plan(&idx).await.unwrap(),
            RemotePlan::Crawl { token: None }
        );
    }

    #[tokio::test]
    async fn test_first_pass_crawls_with_server_token() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.seed_document("/a.txt", b"x").await;
        let source = RemoteChangeSource::new(remote.clone(), 30);
        let idx = index().await;

        let plan = source.plan(&idx).await.unwrap();
        let expected = remote.change_log_token().await.unwrap();
        assert_eq!(
            plan,
            RemotePlan::Crawl {
                token: Some(expected)
            }
        );
    }

    #[tokio::test]
    async fn test_matching_token_is_noop() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.seed_document("/a.txt", b"x").await;
        let source = RemoteChangeSource::new(remote.clone(), 30);
        let idx = index().await;

        let head = remote.change_log_token().await.unwrap();
        idx.set_change_log_token(&head).await.unwrap();

        assert_eq!(source.plan(&idx).await.unwrap(), RemotePlan::NoOp);
    }

    #[tokio::test]
    async fn test_new_events_are_collected_across_pages() {
        let remote = Arc::new(InMemoryRemote::new());
        let source = RemoteChangeSource::with_intervals(remote.clone(), u32::MAX, 2);
        let idx = index().await;

        let baseline = remote.change_log_token().await.unwrap();
        idx.set_change_log_token(&baseline).await.unwrap();

        remote.seed_document("/a.txt", b"1").await;
        remote.seed_document("/b.txt", b"2").await;
        remote.seed_document("/c.txt", b"3").await;

        let plan = source.plan(&idx).await.unwrap();
        let RemotePlan::ChangeLog { events, token } = plan else {
            panic!("expected change-log plan");
        };
        // Page size 2 forces two round trips for three events.
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.kind == ChangeKind::Created));
        assert_eq!(token, remote.change_log_token().await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_token_falls_back_to_crawl() {
        let remote = Arc::new(InMemoryRemote::new());
        let source = RemoteChangeSource::new(remote.clone(), 30);
        let idx = index().await;

        let stale = remote.change_log_token().await.unwrap();
        idx.set_change_log_token(&stale).await.unwrap();
        remote.seed_document("/a.txt", b"x").await;
        remote.expire_tokens().await;

        let plan = source.plan(&idx).await.unwrap();
        let expected = remote.change_log_token().await.unwrap();
        assert_eq!(
            plan,
            RemotePlan::Crawl {
                token: Some(expected)
            }
        );
    }

    #[tokio::test]
    async fn test_periodic_crawl_after_interval() {
        let remote = Arc::new(InMemoryRemote::new());
        let source = RemoteChangeSource::with_intervals(remote.clone(), 3, 100);
        let idx = index().await;

        let head = remote.change_log_token().await.unwrap();
        idx.set_change_log_token(&head).await.unwrap();

        assert_eq!(source.plan(&idx).await.unwrap(), RemotePlan::NoOp);
        assert_eq!(source.plan(&idx).await.unwrap(), RemotePlan::NoOp);
        // Third pass hits the interval.
        assert!(matches!(
            source.plan(&idx).await.unwrap(),
            RemotePlan::Crawl { token: Some(_) }
        ));
        // Counter was reset; the next pass is incremental again.
        assert_eq!(source.plan(&idx).await.unwrap(), RemotePlan::NoOp);
    }
}
