use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use solana_pubkey::Pubkey;

use crate::error::Error;
use crate::protocols::payload::DecodedInstruction;
use crate::scanner::{AssetMutationEvent, EventKind};
use crate::types::TransactionBody;

/// RPC `getSignaturesForAddress` page size and upper limit.
pub const SIGNATURE_PAGE_SIZE: usize = 1000;

// ──── Boundary traits ────

/// Read access to confirmed transactions.
pub trait TransactionSource {
    /// `Ok(None)` when the node does not (yet) know the signature.
    fn fetch_transaction(&self, signature: &str) -> Result<Option<TransactionBody>, Error>;

    /// Signatures touching `address`, newest first.
    fn list_signatures(
        &self,
        address: &Pubkey,
        query: &SignatureQuery,
    ) -> Result<Vec<SignatureInfo>, Error>;
}

/// Push notifications of transactions mentioning an address.
pub trait LogSubscriber {
    fn subscribe_logs(
        &self,
        address: &Pubkey,
        on_signature: Box<dyn FnMut(String) + Send>,
    ) -> Result<(), Error>;
}

/// Off-chain metadata retrieval. `None` covers both unreachable URIs and non-JSON bodies.
pub trait MetadataFetcher {
    fn fetch(&self, uri: &str) -> Option<serde_json::Value>;
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SignatureQuery {
    /// Start searching backwards from this signature (exclusive).
    pub before: Option<String>,
    /// Stop when this signature is reached (exclusive).
    pub until: Option<String>,
    pub limit: usize,
}

/// One row of `getSignaturesForAddress`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub block_time: Option<i64>,
}

impl SignatureInfo {
    pub fn succeeded(&self) -> bool {
        self.err.is_none()
    }
}

// ──── Retry ────

/// Bounded retry schedule with doubling delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Shared stop flag checked between retry attempts.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Fetch a transaction that may not be visible yet.
///
/// `NotFound` and transport errors are both retried. Gives up with
/// `TransactionUnavailable` after `policy.max_attempts`, or `Cancelled` as soon as the
/// token is observed set.
pub fn fetch_with_retries<S, F>(
    source: &S,
    signature: &str,
    policy: &RetryPolicy,
    token: &CancellationToken,
    mut sleep: F,
) -> Result<TransactionBody, Error>
where
    S: TransactionSource + ?Sized,
    F: FnMut(Duration),
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        if token.is_cancelled() {
            return Err(Error::Cancelled {
                signature: signature.to_string(),
            });
        }
        match source.fetch_transaction(signature) {
            Ok(Some(body)) => return Ok(body),
            Ok(None) => tracing::debug!(signature, attempt, "transaction not found yet"),
            Err(e) => tracing::warn!(signature, attempt, error = %e, "transaction fetch failed"),
        }
        if attempt < attempts {
            sleep(policy.delay_after(attempt));
        }
    }
    tracing::warn!(signature, attempts, "giving up on transaction");
    Err(Error::TransactionUnavailable {
        signature: signature.to_string(),
        attempts,
    })
}

// ──── Backfill ────

/// Persisted progress of a tree's history walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BackfillCursor {
    pub last_processed_signature: Option<String>,
    pub genesis_backfill_completed: bool,
}

impl BackfillCursor {
    /// Initial `(before, until)` pair.
    ///
    /// Until the walk has reached the tree's first transaction it resumes backwards from
    /// the oldest signature handled so far. Afterwards it only fetches what is newer than
    /// the last processed signature.
    pub fn initial_query(&self, limit: usize) -> SignatureQuery {
        if self.genesis_backfill_completed {
            SignatureQuery {
                before: None,
                until: self.last_processed_signature.clone(),
                limit,
            }
        } else {
            SignatureQuery {
                before: self.last_processed_signature.clone(),
                until: None,
                limit,
            }
        }
    }

    /// Cursor to persist once every signature of a finished backfill was processed.
    pub fn completed_through(newest: Option<&str>, previous: &Self) -> Self {
        Self {
            last_processed_signature: newest
                .map(str::to_string)
                .or_else(|| previous.last_processed_signature.clone()),
            genesis_backfill_completed: true,
        }
    }
}

/// Collect every signature for `tree` selected by `cursor`, oldest first.
///
/// Pages newest-first and stops on an empty or short page. Failed transactions are
/// dropped since they cannot have changed tree state.
pub fn backfill_signatures<S>(
    source: &S,
    tree: &Pubkey,
    cursor: &BackfillCursor,
    page_size: usize,
) -> Result<Vec<SignatureInfo>, Error>
where
    S: TransactionSource + ?Sized,
{
    let page_size = page_size.clamp(1, SIGNATURE_PAGE_SIZE);
    let mut query = cursor.initial_query(page_size);
    let mut collected = Vec::new();

    loop {
        let page = source.list_signatures(tree, &query)?;
        let page_len = page.len();
        let Some(oldest) = page.last() else {
            break;
        };
        query.before = Some(oldest.signature.clone());
        tracing::info!(tree = %tree, page = page_len, before = ?query.before, "backfill page");
        collected.extend(page.into_iter().filter(SignatureInfo::succeeded));
        if page_len < page_size {
            break;
        }
    }

    collected.reverse();
    Ok(collected)
}

// ──── Metadata ────

/// Off-chain JSON for a mint event's `uri`. Other events never trigger a fetch.
pub fn fetch_mint_metadata<M>(event: &AssetMutationEvent, fetcher: &M) -> Option<serde_json::Value>
where
    M: MetadataFetcher + ?Sized,
{
    if event.kind != EventKind::Mint {
        return None;
    }
    let DecodedInstruction::Mint(metadata) = &event.payload else {
        return None;
    };
    let uri = metadata.uri.trim_end_matches('\0').trim();
    if uri.is_empty() {
        return None;
    }
    let fetched = fetcher.fetch(uri);
    if fetched.is_none() {
        tracing::debug!(uri, signature = %event.signature, "metadata unavailable");
    }
    fetched
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct FlakySource {
        misses: u32,
        calls: Cell<u32>,
        pages: Vec<Vec<SignatureInfo>>,
        queries: RefCell<Vec<SignatureQuery>>,
    }

    impl FlakySource {
        fn new(misses: u32) -> Self {
            Self {
                misses,
                calls: Cell::new(0),
                pages: Vec::new(),
                queries: RefCell::new(Vec::new()),
            }
        }

        fn with_pages(pages: Vec<Vec<SignatureInfo>>) -> Self {
            Self {
                pages,
                ..Self::new(0)
            }
        }
    }

    impl TransactionSource for FlakySource {
        fn fetch_transaction(&self, signature: &str) -> Result<Option<TransactionBody>, Error> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if call <= self.misses {
                if call % 2 == 0 {
                    return Err(Error::Transport {
                        reason: "connection reset".to_string(),
                    });
                }
                return Ok(None);
            }
            Ok(Some(TransactionBody {
                signature: signature.to_string(),
                slot: 9,
                account_keys: vec![],
                loaded_addresses: Default::default(),
                instructions: vec![],
                inner_instructions: vec![],
            }))
        }

        fn list_signatures(
            &self,
            _address: &Pubkey,
            query: &SignatureQuery,
        ) -> Result<Vec<SignatureInfo>, Error> {
            let mut queries = self.queries.borrow_mut();
            let page = self.pages.get(queries.len()).cloned().unwrap_or_default();
            queries.push(query.clone());
            Ok(page)
        }
    }

    fn info(signature: &str, slot: u64) -> SignatureInfo {
        SignatureInfo {
            signature: signature.to_string(),
            slot,
            err: None,
            block_time: None,
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
        }
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let p = policy(10);
        let delays: Vec<_> = (1..=5).map(|a| p.delay_after(a).as_millis()).collect();
        assert_eq!(delays, vec![10, 20, 40, 50, 50]);
        assert_eq!(p.delay_after(64), p.max_delay);
    }

    #[test]
    fn retries_until_transaction_appears() {
        let source = FlakySource::new(3);
        let mut slept = Vec::new();
        let body = fetch_with_retries(&source, "abc", &policy(5), &CancellationToken::new(), |d| {
            slept.push(d);
        })
        .unwrap();
        assert_eq!(body.signature, "abc");
        assert_eq!(source.calls.get(), 4);
        assert_eq!(slept.len(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let source = FlakySource::new(u32::MAX);
        let mut sleeps = 0;
        let err = fetch_with_retries(&source, "abc", &policy(3), &CancellationToken::new(), |_| {
            sleeps += 1;
        })
        .unwrap_err();
        assert!(matches!(
            err,
            Error::TransactionUnavailable { attempts: 3, .. }
        ));
        assert_eq!(source.calls.get(), 3);
        assert_eq!(sleeps, 2);
    }

    #[test]
    fn cancellation_stops_before_next_attempt() {
        let source = FlakySource::new(u32::MAX);
        let token = CancellationToken::new();
        let observer = token.clone();
        let err = fetch_with_retries(&source, "abc", &policy(10), &token, |_| observer.cancel())
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled { .. }));
        assert_eq!(source.calls.get(), 1);
    }

    #[test]
    fn fresh_cursor_walks_back_from_the_tip() {
        let cursor = BackfillCursor::default();
        assert_eq!(
            cursor.initial_query(1000),
            SignatureQuery {
                before: None,
                until: None,
                limit: 1000
            }
        );
        let resumed = BackfillCursor {
            last_processed_signature: Some("s".to_string()),
            genesis_backfill_completed: false,
        };
        assert_eq!(resumed.initial_query(10).before.as_deref(), Some("s"));
        let caught_up = BackfillCursor::completed_through(Some("n"), &resumed);
        assert_eq!(caught_up.initial_query(10).until.as_deref(), Some("n"));
        assert_eq!(caught_up.initial_query(10).before, None);
    }

    #[test]
    fn backfill_pages_until_short_page_and_returns_oldest_first() {
        let source = FlakySource::with_pages(vec![
            vec![info("s5", 50), info("s4", 40)],
            vec![info("s3", 30), info("s2", 20)],
            vec![info("s1", 10)],
        ]);
        let tree = Pubkey::new_from_array([1; 32]);
        let signatures = backfill_signatures(&source, &tree, &BackfillCursor::default(), 2).unwrap();
        let names: Vec<_> = signatures.iter().map(|s| s.signature.as_str()).collect();
        assert_eq!(names, vec!["s1", "s2", "s3", "s4", "s5"]);
        let befores: Vec<_> = source
            .queries
            .borrow()
            .iter()
            .map(|q| q.before.clone())
            .collect();
        assert_eq!(
            befores,
            vec![None, Some("s4".to_string()), Some("s2".to_string())]
        );
    }

    #[test]
    fn backfill_stops_on_empty_page_and_drops_failures() {
        let mut failed = info("bad", 15);
        failed.err = Some(serde_json::json!({"InstructionError": [0, "Custom"]}));
        let source = FlakySource::with_pages(vec![vec![info("b", 20), failed], vec![]]);
        let tree = Pubkey::new_from_array([1; 32]);
        let signatures = backfill_signatures(&source, &tree, &BackfillCursor::default(), 2).unwrap();
        assert_eq!(signatures.len(), 1);
        assert_eq!(signatures[0].signature, "b");
        assert_eq!(source.queries.borrow().len(), 2);
    }

    #[test]
    fn signature_info_deserializes_from_rpc_shape() {
        let row: SignatureInfo = serde_json::from_value(serde_json::json!({
            "signature": "abc",
            "slot": 7,
            "err": null,
            "memo": null,
            "blockTime": 1_700_000_000,
            "confirmationStatus": "finalized"
        }))
        .unwrap();
        assert!(row.succeeded());
        assert_eq!(row.block_time, Some(1_700_000_000));
    }
}
