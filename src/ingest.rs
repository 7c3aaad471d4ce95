use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use solana_pubkey::Pubkey;

use crate::error::Error;
use crate::scanner::{AssetMutationEvent, TransactionScanner};
use crate::store::{ApplyDecision, MutationStore};
use crate::transport::{
    BackfillCursor, CancellationToken, LogSubscriber, RetryPolicy, SIGNATURE_PAGE_SIZE,
    TransactionSource, backfill_signatures, fetch_with_retries,
};

/// What one transaction contributed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub signature: String,
    pub slot: u64,
    pub applied: Vec<(AssetMutationEvent, ApplyDecision)>,
    /// Events the store refused with an error.
    pub rejected: usize,
}

impl IngestReport {
    pub fn decisions(&self) -> impl Iterator<Item = ApplyDecision> + '_ {
        self.applied.iter().map(|(_, decision)| *decision)
    }
}

/// A backfilled signature whose transaction could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSignature {
    pub signature: String,
    pub slot: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillOutcome {
    pub reports: Vec<IngestReport>,
    pub skipped: Vec<SkippedSignature>,
    /// Cursor to persist for the next run.
    pub cursor: BackfillCursor,
}

/// Fetch, scan, apply.
pub struct Ingestor<S, M> {
    scanner: TransactionScanner,
    source: S,
    store: M,
    policy: RetryPolicy,
    token: CancellationToken,
}

impl<S, M> Ingestor<S, M>
where
    S: TransactionSource,
    M: MutationStore,
{
    pub fn new(scanner: TransactionScanner, source: S, store: M, policy: RetryPolicy) -> Self {
        Self {
            scanner,
            source,
            store,
            policy,
            token: CancellationToken::new(),
        }
    }

    pub fn store(&self) -> &M {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Token observed between fetch attempts. Cancel it to stop in-flight retries.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn ingest_signature<F>(&self, signature: &str, sleep: F) -> Result<IngestReport, Error>
    where
        F: FnMut(Duration),
    {
        let body = fetch_with_retries(&self.source, signature, &self.policy, &self.token, sleep)?;
        let events = self.scanner.scan(&body);

        let mut applied = Vec::with_capacity(events.len());
        let mut rejected = 0;
        for event in events {
            match self.store.apply(&event) {
                Ok(decision) => applied.push((event, decision)),
                Err(e) => {
                    rejected += 1;
                    tracing::warn!(
                        signature = %body.signature,
                        ordinal = event.ordinal,
                        kind = %event.kind,
                        error = %e,
                        "store rejected event"
                    );
                }
            }
        }

        Ok(IngestReport {
            signature: body.signature,
            slot: body.slot,
            applied,
            rejected,
        })
    }

    /// Ingest the history of `tree` selected by `cursor`, oldest first.
    ///
    /// A transaction that stays unavailable is recorded in `skipped` and the cursor still
    /// advances past it. Only cancellation aborts the run, leaving the caller's cursor as is.
    pub fn backfill<F>(
        &self,
        tree: &Pubkey,
        cursor: &BackfillCursor,
        mut sleep: F,
    ) -> Result<BackfillOutcome, Error>
    where
        F: FnMut(Duration),
    {
        let signatures = backfill_signatures(&self.source, tree, cursor, SIGNATURE_PAGE_SIZE)?;
        tracing::info!(tree = %tree, count = signatures.len(), "backfilling");

        let mut reports = Vec::with_capacity(signatures.len());
        let mut skipped = Vec::new();
        for info in &signatures {
            match self.ingest_signature(&info.signature, &mut sleep) {
                Ok(report) => reports.push(report),
                Err(e @ Error::Cancelled { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        tree = %tree,
                        signature = %info.signature,
                        slot = info.slot,
                        error = %e,
                        "skipping unavailable transaction"
                    );
                    skipped.push(SkippedSignature {
                        signature: info.signature.clone(),
                        slot: info.slot,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let newest = signatures.last().map(|info| info.signature.as_str());
        Ok(BackfillOutcome {
            reports,
            skipped,
            cursor: BackfillCursor::completed_through(newest, cursor),
        })
    }

    /// Subscribe to `tree` and queue every notified signature for [`drain`](Self::drain).
    pub fn watch<L>(&self, subscriber: &L, tree: &Pubkey) -> Result<Receiver<String>, Error>
    where
        L: LogSubscriber + ?Sized,
    {
        let (sender, receiver) = mpsc::channel();
        subscriber.subscribe_logs(
            tree,
            Box::new(move |signature| {
                if sender.send(signature).is_err() {
                    tracing::debug!("watch receiver dropped");
                }
            }),
        )?;
        tracing::info!(tree = %tree, "watching tree");
        Ok(receiver)
    }

    /// Ingest every signature queued so far. Unavailable transactions are reported in
    /// place and do not stop the rest.
    pub fn drain<F>(
        &self,
        pending: &Receiver<String>,
        mut sleep: F,
    ) -> Vec<Result<IngestReport, Error>>
    where
        F: FnMut(Duration),
    {
        pending
            .try_iter()
            .map(|signature| self.ingest_signature(&signature, &mut sleep))
            .collect()
    }
}
