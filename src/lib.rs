#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::dbg_macro,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::panic,
    )
)]

pub mod config;
pub mod error;
pub mod ingest;
pub mod protocols;
pub mod scanner;
pub mod store;
pub mod transport;
pub mod types;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::WatchConfig;
pub use error::Error;
pub use ingest::{BackfillOutcome, IngestReport, Ingestor, SkippedSignature};
pub use protocols::bubblegum::{InstructionKind, classify};
pub use protocols::log_wrapper::LeafSchema;
pub use protocols::payload::{DecodedInstruction, LeafArgs, MetadataArgs, decode};
pub use protocols::{ProgramRole, ScanContext};
pub use scanner::accounts::AccountKeyTable;
pub use scanner::asset::derive_asset_id;
pub use scanner::correlator::LeafSchemaCorrelator;
pub use scanner::mapping::instruction_to_event_kind;
pub use scanner::roles::{RoleMap, resolve_roles};
pub use scanner::{AssetMutationEvent, EventKind, TransactionScanner, flatten_instructions};
pub use store::{
    ApplyDecision, AssetRecord, EventSequence, InMemoryAssetStore, MutationStore, SequenceEngine,
};
pub use transport::{
    BackfillCursor, CancellationToken, LogSubscriber, MetadataFetcher, RetryPolicy,
    SignatureInfo, SignatureQuery, TransactionSource, backfill_signatures, fetch_mint_metadata,
    fetch_with_retries,
};
pub use types::{CompiledInstruction, RawInstruction, TransactionBody};
