use std::collections::HashSet;

use dashmap::DashMap;
use solana_pubkey::Pubkey;

use crate::error::Error;
use crate::protocols::bubblegum::{NEW_LEAF_OWNER, TREE_CONFIG};
use crate::protocols::payload::{Collection, Creator, DecodedInstruction, MetadataArgs};
use crate::scanner::{AssetMutationEvent, EventKind};
use crate::types::b58;

// Derived ordering: slot, then signature, then ordinal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct EventSequence {
    pub slot: u64,
    pub signature: String,
    pub ordinal: u32,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    strum_macros::Display,
    strum_macros::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplyDecision {
    Apply,
    IgnoreStale,
    IgnoreDuplicate,
    IgnoreUnidentified,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceState {
    last: Option<EventSequence>,
    applied_in_slot: HashSet<(String, u32)>,
}

impl SequenceState {
    pub fn last(&self) -> Option<&EventSequence> {
        self.last.as_ref()
    }

    pub fn record(&mut self, applied: EventSequence) {
        if self.last.as_ref().is_some_and(|last| last.slot != applied.slot) {
            self.applied_in_slot.clear();
        }
        self.applied_in_slot
            .insert((applied.signature.clone(), applied.ordinal));
        self.last = Some(applied);
    }
}

pub struct SequenceEngine;

impl SequenceEngine {
    pub fn decide_apply(state: &SequenceState, incoming: &EventSequence) -> ApplyDecision {
        let Some(last) = state.last() else {
            return ApplyDecision::Apply;
        };

        if incoming.slot < last.slot {
            return ApplyDecision::IgnoreStale;
        }
        if incoming.slot > last.slot {
            return ApplyDecision::Apply;
        }
        if state
            .applied_in_slot
            .contains(&(incoming.signature.clone(), incoming.ordinal))
        {
            return ApplyDecision::IgnoreDuplicate;
        }
        if incoming.signature == last.signature && incoming.ordinal < last.ordinal {
            return ApplyDecision::IgnoreStale;
        }
        ApplyDecision::Apply
    }
}

/// Persistence boundary for mutation events. Implementations must be idempotent and
/// apply events for one asset in sequence order.
pub trait MutationStore: Send + Sync {
    fn apply(&self, event: &AssetMutationEvent) -> Result<ApplyDecision, Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AssetRecord {
    #[serde(serialize_with = "b58::serialize_pubkey")]
    pub asset_id: Pubkey,
    #[serde(serialize_with = "b58::serialize_pubkey")]
    pub merkle_tree: Pubkey,
    #[serde(serialize_with = "b58::serialize_option_pubkey")]
    pub tree_authority: Option<Pubkey>,
    pub leaf_index: Option<u64>,
    pub nonce: Option<u64>,
    #[serde(serialize_with = "b58::serialize_option_pubkey")]
    pub owner: Option<Pubkey>,
    #[serde(serialize_with = "b58::serialize_option_pubkey")]
    pub delegate: Option<Pubkey>,
    pub burnt: bool,
    pub metadata: Option<MetadataArgs>,
    pub collection: Option<Collection>,
    pub creators: Vec<Creator>,
    pub royalty_basis_points: Option<u16>,
    /// Off-chain JSON behind `metadata.uri`, once fetched.
    pub metadata_json: Option<serde_json::Value>,
    pub last_sequence: Option<EventSequence>,
    #[serde(skip)]
    sequence: SequenceState,
}

impl AssetRecord {
    fn new(asset_id: Pubkey, merkle_tree: Pubkey) -> Self {
        Self {
            asset_id,
            merkle_tree,
            tree_authority: None,
            leaf_index: None,
            nonce: None,
            owner: None,
            delegate: None,
            burnt: false,
            metadata: None,
            collection: None,
            creators: Vec::new(),
            royalty_basis_points: None,
            metadata_json: None,
            last_sequence: None,
            sequence: SequenceState::default(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.metadata.is_some()
    }

    fn fill_mint_data(&mut self, metadata: &MetadataArgs, tree_authority: Option<Pubkey>) {
        if self.tree_authority.is_none() {
            self.tree_authority = tree_authority;
        }
        if self.metadata.is_none() {
            self.collection = metadata.collection;
            self.creators = metadata.creators.clone();
            self.royalty_basis_points = Some(metadata.seller_fee_basis_points);
            self.metadata = Some(metadata.clone());
        }
    }

    fn project(&mut self, projection: &Projection<'_>) {
        match projection {
            Projection::Mint {
                owner,
                delegate,
                nonce,
                metadata,
                tree_authority,
            } => {
                self.owner = Some(*owner);
                self.delegate = Some(*delegate);
                self.nonce = Some(*nonce);
                self.fill_mint_data(metadata, *tree_authority);
            }
            Projection::Transfer { new_owner } => {
                self.owner = Some(*new_owner);
                self.delegate = Some(*new_owner);
            }
            Projection::Burn => self.burnt = true,
        }
    }
}

enum Projection<'a> {
    Mint {
        owner: Pubkey,
        delegate: Pubkey,
        nonce: u64,
        metadata: &'a MetadataArgs,
        tree_authority: Option<Pubkey>,
    },
    Transfer {
        new_owner: Pubkey,
    },
    Burn,
}

impl<'a> Projection<'a> {
    fn from_event(event: &'a AssetMutationEvent) -> Result<Self, Error> {
        match (event.kind, &event.payload, &event.leaf_schema) {
            (EventKind::Mint, DecodedInstruction::Mint(metadata), Some(schema)) => {
                Ok(Self::Mint {
                    owner: schema.owner,
                    delegate: schema.delegate,
                    nonce: schema.nonce,
                    metadata,
                    tree_authority: event.roles.get(TREE_CONFIG),
                })
            }
            (EventKind::Transfer, _, _) => Ok(Self::Transfer {
                new_owner: event.roles.require(NEW_LEAF_OWNER)?,
            }),
            (EventKind::Burn, _, _) => Ok(Self::Burn),
            (kind, payload, _) => Err(Error::Parse {
                reason: format!("{kind} event cannot be projected from {payload:?}"),
            }),
        }
    }
}

/// Reference [`MutationStore`] keeping projected records in memory.
#[derive(Debug, Default)]
pub struct InMemoryAssetStore {
    assets: DashMap<Pubkey, AssetRecord>,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, asset_id: &Pubkey) -> Option<AssetRecord> {
        self.assets.get(asset_id).map(|record| record.value().clone())
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn attach_metadata_json(&self, asset_id: &Pubkey, json: serde_json::Value) -> bool {
        match self.assets.get_mut(asset_id) {
            Some(mut record) => {
                record.metadata_json = Some(json);
                true
            }
            None => false,
        }
    }
}

impl MutationStore for InMemoryAssetStore {
    fn apply(&self, event: &AssetMutationEvent) -> Result<ApplyDecision, Error> {
        let Some(asset_id) = event.asset_id else {
            tracing::debug!(
                signature = %event.signature,
                ordinal = event.ordinal,
                "event has no asset id, not stored"
            );
            return Ok(ApplyDecision::IgnoreUnidentified);
        };
        let projection = Projection::from_event(event)?;
        let incoming = event.sequence();

        let mut record = self
            .assets
            .entry(asset_id)
            .or_insert_with(|| AssetRecord::new(asset_id, event.merkle_tree));
        if record.leaf_index.is_none() {
            record.leaf_index = event.leaf_index;
        }

        let decision = SequenceEngine::decide_apply(&record.sequence, &incoming);
        match (decision, &projection) {
            (ApplyDecision::Apply, _) => {
                record.project(&projection);
                record.last_sequence = Some(incoming.clone());
                record.sequence.record(incoming);
            }
            // A late mint still carries the only copy of the asset's metadata.
            (
                ApplyDecision::IgnoreStale,
                Projection::Mint {
                    metadata,
                    nonce,
                    tree_authority,
                    ..
                },
            ) => {
                record.fill_mint_data(metadata, *tree_authority);
                record.nonce.get_or_insert(*nonce);
            }
            _ => {}
        }

        tracing::debug!(
            asset_id = %asset_id,
            kind = %event.kind,
            slot = event.slot,
            decision = %decision,
            "applied event"
        );
        Ok(decision)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    fn seq(slot: u64, signature: &str, ordinal: u32) -> EventSequence {
        EventSequence {
            slot,
            signature: signature.to_string(),
            ordinal,
        }
    }

    fn state_after(applied: &[EventSequence]) -> SequenceState {
        let mut state = SequenceState::default();
        for s in applied {
            state.record(s.clone());
        }
        state
    }

    fn lcg_next(state: &mut u64) -> u64 {
        *state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        *state
    }

    #[test]
    fn decision_strings() {
        assert_eq!(ApplyDecision::IgnoreStale.to_string(), "ignore_stale");
        assert_eq!(ApplyDecision::Apply.as_ref(), "apply");
    }

    #[test]
    fn first_event_always_applies() {
        assert_eq!(
            SequenceEngine::decide_apply(&SequenceState::default(), &seq(0, "a", 0)),
            ApplyDecision::Apply
        );
    }

    #[test]
    fn older_slot_is_stale_and_newer_applies() {
        let state = state_after(&[seq(100, "a", 3)]);
        assert_eq!(
            SequenceEngine::decide_apply(&state, &seq(99, "z", 9)),
            ApplyDecision::IgnoreStale
        );
        assert_eq!(
            SequenceEngine::decide_apply(&state, &seq(101, "a", 0)),
            ApplyDecision::Apply
        );
    }

    #[test]
    fn same_slot_replays_are_duplicates() {
        let state = state_after(&[seq(100, "a", 3), seq(100, "b", 1)]);
        assert_eq!(
            SequenceEngine::decide_apply(&state, &seq(100, "a", 3)),
            ApplyDecision::IgnoreDuplicate
        );
        assert_eq!(
            SequenceEngine::decide_apply(&state, &seq(100, "b", 1)),
            ApplyDecision::IgnoreDuplicate
        );
        assert_eq!(
            SequenceEngine::decide_apply(&state, &seq(100, "c", 0)),
            ApplyDecision::Apply
        );
    }

    #[test]
    fn earlier_instruction_of_same_signature_is_stale() {
        let state = state_after(&[seq(100, "a", 3)]);
        assert_eq!(
            SequenceEngine::decide_apply(&state, &seq(100, "a", 1)),
            ApplyDecision::IgnoreStale
        );
        assert_eq!(
            SequenceEngine::decide_apply(&state, &seq(100, "a", 4)),
            ApplyDecision::Apply
        );
    }

    #[test]
    fn new_slot_forgets_previous_slot_positions() {
        let state = state_after(&[seq(100, "a", 3), seq(105, "b", 0)]);
        assert!(!state.applied_in_slot.contains(&("a".to_string(), 3)));
        assert_eq!(state.last(), Some(&seq(105, "b", 0)));
    }

    #[test]
    fn applied_sequence_never_moves_backwards() {
        let mut seed = 0xDEAD_BEEF_u64;
        let mut state = SequenceState::default();
        for _ in 0..5_000 {
            let incoming = seq(
                lcg_next(&mut seed) % 50,
                ["a", "b", "c"][(lcg_next(&mut seed) % 3) as usize],
                (lcg_next(&mut seed) % 4) as u32,
            );
            let before = state.last().cloned();
            if SequenceEngine::decide_apply(&state, &incoming) == ApplyDecision::Apply {
                if let Some(before) = &before {
                    assert!(incoming.slot >= before.slot);
                }
                state.record(incoming);
            }
            let after = state.last().unwrap();
            if let Some(before) = before {
                assert!(after.slot >= before.slot);
            }
        }
    }
}
