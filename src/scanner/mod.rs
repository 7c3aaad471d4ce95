pub mod accounts;
pub mod asset;
pub mod correlator;
pub mod mapping;
pub mod roles;

use solana_pubkey::Pubkey;

use crate::error::Error;
use crate::protocols::bubblegum::{InstructionKind, MERKLE_TREE, classify};
use crate::protocols::log_wrapper::{LeafSchema, decode_leaf_schema_event};
use crate::protocols::payload::{DecodedInstruction, decode};
use crate::protocols::{ProgramRole, ScanContext};
use crate::store::EventSequence;
use crate::types::{CompiledInstruction, InstructionOrigin, TransactionBody, b58};

use self::accounts::AccountKeyTable;
use self::asset::derive_asset_id_for;
use self::correlator::{LeafSchemaCorrelator, MintClaim};
use self::mapping::{instruction_to_event_kind, needs_leaf_schema};
use self::roles::{RoleMap, resolve_roles};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
    strum_macros::VariantNames,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Mint,
    Transfer,
    Burn,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AssetMutationEvent {
    pub kind: EventKind,
    pub instruction: InstructionKind,
    /// `None` only for a mint whose leaf-schema emission was not found.
    #[serde(serialize_with = "b58::serialize_option_pubkey")]
    pub asset_id: Option<Pubkey>,
    #[serde(serialize_with = "b58::serialize_pubkey")]
    pub merkle_tree: Pubkey,
    pub leaf_index: Option<u64>,
    pub roles: RoleMap,
    pub leaf_schema: Option<LeafSchema>,
    pub payload: DecodedInstruction,
    pub slot: u64,
    pub signature: String,
    pub ordinal: u32,
}

impl AssetMutationEvent {
    pub fn sequence(&self) -> EventSequence {
        EventSequence {
            slot: self.slot,
            signature: self.signature.clone(),
            ordinal: self.ordinal,
        }
    }
}

/// Top-level instructions, each followed by the inner instructions it invoked.
pub fn flatten_instructions<'a>(
    body: &'a TransactionBody,
    table: &AccountKeyTable,
) -> Vec<CompiledInstruction<'a>> {
    let nested_len: usize = body
        .inner_instructions
        .iter()
        .map(|group| group.instructions.len())
        .sum();
    let mut flattened = Vec::with_capacity(body.instructions.len() + nested_len);
    let mut ordinal: u32 = 0;

    for (position, top) in body.instructions.iter().enumerate() {
        let nested = body
            .inner_instructions
            .iter()
            .filter(|group| usize::from(group.index) == position)
            .flat_map(|group| group.instructions.iter())
            .map(|raw| (raw, InstructionOrigin::Nested { parent: position }));

        for (raw, origin) in std::iter::once((top, InstructionOrigin::Top)).chain(nested) {
            let current = ordinal;
            ordinal += 1;
            match table.resolve(usize::from(raw.program_id_index)) {
                Ok(program_address) => flattened.push(CompiledInstruction {
                    program_address,
                    account_indexes: &raw.accounts,
                    payload: &raw.data,
                    origin,
                    position,
                    ordinal: current,
                }),
                Err(e) => tracing::warn!(
                    signature = %body.signature,
                    ordinal = current,
                    error = %e,
                    "skipping instruction with unresolvable program id"
                ),
            }
        }
    }

    flattened
}

#[derive(Debug, Clone, Default)]
pub struct TransactionScanner {
    context: ScanContext,
}

impl TransactionScanner {
    pub fn new(context: ScanContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ScanContext {
        &self.context
    }

    pub fn scan(&self, body: &TransactionBody) -> Vec<AssetMutationEvent> {
        let span = tracing::debug_span!("scan", signature = %body.signature, slot = body.slot);
        let _guard = span.enter();

        let table = AccountKeyTable::from_body(body);
        let flattened = flatten_instructions(body, &table);

        let (_, mut events) = flattened.iter().rev().fold(
            (LeafSchemaCorrelator::Empty, Vec::new()),
            |(correlator, mut events), ix| {
                let correlator = match self.context.program_role(&ix.program_address) {
                    Some(ProgramRole::LogWrapper) => observe_emission(correlator, ix, body),
                    Some(ProgramRole::Target) => {
                        let (correlator, event) = self.visit_target(correlator, ix, &table, body);
                        events.extend(event);
                        correlator
                    }
                    None => correlator,
                };
                (correlator, events)
            },
        );

        events.reverse();
        tracing::debug!(events = events.len(), "scan complete");
        events
    }

    fn visit_target(
        &self,
        correlator: LeafSchemaCorrelator,
        ix: &CompiledInstruction<'_>,
        table: &AccountKeyTable,
        body: &TransactionBody,
    ) -> (LeafSchemaCorrelator, Option<AssetMutationEvent>) {
        let instruction = classify(ix.payload);
        let Some(kind) = instruction_to_event_kind(instruction) else {
            tracing::trace!(ordinal = ix.ordinal, %instruction, "no event for instruction");
            return (correlator, None);
        };

        let (correlator, leaf_schema) = if needs_leaf_schema(kind) {
            let (correlator, claim) = correlator.take_for_mint(ix.position);
            (correlator, accept_claim(claim, ix, body))
        } else {
            (correlator, None)
        };

        match self.build_event(kind, instruction, ix, table, body, leaf_schema) {
            Ok(event) => (correlator, Some(event)),
            Err(e) => {
                tracing::warn!(
                    signature = %body.signature,
                    ordinal = ix.ordinal,
                    %instruction,
                    error = %e,
                    "skipping instruction"
                );
                (correlator, None)
            }
        }
    }

    fn build_event(
        &self,
        kind: EventKind,
        instruction: InstructionKind,
        ix: &CompiledInstruction<'_>,
        table: &AccountKeyTable,
        body: &TransactionBody,
        leaf_schema: Option<LeafSchema>,
    ) -> Result<AssetMutationEvent, Error> {
        let program = &self.context.target_program;
        let roles = resolve_roles(instruction, ix.account_indexes, table, program)?;
        let payload = decode(instruction, ix.payload)?;
        let merkle_tree = roles.require(MERKLE_TREE)?;

        let leaf_index = match (&payload, &leaf_schema) {
            (DecodedInstruction::Transfer(args) | DecodedInstruction::Burn(args), _) => {
                Some(u64::from(args.index))
            }
            (DecodedInstruction::Mint(_), Some(schema)) => Some(schema.nonce),
            (DecodedInstruction::Mint(_), None) => {
                tracing::debug!(
                    signature = %body.signature,
                    ordinal = ix.ordinal,
                    "mint has no leaf schema emission, asset id unknown"
                );
                None
            }
            (DecodedInstruction::Unsupported { .. }, _) => None,
        };
        let asset_id = leaf_index.map(|index| derive_asset_id_for(program, &merkle_tree, index));

        if let (Some(schema), Some(derived)) = (&leaf_schema, asset_id)
            && schema.leaf_id != derived
        {
            tracing::warn!(
                signature = %body.signature,
                ordinal = ix.ordinal,
                emitted = %schema.leaf_id,
                %derived,
                "leaf schema id disagrees with derived asset id, using derived"
            );
        }

        Ok(AssetMutationEvent {
            kind,
            instruction,
            asset_id,
            merkle_tree,
            leaf_index,
            roles,
            leaf_schema,
            payload,
            slot: body.slot,
            signature: body.signature.clone(),
            ordinal: ix.ordinal,
        })
    }
}

fn observe_emission(
    correlator: LeafSchemaCorrelator,
    ix: &CompiledInstruction<'_>,
    body: &TransactionBody,
) -> LeafSchemaCorrelator {
    match decode_leaf_schema_event(ix.payload) {
        Ok(Some(schema)) => {
            let nested_under = match ix.origin {
                InstructionOrigin::Top => None,
                InstructionOrigin::Nested { parent } => Some(parent),
            };
            correlator.observe(schema, nested_under)
        }
        Ok(None) => correlator,
        Err(e) => {
            tracing::warn!(
                signature = %body.signature,
                ordinal = ix.ordinal,
                error = %e,
                "skipping malformed leaf schema emission"
            );
            correlator
        }
    }
}

fn accept_claim(
    claim: MintClaim,
    ix: &CompiledInstruction<'_>,
    body: &TransactionBody,
) -> Option<LeafSchema> {
    match claim {
        MintClaim::Matched(schema) => Some(schema),
        MintClaim::Nothing => None,
        MintClaim::Foreign {
            schema,
            nested_under,
        } => {
            tracing::warn!(
                signature = %body.signature,
                ordinal = ix.ordinal,
                position = ix.position,
                nested_under,
                leaf_id = %schema.leaf_id,
                "leaf schema belongs to another instruction, mint left unidentified"
            );
            None
        }
    }
}
