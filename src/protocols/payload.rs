use borsh::BorshDeserialize;
use solana_pubkey::Pubkey;

use crate::error::Error;
use crate::protocols::bubblegum::{DISCRIMINATOR_LEN, InstructionKind};
use crate::types::b58;

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, serde::Serialize)]
pub struct LeafArgs {
    #[serde(serialize_with = "b58::serialize_hash")]
    pub root: [u8; 32],
    #[serde(serialize_with = "b58::serialize_hash")]
    pub data_hash: [u8; 32],
    #[serde(serialize_with = "b58::serialize_hash")]
    pub creator_hash: [u8; 32],
    pub nonce: u64,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshDeserialize, serde::Serialize)]
pub enum TokenStandard {
    NonFungible,
    FungibleAsset,
    Fungible,
    NonFungibleEdition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshDeserialize, serde::Serialize)]
pub enum UseMethod {
    Burn,
    Multiple,
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshDeserialize, serde::Serialize)]
pub struct Uses {
    pub use_method: UseMethod,
    pub remaining: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshDeserialize, serde::Serialize)]
pub enum TokenProgramVersion {
    Original,
    Token2022,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Collection {
    pub verified: bool,
    #[serde(serialize_with = "b58::serialize_pubkey")]
    pub key: Pubkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Creator {
    #[serde(serialize_with = "b58::serialize_pubkey")]
    pub address: Pubkey,
    pub verified: bool,
    pub share: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetadataArgs {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub primary_sale_happened: bool,
    pub is_mutable: bool,
    pub edition_nonce: Option<u8>,
    pub token_standard: Option<TokenStandard>,
    pub collection: Option<Collection>,
    pub uses: Option<Uses>,
    pub token_program_version: TokenProgramVersion,
    pub creators: Vec<Creator>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecodedInstruction {
    Mint(MetadataArgs),
    Transfer(LeafArgs),
    Burn(LeafArgs),
    Unsupported { kind: InstructionKind },
}

#[derive(BorshDeserialize)]
struct CollectionWire {
    verified: bool,
    key: [u8; 32],
}

#[derive(BorshDeserialize)]
struct CreatorWire {
    address: [u8; 32],
    verified: bool,
    share: u8,
}

#[derive(BorshDeserialize)]
struct MetadataArgsWire {
    name: String,
    symbol: String,
    uri: String,
    seller_fee_basis_points: u16,
    primary_sale_happened: bool,
    is_mutable: bool,
    edition_nonce: Option<u8>,
    token_standard: Option<TokenStandard>,
    collection: Option<CollectionWire>,
    uses: Option<Uses>,
    token_program_version: TokenProgramVersion,
    creators: Vec<CreatorWire>,
}

impl From<MetadataArgsWire> for MetadataArgs {
    fn from(wire: MetadataArgsWire) -> Self {
        Self {
            name: wire.name,
            symbol: wire.symbol,
            uri: wire.uri,
            seller_fee_basis_points: wire.seller_fee_basis_points,
            primary_sale_happened: wire.primary_sale_happened,
            is_mutable: wire.is_mutable,
            edition_nonce: wire.edition_nonce,
            token_standard: wire.token_standard,
            collection: wire.collection.map(|c| Collection {
                verified: c.verified,
                key: Pubkey::new_from_array(c.key),
            }),
            uses: wire.uses,
            token_program_version: wire.token_program_version,
            creators: wire
                .creators
                .into_iter()
                .map(|c| Creator {
                    address: Pubkey::new_from_array(c.address),
                    verified: c.verified,
                    share: c.share,
                })
                .collect(),
        }
    }
}

/// `payload` is the full instruction data. Trailing bytes after the arguments are ignored.
pub fn decode(kind: InstructionKind, payload: &[u8]) -> Result<DecodedInstruction, Error> {
    match kind {
        InstructionKind::MintV1 | InstructionKind::MintToCollectionV1 => {
            let wire: MetadataArgsWire = deserialize_args(kind, payload)?;
            Ok(DecodedInstruction::Mint(wire.into()))
        }
        InstructionKind::Transfer => Ok(DecodedInstruction::Transfer(deserialize_args(
            kind, payload,
        )?)),
        InstructionKind::Burn => Ok(DecodedInstruction::Burn(deserialize_args(kind, payload)?)),
        other => Ok(DecodedInstruction::Unsupported { kind: other }),
    }
}

fn deserialize_args<T: BorshDeserialize>(
    kind: InstructionKind,
    payload: &[u8],
) -> Result<T, Error> {
    let mut args = payload
        .get(DISCRIMINATOR_LEN..)
        .ok_or_else(|| Error::MalformedPayload {
            kind: kind.to_string(),
            reason: format!("{} bytes is shorter than the discriminator", payload.len()),
        })?;
    T::deserialize(&mut args).map_err(|e| Error::MalformedPayload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}
