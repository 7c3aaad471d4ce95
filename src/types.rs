use solana_pubkey::Pubkey;

/// A confirmed transaction as handed over by the transport layer.
///
/// Field names follow the Solana RPC `getTransaction` JSON shape so a body can be
/// deserialized straight from a response (or a fixture) after flattening `meta`.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBody {
    /// First transaction signature (base58).
    pub signature: String,
    /// Slot in which the transaction landed.
    pub slot: u64,
    /// Static account keys from the message.
    #[serde(deserialize_with = "b58::deserialize_pubkeys")]
    pub account_keys: Vec<Pubkey>,
    /// Keys loaded from address lookup tables (v0 messages only).
    #[serde(default)]
    pub loaded_addresses: LoadedAddresses,
    /// Top-level instructions in message order.
    pub instructions: Vec<RawInstruction>,
    /// CPI instructions grouped by the top-level instruction that invoked them.
    #[serde(default)]
    pub inner_instructions: Vec<InnerInstructions>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct LoadedAddresses {
    #[serde(default, deserialize_with = "b58::deserialize_pubkeys")]
    pub writable: Vec<Pubkey>,
    #[serde(default, deserialize_with = "b58::deserialize_pubkeys")]
    pub readonly: Vec<Pubkey>,
}

/// A compiled instruction exactly as it appears on the wire.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    /// Instruction data, base58 in JSON.
    #[serde(deserialize_with = "b58::deserialize_data")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct InnerInstructions {
    /// Index of the top-level instruction these were invoked from.
    pub index: u8,
    pub instructions: Vec<RawInstruction>,
}

/// Where a flattened instruction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionOrigin {
    Top,
    Nested { parent: usize },
}

/// One instruction of the flattened, execution-ordered view of a transaction.
///
/// Borrows from the [`TransactionBody`] it was flattened from and never outlives a scan.
#[derive(Debug, Clone, Copy)]
pub struct CompiledInstruction<'a> {
    pub program_address: Pubkey,
    pub account_indexes: &'a [u8],
    pub payload: &'a [u8],
    pub origin: InstructionOrigin,
    /// Index of the top-level instruction this one executes under.
    pub position: usize,
    /// Position in execution order across top-level and nested instructions.
    pub ordinal: u32,
}

pub(crate) mod b58 {
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_pubkey::Pubkey;

    pub fn serialize_pubkey<S: Serializer>(key: &Pubkey, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(key)
    }

    pub fn serialize_option_pubkey<S: Serializer>(
        key: &Option<Pubkey>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match key {
            Some(key) => s.collect_str(key),
            None => s.serialize_none(),
        }
    }

    pub fn serialize_pubkeys<S: Serializer>(keys: &[Pubkey], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(keys.iter().map(ToString::to_string))
    }

    pub fn serialize_pubkey_map<S: Serializer>(
        map: &BTreeMap<&'static str, Pubkey>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.collect_map(map.iter().map(|(role, key)| (*role, key.to_string())))
    }

    pub fn serialize_hash<S: Serializer>(hash: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&bs58::encode(hash).into_string())
    }

    pub fn parse_pubkey(value: &str) -> Result<Pubkey, crate::Error> {
        Pubkey::from_str(value).map_err(|e| crate::Error::Parse {
            reason: format!("invalid address {value}: {e}"),
        })
    }

    pub fn deserialize_pubkeys<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Pubkey>, D::Error> {
        let raw = Vec::<String>::deserialize(d)?;
        raw.iter()
            .map(|s| Pubkey::from_str(s).map_err(|e| D::Error::custom(format!("{s}: {e}"))))
            .collect()
    }

    pub fn deserialize_data<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(d)?;
        bs58::decode(&raw).into_vec().map_err(D::Error::custom)
    }
}
