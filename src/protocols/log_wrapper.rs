use borsh::BorshDeserialize;
use solana_pubkey::Pubkey;

use crate::error::Error;
use crate::protocols::read_array;
use crate::types::b58;

pub const TAG_LEN: usize = 8;

/// Prefix of a Noop payload carrying a Bubblegum leaf-schema event.
///
/// `AccountCompressionEvent::ApplicationData` (1), `ApplicationDataEvent::V1` (0), a
/// little-endian `u32` body length of 203, then `BubblegumEventType::LeafSchemaEvent` (1)
/// and `Version::V1` (0).
pub const LEAF_SCHEMA_EVENT_TAG: [u8; TAG_LEN] = [0x01, 0x00, 0xcb, 0x00, 0x00, 0x00, 0x01, 0x00];

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LeafSchema {
    #[serde(serialize_with = "b58::serialize_pubkey")]
    pub leaf_id: Pubkey,
    #[serde(serialize_with = "b58::serialize_pubkey")]
    pub owner: Pubkey,
    #[serde(serialize_with = "b58::serialize_pubkey")]
    pub delegate: Pubkey,
    /// Equal to the leaf index for leaves minted by Bubblegum.
    pub nonce: u64,
    #[serde(serialize_with = "b58::serialize_hash")]
    pub data_hash: [u8; 32],
    #[serde(serialize_with = "b58::serialize_hash")]
    pub creator_hash: [u8; 32],
    #[serde(serialize_with = "b58::serialize_hash")]
    pub leaf_hash: [u8; 32],
}

#[derive(BorshDeserialize)]
enum LeafSchemaWire {
    V1 {
        id: [u8; 32],
        owner: [u8; 32],
        delegate: [u8; 32],
        nonce: u64,
        data_hash: [u8; 32],
        creator_hash: [u8; 32],
    },
}

#[derive(BorshDeserialize)]
struct LeafSchemaEventWire {
    schema: LeafSchemaWire,
    leaf_hash: [u8; 32],
}

pub fn is_leaf_schema_event(payload: &[u8]) -> bool {
    read_array::<TAG_LEN>(payload, 0) == Some(LEAF_SCHEMA_EVENT_TAG)
}

pub fn decode_leaf_schema_event(payload: &[u8]) -> Result<Option<LeafSchema>, Error> {
    if !is_leaf_schema_event(payload) {
        return Ok(None);
    }
    let mut body = payload.get(TAG_LEN..).unwrap_or_default();
    let LeafSchemaEventWire { schema, leaf_hash } = LeafSchemaEventWire::deserialize(&mut body)
        .map_err(|e| Error::MalformedPayload {
            kind: "leaf_schema_event".to_string(),
            reason: e.to_string(),
        })?;
    let LeafSchemaWire::V1 {
        id,
        owner,
        delegate,
        nonce,
        data_hash,
        creator_hash,
    } = schema;
    Ok(Some(LeafSchema {
        leaf_id: Pubkey::new_from_array(id),
        owner: Pubkey::new_from_array(owner),
        delegate: Pubkey::new_from_array(delegate),
        nonce,
        data_hash,
        creator_hash,
        leaf_hash,
    }))
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn leaf_schema_event_payload(
        leaf_id: Pubkey,
        owner: Pubkey,
        delegate: Pubkey,
        nonce: u64,
    ) -> Vec<u8> {
        let mut data = LEAF_SCHEMA_EVENT_TAG.to_vec();
        data.push(0); // LeafSchema::V1
        data.extend_from_slice(leaf_id.as_ref());
        data.extend_from_slice(owner.as_ref());
        data.extend_from_slice(delegate.as_ref());
        data.extend_from_slice(&nonce.to_le_bytes());
        data.extend_from_slice(&[0xD1; 32]);
        data.extend_from_slice(&[0xC2; 32]);
        data.extend_from_slice(&[0xE3; 32]);
        data
    }

    #[test]
    fn tag_length_field_matches_body_size() {
        let payload = leaf_schema_event_payload(
            Pubkey::new_from_array([1; 32]),
            Pubkey::new_from_array([2; 32]),
            Pubkey::new_from_array([3; 32]),
            7,
        );
        let declared = u32::from_le_bytes(payload[2..6].try_into().unwrap()) as usize;
        assert_eq!(payload.len() - 6, declared);
    }

    #[test]
    fn decodes_leaf_schema_fields() {
        let owner = Pubkey::new_from_array([2; 32]);
        let payload = leaf_schema_event_payload(
            Pubkey::new_from_array([1; 32]),
            owner,
            Pubkey::new_from_array([3; 32]),
            7,
        );
        let schema = decode_leaf_schema_event(&payload).unwrap().unwrap();
        assert_eq!(schema.owner, owner);
        assert_eq!(schema.nonce, 7);
        assert_eq!(schema.data_hash, [0xD1; 32]);
        assert_eq!(schema.creator_hash, [0xC2; 32]);
        assert_eq!(schema.leaf_hash, [0xE3; 32]);
    }

    #[test]
    fn other_emissions_are_ignored() {
        // AccountCompressionEvent::ChangeLog
        assert!(decode_leaf_schema_event(&[0x00, 0x01, 0x02]).unwrap().is_none());
        assert!(decode_leaf_schema_event(&[]).unwrap().is_none());
        let mut payload = LEAF_SCHEMA_EVENT_TAG.to_vec();
        payload[6] = 0x02;
        assert!(decode_leaf_schema_event(&payload).unwrap().is_none());
    }

    #[test]
    fn truncated_body_is_malformed() {
        let mut payload = leaf_schema_event_payload(
            Pubkey::new_from_array([1; 32]),
            Pubkey::new_from_array([2; 32]),
            Pubkey::new_from_array([3; 32]),
            7,
        );
        payload.truncate(100);
        assert!(matches!(
            decode_leaf_schema_event(&payload),
            Err(Error::MalformedPayload { .. })
        ));
    }

    #[test]
    fn unknown_schema_version_is_malformed() {
        let mut payload = leaf_schema_event_payload(
            Pubkey::new_from_array([1; 32]),
            Pubkey::new_from_array([2; 32]),
            Pubkey::new_from_array([3; 32]),
            7,
        );
        payload[TAG_LEN] = 1;
        assert!(decode_leaf_schema_event(&payload).is_err());
    }
}
