use std::collections::BTreeMap;

use solana_pubkey::Pubkey;

use crate::error::Error;
use crate::protocols::bubblegum::{InstructionKind, role_schema};
use crate::scanner::accounts::AccountKeyTable;
use crate::types::b58;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RoleMap {
    #[serde(serialize_with = "b58::serialize_pubkey_map")]
    named: BTreeMap<&'static str, Pubkey>,
    #[serde(serialize_with = "b58::serialize_pubkeys")]
    remaining: Vec<Pubkey>,
}

impl RoleMap {
    pub fn get(&self, role: &str) -> Option<Pubkey> {
        self.named.get(role).copied()
    }

    pub fn require(&self, role: &'static str) -> Result<Pubkey, Error> {
        self.get(role).ok_or(Error::MissingRole { role })
    }

    pub fn remaining_accounts(&self) -> &[Pubkey] {
        &self.remaining
    }

    pub fn named_len(&self) -> usize {
        self.named.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Pubkey)> + '_ {
        self.named.iter().map(|(role, key)| (*role, *key))
    }
}

pub fn resolve_roles(
    kind: InstructionKind,
    account_indexes: &[u8],
    table: &AccountKeyTable,
    program_id: &Pubkey,
) -> Result<RoleMap, Error> {
    let schema = role_schema(kind);
    let mut roles = RoleMap::default();

    for (position, &index) in account_indexes.iter().enumerate() {
        let index = usize::from(index);
        match schema.get(position) {
            Some(spec) => {
                let key = table.resolve(index).map_err(|_| Error::RoleResolutionFailed {
                    role: spec.name,
                    index,
                })?;
                if spec.optional && key == *program_id {
                    continue;
                }
                roles.named.insert(spec.name, key);
            }
            None => roles.remaining.push(table.resolve(index)?),
        }
    }

    Ok(roles)
}
