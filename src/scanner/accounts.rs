use solana_pubkey::Pubkey;

use crate::error::Error;
use crate::types::TransactionBody;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKeyTable {
    keys: Vec<Pubkey>,
}

impl AccountKeyTable {
    pub fn new(keys: Vec<Pubkey>) -> Self {
        Self { keys }
    }

    pub fn from_body(body: &TransactionBody) -> Self {
        let loaded = &body.loaded_addresses;
        let mut keys =
            Vec::with_capacity(body.account_keys.len() + loaded.writable.len() + loaded.readonly.len());
        // v0 message order: static, then lookup writable, then lookup readonly.
        keys.extend_from_slice(&body.account_keys);
        keys.extend_from_slice(&loaded.writable);
        keys.extend_from_slice(&loaded.readonly);
        Self { keys }
    }

    pub fn resolve(&self, index: usize) -> Result<Pubkey, Error> {
        self.keys
            .get(index)
            .copied()
            .ok_or(Error::AccountIndexOutOfRange {
                index,
                len: self.keys.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::types::LoadedAddresses;

    fn key(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    #[test]
    fn lookup_keys_follow_static_keys() {
        let body = TransactionBody {
            signature: "sig".to_string(),
            slot: 1,
            account_keys: vec![key(0), key(1)],
            loaded_addresses: LoadedAddresses {
                writable: vec![key(2)],
                readonly: vec![key(3), key(4)],
            },
            instructions: vec![],
            inner_instructions: vec![],
        };
        let table = AccountKeyTable::from_body(&body);
        assert_eq!(table.len(), 5);
        for i in 0..5_u8 {
            assert_eq!(table.resolve(usize::from(i)).unwrap(), key(i));
        }
    }

    #[test]
    fn out_of_range_index_fails_lazily() {
        let table = AccountKeyTable::new(vec![key(0)]);
        assert!(matches!(
            table.resolve(1),
            Err(Error::AccountIndexOutOfRange { index: 1, len: 1 })
        ));
        assert!(table.resolve(0).is_ok());
        assert!(AccountKeyTable::new(vec![]).is_empty());
    }
}
