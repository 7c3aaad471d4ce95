use solana_pubkey::Pubkey;

use crate::protocols::BUBBLEGUM;

pub const ASSET_SEED: &[u8] = b"asset";

/// Asset id of the leaf at `leaf_index` in `merkle_tree`.
pub fn derive_asset_id(merkle_tree: &Pubkey, leaf_index: u64) -> Pubkey {
    derive_asset_id_for(&BUBBLEGUM, merkle_tree, leaf_index)
}

pub fn derive_asset_id_for(program_id: &Pubkey, merkle_tree: &Pubkey, leaf_index: u64) -> Pubkey {
    let (asset_id, _bump) = Pubkey::find_program_address(
        &[ASSET_SEED, merkle_tree.as_ref(), &leaf_index.to_le_bytes()],
        program_id,
    );
    asset_id
}
