use crate::protocols::read_array;

pub const DISCRIMINATOR_LEN: usize = 8;

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
pub enum InstructionKind {
    MintV1,
    MintToCollectionV1,
    Transfer,
    Burn,
    Delegate,
    Redeem,
    CancelRedeem,
    DecompressV1,
    Compress,
    CreateTree,
    SetTreeDelegate,
    VerifyCreator,
    UnverifyCreator,
    VerifyCollection,
    UnverifyCollection,
    SetAndVerifyCollection,
    UpdateMetadata,
    SetDecompressibleState,
    SetDecompressableState,
    VerifyLeaf,
    Unrecognized,
}

impl InstructionKind {
    pub fn is_mint(self) -> bool {
        matches!(self, Self::MintV1 | Self::MintToCollectionV1)
    }
}

/// Anchor discriminators, `sha256("global:<name>")[..8]`.
pub const DISCRIMINATORS: &[([u8; DISCRIMINATOR_LEN], InstructionKind)] = &[
    ([145, 98, 192, 118, 184, 147, 118, 104], InstructionKind::MintV1),
    ([153, 18, 178, 47, 197, 158, 86, 15], InstructionKind::MintToCollectionV1),
    ([163, 52, 200, 231, 140, 3, 69, 186], InstructionKind::Transfer),
    ([116, 110, 29, 56, 107, 219, 42, 93], InstructionKind::Burn),
    ([90, 147, 75, 178, 85, 88, 4, 137], InstructionKind::Delegate),
    ([184, 12, 86, 149, 70, 196, 97, 225], InstructionKind::Redeem),
    ([111, 76, 232, 50, 39, 175, 48, 242], InstructionKind::CancelRedeem),
    ([54, 85, 76, 70, 228, 250, 164, 81], InstructionKind::DecompressV1),
    ([82, 193, 176, 117, 176, 21, 115, 253], InstructionKind::Compress),
    ([165, 83, 136, 142, 89, 202, 47, 220], InstructionKind::CreateTree),
    ([253, 118, 66, 37, 190, 49, 154, 102], InstructionKind::SetTreeDelegate),
    ([52, 17, 96, 132, 71, 4, 85, 194], InstructionKind::VerifyCreator),
    ([107, 178, 57, 39, 105, 115, 112, 152], InstructionKind::UnverifyCreator),
    ([56, 113, 101, 253, 79, 55, 122, 169], InstructionKind::VerifyCollection),
    ([250, 251, 42, 106, 41, 137, 186, 168], InstructionKind::UnverifyCollection),
    ([235, 242, 121, 216, 158, 234, 180, 234], InstructionKind::SetAndVerifyCollection),
    ([170, 182, 43, 239, 97, 78, 225, 186], InstructionKind::UpdateMetadata),
    ([82, 104, 152, 6, 149, 111, 100, 13], InstructionKind::SetDecompressibleState),
    ([18, 135, 238, 168, 246, 195, 61, 115], InstructionKind::SetDecompressableState),
    ([124, 220, 22, 223, 104, 10, 250, 224], InstructionKind::VerifyLeaf),
];

/// Exact 8-byte match; short payloads and unknown prefixes are `Unrecognized`.
pub fn classify(payload: &[u8]) -> InstructionKind {
    let Some(prefix) = read_array::<DISCRIMINATOR_LEN>(payload, 0) else {
        return InstructionKind::Unrecognized;
    };
    DISCRIMINATORS
        .iter()
        .find(|(discriminator, _)| *discriminator == prefix)
        .map_or(InstructionKind::Unrecognized, |(_, kind)| *kind)
}

pub fn discriminator_for(kind: InstructionKind) -> Option<[u8; DISCRIMINATOR_LEN]> {
    DISCRIMINATORS
        .iter()
        .find(|(_, k)| *k == kind)
        .map(|(discriminator, _)| *discriminator)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSpec {
    pub name: &'static str,
    /// Anchor passes the program id itself to signal `None` for optional accounts.
    pub optional: bool,
}

const fn role(name: &'static str) -> RoleSpec {
    RoleSpec {
        name,
        optional: false,
    }
}

const fn optional_role(name: &'static str) -> RoleSpec {
    RoleSpec {
        name,
        optional: true,
    }
}

pub const MERKLE_TREE: &str = "merkle_tree";
pub const TREE_CONFIG: &str = "tree_config";
pub const LEAF_OWNER: &str = "leaf_owner";
pub const LEAF_DELEGATE: &str = "leaf_delegate";
pub const NEW_LEAF_OWNER: &str = "new_leaf_owner";
pub const COLLECTION_MINT: &str = "collection_mint";

const MINT_V1_ROLES: &[RoleSpec] = &[
    role(TREE_CONFIG),
    role(LEAF_OWNER),
    role(LEAF_DELEGATE),
    role(MERKLE_TREE),
    role("payer"),
    role("tree_creator_or_delegate"),
    role("log_wrapper"),
    role("compression_program"),
    role("system_program"),
];

const MINT_TO_COLLECTION_V1_ROLES: &[RoleSpec] = &[
    role(TREE_CONFIG),
    role(LEAF_OWNER),
    role(LEAF_DELEGATE),
    role(MERKLE_TREE),
    role("payer"),
    role("tree_creator_or_delegate"),
    role("collection_authority"),
    optional_role("collection_authority_record_pda"),
    role(COLLECTION_MINT),
    role("collection_metadata"),
    role("collection_edition"),
    role("bubblegum_signer"),
    role("log_wrapper"),
    role("compression_program"),
    role("token_metadata_program"),
    role("system_program"),
];

const TRANSFER_ROLES: &[RoleSpec] = &[
    role(TREE_CONFIG),
    role(LEAF_OWNER),
    role(LEAF_DELEGATE),
    role(NEW_LEAF_OWNER),
    role(MERKLE_TREE),
    role("log_wrapper"),
    role("compression_program"),
    role("system_program"),
];

const BURN_ROLES: &[RoleSpec] = &[
    role(TREE_CONFIG),
    role(LEAF_OWNER),
    role(LEAF_DELEGATE),
    role(MERKLE_TREE),
    role("log_wrapper"),
    role("compression_program"),
    role("system_program"),
];

pub fn role_schema(kind: InstructionKind) -> &'static [RoleSpec] {
    match kind {
        InstructionKind::MintV1 => MINT_V1_ROLES,
        InstructionKind::MintToCollectionV1 => MINT_TO_COLLECTION_V1_ROLES,
        InstructionKind::Transfer => TRANSFER_ROLES,
        InstructionKind::Burn => BURN_ROLES,
        _ => &[],
    }
}
