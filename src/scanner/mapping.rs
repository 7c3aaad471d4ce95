use crate::protocols::bubblegum::InstructionKind;
use crate::scanner::EventKind;

/// Canonical mapping from [`InstructionKind`] to the mutation it records.
///
/// Kinds that do not change ownership or existence of a leaf (delegation, creator and
/// collection verification, tree administration) map to `None` and are classified
/// without emitting an event.
pub fn instruction_to_event_kind(kind: InstructionKind) -> Option<EventKind> {
    match kind {
        InstructionKind::MintV1 | InstructionKind::MintToCollectionV1 => Some(EventKind::Mint),
        InstructionKind::Transfer => Some(EventKind::Transfer),
        InstructionKind::Burn => Some(EventKind::Burn),
        InstructionKind::Delegate
        | InstructionKind::Redeem
        | InstructionKind::CancelRedeem
        | InstructionKind::DecompressV1
        | InstructionKind::Compress
        | InstructionKind::CreateTree
        | InstructionKind::SetTreeDelegate
        | InstructionKind::VerifyCreator
        | InstructionKind::UnverifyCreator
        | InstructionKind::VerifyCollection
        | InstructionKind::UnverifyCollection
        | InstructionKind::SetAndVerifyCollection
        | InstructionKind::UpdateMetadata
        | InstructionKind::SetDecompressibleState
        | InstructionKind::SetDecompressableState
        | InstructionKind::VerifyLeaf
        | InstructionKind::Unrecognized => None,
    }
}

/// Whether events of this kind take their leaf position from a log-wrapper emission
/// rather than from the instruction arguments.
pub fn needs_leaf_schema(kind: EventKind) -> bool {
    matches!(kind, EventKind::Mint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::VariantNames;

    #[test]
    fn only_ownership_mutations_map_to_events() {
        let mapped: Vec<_> = InstructionKind::VARIANTS
            .iter()
            .filter_map(|name| InstructionKind::from_str(name).ok())
            .filter(|kind| instruction_to_event_kind(*kind).is_some())
            .collect();
        assert_eq!(
            mapped,
            vec![
                InstructionKind::MintV1,
                InstructionKind::MintToCollectionV1,
                InstructionKind::Transfer,
                InstructionKind::Burn,
            ]
        );
    }

    #[test]
    fn mint_kinds_agree_with_mint_events() {
        for name in InstructionKind::VARIANTS {
            let kind = InstructionKind::from_str(name).unwrap_or(InstructionKind::Unrecognized);
            assert_eq!(
                kind.is_mint(),
                instruction_to_event_kind(kind).is_some_and(needs_leaf_schema),
                "{kind}"
            );
        }
    }
}
