use crate::protocols::log_wrapper::LeafSchema;

/// Threaded by value through the reverse walk, so it sees an emission before its mint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LeafSchemaCorrelator {
    #[default]
    Empty,
    Holding {
        schema: LeafSchema,
        nested_under: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintClaim {
    Matched(LeafSchema),
    /// Emitted inside the call tree of a different top-level instruction.
    Foreign {
        schema: LeafSchema,
        nested_under: usize,
    },
    Nothing,
}

impl LeafSchemaCorrelator {
    pub fn observe(self, schema: LeafSchema, nested_under: Option<usize>) -> Self {
        Self::Holding {
            schema,
            nested_under,
        }
    }

    /// Hand the held schema to the mint executing under top-level `position` and reset.
    pub fn take_for_mint(self, position: usize) -> (Self, MintClaim) {
        let claim = match self {
            Self::Empty => MintClaim::Nothing,
            Self::Holding {
                schema,
                nested_under: Some(parent),
            } if parent != position => MintClaim::Foreign {
                schema,
                nested_under: parent,
            },
            Self::Holding { schema, .. } => MintClaim::Matched(schema),
        };
        (Self::Empty, claim)
    }

    pub fn is_holding(&self) -> bool {
        matches!(self, Self::Holding { .. })
    }
}
