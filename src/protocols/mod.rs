pub mod bubblegum;
pub mod log_wrapper;
pub mod payload;

use solana_pubkey::Pubkey;

pub const BUBBLEGUM_PROGRAM_ID: &str = "BGUMAp9Gq7iTEuizy4pqaxsTyUCBK68MDfK752saRPUY";
pub const SPL_NOOP_PROGRAM_ID: &str = "noopb9bkMVfRPU8AsbpTUg8AQkHtKwMYZiFUjNRtMmV";
pub const SPL_ACCOUNT_COMPRESSION_PROGRAM_ID: &str = "cmtDvXumGCrqC1Age74AVPhSRVXJMd8PJS91L8KbNCK";

pub const BUBBLEGUM: Pubkey = Pubkey::from_str_const(BUBBLEGUM_PROGRAM_ID);
pub const SPL_NOOP: Pubkey = Pubkey::from_str_const(SPL_NOOP_PROGRAM_ID);

/// What an instruction's owning program means to the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ProgramRole {
    /// The program whose instructions mutate compressed assets.
    Target,
    /// A program used only to emit structured data into the transaction log.
    LogWrapper,
}

/// Immutable program registry handed to the scanner at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanContext {
    pub target_program: Pubkey,
    pub log_wrapper_programs: Vec<Pubkey>,
}

impl ScanContext {
    pub fn new(target_program: Pubkey, log_wrapper_programs: Vec<Pubkey>) -> Self {
        Self {
            target_program,
            log_wrapper_programs,
        }
    }

    pub fn program_role(&self, program: &Pubkey) -> Option<ProgramRole> {
        if *program == self.target_program {
            Some(ProgramRole::Target)
        } else if self.log_wrapper_programs.contains(program) {
            Some(ProgramRole::LogWrapper)
        } else {
            None
        }
    }

    pub fn all_program_ids(&self) -> Vec<Pubkey> {
        std::iter::once(self.target_program)
            .chain(self.log_wrapper_programs.iter().copied())
            .collect()
    }
}

impl Default for ScanContext {
    fn default() -> Self {
        Self::new(BUBBLEGUM, vec![SPL_NOOP])
    }
}

/// Fixed-width byte reader for layouts that are not worth a Borsh type.
pub fn read_array<const N: usize>(data: &[u8], offset: usize) -> Option<[u8; N]> {
    data.get(offset..offset.checked_add(N)?)?.try_into().ok()
}
