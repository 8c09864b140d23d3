//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scheduled jobs branch on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 2    | Usage error (bad arguments, unreadable config file)      |
//! | 3    | Invalid config (TOML syntax or validation)               |
//! | 4    | Source error (unreadable workbook, header, date, number) |
//! | 5    | Master data error                                        |
//! | 6    | Reconciliation error (duplicate key, zero volume)        |
//! | 7    | Persistence error (sales table not written)              |

use sellout_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing config file, unwritable output file.
pub const EXIT_USAGE: u8 = 2;

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// A chain's export could not be read or did not match its layout.
pub const EXIT_SOURCE: u8 = 4;

/// Master data file or table could not be loaded.
pub const EXIT_MASTER_DATA: u8 = 5;

/// A dimension key repeated at join time, or a distribution group had zero
/// units under the `fail` policy.
pub const EXIT_RECONCILIATION: u8 = 6;

/// Sales table could not be replaced.
pub const EXIT_PERSISTENCE: u8 = 7;

/// Map a pipeline error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::SourceRead { .. }
        | ReconError::SchemaMismatch { .. }
        | ReconError::DateParse { .. }
        | ReconError::NumberParse { .. } => EXIT_SOURCE,
        ReconError::MasterData(_) => EXIT_MASTER_DATA,
        ReconError::DuplicateDimensionKey { .. } | ReconError::ZeroVolumeGroup { .. } => {
            EXIT_RECONCILIATION
        }
        ReconError::Persistence(_) => EXIT_PERSISTENCE,
    }
}
