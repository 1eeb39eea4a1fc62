// ABOUTME: Validated domain types shared across the keeper.
// ABOUTME: Server versions and player identities parsed from console output.

mod player;
mod version;

pub use player::{PlayerIdError, PlayerName, Xuid};
pub use version::{ServerVersion, VersionCompareError, compare_versions, try_compare_versions};
