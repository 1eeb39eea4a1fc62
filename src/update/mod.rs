// ABOUTME: Server updates using the type state pattern for the install swap.
// ABOUTME: Exports the release feed, update check, rollout states, and the orchestrator.

mod check;
mod error;
mod feed;
mod orchestrator;
mod rollout;
mod state;
mod transitions;

pub use check::{UpdateCheck, UpdateStatus, check_for_update};
pub use error::{Recovery, UpdateError, UpdateErrorKind};
pub use feed::{HttpReleaseFeed, ReleaseFeed, ReleaseInfo, version_from_url};
pub use orchestrator::{UpdateContext, UpdateOrchestrator, UpdateOutcome, UpdateReport};
pub use rollout::{ArtifactStatus, DownloadArtifact, PRESERVED_ITEMS, Rollout, SwapPlan};
pub use state::{Completed, Downloaded, Installed, Parked, Restored, RollbackPoint, Stopped};
pub use transitions::TransitionResult;
