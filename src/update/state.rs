// ABOUTME: Rollout state marker types for the type state pattern.
// ABOUTME: Zero-sized types enforce the order of the install swap at compile time.

/// Release archive downloaded and readable; live install untouched.
/// Available actions: `stop_server()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Downloaded;

/// Server stopped; live install untouched.
/// Available actions: `park_current()`, `resume()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Stopped;

/// Live install renamed to the rollback slot; no live install exists.
/// Available actions: `install()`, `roll_back()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Parked;

/// Fresh release extracted into the live path.
/// Available actions: `restore_state()`, `roll_back()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Installed;

/// Worlds and settings copied back from the rollback slot.
/// Available actions: `relaunch()`, `roll_back()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Restored;

/// Updated server launched.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Completed;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Parked {}
    impl Sealed for super::Installed {}
    impl Sealed for super::Restored {}
}

/// States after the live install was moved aside, from which `roll_back()` is available.
pub trait RollbackPoint: sealed::Sealed {}

impl RollbackPoint for Parked {}
impl RollbackPoint for Installed {}
impl RollbackPoint for Restored {}
