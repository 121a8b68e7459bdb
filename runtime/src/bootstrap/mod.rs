//! SDK bootstrap coordination — the shared init guard and view teardown.

pub mod guard;
pub mod teardown;

pub use guard::{BootstrapRequest, BootstrapState, InitGuard, ReadinessWait};
pub use teardown::TeardownSignal;
