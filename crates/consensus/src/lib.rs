pub mod authorization;
pub mod collector;
pub mod fsm;
pub mod submitter;

pub use authorization::{AuthorizationGate, LedgerAuthorizer};
pub use collector::{Collector, CycleOutcome};
pub use fsm::{CollectCycle, CycleState};
pub use submitter::{Submitter, DEFAULT_MAX_IN_FLIGHT};
