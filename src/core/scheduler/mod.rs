pub mod driver;
pub mod session;
pub mod state_machine;

pub use driver::{DetectionLoop, LoopHandle, TickOutcome};
pub use session::{
    AcceptedDocument, CycleOutcome, CycleTicket, DetectionSession, SessionStats, TickDecision,
};
pub use state_machine::{DetectionState, SchedulerEvent, StateAction};
