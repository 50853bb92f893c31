pub mod engine;
pub mod states;

pub use engine::{can_transition, OrderLifecycle, OrderTransitionError};
pub use states::{Actor, ActorRole, StatusChange, TransitionOutcome};
