//! Device State Machine module root.

pub mod machine;

pub use self::machine::{
    DeviceStateMachine, HISTORY_DEPTH, Transition, TransitionReason, TransitionRecord,
};
