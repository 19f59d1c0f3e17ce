//! Generic state machine infrastructure for the bridge.
//!
//! This module provides the core abstractions for the state machines of the bridge, including the
//! generic output type and the trait that every state machine implements.

/// Generic output from any state machine after processing an event.
///
/// `duties` are the actions that need to be executed outside of the host chain's ordered
/// pipeline, such as relaying a transaction to the Bitcoin network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SMOutput<D> {
    /// The duties that need to be performed by external executors.
    pub duties: Vec<D>,
}

impl<D> Default for SMOutput<D> {
    fn default() -> Self {
        Self { duties: Vec::new() }
    }
}

impl<D> SMOutput<D> {
    /// Creates a new empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an output with the given duties.
    pub const fn with_duties(duties: Vec<D>) -> Self {
        Self { duties }
    }
}

/// Trait for all state machines in the bridge.
///
/// Each state machine specifies its own configuration, duty, event and error types through
/// associated types.
pub trait StateMachine {
    /// The static configuration passed along with every event.
    type Config;

    /// The type of duties this state machine can emit.
    type Duty;

    /// The type of events this state machine can process.
    type Event;

    /// The error type returned when event processing fails.
    type Error;

    /// Processes an event and returns the duties to execute or an error.
    ///
    /// An event that is rejected must leave the state machine unchanged.
    fn process_event(
        &mut self,
        cfg: Self::Config,
        event: Self::Event,
    ) -> Result<SMOutput<Self::Duty>, Self::Error>;
}
