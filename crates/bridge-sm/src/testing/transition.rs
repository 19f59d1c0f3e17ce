//! Value-based transition testing helpers.
//!
//! Declare the transition table of a state machine as concrete values and check each entry with
//! [`test_transition`] or [`test_invalid_transition`].

use std::fmt::Debug;

use crate::state_machine::StateMachine;

/// Describes a valid state transition.
#[derive(Debug)]
pub(crate) struct Transition<S, E, D> {
    /// The initial state before the transition
    pub(crate) from_state: S,
    /// The event that triggers the transition
    pub(crate) event: E,
    /// The expected state after the transition
    pub(crate) expected_state: S,
    /// The expected duties emitted during the transition
    pub(crate) expected_duties: Vec<D>,
}

/// Creates a state machine in `from_state`, processes the event and checks the resulting state and
/// duties.
pub(crate) fn test_transition<SM, S, E, D, Err, CreateFn, GetStateFn>(
    create_sm: CreateFn,
    get_state: GetStateFn,
    config: SM::Config,
    transition: Transition<S, E, D>,
) where
    SM: StateMachine<Event = E, Duty = D, Error = Err>,
    S: PartialEq + Debug,
    D: PartialEq + Debug,
    Err: Debug,
    CreateFn: Fn(S) -> SM,
    GetStateFn: Fn(&SM) -> &S,
{
    let mut sm = create_sm(transition.from_state);

    let output = sm
        .process_event(config, transition.event)
        .unwrap_or_else(|e| panic!("Expected successful transition, got error: {e:?}"));

    assert_eq!(
        get_state(&sm),
        &transition.expected_state,
        "State mismatch after transition"
    );
    assert_eq!(output.duties, transition.expected_duties, "Duties mismatch");
}

/// Describes an invalid state-event pair that should produce an error.
#[derive(Debug)]
pub(crate) struct InvalidTransition<S, E, Err> {
    /// The initial state
    pub(crate) from_state: S,
    /// The event that should be rejected
    pub(crate) event: E,
    /// A function to verify the error type
    pub(crate) expected_error: fn(&Err) -> bool,
}

/// Checks that the event is rejected and that the state machine is left in its initial state.
pub(crate) fn test_invalid_transition<SM, S, E, D, Err, CreateFn, GetStateFn>(
    create_sm: CreateFn,
    get_state: GetStateFn,
    config: SM::Config,
    invalid: InvalidTransition<S, E, Err>,
) where
    SM: StateMachine<Event = E, Duty = D, Error = Err>,
    S: PartialEq + Clone + Debug,
    D: Debug,
    Err: Debug,
    CreateFn: Fn(S) -> SM,
    GetStateFn: Fn(&SM) -> &S,
{
    let from_state = invalid.from_state.clone();
    let mut sm = create_sm(invalid.from_state);

    let err = match sm.process_event(config, invalid.event) {
        Ok(output) => panic!("Expected error, but transition succeeded with {output:?}"),
        Err(e) => e,
    };

    assert!(
        (invalid.expected_error)(&err),
        "Error type mismatch. Got: {err:?}"
    );
    assert_eq!(get_state(&sm), &from_state, "Rejected event changed the state");
}
