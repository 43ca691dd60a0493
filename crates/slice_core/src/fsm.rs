//! Finite state machine

use std::fmt::Debug;

/// A transition that is not part of the machine's table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rejected<S, E> {
    pub state: S,
    pub event: E,
}

/// C-enums that implement this trait can undergo state machine transitions.
///
/// Unlike a permissive machine, events with no matching transition are
/// rejected and leave the state untouched, so the caller decides what a
/// rejection means.
pub trait TransitableState: Clone + Copy + Debug + Default {
    /// Events that can trigger a change in state.
    type Event: Clone + Copy + Debug;

    /// Process the input and modify the internal state, if applicable.
    ///
    /// Use the [state_transitions!] macro to implement this trait.
    fn ingest(&mut self, event: Self::Event) -> Result<(), Rejected<Self, Self::Event>>;
}

/// Generate the state transition logic.
///
/// This macro implements [TransitableState::ingest].
///
/// ```
/// use slice_core::fsm::TransitableState;
/// use slice_core::state_transitions;
///
/// #[derive(Clone, Copy, Debug, Default, PartialEq)]
/// enum Lamp {
///     #[default]
///     Off,
///     On,
/// }
///
/// #[derive(Clone, Copy, Debug)]
/// enum LampEvent {
///     Press,
///     Unplug,
/// }
///
/// state_transitions! {
///     type State = Lamp;
///     type Event = LampEvent;
///
///     Off + Press => On;
///     On + Press | Unplug => Off;
/// }
///
/// let mut lamp = Lamp::default();
/// lamp.ingest(LampEvent::Press).unwrap();
/// assert_eq!(lamp, Lamp::On);
/// assert!(Lamp::Off.ingest(LampEvent::Unplug).is_err());
/// ```
#[macro_export]
macro_rules! state_transitions {
    {
        type State = $st: ident;
        type Event = $ev: ident;

        $($st_variant: ident + $($ev_variant: ident)|+ => $new_st: ident;)*
    } => {

        impl $crate::fsm::TransitableState for $st {
            type Event = $ev;

            fn ingest(
                &mut self,
                event: Self::Event,
            ) -> ::std::result::Result<(), $crate::fsm::Rejected<Self, Self::Event>> {

                *self = match (*self, event) {

                    $(
                        ($st::$st_variant, $($ev::$ev_variant)|+) => $st::$new_st,
                    )*

                    // all other cases
                    (state, event) => return Err($crate::fsm::Rejected { state, event }),
                };

                Ok(())
            }
        }
    };
}

/// Sequencing state of a [crate::builder::SliceBuilder].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BuilderState {
    /// Nothing open. Children (strings, vectors, records) may be created.
    #[default]
    Idle,

    /// A record is open and accepts fields.
    InRecord,

    /// A vector is open and accepts elements.
    InVector,

    /// An earlier call was rejected. The build cannot continue.
    Poisoned,
}

/// Calls made against a [crate::builder::SliceBuilder].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuilderEvent {
    StartRecord,
    Field,
    EndRecord,
    StartVector,
    Element,
    EndVector,
    /// Create a string or a byte vector in one call.
    Child,
    Finish,
}

state_transitions! {
    type State = BuilderState;
    type Event = BuilderEvent;

    Idle + StartRecord => InRecord;
    Idle + StartVector => InVector;
    Idle + Child | Finish => Idle;
    InRecord + Field => InRecord;
    InRecord + EndRecord => Idle;
    InVector + Element => InVector;
    InVector + EndVector => Idle;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sequence() {
        let mut state = BuilderState::default();

        for event in [
            BuilderEvent::Child,
            BuilderEvent::StartRecord,
            BuilderEvent::Field,
            BuilderEvent::Field,
            BuilderEvent::EndRecord,
            BuilderEvent::Finish,
        ] {
            state.ingest(event).unwrap();
        }

        assert_eq!(state, BuilderState::Idle);
    }

    #[test]
    fn test_rejected_transitions_keep_state() {
        let mut state = BuilderState::InRecord;

        let rejected = state.ingest(BuilderEvent::StartRecord).unwrap_err();
        assert_eq!(rejected.state, BuilderState::InRecord);
        assert_eq!(rejected.event, BuilderEvent::StartRecord);
        assert_eq!(state, BuilderState::InRecord);

        assert!(state.ingest(BuilderEvent::Child).is_err());
        assert!(state.ingest(BuilderEvent::Finish).is_err());
    }

    #[test]
    fn test_poisoned_accepts_nothing() {
        let mut state = BuilderState::Poisoned;

        for event in [
            BuilderEvent::StartRecord,
            BuilderEvent::StartVector,
            BuilderEvent::Child,
            BuilderEvent::Finish,
        ] {
            assert!(state.ingest(event).is_err());
        }
    }
}
