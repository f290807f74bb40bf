//! # Soulbound Core
//!
//! Core traits and types for the soulbound credential engine.
//!
//! The engine keeps a small, fixed-size aggregate per credential and an
//! unbounded, append-only log of lifecycle actions. Actions are dispatched to
//! the log and later folded into the aggregate by a [`reducer::Reducer`].
//!
//! ## Core Concepts
//!
//! - **State**: The aggregate a reducer folds into
//! - **Action**: One immutable log entry
//! - **Reducer**: Pure fold step `(State, Action, Environment) → State`
//! - **Action Log**: Append-only, externally ordered storage ([`action_log::ActionLog`])
//! - **Fold Pointer**: Hash-chained cursor marking what has been folded ([`pointer::FoldPointer`])
//! - **Environment**: Injected dependencies via traits ([`environment::Clock`])
//!
//! ## Example
//!
//! ```
//! use soulbound_core::reducer::Reducer;
//!
//! #[derive(Default)]
//! struct Tally {
//!     seen: u32,
//! }
//!
//! struct TallyReducer;
//!
//! impl Reducer for TallyReducer {
//!     type State = Tally;
//!     type Action = u32;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut Tally, action: &u32, _env: &()) {
//!         state.seen += action;
//!     }
//! }
//!
//! let mut tally = Tally::default();
//! TallyReducer.reduce_all(&mut tally, [1_u32, 2, 3].iter(), &());
//! assert_eq!(tally.seen, 6);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod action_log;
pub mod event;
pub mod pointer;
pub mod stream;

/// Reducer module - the fold step
///
/// Reducers are pure functions: `(State, Action, Environment) → State`.
/// They are deterministic, so replaying the same actions from the same state
/// always yields the same result.
pub mod reducer {
    /// The Reducer trait - one deterministic fold step
    ///
    /// # Type Parameters
    ///
    /// - `State`: The aggregate this reducer folds into
    /// - `Action`: The log entry type being folded
    /// - `Environment`: Injected dependencies (often `()`)
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Fold one action into state, in place.
        ///
        /// Must not perform I/O and must not depend on anything outside
        /// `state`, `action` and `env`.
        fn reduce(&self, state: &mut Self::State, action: &Self::Action, env: &Self::Environment);

        /// Fold a sequence of actions left to right.
        fn reduce_all<'a, I>(&self, state: &mut Self::State, actions: I, env: &Self::Environment)
        where
            I: IntoIterator<Item = &'a Self::Action>,
            Self::Action: 'a,
        {
            for action in actions {
                self.reduce(state, action, env);
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via an environment value.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use soulbound_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
