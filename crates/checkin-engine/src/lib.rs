//! # checkin-engine
//!
//! The weekly challenge itself:
//!
//! - [`AttendanceBook`]: attendance state machine over a [`checkin_store::WeekStore`]
//! - [`SummarySync`]: one live summary message per week, recovering from deleted messages
//! - [`Scheduler`]: daily start/continue decision and its timer loop
//! - [`Dispatcher`]: inbound events to operations and localized replies
//!
//! Every operation on a week runs under that week's [`WeekLocks`] entry.

#![deny(unsafe_code)]

pub mod book;
pub mod challenge;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod locks;
pub mod scheduler;
pub mod sync;
pub mod trigger;

pub use book::{AttendanceBook, DeleteOutcome, StagedCompletion};
pub use challenge::Challenge;
pub use config::EngineConfig;
pub use dispatcher::Dispatcher;
pub use errors::ChallengeError;
pub use locks::WeekLocks;
pub use scheduler::{ScheduledAction, Scheduler, decide};
pub use sync::SummarySync;
pub use trigger::{Command, CommandKeywords, Trigger, TriggerParser};
