//! # checkin-core
//!
//! Domain model for the weekly check-in challenge: identifiers, the week
//! clock, the attendance matrix, summary rendering, and the chat platform
//! seam. Nothing here performs I/O.

#![deny(unsafe_code)]

pub mod attendance;
pub mod clock;
pub mod errors;
pub mod events;
pub mod ids;
pub mod platform;
pub mod render;

pub use attendance::{
    AttendanceRow, AttendanceStatus, DaySlot, MarkError, MarkOutcome, ParticipantRow,
    SlotPolicy, WeekLength, WeekRecord,
};
pub use clock::{Clock, FixedClock, SystemClock, WeekContext};
pub use errors::{ClockError, PlatformError};
pub use events::{ChatEvent, EventKind};
pub use ids::{ChannelId, MessageTs, UserId, WeekId};
pub use platform::{ChatPlatform, MessageHandle};
pub use render::{Locale, Notice};
