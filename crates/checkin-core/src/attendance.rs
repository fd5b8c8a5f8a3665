//! Attendance matrix types.
//!
//! A [`WeekRecord`] is the whole matrix for one week: participants in
//! membership-snapshot order, each owning an [`AttendanceRow`] of fixed length.
//! The participant set is frozen at construction; the only mutation is
//! [`WeekRecord::mark`].

use serde::{Deserialize, Serialize};

/// State of one (participant, day) cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// Not yet completed.
    Pending,
    /// Qualifying post received before the cutoff.
    Completed,
    /// Non-business day in a full-week record. Never changes.
    Weekend,
}

impl AttendanceStatus {
    /// Glyph used by the summary message.
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Pending => "❌",
            Self::Completed => "✅",
            Self::Weekend => "➖",
        }
    }

    /// Whether the cell can no longer change this week.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Number of day slots tracked per week.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekLength {
    /// Monday to Friday.
    #[default]
    Business,
    /// Monday to Sunday, with Saturday and Sunday pre-filled as [`AttendanceStatus::Weekend`].
    Full,
}

impl WeekLength {
    /// Slot count (5 or 7).
    pub fn slots(self) -> usize {
        match self {
            Self::Business => 5,
            Self::Full => 7,
        }
    }

    /// Initial status of a slot when a week is created.
    fn initial_status(self, index: usize) -> AttendanceStatus {
        match self {
            Self::Full if index >= 5 => AttendanceStatus::Weekend,
            _ => AttendanceStatus::Pending,
        }
    }

    /// Stored integer form.
    pub fn as_i64(self) -> i64 {
        self.slots() as i64
    }

    /// Inverse of [`WeekLength::as_i64`].
    pub fn from_i64(n: i64) -> Option<Self> {
        match n {
            5 => Some(Self::Business),
            7 => Some(Self::Full),
            _ => None,
        }
    }
}

/// Column index within an attendance row. Monday is slot 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DaySlot(u8);

impl DaySlot {
    /// Slot for a weekday index (Monday = 0). `None` when the weekday is outside
    /// the configured week length, e.g. Saturday in a business week.
    pub fn for_weekday(weekday_index: u32, length: WeekLength) -> Option<Self> {
        let index = weekday_index as usize;
        (index < length.slots()).then_some(Self(weekday_index as u8))
    }

    /// Zero-based column.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a completion picks the cell to mark.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotPolicy {
    /// Mark exactly today's slot.
    #[default]
    Today,
    /// Mark the earliest still-pending slot at or before today.
    Backfill,
}

/// One participant's statuses for the week, in slot order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendanceRow(Vec<AttendanceStatus>);

impl AttendanceRow {
    fn fresh(length: WeekLength) -> Self {
        Self((0..length.slots()).map(|i| length.initial_status(i)).collect())
    }

    /// Status at `slot`, if in range.
    pub fn get(&self, slot: DaySlot) -> Option<AttendanceStatus> {
        self.0.get(slot.index()).copied()
    }

    /// All statuses in slot order.
    pub fn statuses(&self) -> &[AttendanceStatus] {
        &self.0
    }

    /// Concatenated glyphs, e.g. `❌❌✅❌❌`.
    pub fn glyphs(&self) -> String {
        self.0.iter().map(|s| s.glyph()).collect()
    }

    /// Number of completed cells.
    pub fn completed(&self) -> usize {
        self.0
            .iter()
            .filter(|s| **s == AttendanceStatus::Completed)
            .count()
    }
}

/// A participant and their row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRow {
    /// Display name captured at week start.
    pub name: String,
    /// Statuses for the week.
    pub days: AttendanceRow,
}

/// Result of a successful [`WeekRecord::mark`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The given slot moved from Pending to Completed.
    Marked(DaySlot),
    /// Nothing changed; the participant already has credit.
    AlreadyCompleted,
}

/// Why a [`WeekRecord::mark`] was refused.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MarkError {
    /// Name is not part of the frozen participant set.
    #[error("unknown participant: {0}")]
    UnknownParticipant(String),
    /// The target cell is a rest day or outside the row.
    #[error("no challenge slot for this day")]
    NoSlotToday,
}

/// Attendance matrix for one week.
///
/// Not `Deserialize`: stored rows come back through [`WeekRecord::from_parts`]
/// so the row-length and unique-name invariants are checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WeekRecord {
    length: WeekLength,
    participants: Vec<ParticipantRow>,
}

impl WeekRecord {
    /// Fresh record with every cell at its initial status.
    ///
    /// Names keep their snapshot order. A repeated name keeps its first
    /// position only, since rows are keyed by display name.
    pub fn new<I, S>(length: WeekLength, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut participants: Vec<ParticipantRow> = Vec::new();
        for name in names {
            let name = name.into();
            if participants.iter().any(|p| p.name == name) {
                continue;
            }
            participants.push(ParticipantRow {
                name,
                days: AttendanceRow::fresh(length),
            });
        }
        Self {
            length,
            participants,
        }
    }

    /// Rebuild from stored parts. Returns `None` if any row length disagrees
    /// with `length` or a name repeats.
    pub fn from_parts(length: WeekLength, participants: Vec<ParticipantRow>) -> Option<Self> {
        let rows_ok = participants
            .iter()
            .all(|p| p.days.statuses().len() == length.slots());
        let names_unique = participants
            .iter()
            .enumerate()
            .all(|(i, p)| participants[..i].iter().all(|q| q.name != p.name));
        (rows_ok && names_unique).then_some(Self {
            length,
            participants,
        })
    }

    /// Slot count for this record.
    pub fn length(&self) -> WeekLength {
        self.length
    }

    /// Participants in snapshot order.
    pub fn participants(&self) -> &[ParticipantRow] {
        &self.participants
    }

    /// Participant names in snapshot order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.name.as_str())
    }

    /// Row for a participant.
    pub fn row(&self, name: &str) -> Option<&AttendanceRow> {
        self.participants
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.days)
    }

    /// Whether `name` is part of this week.
    pub fn contains(&self, name: &str) -> bool {
        self.row(name).is_some()
    }

    /// Apply a completion for `name` on `today` according to `policy`.
    pub fn mark(
        &mut self,
        name: &str,
        today: DaySlot,
        policy: SlotPolicy,
    ) -> Result<MarkOutcome, MarkError> {
        let row = self
            .participants
            .iter_mut()
            .find(|p| p.name == name)
            .map(|p| &mut p.days.0)
            .ok_or_else(|| MarkError::UnknownParticipant(name.to_string()))?;

        let current = row.get(today.index()).copied().ok_or(MarkError::NoSlotToday)?;
        if current == AttendanceStatus::Completed {
            return Ok(MarkOutcome::AlreadyCompleted);
        }

        let target = match policy {
            SlotPolicy::Today => {
                if current == AttendanceStatus::Weekend {
                    return Err(MarkError::NoSlotToday);
                }
                today.index()
            }
            SlotPolicy::Backfill => {
                match row[..=today.index()]
                    .iter()
                    .position(|s| *s == AttendanceStatus::Pending)
                {
                    Some(i) => i,
                    None => return Ok(MarkOutcome::AlreadyCompleted),
                }
            }
        };

        row[target] = AttendanceStatus::Completed;
        Ok(MarkOutcome::Marked(DaySlot(target as u8)))
    }
}
