/// MIDI channel, always in `0..16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(u8);

impl Channel {
    pub const COUNT: usize = 16;

    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < Self::COUNT).then_some(Self(index))
    }

    /// Channel carried in the low nibble of a status byte.
    pub fn from_status(status: u8) -> Self {
        Self(status & 0x0F)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> u8 {
        channel.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NoteOn {
        channel: Channel,
        note: u8,
        velocity: u8,
    },
    NoteOff {
        channel: Channel,
        note: u8,
        velocity: u8,
    },
    ProgramChange { channel: Channel, program: u8 },
    EndOfTrack,
}

/// A decoded sequence event.
///
/// `time` is the accumulated delta-time in ticks since the start of the
/// sequence, not the delta from the previous event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub time: u32,
    pub kind: EventKind,
}

impl Event {
    pub fn new(time: u32, kind: EventKind) -> Self {
        Self { time, kind }
    }

    pub fn channel(&self) -> Option<Channel> {
        match self.kind {
            EventKind::NoteOn { channel, .. }
            | EventKind::NoteOff { channel, .. }
            | EventKind::ProgramChange { channel, .. } => Some(channel),
            EventKind::EndOfTrack => None,
        }
    }
}

pub type EventList = Vec<Event>;
