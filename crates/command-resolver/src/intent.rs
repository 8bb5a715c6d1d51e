//! Canonical intents and the actuator command table

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Canonical command categories understood by the robot.
///
/// Declaration order is significant: it breaks ties between equally
/// probable classifier predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    LightOn,
    LightOff,
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    Stop,
    ReadTemperature,
    ReadHumidity,
    Alarm,
    Beep,
}

impl Intent {
    pub const COUNT: usize = 11;

    /// Every intent, in declaration order.
    pub const ALL: [Intent; Intent::COUNT] = [
        Intent::LightOn,
        Intent::LightOff,
        Intent::MoveForward,
        Intent::MoveBackward,
        Intent::MoveLeft,
        Intent::MoveRight,
        Intent::Stop,
        Intent::ReadTemperature,
        Intent::ReadHumidity,
        Intent::Alarm,
        Intent::Beep,
    ];

    /// Stable snake_case label
    pub fn label(self) -> &'static str {
        match self {
            Intent::LightOn => "light_on",
            Intent::LightOff => "light_off",
            Intent::MoveForward => "move_forward",
            Intent::MoveBackward => "move_backward",
            Intent::MoveLeft => "move_left",
            Intent::MoveRight => "move_right",
            Intent::Stop => "stop",
            Intent::ReadTemperature => "read_temperature",
            Intent::ReadHumidity => "read_humidity",
            Intent::Alarm => "alarm",
            Intent::Beep => "beep",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Intent::ALL
            .into_iter()
            .find(|i| i.label() == wanted)
            .ok_or_else(|| format!("unknown intent: {s}"))
    }
}

/// A literal actuator-protocol command, sent verbatim (newline appended by the link).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command(String);

impl Command {
    pub fn new(literal: impl Into<String>) -> Self {
        Self(literal.into())
    }

    /// Tone command `S<hz>:<seconds>`
    pub fn tone(hz: u32, seconds: u32) -> Self {
        Self(format!("S{hz}:{seconds}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Command {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Default protocol literals for every intent.
pub const DEFAULT_COMMANDS: &[(Intent, &str)] = &[
    (Intent::LightOn, "L13:1:5"),
    (Intent::LightOff, "L13:0:0"),
    (Intent::MoveForward, "MF:90:1"),
    (Intent::MoveBackward, "MB:90:1"),
    (Intent::MoveLeft, "ML:90:1"),
    (Intent::MoveRight, "MR:90:1"),
    (Intent::Stop, "MS:0:0"),
    (Intent::ReadTemperature, "TR"),
    (Intent::ReadHumidity, "HR"),
    (Intent::Alarm, "S1000:1;S2000:1;S1000:1"),
    (Intent::Beep, "S1000:1"),
];

/// Read-only intent → command mapping.
///
/// Built once from a declarative list; a later entry for the same intent
/// replaces an earlier one. Intents without an entry are unmapped.
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: [Option<Command>; Intent::COUNT],
}

impl CommandTable {
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Intent, &'a str)>,
    {
        let mut table: [Option<Command>; Intent::COUNT] = Default::default();
        for (intent, literal) in entries {
            table[intent as usize] = Some(Command::new(literal));
        }
        Self { entries: table }
    }

    pub fn lookup(&self, intent: Intent) -> Option<&Command> {
        self.entries[intent as usize].as_ref()
    }

    /// Number of mapped intents
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Intent, &Command)> + '_ {
        Intent::ALL
            .into_iter()
            .filter_map(|i| self.lookup(i).map(|c| (i, c)))
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::from_entries(DEFAULT_COMMANDS.iter().copied())
    }
}
