//! Bed screw thread definitions.
//!
//! The thread type decides how far one full screw turn moves the bed and
//! which way the user has to turn. Threads are selected with a two-digit
//! code: the first digit is the metric size, the second the handedness.

use crate::error::{Error, Result};

/// Metric screw size of the bed adjusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrewSize {
    /// M3, 0.5 mm pitch.
    M3,
    /// M4, 0.7 mm pitch.
    M4,
    /// M5, 0.8 mm pitch.
    M5,
}

impl ScrewSize {
    /// Millimeters advanced per full turn.
    pub fn pitch(&self) -> f64 {
        match self {
            Self::M3 => 0.5,
            Self::M4 => 0.7,
            Self::M5 => 0.8,
        }
    }

    /// Nominal diameter in millimeters.
    pub fn diameter(&self) -> u8 {
        match self {
            Self::M3 => 3,
            Self::M4 => 4,
            Self::M5 => 5,
        }
    }
}

/// A bed screw thread: size and handedness.
///
/// Odd codes are counter-clockwise threads. The numeric code is kept as the
/// canonical representation because the turn direction rule is defined on
/// its parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "i32", into = "i32"))]
#[repr(u8)]
pub enum ScrewThread {
    /// Clockwise M3.
    #[default]
    M3Clockwise = 30,
    /// Counter-clockwise M3.
    M3CounterClockwise = 31,
    /// Clockwise M4.
    M4Clockwise = 40,
    /// Counter-clockwise M4.
    M4CounterClockwise = 41,
    /// Clockwise M5.
    M5Clockwise = 50,
    /// Counter-clockwise M5.
    M5CounterClockwise = 51,
}

impl ScrewThread {
    /// All accepted threads in code order.
    pub const ALL: [ScrewThread; 6] = [
        Self::M3Clockwise,
        Self::M3CounterClockwise,
        Self::M4Clockwise,
        Self::M4CounterClockwise,
        Self::M5Clockwise,
        Self::M5CounterClockwise,
    ];

    /// Parse a thread from its two-digit code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScrewThread`] unless the code lies in
    /// `30..=51` and its last digit is 0 or 1.
    ///
    /// # Example
    ///
    /// ```
    /// use bed_tramming::ScrewThread;
    ///
    /// assert_eq!(ScrewThread::from_code(41).unwrap(), ScrewThread::M4CounterClockwise);
    /// assert!(ScrewThread::from_code(32).is_err());
    /// ```
    pub fn from_code(code: i32) -> Result<Self> {
        if !(30..=51).contains(&code) || code % 10 > 1 {
            return Err(Error::InvalidScrewThread { code });
        }
        Ok(match code {
            30 => Self::M3Clockwise,
            31 => Self::M3CounterClockwise,
            40 => Self::M4Clockwise,
            41 => Self::M4CounterClockwise,
            50 => Self::M5Clockwise,
            _ => Self::M5CounterClockwise,
        })
    }

    /// Get the two-digit code.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Whether the code is odd, i.e. a counter-clockwise thread.
    pub fn is_odd(&self) -> bool {
        self.code() & 1 == 1
    }

    /// Get the metric size.
    pub fn size(&self) -> ScrewSize {
        match self {
            Self::M3Clockwise | Self::M3CounterClockwise => ScrewSize::M3,
            Self::M4Clockwise | Self::M4CounterClockwise => ScrewSize::M4,
            Self::M5Clockwise | Self::M5CounterClockwise => ScrewSize::M5,
        }
    }

    /// Millimeters of bed travel per full screw turn.
    pub fn threads_factor(&self) -> f64 {
        self.size().pitch()
    }

    /// Get a human-readable name for this thread.
    pub fn name(&self) -> &'static str {
        match self {
            Self::M3Clockwise => "Clockwise M3",
            Self::M3CounterClockwise => "Counter-Clockwise M3",
            Self::M4Clockwise => "Clockwise M4",
            Self::M4CounterClockwise => "Counter-Clockwise M4",
            Self::M5Clockwise => "Clockwise M5",
            Self::M5CounterClockwise => "Counter-Clockwise M5",
        }
    }
}

impl TryFrom<i32> for ScrewThread {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self> {
        Self::from_code(code)
    }
}

impl From<ScrewThread> for i32 {
    fn from(thread: ScrewThread) -> Self {
        thread.code() as i32
    }
}

impl std::fmt::Display for ScrewThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
