//! Measurement modes and the front-end switch configuration each one needs.
//!
//! The peer selects a mode by writing a single byte to the mode
//! characteristic.  Byte values follow the profile definition:
//!
//! | Byte | Mode            | Front end                     |
//! |------|-----------------|-------------------------------|
//! | 0    | Off             | both lines low, ADC closed    |
//! | 1    | 3 V range       | A low, B low                  |
//! | 2    | 10 V range      | A low, B high (divider)       |
//! | 3    | 500 mA range    | A high, B unchanged (shunt)   |
//! | 4    | Resistance      | unsupported, treated as Off   |

/// Measurement mode selected by the connected peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Mode {
    #[default]
    Off = 0,
    /// Range A: direct input, 0–3 V.
    Volts3 = 1,
    /// Range B: through the resistive divider, 0–10 V.
    Volts10 = 2,
    /// Range C: across the current shunt, 0–500 mA.
    MilliAmps500 = 3,
    /// Range D: resistance.  No front end exists for it yet.
    Ohms = 4,
}

impl Mode {
    /// Decode the characteristic byte.  Unknown values map to `None`; the
    /// controller treats them like an unsupported mode.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::Volts3),
            2 => Some(Self::Volts10),
            3 => Some(Self::MilliAmps500),
            4 => Some(Self::Ohms),
            _ => None,
        }
    }

    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// Switch-line levels for this mode, given the current levels.
    ///
    /// Returns `None` for modes without a front end.  The 500 mA range only
    /// drives line A, so line B keeps whatever level it had.
    pub const fn front_end(self, current: FrontEndLines) -> Option<FrontEndLines> {
        match self {
            Self::Volts3 => Some(FrontEndLines::LOW),
            Self::Volts10 => Some(FrontEndLines {
                line_a: false,
                line_b: true,
            }),
            Self::MilliAmps500 => Some(FrontEndLines {
                line_a: true,
                line_b: current.line_b,
            }),
            Self::Off | Self::Ohms => None,
        }
    }
}

/// Levels of the two GPIO lines that route the input through the
/// attenuator or the shunt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrontEndLines {
    pub line_a: bool,
    pub line_b: bool,
}

impl FrontEndLines {
    /// Both lines low: direct input, nothing switched in.
    pub const LOW: Self = Self {
        line_a: false,
        line_b: false,
    };
}
