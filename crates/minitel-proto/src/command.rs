//! Command codes.
//!
//! Client commands live in `0x00..=0x7F`; server responses set the high bit.
//! A response code is its request code with `0x80` or'd in, except for
//! DUMP, which has two possible answers.

use std::fmt;

/// One-byte command code carried in every frame.
///
/// Decoding never rejects a code: unrecognised values become
/// [`Command::Unknown`] and it is up to the caller to refuse them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client greeting (0x01)
    Hello,
    /// Request for the override code (0x02)
    Dump,
    /// Graceful close (0x04)
    Stop,
    /// Server answer to HELLO (0x81)
    HelloAck,
    /// Server refused a DUMP (0x82)
    DumpFailed,
    /// Server answered a DUMP with the code in the payload (0x83)
    DumpOk,
    /// Server answer to STOP (0x84)
    StopOk,
    /// Code outside the known set
    Unknown(u8),
}

impl Command {
    /// Map a wire byte to a command.
    pub fn from_u8(code: u8) -> Self {
        match code {
            0x01 => Self::Hello,
            0x02 => Self::Dump,
            0x04 => Self::Stop,
            0x81 => Self::HelloAck,
            0x82 => Self::DumpFailed,
            0x83 => Self::DumpOk,
            0x84 => Self::StopOk,
            other => Self::Unknown(other),
        }
    }

    /// Wire byte for this command.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Hello => 0x01,
            Self::Dump => 0x02,
            Self::Stop => 0x04,
            Self::HelloAck => 0x81,
            Self::DumpFailed => 0x82,
            Self::DumpOk => 0x83,
            Self::StopOk => 0x84,
            Self::Unknown(code) => code,
        }
    }

    /// Protocol name, `"UNKNOWN"` for unrecognised codes.
    pub fn name(self) -> &'static str {
        match self {
            Self::Hello => "HELLO",
            Self::Dump => "DUMP",
            Self::Stop => "STOP",
            Self::HelloAck => "HELLO_ACK",
            Self::DumpFailed => "DUMP_FAILED",
            Self::DumpOk => "DUMP_OK",
            Self::StopOk => "STOP_OK",
            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// True for codes a server sends.
    pub fn is_response(self) -> bool {
        self.to_u8() & 0x80 != 0
    }
}

impl From<u8> for Command {
    fn from(code: u8) -> Self {
        Self::from_u8(code)
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.to_u8()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
