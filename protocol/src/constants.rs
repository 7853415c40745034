//! Protocol constants and command code definitions

macro_rules! commands {
    ($($name:ident = $code:literal,)*) => {
        /// SMB2 command codes
        ///
        /// Codes outside the table survive as [`Command::Unknown`] so a
        /// response with a newer command can still be inspected.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Command {
            $($name,)*
            Unknown(u16),
        }

        impl Command {
            /// Known commands only
            pub fn from_u16(value: u16) -> Option<Self> {
                match value {
                    $($code => Some(Command::$name),)*
                    _ => None,
                }
            }

            pub fn to_u16(self) -> u16 {
                match self {
                    $(Command::$name => $code,)*
                    Command::Unknown(raw) => raw,
                }
            }
        }
    };
}

commands! {
    Negotiate = 0x0000,
    SessionSetup = 0x0001,
    Logoff = 0x0002,
    TreeConnect = 0x0003,
    TreeDisconnect = 0x0004,
    Create = 0x0005,
    Close = 0x0006,
    Flush = 0x0007,
    Read = 0x0008,
    Write = 0x0009,
    Lock = 0x000A,
    Ioctl = 0x000B,
    Cancel = 0x000C,
    Echo = 0x000D,
    QueryDirectory = 0x000E,
    ChangeNotify = 0x000F,
    QueryInfo = 0x0010,
    SetInfo = 0x0011,
    OplockBreak = 0x0012,
}

impl Command {
    /// Total mapping; unlisted codes become [`Command::Unknown`]
    pub fn from_raw(value: u16) -> Self {
        Self::from_u16(value).unwrap_or(Command::Unknown(value))
    }

    pub fn is_known(self) -> bool {
        !matches!(self, Command::Unknown(_))
    }
}

/// Header flags
pub mod flags {
    /// Message is a response
    pub const SERVER_TO_REDIR: u32 = 0x0000_0001;
    /// Async header layout (AsyncId instead of TreeId)
    pub const ASYNC_COMMAND: u32 = 0x0000_0002;
    /// Part of a compound chain
    pub const RELATED_OPERATIONS: u32 = 0x0000_0004;
    /// Message carries a signature
    pub const SIGNED: u32 = 0x0000_0008;
    pub const DFS_OPERATIONS: u32 = 0x1000_0000;
}

/// Byte offset of the 16-byte signature within the header
pub const SIGNATURE_OFFSET: usize = 48;

/// Signature length
pub const SIGNATURE_SIZE: usize = 16;

/// StructureSize of an SMB2 ERROR response body
pub const ERROR_STRUCTURE_SIZE: u16 = 9;
