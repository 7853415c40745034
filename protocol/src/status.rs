//! NTSTATUS catalog
//!
//! Maps the 32-bit status field of every response to a named status with a
//! technical description and, where it differs, a user-facing explanation.
//! Lookup is total: codes outside the table become [`StatusCode::Unknown`]
//! and keep their raw value.

use std::fmt;

use thiserror::Error;

macro_rules! localized_or {
    ($localized:literal ; $description:literal) => {
        $localized
    };
    (; $description:literal) => {
        $description
    };
}

macro_rules! status_catalog {
    ($(
        $(#[$meta:meta])*
        $variant:ident = $code:literal => $name:literal, $description:literal $(, $localized:literal)?;
    )+) => {
        /// Known NTSTATUS values
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode {
            $(
                $(#[$meta])*
                $variant,
            )+
            /// A code outside the catalog
            Unknown(u32),
        }

        impl StatusCode {
            pub fn from_u32(code: u32) -> Self {
                match code {
                    $($code => StatusCode::$variant,)+
                    other => StatusCode::Unknown(other),
                }
            }

            pub fn to_u32(self) -> u32 {
                match self {
                    $(StatusCode::$variant => $code,)+
                    StatusCode::Unknown(raw) => raw,
                }
            }

            /// Symbolic name, e.g. `STATUS_ACCESS_DENIED`
            pub fn name(self) -> &'static str {
                match self {
                    $(StatusCode::$variant => $name,)+
                    StatusCode::Unknown(_) => "STATUS_UNKNOWN",
                }
            }

            fn known_description(self) -> Option<&'static str> {
                match self {
                    $(StatusCode::$variant => Some($description),)+
                    StatusCode::Unknown(_) => None,
                }
            }

            fn known_localized(self) -> Option<&'static str> {
                match self {
                    $(StatusCode::$variant => Some(localized_or!($($localized)? ; $description)),)+
                    StatusCode::Unknown(_) => None,
                }
            }
        }
    };
}

status_catalog! {
    Success = 0x0000_0000 => "STATUS_SUCCESS",
        "The operation completed successfully.";
    Pending = 0x0000_0103 => "STATUS_PENDING",
        "The operation that was requested is pending completion.";
    NotifyEnumDir = 0x0000_010C => "STATUS_NOTIFY_ENUM_DIR",
        "A notify change request is being completed and the information is not being returned in the caller's buffer.";
    BufferOverflow = 0x8000_0005 => "STATUS_BUFFER_OVERFLOW",
        "The data was too large to fit into the specified buffer.";
    NoMoreFiles = 0x8000_0006 => "STATUS_NO_MORE_FILES",
        "No more files were found which match the file specification.";
    StoppedOnSymlink = 0x8000_002D => "STATUS_STOPPED_ON_SYMLINK",
        "The create operation stopped after reaching a symbolic link.";
    Unsuccessful = 0xC000_0001 => "STATUS_UNSUCCESSFUL",
        "The requested operation was unsuccessful.";
    NotImplemented = 0xC000_0002 => "STATUS_NOT_IMPLEMENTED",
        "The requested operation is not implemented.";
    InvalidInfoClass = 0xC000_0003 => "STATUS_INVALID_INFO_CLASS",
        "The specified information class is not a valid information class for the specified object.";
    InfoLengthMismatch = 0xC000_0004 => "STATUS_INFO_LENGTH_MISMATCH",
        "The specified information record length does not match the length that is required for the specified information class.";
    InvalidHandle = 0xC000_0008 => "STATUS_INVALID_HANDLE",
        "An invalid HANDLE was specified.";
    InvalidParameter = 0xC000_000D => "STATUS_INVALID_PARAMETER",
        "An invalid parameter was passed to a service or function.";
    NoSuchDevice = 0xC000_000E => "STATUS_NO_SUCH_DEVICE",
        "A device that does not exist was specified.";
    NoSuchFile = 0xC000_000F => "STATUS_NO_SUCH_FILE",
        "The file does not exist.",
        "The file could not be found.";
    InvalidDeviceRequest = 0xC000_0010 => "STATUS_INVALID_DEVICE_REQUEST",
        "The specified request is not a valid operation for the target device.";
    EndOfFile = 0xC000_0011 => "STATUS_END_OF_FILE",
        "The end-of-file marker has been reached. There is no valid data in the file beyond this marker.",
        "The end of the file was reached.";
    MoreProcessingRequired = 0xC000_0016 => "STATUS_MORE_PROCESSING_REQUIRED",
        "The exchange is not complete; the caller must continue with another request.";
    AccessDenied = 0xC000_0022 => "STATUS_ACCESS_DENIED",
        "A process has requested access to an object but has not been granted those access rights.",
        "You do not have permission to access this item.";
    BufferTooSmall = 0xC000_0023 => "STATUS_BUFFER_TOO_SMALL",
        "The buffer is too small to contain the entry. No information has been written to the buffer.";
    ObjectTypeMismatch = 0xC000_0024 => "STATUS_OBJECT_TYPE_MISMATCH",
        "There is a mismatch between the type of object that is required by the requested operation and the type of object that is specified in the request.";
    ObjectNameInvalid = 0xC000_0033 => "STATUS_OBJECT_NAME_INVALID",
        "The object name is invalid.",
        "The file name is not valid.";
    ObjectNameNotFound = 0xC000_0034 => "STATUS_OBJECT_NAME_NOT_FOUND",
        "The object name is not found.",
        "The file or folder could not be found.";
    ObjectNameCollision = 0xC000_0035 => "STATUS_OBJECT_NAME_COLLISION",
        "The object name already exists.",
        "An item with the same name already exists.";
    ObjectPathNotFound = 0xC000_003A => "STATUS_OBJECT_PATH_NOT_FOUND",
        "The path does not exist.",
        "The folder could not be found.";
    SharingViolation = 0xC000_0043 => "STATUS_SHARING_VIOLATION",
        "A file cannot be opened because the share access flags are incompatible.",
        "The file is in use by another program.";
    DeletePending = 0xC000_0056 => "STATUS_DELETE_PENDING",
        "A non-close operation has been requested of a file object that has a delete pending.";
    NoSuchUser = 0xC000_0064 => "STATUS_NO_SUCH_USER",
        "The specified account does not exist.",
        "The user name or password is incorrect.";
    WrongPassword = 0xC000_006A => "STATUS_WRONG_PASSWORD",
        "When trying to update a password, this return status indicates that the value provided as the current password is not correct.",
        "The user name or password is incorrect.";
    LogonFailure = 0xC000_006D => "STATUS_LOGON_FAILURE",
        "The attempted logon is invalid. This is either due to a bad username or authentication information.",
        "The user name or password is incorrect.";
    AccountRestriction = 0xC000_006E => "STATUS_ACCOUNT_RESTRICTION",
        "Indicates a referenced user name and authentication information are valid, but some user account restriction has prevented successful authentication.";
    InvalidLogonHours = 0xC000_006F => "STATUS_INVALID_LOGON_HOURS",
        "The user account has time restrictions and cannot be logged onto at this time.";
    InvalidWorkstation = 0xC000_0070 => "STATUS_INVALID_WORKSTATION",
        "The user account is restricted so that it cannot be used to log on from the source workstation.";
    PasswordExpired = 0xC000_0071 => "STATUS_PASSWORD_EXPIRED",
        "The user account password has expired.",
        "Your password has expired.";
    AccountDisabled = 0xC000_0072 => "STATUS_ACCOUNT_DISABLED",
        "The referenced account is currently disabled and cannot be logged on to.",
        "This account has been disabled.";
    DiskFull = 0xC000_007F => "STATUS_DISK_FULL",
        "An operation failed because the disk was full.",
        "There is not enough space on the server.";
    InsufficientResources = 0xC000_009A => "STATUS_INSUFFICIENT_RESOURCES",
        "Insufficient system resources exist to complete the API.";
    IoTimeout = 0xC000_00B5 => "STATUS_IO_TIMEOUT",
        "The specified I/O operation was not completed before the time-out period expired.",
        "The server did not respond in time.";
    FileIsADirectory = 0xC000_00BA => "STATUS_FILE_IS_A_DIRECTORY",
        "The file that was specified as a target is a directory, and the caller specified that it could be anything but a directory.";
    NotSupported = 0xC000_00BB => "STATUS_NOT_SUPPORTED",
        "The request is not supported.",
        "The server does not support this operation.";
    NetworkNameDeleted = 0xC000_00C9 => "STATUS_NETWORK_NAME_DELETED",
        "The network name was deleted.";
    NetworkAccessDenied = 0xC000_00CA => "STATUS_NETWORK_ACCESS_DENIED",
        "Network access is denied.",
        "You do not have permission to access this share.";
    BadNetworkName = 0xC000_00CC => "STATUS_BAD_NETWORK_NAME",
        "The specified share name cannot be found on the remote server.",
        "The shared folder could not be found.";
    RequestNotAccepted = 0xC000_00D0 => "STATUS_REQUEST_NOT_ACCEPTED",
        "No more connections can be made to this remote computer at this time because the computer has already accepted the maximum number of connections.";
    DirectoryNotEmpty = 0xC000_0101 => "STATUS_DIRECTORY_NOT_EMPTY",
        "Indicates that the directory trying to be deleted is not empty.",
        "The folder is not empty.";
    NotADirectory = 0xC000_0103 => "STATUS_NOT_A_DIRECTORY",
        "A requested opened file is not a directory.";
    Cancelled = 0xC000_0120 => "STATUS_CANCELLED",
        "The I/O request was canceled.";
    FileClosed = 0xC000_0128 => "STATUS_FILE_CLOSED",
        "An I/O request other than close and several other special case operations was attempted using a file object that had already been closed.";
    UserSessionDeleted = 0xC000_0203 => "STATUS_USER_SESSION_DELETED",
        "The remote user session has been deleted.",
        "The connection to the server was lost.";
    PasswordMustChange = 0xC000_0224 => "STATUS_PASSWORD_MUST_CHANGE",
        "The user password must be changed before logging on the first time.";
    AccountLockedOut = 0xC000_0234 => "STATUS_ACCOUNT_LOCKED_OUT",
        "The user account has been automatically locked because too many invalid logon attempts or password change attempts have been requested.",
        "This account is locked out.";
    PathNotCovered = 0xC000_0257 => "STATUS_PATH_NOT_COVERED",
        "The contacted server does not support the indicated part of the DFS namespace.";
    NetworkSessionExpired = 0xC000_035C => "STATUS_NETWORK_SESSION_EXPIRED",
        "The client session has expired; so the client must re-authenticate to continue accessing the remote resources.",
        "Your session has expired. Please sign in again.";
}

impl StatusCode {
    pub fn description(self) -> String {
        match self.known_description() {
            Some(text) => text.to_string(),
            None => format!("Unknown error (0x{:08X})", self.to_u32()),
        }
    }

    pub fn localized_description(self) -> String {
        match self.known_localized() {
            Some(text) => text.to_string(),
            None => format!("An unknown error occurred (0x{:08X}).", self.to_u32()),
        }
    }

    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }

    pub fn is_pending(self) -> bool {
        self == StatusCode::Pending
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, StatusCode::Unknown(_))
    }

    /// Severity bits `0b10`
    pub fn is_warning(self) -> bool {
        self.to_u32() >> 30 == 0b10
    }

    /// Severity bits `0b11`
    pub fn is_error(self) -> bool {
        self.to_u32() >> 30 == 0b11
    }
}

impl From<u32> for StatusCode {
    fn from(code: u32) -> Self {
        StatusCode::from_u32(code)
    }
}

impl From<StatusCode> for u32 {
    fn from(status: StatusCode) -> Self {
        status.to_u32()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.to_u32())
    }
}

/// Everything the catalog knows about one code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    pub code: StatusCode,
    pub name: &'static str,
    pub description: String,
    pub localized_description: String,
}

/// Describe any 32-bit status value
pub fn status_description(code: u32) -> StatusInfo {
    let status = StatusCode::from_u32(code);
    StatusInfo {
        code: status,
        name: status.name(),
        description: status.description(),
        localized_description: status.localized_description(),
    }
}

/// A response carried a status other than success or pending
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {description}")]
pub struct StatusError {
    pub status: StatusCode,
    pub description: String,
    pub localized_description: String,
}

impl StatusError {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            description: status.description(),
            localized_description: status.localized_description(),
        }
    }
}

/// Accept success and pending, turn anything else into a [`StatusError`]
pub fn check_status(code: u32) -> Result<StatusCode, StatusError> {
    let status = StatusCode::from_u32(code);
    if status.is_success() || status.is_pending() {
        Ok(status)
    } else {
        Err(StatusError::new(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        let info = status_description(0xC000_0022);
        assert_eq!(info.code, StatusCode::AccessDenied);
        assert_eq!(info.name, "STATUS_ACCESS_DENIED");
        assert_ne!(info.description, info.localized_description);

        let info = status_description(0);
        assert_eq!(info.code, StatusCode::Success);
        // no distinct explanation: falls back to the description
        assert_eq!(info.description, info.localized_description);
    }

    #[test]
    fn test_unknown_code_keeps_raw_value() {
        let info = status_description(0xC0DE_0001);
        assert_eq!(info.code, StatusCode::Unknown(0xC0DE_0001));
        assert_eq!(info.name, "STATUS_UNKNOWN");
        assert!(info.description.contains("C0DE0001"));
        assert_eq!(info.code.to_u32(), 0xC0DE_0001);
    }

    #[test]
    fn test_lookup_is_total() {
        let samples = (0..=u32::MAX).step_by(0x0001_0001).chain([
            u32::MAX,
            0x0000_0103,
            0xC000_0016,
            0x8000_0006,
        ]);
        for code in samples {
            let info = status_description(code);
            assert!(!info.name.is_empty());
            assert!(!info.description.is_empty());
            assert!(!info.localized_description.is_empty());
            assert_eq!(info.code.to_u32(), code);
        }
    }

    #[test]
    fn test_severity() {
        assert!(StatusCode::LogonFailure.is_error());
        assert!(StatusCode::NoMoreFiles.is_warning());
        assert!(!StatusCode::Pending.is_error());
        assert!(StatusCode::Unknown(0xE000_0000).is_error());
    }

    #[test]
    fn test_check_status() {
        assert_eq!(check_status(0).unwrap(), StatusCode::Success);
        assert_eq!(check_status(0x103).unwrap(), StatusCode::Pending);

        let err = check_status(0xC000_006D).unwrap_err();
        assert_eq!(err.status, StatusCode::LogonFailure);
        assert!(err.to_string().starts_with("STATUS_LOGON_FAILURE (0xC000006D)"));

        // more-processing is still an error at this layer
        assert!(check_status(0xC000_0016).is_err());
    }
}
