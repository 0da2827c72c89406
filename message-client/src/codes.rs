//! Reply codes, one enum per operation.
//!
//! The server answers every exchange with a single byte. Its meaning depends on
//! the operation, so each operation gets its own enum. `0` is always success.
//! Bytes outside an operation's table are kept as `Unrecognized` and passed
//! through untouched.

use std::fmt;

pub trait ReplyCode: Copy + fmt::Debug + fmt::Display + PartialEq {
    /// Generic failure, also used when the transport fails.
    const ANY: Self;

    fn from_byte(byte: u8) -> Self;
    fn as_byte(self) -> u8;

    fn is_success(self) -> bool {
        self.as_byte() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterCode {
    Success,
    AlreadyRegistered,
    Failed,
    Unrecognized(u8),
}

impl ReplyCode for RegisterCode {
    const ANY: Self = RegisterCode::Failed;

    fn from_byte(byte: u8) -> Self {
        match byte {
            0 => RegisterCode::Success,
            1 => RegisterCode::AlreadyRegistered,
            2 => RegisterCode::Failed,
            other => RegisterCode::Unrecognized(other),
        }
    }

    fn as_byte(self) -> u8 {
        match self {
            RegisterCode::Success => 0,
            RegisterCode::AlreadyRegistered => 1,
            RegisterCode::Failed => 2,
            RegisterCode::Unrecognized(other) => other,
        }
    }
}

impl fmt::Display for RegisterCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterCode::Success => f.write_str("REGISTER OK"),
            RegisterCode::AlreadyRegistered => f.write_str("USERNAME IN USE"),
            RegisterCode::Failed => f.write_str("REGISTRATION FAIL"),
            RegisterCode::Unrecognized(code) => write!(f, "REGISTRATION FAIL (code {code})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisterCode {
    Success,
    UserNotExists,
    Failed,
    Unrecognized(u8),
}

impl ReplyCode for UnregisterCode {
    const ANY: Self = UnregisterCode::Failed;

    fn from_byte(byte: u8) -> Self {
        match byte {
            0 => UnregisterCode::Success,
            1 => UnregisterCode::UserNotExists,
            2 => UnregisterCode::Failed,
            other => UnregisterCode::Unrecognized(other),
        }
    }

    fn as_byte(self) -> u8 {
        match self {
            UnregisterCode::Success => 0,
            UnregisterCode::UserNotExists => 1,
            UnregisterCode::Failed => 2,
            UnregisterCode::Unrecognized(other) => other,
        }
    }
}

impl fmt::Display for UnregisterCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnregisterCode::Success => f.write_str("UNREGISTER OK"),
            UnregisterCode::UserNotExists => f.write_str("USER DOES NOT EXIST"),
            UnregisterCode::Failed => f.write_str("UNREGISTER FAIL"),
            UnregisterCode::Unrecognized(code) => write!(f, "UNREGISTER FAIL (code {code})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectCode {
    Success,
    UserNotExists,
    AlreadyConnected,
    Failed,
    /// Local only: another user is connected on this session.
    DifferentUserConnected,
    Unrecognized(u8),
}

impl ReplyCode for ConnectCode {
    const ANY: Self = ConnectCode::Failed;

    fn from_byte(byte: u8) -> Self {
        match byte {
            0 => ConnectCode::Success,
            1 => ConnectCode::UserNotExists,
            2 => ConnectCode::AlreadyConnected,
            3 => ConnectCode::Failed,
            4 => ConnectCode::DifferentUserConnected,
            other => ConnectCode::Unrecognized(other),
        }
    }

    fn as_byte(self) -> u8 {
        match self {
            ConnectCode::Success => 0,
            ConnectCode::UserNotExists => 1,
            ConnectCode::AlreadyConnected => 2,
            ConnectCode::Failed => 3,
            ConnectCode::DifferentUserConnected => 4,
            ConnectCode::Unrecognized(other) => other,
        }
    }
}

impl fmt::Display for ConnectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectCode::Success => f.write_str("CONNECT OK"),
            ConnectCode::UserNotExists => f.write_str("CONNECT FAIL, USER DOES NOT EXIST"),
            ConnectCode::AlreadyConnected => f.write_str("USER ALREADY CONNECTED"),
            ConnectCode::Failed => f.write_str("CONNECT FAIL"),
            ConnectCode::DifferentUserConnected => {
                f.write_str("CONNECT FAIL, ANOTHER USER IS CONNECTED ON THIS SESSION")
            }
            ConnectCode::Unrecognized(code) => write!(f, "CONNECT FAIL (code {code})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectCode {
    Success,
    UserNotExists,
    NotConnected,
    Failed,
    /// Local only: the named user is not the one connected on this session.
    DifferentUserConnected,
    Unrecognized(u8),
}

impl ReplyCode for DisconnectCode {
    const ANY: Self = DisconnectCode::Failed;

    fn from_byte(byte: u8) -> Self {
        match byte {
            0 => DisconnectCode::Success,
            1 => DisconnectCode::UserNotExists,
            2 => DisconnectCode::NotConnected,
            3 => DisconnectCode::Failed,
            4 => DisconnectCode::DifferentUserConnected,
            other => DisconnectCode::Unrecognized(other),
        }
    }

    fn as_byte(self) -> u8 {
        match self {
            DisconnectCode::Success => 0,
            DisconnectCode::UserNotExists => 1,
            DisconnectCode::NotConnected => 2,
            DisconnectCode::Failed => 3,
            DisconnectCode::DifferentUserConnected => 4,
            DisconnectCode::Unrecognized(other) => other,
        }
    }
}

impl fmt::Display for DisconnectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectCode::Success => f.write_str("DISCONNECT OK"),
            DisconnectCode::UserNotExists => f.write_str("DISCONNECT FAIL / USER DOES NOT EXIST"),
            DisconnectCode::NotConnected => f.write_str("DISCONNECT FAIL / USER NOT CONNECTED"),
            DisconnectCode::Failed => f.write_str("DISCONNECT FAIL"),
            DisconnectCode::DifferentUserConnected => {
                f.write_str("DISCONNECT FAIL / USER NOT CONNECTED ON THIS SESSION")
            }
            DisconnectCode::Unrecognized(code) => write!(f, "DISCONNECT FAIL (code {code})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendCode {
    Success,
    UserNotExists,
    Failed,
    Unrecognized(u8),
}

impl ReplyCode for SendCode {
    const ANY: Self = SendCode::Failed;

    fn from_byte(byte: u8) -> Self {
        match byte {
            0 => SendCode::Success,
            1 => SendCode::UserNotExists,
            2 => SendCode::Failed,
            other => SendCode::Unrecognized(other),
        }
    }

    fn as_byte(self) -> u8 {
        match self {
            SendCode::Success => 0,
            SendCode::UserNotExists => 1,
            SendCode::Failed => 2,
            SendCode::Unrecognized(other) => other,
        }
    }
}

impl fmt::Display for SendCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendCode::Success => f.write_str("SEND OK"),
            SendCode::UserNotExists => f.write_str("SEND FAIL / USER DOES NOT EXIST"),
            SendCode::Failed => f.write_str("SEND FAIL"),
            SendCode::Unrecognized(code) => write!(f, "SEND FAIL (code {code})"),
        }
    }
}

/// Result of a SEND exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub code: SendCode,
    /// Server-assigned id, present only on success.
    pub message_id: Option<String>,
    /// The body exceeded the field budget. It was still sent.
    pub too_long: bool,
}

impl fmt::Display for SendOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message_id) {
            (SendCode::Success, Some(id)) => write!(f, "SEND OK - MESSAGE {id}"),
            (code, _) => fmt::Display::fmt(code, f),
        }
    }
}
