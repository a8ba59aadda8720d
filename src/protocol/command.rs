//! Command definitions
//!
//! Represents requests sent by clients.

use crate::error::{Result, TwinError};

/// Command tags, sent as the first byte of every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    Login = 0x01,
    Image = 0x02,
    Video = 0x03,
    GetByHash = 0x04,
}

/// How the response to a command is framed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// data_len (4) + data
    Data,

    /// name_len (4) + name + data_len (4) + data
    NamedData,
}

impl CommandType {
    /// Parse a command tag byte
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0x01 => Ok(CommandType::Login),
            0x02 => Ok(CommandType::Image),
            0x03 => Ok(CommandType::Video),
            0x04 => Ok(CommandType::GetByHash),
            _ => Err(TwinError::FramingViolation(format!(
                "Unknown command type: 0x{:02x}",
                tag
            ))),
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Response framing selected by this command
    pub fn response_shape(self) -> ResponseShape {
        match self {
            CommandType::Login | CommandType::GetByHash => ResponseShape::Data,
            CommandType::Image | CommandType::Video => ResponseShape::NamedData,
        }
    }

    /// Name used in log lines
    pub fn name(self) -> &'static str {
        match self {
            CommandType::Login => "LOGIN",
            CommandType::Image => "IMAGE",
            CommandType::Video => "VIDEO",
            CommandType::GetByHash => "GET_BY_HASH",
        }
    }
}

/// A fully buffered request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: CommandType,
    pub payload: Vec<u8>,
}

impl Request {
    pub fn new(command: CommandType, payload: Vec<u8>) -> Self {
        Self { command, payload }
    }
}
