//! XT message codec
//!
//! Outbound messages are `%xt%<opcode>%-1%<arg>%...%` followed by a NUL
//! byte. Inbound packets are `%xt%<ext>%<handler>%<internal room>%<arg>%...%`.

use std::fmt::Display;

use crate::error::{ProtocolError, Result, WaddleError};

/// Packet delimiter on the wire
pub const DELIMITER: u8 = 0;

/// Internal room ID sent with every server message
const SERVER_ROOM_ID: &str = "-1";

/// Remove field separators from free text so it stays one payload field
pub fn strip_separators(text: &str) -> String {
    text.replace('%', "")
}

/// An outbound message: opcode plus ordered payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XtMessage {
    opcode: String,
    args: Vec<String>,
}

impl XtMessage {
    /// Start a message with no payload
    pub fn new(opcode: &str) -> Self {
        Self {
            opcode: opcode.to_string(),
            args: Vec::new(),
        }
    }

    /// Append a payload field
    pub fn arg(mut self, value: impl Display) -> Self {
        self.args.push(value.to_string());
        self
    }

    pub fn opcode(&self) -> &str {
        &self.opcode
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Encode without the trailing delimiter
    pub fn encode(&self) -> String {
        let mut out = format!("%xt%{}%{}%", self.opcode, SERVER_ROOM_ID);
        for arg in &self.args {
            out.push_str(arg);
            out.push('%');
        }
        out
    }

    /// Encode as a delimited frame ready for the socket
    pub fn to_frame(&self) -> Vec<u8> {
        let mut frame = self.encode().into_bytes();
        frame.push(DELIMITER);
        frame
    }
}

impl Display for XtMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// A parsed inbound packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XtPacket {
    /// Extension (`s` for world commands)
    pub extension: String,
    /// Handler ID, e.g. `i#ai`
    pub handler: String,
    /// Client-side internal room ID
    pub internal_room: i32,
    /// Positional arguments
    pub args: Vec<String>,
}

impl XtPacket {
    /// Parse a single packet (delimiter already stripped)
    pub fn parse(data: &str) -> Result<Self> {
        let data = data.trim_end_matches('\0');
        let body = data
            .strip_prefix("%xt%")
            .ok_or_else(|| malformed("missing %xt% prefix"))?;
        let body = body
            .strip_suffix('%')
            .ok_or_else(|| malformed("missing trailing %"))?;

        let mut fields = body.split('%');
        let extension = fields.next().unwrap_or_default().to_string();
        let handler = fields
            .next()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| malformed("missing handler"))?
            .to_string();
        let internal_room = fields
            .next()
            .ok_or_else(|| malformed("missing internal room"))?
            .parse::<i32>()
            .map_err(|_| malformed("internal room is not a number"))?;
        let args = fields.map(str::to_string).collect();

        Ok(Self {
            extension,
            handler,
            internal_room,
            args,
        })
    }

    /// Raw argument at `index`
    pub fn arg(&self, index: usize) -> Result<&str> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                WaddleError::Protocol(ProtocolError::InvalidArgument {
                    index,
                    value: String::new(),
                })
            })
    }

    /// Argument at `index` parsed as a number
    pub fn int_arg<T: std::str::FromStr>(&self, index: usize) -> Result<T> {
        let raw = self.arg(index)?;
        raw.parse().map_err(|_| {
            WaddleError::Protocol(ProtocolError::InvalidArgument {
                index,
                value: raw.to_string(),
            })
        })
    }
}

fn malformed(reason: &str) -> WaddleError {
    WaddleError::Protocol(ProtocolError::MalformedPacket(reason.to_string()))
}
