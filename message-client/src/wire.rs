use std::{fmt, io, str::FromStr};

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Field budget for a message body, not counting the NUL terminator.
pub const MAX_MESSAGE_LEN: usize = 255;

/// Upper bound on one received field, terminator included.
pub const MAX_FIELD_LEN: u64 = 64 * 1024;

const NUL: u8 = b'\0';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Register,
    Unregister,
    Connect,
    Disconnect,
    Send,
    SendMessage,
    SendMessAck,
    EndListen,
}

impl OpCode {
    pub fn as_str(self) -> &'static str {
        match self {
            OpCode::Register => "REGISTER",
            OpCode::Unregister => "UNREGISTER",
            OpCode::Connect => "CONNECT",
            OpCode::Disconnect => "DISCONNECT",
            OpCode::Send => "SEND",
            OpCode::SendMessage => "SEND_MESSAGE",
            OpCode::SendMessAck => "SEND_MESS_ACK",
            OpCode::EndListen => "END_LISTEN",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown operation code '{0}'")]
pub struct ParseOpCodeError(pub String);

impl FromStr for OpCode {
    type Err = ParseOpCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGISTER" => Ok(OpCode::Register),
            "UNREGISTER" => Ok(OpCode::Unregister),
            "CONNECT" => Ok(OpCode::Connect),
            "DISCONNECT" => Ok(OpCode::Disconnect),
            "SEND" => Ok(OpCode::Send),
            "SEND_MESSAGE" => Ok(OpCode::SendMessage),
            "SEND_MESS_ACK" => Ok(OpCode::SendMessAck),
            "END_LISTEN" => Ok(OpCode::EndListen),
            other => Err(ParseOpCodeError(other.to_string())),
        }
    }
}

/// One outbound exchange, fully built before anything touches the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Register { user: String },
    Unregister { user: String },
    Connect { user: String, listening_port: u16 },
    Disconnect { user: String },
    Send { user: String, recipient: String, message: String },
    EndListen,
}

impl Request {
    pub fn op_code(&self) -> OpCode {
        match self {
            Request::Register { .. } => OpCode::Register,
            Request::Unregister { .. } => OpCode::Unregister,
            Request::Connect { .. } => OpCode::Connect,
            Request::Disconnect { .. } => OpCode::Disconnect,
            Request::Send { .. } => OpCode::Send,
            Request::EndListen => OpCode::EndListen,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Request::Register { user }
            | Request::Unregister { user }
            | Request::Connect { user, .. }
            | Request::Disconnect { user }
            | Request::Send { user, .. } => user,
            Request::EndListen => "",
        }
    }

    /// Writes header plus the operation payload and flushes.
    pub async fn write_to<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        write_header(writer, self.op_code(), self.username()).await?;
        match self {
            Request::Connect { listening_port, .. } => {
                write_connect_payload(writer, *listening_port).await?
            }
            Request::Send {
                recipient, message, ..
            } => write_send_payload(writer, recipient, message).await?,
            _ => {}
        }
        writer.flush().await
    }
}

/// Server-initiated message received on the push listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Message {
        sender: String,
        message_id: String,
        body: String,
    },
    Ack {
        message_id: String,
    },
    EndListen,
    Unknown(String),
}

pub async fn write_field<W>(writer: &mut W, field: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(field.as_bytes()).await?;
    writer.write_all(&[NUL]).await
}

pub async fn write_header<W>(writer: &mut W, op_code: OpCode, username: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_field(writer, op_code.as_str()).await?;
    write_field(writer, username).await
}

pub async fn write_connect_payload<W>(writer: &mut W, listening_port: u16) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_field(writer, &listening_port.to_string()).await
}

pub async fn write_send_payload<W>(writer: &mut W, recipient: &str, message: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_field(writer, recipient).await?;
    write_field(writer, message).await
}

/// Reads the single raw reply byte. It is not NUL-terminated.
pub async fn read_error_code<R>(reader: &mut R) -> io::Result<u8>
where
    R: AsyncRead + Unpin,
{
    reader.read_u8().await
}

pub async fn read_field<R>(reader: &mut R) -> io::Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut limited = reader.take(MAX_FIELD_LEN);
    limited.read_until(NUL, &mut buf).await?;
    if buf.pop() != Some(NUL) {
        if limited.limit() == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("field exceeds {MAX_FIELD_LEN} bytes"),
            ));
        }
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before field terminator",
        ));
    }
    String::from_utf8(buf).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

pub async fn read_notification<R>(reader: &mut R) -> io::Result<Notification>
where
    R: AsyncBufRead + Unpin,
{
    let op = read_field(reader).await?;
    let notification = match op.parse::<OpCode>() {
        Ok(OpCode::SendMessage) => Notification::Message {
            sender: read_field(reader).await?,
            message_id: read_field(reader).await?,
            body: read_field(reader).await?,
        },
        Ok(OpCode::SendMessAck) => Notification::Ack {
            message_id: read_field(reader).await?,
        },
        Ok(OpCode::EndListen) => Notification::EndListen,
        _ => Notification::Unknown(op),
    };
    Ok(notification)
}
