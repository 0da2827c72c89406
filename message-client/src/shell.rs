//! Interactive command loop.
//!
//! Reads commands from stdin, drives the [`Session`], and prints each outcome.
//! Pushed messages are printed as they arrive. Nothing in here ends the
//! process except `QUIT`, end of input, or ctrl-c.

use anyhow::{anyhow, Result};
use tokio::{
    io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    select,
    sync::mpsc,
};
use tracing::{debug, warn};

use crate::{
    session::Session,
    wire::{Notification, MAX_MESSAGE_LEN},
};

const PROMPT: &str = "c> ";
const LINE_ENDINGS: &[char] = &['\n', '\r'];

#[derive(Debug, PartialEq, Eq)]
pub enum ShellCommand {
    Register { user: String },
    Unregister { user: String },
    Connect { user: String },
    Disconnect { user: String },
    Send { recipient: String, message: String },
    Quit,
}

impl ShellCommand {
    /// Parses one input line. The verb is case-insensitive; a SEND message keeps
    /// its inner spacing.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(LINE_ENDINGS);
        let mut parts = line.split(' ');
        let verb = parts.next().unwrap_or_default().to_uppercase();
        let args: Vec<&str> = parts.collect();

        match verb.as_str() {
            "REGISTER" => single_user(&args, "REGISTER")
                .map(|user| ShellCommand::Register { user }),
            "UNREGISTER" => single_user(&args, "UNREGISTER")
                .map(|user| ShellCommand::Unregister { user }),
            "CONNECT" => single_user(&args, "CONNECT").map(|user| ShellCommand::Connect { user }),
            "DISCONNECT" => single_user(&args, "DISCONNECT")
                .map(|user| ShellCommand::Disconnect { user }),
            "SEND" if args.len() >= 2 => Ok(ShellCommand::Send {
                recipient: args[0].to_string(),
                message: args[1..].join(" "),
            }),
            "SEND" => Err(anyhow!("Syntax error. Usage: SEND <userName> <message>")),
            "QUIT" if args.is_empty() => Ok(ShellCommand::Quit),
            "QUIT" => Err(anyhow!("Syntax error. Use: QUIT")),
            other => Err(anyhow!("Error: command {other} not valid.")),
        }
    }
}

fn single_user(args: &[&str], verb: &str) -> Result<String> {
    match args {
        [user] => Ok((*user).to_string()),
        _ => Err(anyhow!("Syntax error. Usage: {verb} <userName>")),
    }
}

/// Runs the loop on stdin and stdout until the user quits, then closes the session.
pub async fn run(session: Session, notifications: mpsc::UnboundedReceiver<Notification>) {
    run_with(session, notifications, BufReader::new(io::stdin()), io::stdout()).await;
}

/// Drives `session` from `input`, printing to `output`.
///
/// A failed write to `output` ends the loop like end of input does, so the
/// session is always closed before this returns.
pub async fn run_with<R, W>(
    mut session: Session,
    mut notifications: mpsc::UnboundedReceiver<Notification>,
    mut input: R,
    mut output: W,
) where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        if let Err(err) = write_prompt(&mut output).await {
            warn!(error = ?err, "failed to write prompt");
            break;
        }
        select! {
            bytes_read = input.read_line(&mut line) => {
                match bytes_read {
                    Ok(0) => break,
                    Ok(_) => {
                        // read_line is not cancel-safe: a partial line is lost if
                        // another branch wins.
                        let handled = handle_line(&mut session, &line, &mut output).await;
                        line.clear();
                        match handled {
                            Ok(true) => {}
                            Ok(false) => break,
                            Err(err) => {
                                warn!(error = ?err, "failed to write command output");
                                break;
                            }
                        }
                    }
                    Err(err) => {
                        warn!(error = ?err, "failed to read command");
                        break;
                    }
                }
            }
            Some(notification) = notifications.recv() => {
                let rendered = render_notification(&notification);
                if let Err(err) = write_line(&mut output, &rendered).await {
                    warn!(error = ?err, "failed to print notification");
                    break;
                }
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                if let Err(error) = ctrl_c {
                    warn!(?error, "ctrl-c handler failed");
                }
                break;
            }
        }
    }

    if let Some(code) = session.close().await {
        if let Err(err) = write_line(&mut output, &code.to_string()).await {
            warn!(error = ?err, ?code, "failed to print disconnect result");
        }
    }
}

/// Executes one line. Returns `false` when the loop should stop.
async fn handle_line<W>(session: &mut Session, line: &str, output: &mut W) -> io::Result<bool>
where
    W: AsyncWrite + Unpin,
{
    if line.trim().is_empty() {
        return Ok(true);
    }

    let command = match ShellCommand::parse(line) {
        Ok(command) => command,
        Err(err) => {
            write_line(output, &err.to_string()).await?;
            return Ok(true);
        }
    };
    debug!(?command, "running command");

    let printed = match command {
        ShellCommand::Register { user } => session.register(&user).await.to_string(),
        ShellCommand::Unregister { user } => session.unregister(&user).await.to_string(),
        ShellCommand::Connect { user } => session.connect(&user).await.to_string(),
        ShellCommand::Disconnect { user } => session.disconnect(&user).await.to_string(),
        ShellCommand::Send { recipient, message } => {
            let outcome = session.send(&recipient, &message).await;
            if outcome.too_long {
                write_line(output, &format!("ERROR, MESSAGE TOO LONG (max {MAX_MESSAGE_LEN})"))
                    .await?;
            }
            outcome.to_string()
        }
        ShellCommand::Quit => return Ok(false),
    };
    write_line(output, &printed).await?;
    Ok(true)
}

pub fn render_notification(notification: &Notification) -> String {
    match notification {
        Notification::Message {
            sender,
            message_id,
            body,
        } => format!("MESSAGE {message_id} FROM {sender}:\n {body}\nEND"),
        Notification::Ack { message_id } => format!("SEND MESSAGE {message_id} OK"),
        Notification::EndListen => "END_LISTEN".to_string(),
        Notification::Unknown(op) => format!("ERROR, INVALID OPERATION {op}"),
    }
}

async fn write_prompt<W: AsyncWrite + Unpin>(output: &mut W) -> io::Result<()> {
    output.write_all(PROMPT.as_bytes()).await?;
    output.flush().await
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
