//! Background task that receives server pushes on the session's listening socket.
//!
//! The server opens a fresh connection for every push. The task handles them
//! one at a time and exits only when it decodes the `END_LISTEN` sentinel, which
//! the owning session delivers by connecting to its own port.

use std::{io, net::Ipv4Addr, time::Duration};

use tokio::{
    io::BufReader,
    net::{TcpListener, TcpStream},
    sync::mpsc,
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::{
    transport::open_request_connection,
    wire::{read_notification, Notification, Request},
};

pub type NotificationSink = mpsc::UnboundedSender<Notification>;

#[derive(Debug)]
pub struct ListenerHandle {
    port: u16,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Sends the sentinel to our own port and waits for the task to exit.
    ///
    /// Returns `false` when the listener could not be confirmed stopped within
    /// `wait`. The task is never aborted.
    pub async fn stop(self, wait: Duration) -> bool {
        let ListenerHandle { port, task } = self;
        if task.is_finished() {
            return true;
        }

        if let Err(err) = send_end_listen(port, wait).await {
            warn!(port, error = ?err, "failed to signal push listener; leaving it running");
            return false;
        }

        match timeout(wait, task).await {
            Ok(Ok(())) => {
                debug!(port, "push listener stopped");
                true
            }
            Ok(Err(err)) => {
                warn!(port, error = ?err, "push listener task failed");
                true
            }
            Err(_) => {
                warn!(port, ?wait, "push listener did not exit after END_LISTEN");
                false
            }
        }
    }
}

async fn send_end_listen(port: u16, wait: Duration) -> io::Result<()> {
    let mut stream = open_request_connection((Ipv4Addr::LOCALHOST, port), wait)
        .await
        .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "listener unreachable"))?;
    Request::EndListen.write_to(&mut stream).await
}

pub fn spawn_push_listener(
    listener: TcpListener,
    port: u16,
    read_timeout: Duration,
    sink: NotificationSink,
) -> ListenerHandle {
    let task = tokio::spawn(run_push_listener(listener, read_timeout, sink));
    ListenerHandle { port, task }
}

async fn run_push_listener(listener: TcpListener, read_timeout: Duration, sink: NotificationSink) {
    loop {
        let stream = match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "accepted push connection");
                stream
            }
            Err(err) => {
                warn!(error = ?err, "failed to accept push connection");
                continue;
            }
        };

        if !handle_push(stream, read_timeout, &sink).await {
            break;
        }
    }
    debug!("push listener exiting");
}

/// Decodes one push and acts on it. Returns `false` on the sentinel.
async fn handle_push(stream: TcpStream, read_timeout: Duration, sink: &NotificationSink) -> bool {
    let mut reader = BufReader::new(stream);
    let notification = match timeout(read_timeout, read_notification(&mut reader)).await {
        Ok(Ok(notification)) => notification,
        Ok(Err(err)) => {
            warn!(error = ?err, "failed to decode push notification");
            return true;
        }
        Err(_) => {
            warn!(?read_timeout, "push connection stalled; dropping it");
            return true;
        }
    };

    match notification {
        Notification::EndListen => false,
        Notification::Unknown(op) => {
            warn!(%op, "ignoring push with invalid operation");
            true
        }
        notification => {
            match &notification {
                Notification::Message {
                    sender, message_id, ..
                } => info!(%sender, %message_id, "message received"),
                Notification::Ack { message_id } => info!(%message_id, "message delivered"),
                _ => {}
            }
            if sink.send(notification).is_err() {
                debug!("notification receiver dropped");
            }
            true
        }
    }
}
