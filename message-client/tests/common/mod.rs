//! In-process fake directory server.
//!
//! Implements just enough of the server side of the wire contract to drive a
//! real `Session`: a user registry, connect state with each user's push
//! endpoint, per-recipient message ids starting at 1, immediate delivery to
//! connected recipients, queued delivery on reconnect, and SEND_MESS_ACK back
//! to the sender once a message is delivered.

#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    net::{IpAddr, SocketAddr},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{bail, Result};
use message_client::{
    config::ClientConfig,
    session::Session,
    wire::{read_field, write_field, Notification, OpCode},
};
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    select,
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
    time::timeout,
};

pub const WAIT: Duration = Duration::from_secs(2);

pub struct FakeDirectory {
    addr: SocketAddr,
    state: Arc<DirectoryState>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl FakeDirectory {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(DirectoryState::default());
        let (shutdown, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run_until(listener, Arc::clone(&state), async move {
            let _ = shutdown_rx.await;
        }));

        Ok(Self {
            addr,
            state,
            shutdown,
            task,
        })
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            connect_timeout: Duration::from_secs(1),
            ..ClientConfig::new(self.addr.ip().to_string(), self.addr.port())
        }
    }

    pub fn session(&self) -> (Session, mpsc::UnboundedReceiver<Notification>) {
        Session::new(self.config())
    }

    /// Number of request connections the server has accepted.
    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub async fn is_connected(&self, user: &str) -> bool {
        let users = self.state.users.lock().await;
        users
            .get(user)
            .is_some_and(|record| record.endpoint.is_some())
    }

    pub async fn pending_for(&self, user: &str) -> usize {
        let users = self.state.users.lock().await;
        users.get(user).map_or(0, |record| record.pending.len())
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }
}

#[derive(Default)]
struct DirectoryState {
    users: Mutex<HashMap<String, UserRecord>>,
    requests: AtomicUsize,
}

#[derive(Default)]
struct UserRecord {
    endpoint: Option<SocketAddr>,
    last_message_id: u32,
    pending: VecDeque<Pending>,
}

struct Pending {
    sender: String,
    id: u32,
    body: String,
}

async fn run_until<F>(listener: TcpListener, state: Arc<DirectoryState>, shutdown: F)
where
    F: Future<Output = ()> + Send,
{
    tokio::pin!(shutdown);
    loop {
        select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => {
                let Ok((stream, peer)) = accepted else { continue };
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let _ = handle_request(stream, peer.ip(), state).await;
                });
            }
        }
    }
}

async fn handle_request(stream: TcpStream, peer: IpAddr, state: Arc<DirectoryState>) -> Result<()> {
    let mut stream = BufReader::new(stream);
    let op: OpCode = read_field(&mut stream).await?.parse()?;
    let user = read_field(&mut stream).await?;
    state.requests.fetch_add(1, Ordering::SeqCst);

    match op {
        OpCode::Register => {
            let mut users = state.users.lock().await;
            let code = if users.contains_key(&user) {
                1
            } else {
                users.insert(user, UserRecord::default());
                0
            };
            stream.get_mut().write_all(&[code]).await?;
        }
        OpCode::Unregister => {
            let removed = state.users.lock().await.remove(&user).is_some();
            stream.get_mut().write_all(&[if removed { 0 } else { 1 }]).await?;
        }
        OpCode::Connect => {
            let port = read_field(&mut stream).await?;
            let (code, pending) = connect(&state, &user, peer, &port).await;
            stream.get_mut().write_all(&[code]).await?;
            drop(stream);
            deliver_pending(&state, &user, pending).await;
        }
        OpCode::Disconnect => {
            let mut users = state.users.lock().await;
            let code = match users.get_mut(&user) {
                None => 1,
                Some(record) if record.endpoint.is_none() => 2,
                Some(record) => {
                    record.endpoint = None;
                    0
                }
            };
            stream.get_mut().write_all(&[code]).await?;
        }
        OpCode::Send => {
            let recipient = read_field(&mut stream).await?;
            let body = read_field(&mut stream).await?;
            send(&state, stream, user, recipient, body).await?;
        }
        other => bail!("unexpected request {other}"),
    }
    Ok(())
}

async fn connect(
    state: &DirectoryState,
    user: &str,
    peer: IpAddr,
    port: &str,
) -> (u8, Vec<Pending>) {
    let mut users = state.users.lock().await;
    let Some(record) = users.get_mut(user) else {
        return (1, Vec::new());
    };
    if record.endpoint.is_some() {
        return (2, Vec::new());
    }
    let Ok(port) = port.parse::<u16>() else {
        return (3, Vec::new());
    };
    record.endpoint = Some(SocketAddr::new(peer, port));
    (0, record.pending.drain(..).collect())
}

async fn deliver_pending(state: &DirectoryState, user: &str, pending: Vec<Pending>) {
    for message in pending {
        let delivered = match endpoint_of(state, user).await {
            Some(endpoint) => push_message(endpoint, &message).await.is_ok(),
            None => false,
        };
        if delivered {
            ack_sender(state, &message.sender, message.id).await;
        } else {
            requeue(state, user, message).await;
        }
    }
}

async fn send(
    state: &DirectoryState,
    mut stream: BufReader<TcpStream>,
    sender: String,
    recipient: String,
    body: String,
) -> Result<()> {
    let assigned = {
        let mut users = state.users.lock().await;
        if users.contains_key(&sender) {
            users.get_mut(&recipient).map(|record| {
                record.last_message_id += 1;
                (record.last_message_id, record.endpoint)
            })
        } else {
            None
        }
    };
    let Some((id, endpoint)) = assigned else {
        stream.get_mut().write_all(&[1]).await?;
        return Ok(());
    };

    let message = Pending {
        sender: sender.clone(),
        id,
        body,
    };
    let delivered = match endpoint {
        Some(endpoint) => push_message(endpoint, &message).await.is_ok(),
        None => false,
    };
    if !delivered {
        if endpoint.is_some() {
            mark_disconnected(state, &recipient).await;
        }
        requeue(state, &recipient, message).await;
    }

    stream.get_mut().write_all(&[0]).await?;
    write_field(stream.get_mut(), &id.to_string()).await?;
    stream.get_mut().flush().await?;
    drop(stream);

    if delivered {
        ack_sender(state, &sender, id).await;
    }
    Ok(())
}

async fn endpoint_of(state: &DirectoryState, user: &str) -> Option<SocketAddr> {
    let users = state.users.lock().await;
    users.get(user).and_then(|record| record.endpoint)
}

async fn requeue(state: &DirectoryState, user: &str, message: Pending) {
    let mut users = state.users.lock().await;
    if let Some(record) = users.get_mut(user) {
        record.pending.push_back(message);
    }
}

async fn mark_disconnected(state: &DirectoryState, user: &str) {
    let mut users = state.users.lock().await;
    if let Some(record) = users.get_mut(user) {
        record.endpoint = None;
    }
}

async fn ack_sender(state: &DirectoryState, sender: &str, id: u32) {
    if let Some(endpoint) = endpoint_of(state, sender).await {
        let _ = push_fields(endpoint, &[OpCode::SendMessAck.as_str(), &id.to_string()]).await;
    }
}

async fn push_message(endpoint: SocketAddr, message: &Pending) -> Result<()> {
    push_fields(
        endpoint,
        &[
            OpCode::SendMessage.as_str(),
            &message.sender,
            &message.id.to_string(),
            &message.body,
        ],
    )
    .await
}

async fn push_fields(endpoint: SocketAddr, fields: &[&str]) -> Result<()> {
    let mut stream = timeout(WAIT, TcpStream::connect(endpoint)).await??;
    for field in fields {
        write_field(&mut stream, field).await?;
    }
    stream.flush().await?;
    Ok(())
}

/// Waits for the next pushed notification.
pub async fn next_notification(
    rx: &mut mpsc::UnboundedReceiver<Notification>,
) -> Result<Notification> {
    match timeout(WAIT, rx.recv()).await? {
        Some(notification) => Ok(notification),
        None => bail!("notification channel closed"),
    }
}

/// Asserts user, port and listener are all present or all absent.
pub fn assert_state_consistent(session: &Session) {
    let user = session.connected_user().is_some();
    let port = session.listening_port().is_some();
    let listening = session.is_listening();
    assert_eq!(user, port, "user and port must be set together");
    assert_eq!(user, listening, "user and listener must be set together");
}

/// True once nothing accepts on `port` any more.
pub async fn port_closed(port: u16) -> bool {
    TcpStream::connect(("127.0.0.1", port)).await.is_err()
}
