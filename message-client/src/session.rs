//! Client session state machine.
//!
//! A [`Session`] tracks the one user connected from this client, if any, and the
//! push listener that belongs to it. Every operation takes `&mut self`, so calls
//! into one session are serialized and the state moves between `Idle` and
//! `Connected` as a single unit.
//!
//! Operations never fail with an error value. Local guard violations, transport
//! failures and server-reported failures all come back as the operation's
//! reply code.

use std::mem;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    codes::{
        ConnectCode, DisconnectCode, RegisterCode, ReplyCode, SendCode, SendOutcome,
        UnregisterCode,
    },
    config::ClientConfig,
    filter::{MessageFilter, Passthrough},
    listener::{spawn_push_listener, ListenerHandle, NotificationSink},
    transport::{open_ephemeral_listener, Exchange},
    wire::{Notification, Request, MAX_MESSAGE_LEN},
};

#[derive(Debug)]
pub struct ConnectedUser {
    user: String,
    listener: ListenerHandle,
}

impl ConnectedUser {
    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn listening_port(&self) -> u16 {
        self.listener.port()
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_running()
    }
}

/// The user, port and listener live together in `Connected`, so either all
/// three are present or none are.
#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connected(ConnectedUser),
}

pub struct Session {
    config: ClientConfig,
    filter: Box<dyn MessageFilter>,
    notifications: NotificationSink,
    state: SessionState,
}

impl Session {
    /// Creates an idle session and the receiver its push listeners feed.
    pub fn new(config: ClientConfig) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (notifications, rx) = mpsc::unbounded_channel();
        let session = Self {
            config,
            filter: Box::new(Passthrough),
            notifications,
            state: SessionState::Idle,
        };
        (session, rx)
    }

    pub fn with_filter(mut self, filter: Box<dyn MessageFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn connected_user(&self) -> Option<&str> {
        match &self.state {
            SessionState::Connected(connected) => Some(connected.user()),
            SessionState::Idle => None,
        }
    }

    pub fn listening_port(&self) -> Option<u16> {
        match &self.state {
            SessionState::Connected(connected) => Some(connected.listening_port()),
            SessionState::Idle => None,
        }
    }

    pub fn is_listening(&self) -> bool {
        match &self.state {
            SessionState::Connected(connected) => connected.is_listening(),
            SessionState::Idle => false,
        }
    }

    pub async fn register(&mut self, user: &str) -> RegisterCode {
        let code = self
            .reply_code(&Request::Register {
                user: user.to_string(),
            })
            .await;
        info!(user, ?code, "register");
        code
    }

    /// Unregistering the user connected here also tears the session down.
    pub async fn unregister(&mut self, user: &str) -> UnregisterCode {
        let code: UnregisterCode = self
            .reply_code(&Request::Unregister {
                user: user.to_string(),
            })
            .await;
        info!(user, ?code, "unregister");

        if code.is_success() && self.connected_user() == Some(user) {
            debug!(user, "unregistered the connected user; closing session");
            self.teardown().await;
        }
        code
    }

    /// Starts a push listener, then asks the server to deliver to its port.
    ///
    /// On any failure the new listener is stopped and the previous state is kept.
    pub async fn connect(&mut self, user: &str) -> ConnectCode {
        if let Some(current) = self.connected_user() {
            if current != user {
                warn!(user, current, "another user is connected on this session");
                return ConnectCode::DifferentUserConnected;
            }
        }

        let (port, listener) = match open_ephemeral_listener().await {
            Ok(bound) => bound,
            Err(err) => {
                warn!(error = ?err, "failed to bind push listener");
                return ConnectCode::ANY;
            }
        };
        let handle = spawn_push_listener(
            listener,
            port,
            self.config.push_read_timeout,
            self.notifications.clone(),
        );

        let code: ConnectCode = self
            .reply_code(&Request::Connect {
                user: user.to_string(),
                listening_port: port,
            })
            .await;
        info!(user, port, ?code, "connect");

        if code.is_success() {
            let previous = mem::replace(
                &mut self.state,
                SessionState::Connected(ConnectedUser {
                    user: user.to_string(),
                    listener: handle,
                }),
            );
            if let SessionState::Connected(previous) = previous {
                self.stop_listener(previous.listener).await;
            }
        } else {
            self.stop_listener(handle).await;
        }
        code
    }

    /// Disconnecting while idle is left for the server to judge.
    pub async fn disconnect(&mut self, user: &str) -> DisconnectCode {
        if let Some(current) = self.connected_user() {
            if current != user {
                warn!(user, current, "user is not connected on this session");
                return DisconnectCode::DifferentUserConnected;
            }
        }

        let code: DisconnectCode = self
            .reply_code(&Request::Disconnect {
                user: user.to_string(),
            })
            .await;
        info!(user, ?code, "disconnect");

        if code.is_success() {
            self.teardown().await;
        }
        code
    }

    /// Sends `message` from the connected user to `recipient`.
    ///
    /// Bodies over [`MAX_MESSAGE_LEN`] are flagged in the outcome but still sent.
    pub async fn send(&mut self, recipient: &str, message: &str) -> SendOutcome {
        let body = self.filter.apply(message);
        let too_long = body.chars().count() > MAX_MESSAGE_LEN;
        if too_long {
            warn!(
                len = body.chars().count(),
                max = MAX_MESSAGE_LEN,
                "message too long; sending anyway"
            );
        }

        let Some(user) = self.connected_user().map(str::to_owned) else {
            warn!(recipient, "no user connected on this session");
            return SendOutcome {
                code: SendCode::ANY,
                message_id: None,
                too_long,
            };
        };

        let request = Request::Send {
            user,
            recipient: recipient.to_string(),
            message: body,
        };
        let Some((byte, mut exchange)) = self.request_reply(&request).await else {
            return SendOutcome {
                code: SendCode::ANY,
                message_id: None,
                too_long,
            };
        };

        let code = SendCode::from_byte(byte);
        let message_id = if code.is_success() {
            match exchange.read_field().await {
                Ok(id) => Some(id),
                Err(err) => {
                    warn!(error = ?err, "send accepted but message id was not received");
                    None
                }
            }
        } else {
            None
        };
        info!(recipient, ?code, message_id = message_id.as_deref(), "send");

        SendOutcome {
            code,
            message_id,
            too_long,
        }
    }

    /// Tears the session down before exit: disconnects the connected user, then
    /// stops the listener even if the server refused the disconnect.
    pub async fn close(&mut self) -> Option<DisconnectCode> {
        let user = self.connected_user()?.to_string();
        let code = self.disconnect(&user).await;
        if !code.is_success() {
            warn!(user, ?code, "disconnect on close failed; stopping listener anyway");
            self.teardown().await;
        }
        Some(code)
    }

    async fn teardown(&mut self) {
        if let SessionState::Connected(connected) = mem::take(&mut self.state) {
            self.stop_listener(connected.listener).await;
        }
    }

    async fn stop_listener(&self, listener: ListenerHandle) {
        let port = listener.port();
        if !listener.stop(self.config.stop_timeout).await {
            warn!(port, "push listener may still be running");
        }
    }

    async fn reply_code<C: ReplyCode>(&self, request: &Request) -> C {
        match self.request_reply(request).await {
            Some((byte, _exchange)) => C::from_byte(byte),
            None => C::ANY,
        }
    }

    /// Runs one exchange up to the reply byte. `None` means the transport failed.
    async fn request_reply(&self, request: &Request) -> Option<(u8, Exchange)> {
        let op = request.op_code();
        let mut exchange =
            Exchange::open(self.config.server_address(), self.config.connect_timeout).await?;

        if let Err(err) = exchange.send(request).await {
            warn!(%op, error = ?err, "failed to send request");
            return None;
        }
        match exchange.read_error_code().await {
            Ok(byte) => Some((byte, exchange)),
            Err(err) => {
                warn!(%op, error = ?err, "failed to read reply");
                None
            }
        }
    }
}
