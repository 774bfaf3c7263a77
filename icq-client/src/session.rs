//! The per-user session orchestrator: owns the transport and every
//! protocol manager, drives the login handshake to completion, and turns
//! subsequent inbound SNACs into a stream of events a gateway can bridge
//! onto XMPP.

use crate::connector::Connector;
use crate::contact::ContactType;
use crate::error::{Error, Result};
use crate::login::{LoginEvent, LoginManager, LoginState};
use crate::message::{self, Message};
use crate::meta_info::{MetaInfoManager, MetaInfoType};
use crate::socket::OscarSocket;
use crate::ssi::SsiManager;
use crate::user_info::{DetailsReady, OnlineStatus, UserInfoManager};
use icq_wire::{Channel, FlapBuffer, SnacBuffer};

/// Coarse-grained lifecycle state of a session, independent of where the
/// login handshake currently stands internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport open.
    Disconnected,
    /// Transport open, login handshake in progress.
    Connecting,
    /// Login complete; normal traffic flows.
    Connected,
}

/// Something the session observed that a gateway will want to act on.
#[derive(Debug)]
pub enum SessionEvent {
    /// The login handshake finished successfully.
    Ready,
    /// An instant message arrived.
    Message(Message),
    /// A buddy's status changed.
    Presence {
        /// The buddy's UIN.
        uin: String,
        /// Their new status, or `None` if they went offline.
        status: Option<OnlineStatus>,
    },
    /// The connection closed or the login handshake failed.
    Disconnected(Error),
    /// Offline messages were fetched; the server-side queue has been told
    /// to purge them.
    OfflineMessages(Vec<Message>),
    /// A short user-details lookup (nick/name/email) completed for a UIN.
    ShortUserDetailsAvailable(String),
    /// A full user-details lookup completed for a UIN.
    UserDetailsAvailable(String),
}

/// Drives one account's OSCAR connection end to end.
pub struct IcqSession {
    uin: String,
    state: SessionState,
    connector: Connector,
    socket: Option<OscarSocket>,
    login: LoginManager,
    ssi: SsiManager,
    meta_info: MetaInfoManager,
    user_info: UserInfoManager,
    icbm_counter: u64,
    authorizer_host: String,
    authorizer_port: u16,
}

impl IcqSession {
    /// Creates a session for `uin`, initially pointed at the given
    /// authorizer (typically `login.icq.com:5190`).
    pub fn new(uin: impl Into<String>, password: impl Into<String>, authorizer_host: impl Into<String>, authorizer_port: u16) -> IcqSession {
        let uin = uin.into();
        let own_uin: u32 = uin.parse().unwrap_or(0);
        IcqSession {
            login: LoginManager::new(uin.clone(), password),
            uin,
            state: SessionState::Disconnected,
            connector: Connector::new(),
            socket: None,
            ssi: SsiManager::new(),
            meta_info: MetaInfoManager::new(own_uin),
            user_info: UserInfoManager::new(),
            icbm_counter: 0,
            authorizer_host: authorizer_host.into(),
            authorizer_port,
        }
    }

    /// The account this session is for.
    pub fn uin(&self) -> &str {
        &self.uin
    }

    /// The session's current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// A view of the account's contact list, once login has completed.
    pub fn contacts(&self) -> &SsiManager {
        &self.ssi
    }

    async fn send_event(&mut self, event: LoginEvent) -> Result<Option<SessionEvent>> {
        match event {
            LoginEvent::Send(flap) => {
                self.socket_mut()?.send_flap(flap).await?;
                Ok(None)
            }
            LoginEvent::Redirect { host, port, cookie } => {
                let stream = self.connector.connect(&host, port).await?;
                self.socket = Some(OscarSocket::new(stream));
                let resume = self.login.resume_on_bos();
                self.send_event(resume).await?;
                let _ = cookie;
                Ok(None)
            }
            LoginEvent::Ready => {
                self.state = SessionState::Connected;
                Ok(Some(SessionEvent::Ready))
            }
            LoginEvent::Failed(e) => Ok(Some(SessionEvent::Disconnected(e))),
        }
    }

    fn socket_mut(&mut self) -> Result<&mut OscarSocket> {
        self.socket.as_mut().ok_or_else(|| Error::Transport("no active connection".into()))
    }

    /// Connects to the authorizer and drives the login handshake through
    /// to completion, returning once the session is [`SessionState::Connected`]
    /// or the handshake failed.
    pub async fn connect(&mut self) -> Result<()> {
        self.state = SessionState::Connecting;
        let host = self.authorizer_host.clone();
        let port = self.authorizer_port;
        let stream = self.connector.connect(&host, port).await?;
        self.socket = Some(OscarSocket::new(stream));

        let start = self.login.start();
        if let Some(SessionEvent::Disconnected(e)) = self.send_event(start).await? {
            self.state = SessionState::Disconnected;
            return Err(e);
        }

        loop {
            let flap = self.socket_mut()?.read_frame().await?;
            let next = self.step_login(&flap)?;
            if let Some(event) = self.send_event(next).await? {
                match event {
                    SessionEvent::Ready => return Ok(()),
                    SessionEvent::Disconnected(e) => {
                        self.state = SessionState::Disconnected;
                        return Err(e);
                    }
                    _ => {}
                }
            }
            if self.login.state() == LoginState::BosInit || self.login.state() == LoginState::SendCookie {
                let advance = self.login.advance();
                if let Some(event) = self.send_event(advance).await? {
                    if let SessionEvent::Disconnected(e) = event {
                        self.state = SessionState::Disconnected;
                        return Err(e);
                    }
                }
            }
        }
    }

    fn step_login(&mut self, flap: &FlapBuffer) -> Result<LoginEvent> {
        if flap.channel() == Channel::Auth as u8 {
            self.login.handle_flap(flap)
        } else {
            let snac = SnacBuffer::from_flap(flap)?;
            self.login.handle_snac(&snac)
        }
    }

    /// Reads and interprets the next frame once the session is
    /// [`SessionState::Connected`], translating protocol traffic into
    /// [`SessionEvent`]s for the caller to act on.
    pub async fn next_event(&mut self) -> Result<SessionEvent> {
        loop {
            let flap = self.socket_mut()?.read_frame().await?;
            if flap.channel() != Channel::Data as u8 {
                continue;
            }
            let snac = SnacBuffer::from_flap(&flap)?;
            if let Some(event) = self.handle_data_snac(&snac).await? {
                return Ok(event);
            }
        }
    }

    async fn handle_data_snac(&mut self, snac: &SnacBuffer) -> Result<Option<SessionEvent>> {
        match (snac.family(), snac.subtype()) {
            (0x0001, 0x0007) => {
                self.socket_mut()?.rates().handle_server_rates(snac)?;
                Ok(None)
            }
            (0x0001, 0x000A) => {
                self.socket_mut()?.rates().handle_rate_change(snac)?;
                Ok(None)
            }
            (0x0004, 0x0007) => {
                let mut buf = icq_wire::Buffer::from(snac.payload());
                buf.seek_forward(8); // ICBM cookie
                buf.seek_forward(2); // channel
                let sender_len = buf.get_byte()? as usize;
                buf.seek_forward(sender_len);
                let chain = icq_wire::TlvChain::from_bytes(buf.read_all().to_vec())?;
                let mut msg = if chain.has(0x0002) {
                    message::parse_channel_1(&chain)?
                } else {
                    message::parse_channel_2(&chain)?
                };
                msg.set_channel(if chain.has(0x0002) { 1 } else { 2 });
                Ok(Some(SessionEvent::Message(msg)))
            }
            (0x0003, 0x000B) | (0x0003, 0x000C) => {
                let changes = self.user_info.handle_presence_snac(snac)?;
                if let Some((uin, status)) = changes.into_iter().next() {
                    Ok(Some(SessionEvent::Presence { uin, status }))
                } else {
                    Ok(None)
                }
            }
            (0x0013, 0x0006) => {
                self.ssi.handle_full_list(snac)?;
                Ok(None)
            }
            (0x0013, 0x0008) => {
                self.ssi.handle_add(snac)?;
                Ok(None)
            }
            (0x0013, 0x0009) => {
                self.ssi.handle_update(snac)?;
                Ok(None)
            }
            (0x0013, 0x000A) => {
                self.ssi.handle_remove(snac)?;
                Ok(None)
            }
            (0x0013, 0x000E) => {
                self.ssi.handle_edit_ack(snac)?;
                Ok(None)
            }
            (0x0015, 0x0003) => {
                let (ty, body) = self.meta_info.parse_reply(snac)?;
                match ty {
                    MetaInfoType::OfflineMessages => {
                        let messages = self.meta_info.parse_offline_messages(body)?;
                        Ok(Some(SessionEvent::OfflineMessages(messages)))
                    }
                    MetaInfoType::EndOfOfflineMessages => {
                        let purge = self.meta_info.request_purge_offline_messages();
                        self.socket_mut()?.send_snac_now(purge).await?;
                        Ok(None)
                    }
                    other => match self.user_info.handle_meta_info(other, body)? {
                        Some(DetailsReady::Short(uin)) => Ok(Some(SessionEvent::ShortUserDetailsAvailable(uin))),
                        Some(DetailsReady::Full(uin)) => Ok(Some(SessionEvent::UserDetailsAvailable(uin))),
                        None => Ok(None),
                    },
                }
            }
            (family, subtype) => {
                log::debug!("unhandled data SNAC ({family:#06x},{subtype:#06x})");
                Ok(None)
            }
        }
    }

    /// Sends an instant message to `receiver`, stamping it with a fresh
    /// ICBM cookie.
    pub async fn send_message(&mut self, receiver: &str, text: &[u8]) -> Result<()> {
        let mut msg = Message::new(receiver, text.to_vec());
        msg.set_icbm_cookie(message::next_icbm_cookie(&mut self.icbm_counter));
        let snac = message::build_outbound_snac(&msg);
        self.socket_mut()?.send_snac(snac).await
    }

    /// Fetches any offline messages waiting for this account.
    pub async fn request_offline_messages(&mut self) -> Result<()> {
        let snac = self.meta_info.request_offline_messages();
        self.socket_mut()?.send_snac_now(snac).await
    }

    /// A view of cached directory lookups, once they complete.
    pub fn user_info(&self) -> &UserInfoManager {
        &self.user_info
    }

    /// Requests `uin`'s short details (nick/name/email), unless already
    /// cached. Completion is reported as [`SessionEvent::ShortUserDetailsAvailable`].
    pub async fn request_short_details(&mut self, uin: &str) -> Result<()> {
        if let Some(snac) = self.user_info.request_short_details(&mut self.meta_info, uin) {
            self.socket_mut()?.send_snac_now(snac).await?;
        }
        Ok(())
    }

    /// Requests `uin`'s full details, unless already cached. Completion is
    /// reported as [`SessionEvent::UserDetailsAvailable`].
    pub async fn request_full_details(&mut self, uin: &str) -> Result<()> {
        if let Some(snac) = self.user_info.request_full_details(&mut self.meta_info, uin) {
            self.socket_mut()?.send_snac_now(snac).await?;
        }
        Ok(())
    }

    /// Tears down the transport; the session may be reconnected afterwards
    /// with a fresh [`IcqSession::connect`].
    pub async fn disconnect(&mut self) {
        self.socket = None;
        self.state = SessionState::Disconnected;
    }

    /// Adds `uin` to the contact list under `group_name`, creating the
    /// group first if it doesn't exist yet.
    pub async fn add_contact(&mut self, uin: &str, group_name: &str) -> Result<()> {
        let group_id = match self.ssi.group_by_name(group_name) {
            Some(id) => id,
            None => {
                let group = self.ssi.prepare_add(group_name, 0, ContactType::Group);
                let id = group.item_id();
                let add = SnacBuffer::with_data(0x0013, 0x0008, group.encode());
                self.socket_mut()?.send_snac_now(add).await?;
                id
            }
        };
        let contact = self.ssi.prepare_add(uin, group_id, ContactType::Buddy);
        let add = SnacBuffer::with_data(0x0013, 0x0008, contact.encode());
        self.socket_mut()?.send_snac_now(add).await
    }

    /// Removes `uin` from the contact list, if present.
    pub async fn remove_contact(&mut self, uin: &str) -> Result<()> {
        let Some(contact) = self.ssi.buddies().find(|c| c.name() == uin).cloned() else {
            return Ok(());
        };
        self.ssi.prepare_remove(contact.clone());
        let remove = SnacBuffer::with_data(0x0013, 0x000A, contact.encode());
        self.socket_mut()?.send_snac_now(remove).await
    }

    /// Grants `uin` authorization to add this account to their own list.
    pub async fn grant_auth(&mut self, uin: &str) -> Result<()> {
        let snac = self.ssi.grant_authorization(uin);
        self.socket_mut()?.send_snac_now(snac).await
    }

    /// Denies `uin` authorization to add this account to their own list.
    pub async fn deny_auth(&mut self, uin: &str) -> Result<()> {
        let snac = self.ssi.deny_authorization(uin);
        self.socket_mut()?.send_snac_now(snac).await
    }
}
