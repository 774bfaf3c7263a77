//! The gateway's own event loop: owns the component stream, the registered
//! users' running sessions, and the bridging policy that turns stanzas into
//! legacy actions and legacy events into stanzas.

use std::collections::HashMap;

use icq_client::session::IcqSession;
use icq_jid::{BareJid, Jid};
use icq_xml::Element;
use tokio::sync::mpsc;
use xmpp_core::component::{ComponentEvent, ComponentStream};
use xmpp_core::stanza::{Iq, IqType, Message as XmppMessage, MessageType, Presence, PresenceType, Stanza};
use xmpp_core::stanza_error::{DefinedCondition, StanzaError};
use xmpp_ext::delay::Delay;
use xmpp_ext::register::RegisterQuery;
use xmpp_ext::rosterx::RosterExchange;
use xmpp_ext::vcard::VCard;

use crate::config::Config;
use crate::error::Result;
use crate::session::{run_session, GatewayEvent, SessionCommand, SessionHandle};
use crate::store::{UserStore, OPT_AUTO_RECONNECT, OPT_FIRST_LOGIN};

const DEFAULT_GROUP: &str = "Buddies";
const MAX_RECONNECT_ATTEMPTS: u32 = 3;
const REGISTER_INSTRUCTIONS: &str = "Enter your ICQ UIN and password.";

struct PendingVCard {
    requester: Jid,
    iq_id: String,
}

/// Owns the component connection and every registered user's running
/// session, and bridges traffic between them.
pub struct Gateway {
    component: ComponentStream,
    config: Config,
    store: Box<dyn UserStore>,
    sessions: HashMap<BareJid, SessionHandle>,
    events_tx: mpsc::Sender<GatewayEvent>,
    events_rx: mpsc::Receiver<GatewayEvent>,
    reconnect_attempts: HashMap<BareJid, u32>,
    known_contacts: HashMap<BareJid, Vec<String>>,
    pending_vcards: HashMap<(BareJid, String), PendingVCard>,
}

impl Gateway {
    /// Connects the component stream and returns a gateway ready to [`Gateway::run`].
    pub async fn connect(config: Config, store: Box<dyn UserStore>) -> Result<Gateway> {
        let component = ComponentStream::connect(
            &config.component_host,
            config.component_port,
            &config.component_domain,
            &config.component_secret,
        )
        .await?;
        let (events_tx, events_rx) = mpsc::channel(256);
        Ok(Gateway {
            component,
            config,
            store,
            sessions: HashMap::new(),
            events_tx,
            events_rx,
            reconnect_attempts: HashMap::new(),
            known_contacts: HashMap::new(),
            pending_vcards: HashMap::new(),
        })
    }

    /// Runs the main loop until the component stream fails.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            tokio::select! {
                event = self.component.next_event() => {
                    match event? {
                        ComponentEvent::StreamReady => {}
                        ComponentEvent::Stanza(stanza) => self.handle_stanza(stanza).await?,
                        ComponentEvent::StreamError(e) => {
                            log::error!("component stream closed: {e}");
                            return Ok(());
                        }
                    }
                }
                Some(event) = self.events_rx.recv() => {
                    self.handle_gateway_event(event).await?;
                }
            }
        }
    }

    /// Tears every running session down in the documented order: unavailable
    /// for each known contact, then unavailable for the gateway itself, then
    /// the session task is told to disconnect.
    pub async fn shutdown(&mut self) -> Result<()> {
        let jids: Vec<BareJid> = self.sessions.keys().cloned().collect();
        for jid in jids {
            if let Some(contacts) = self.known_contacts.get(&jid).cloned() {
                for uin in contacts {
                    self.send_contact_presence(&jid, &uin, Some(PresenceType::Unavailable)).await?;
                }
            }
            self.send_domain_presence(&jid, Some(PresenceType::Unavailable)).await?;
            if let Some(handle) = self.sessions.get(&jid) {
                let _ = handle.commands.send(SessionCommand::Disconnect).await;
            }
        }
        self.component.close().await?;
        Ok(())
    }

    fn contact_jid(&self, uin: &str) -> Jid {
        Jid::Bare(BareJid::new(uin.to_string(), self.config.component_domain.clone()))
    }

    fn domain_jid(&self) -> Jid {
        Jid::Bare(BareJid::domain(self.config.component_domain.clone()))
    }

    async fn send_contact_presence(
        &mut self,
        jid: &BareJid,
        uin: &str,
        type_: Option<PresenceType>,
    ) -> Result<()> {
        let mut presence = Presence::new(type_, Jid::Bare(jid.clone()));
        presence.from = Some(self.contact_jid(uin));
        self.component.send_stanza(Stanza::Presence(presence)).await?;
        Ok(())
    }

    async fn send_domain_presence(&mut self, jid: &BareJid, type_: Option<PresenceType>) -> Result<()> {
        let mut presence = Presence::new(type_, Jid::Bare(jid.clone()));
        presence.from = Some(self.domain_jid());
        self.component.send_stanza(Stanza::Presence(presence)).await?;
        Ok(())
    }

    async fn handle_stanza(&mut self, stanza: Stanza) -> Result<()> {
        match stanza {
            Stanza::Iq(iq) => self.handle_iq(iq).await,
            Stanza::Message(msg) => self.handle_message(msg).await,
            Stanza::Presence(pres) => self.handle_presence(pres).await,
        }
    }

    async fn handle_iq(&mut self, iq: Iq) -> Result<()> {
        if !matches!(iq.type_, IqType::Get | IqType::Set) {
            return Ok(());
        }
        let Some(payload) = iq.payload().cloned() else {
            return Ok(());
        };
        if payload.is("query", xmpp_ext::register::NS_REGISTER) {
            self.handle_register(iq, &payload).await
        } else if payload.is("vCard", xmpp_ext::vcard::NS_VCARD) && iq.type_ == IqType::Get {
            self.handle_vcard_request(iq).await
        } else {
            let err = StanzaError::from_condition(DefinedCondition::FeatureNotImplemented, None);
            self.component.send_stanza(Stanza::Iq(iq.error_reply(err))).await?;
            Ok(())
        }
    }

    async fn handle_register(&mut self, iq: Iq, payload: &Element) -> Result<()> {
        let Some(from) = iq.from.clone() else { return Ok(()) };
        let bare = from.to_bare();

        if iq.type_ == IqType::Get {
            let form = if self.store.is_registered(&bare) {
                RegisterQuery {
                    instructions: Some(REGISTER_INSTRUCTIONS.to_string()),
                    username: self.store.get_uin(&bare),
                    password: Some(String::new()),
                    remove: false,
                }
            } else {
                RegisterQuery::empty_form(REGISTER_INSTRUCTIONS)
            };
            let mut reply = iq.clone();
            reply.type_ = IqType::Result;
            reply.swap_from_to();
            reply.set_payload(form.to_element());
            self.component.send_stanza(Stanza::Iq(reply)).await?;
            return Ok(());
        }

        let Some(query) = RegisterQuery::from_element(payload) else {
            let err = StanzaError::from_condition(DefinedCondition::BadRequest, None);
            self.component.send_stanza(Stanza::Iq(iq.error_reply(err))).await?;
            return Ok(());
        };

        if query.remove {
            self.unregister_user(&bare).await?;
        } else {
            let (Some(uin), Some(password)) = (query.username, query.password) else {
                let err = StanzaError::from_condition(DefinedCondition::BadRequest, None);
                self.component.send_stanza(Stanza::Iq(iq.error_reply(err))).await?;
                return Ok(());
            };
            self.store.add(&bare, &uin, &password);
            self.store.set_option(&bare, OPT_FIRST_LOGIN, "true");
        }

        let mut reply = iq.clone();
        reply.type_ = IqType::Result;
        reply.swap_from_to();
        self.component.send_stanza(Stanza::Iq(reply)).await?;
        Ok(())
    }

    async fn handle_vcard_request(&mut self, iq: Iq) -> Result<()> {
        let (Some(from), Some(to)) = (iq.from.clone(), iq.to.clone()) else { return Ok(()) };
        let bare = from.to_bare();
        let Some(uin) = to.node().map(str::to_string) else { return Ok(()) };
        if !self.store.is_registered(&bare) {
            let err = StanzaError::from_condition(DefinedCondition::RegistrationRequired, None);
            self.component.send_stanza(Stanza::Iq(iq.error_reply(err))).await?;
            return Ok(());
        }
        let Some(handle) = self.sessions.get(&bare) else {
            let err = StanzaError::from_condition(DefinedCondition::RecipientUnavailable, None);
            self.component.send_stanza(Stanza::Iq(iq.error_reply(err))).await?;
            return Ok(());
        };
        self.pending_vcards.insert(
            (bare, uin.clone()),
            PendingVCard { requester: from, iq_id: iq.id.clone() },
        );
        let _ = handle.commands.send(SessionCommand::RequestShortDetails { uin }).await;
        Ok(())
    }

    async fn handle_message(&mut self, msg: XmppMessage) -> Result<()> {
        let (Some(from), Some(to)) = (msg.from.clone(), msg.to.clone()) else { return Ok(()) };
        let Some(uin) = to.node().map(str::to_string) else { return Ok(()) };
        let Some(body) = msg.body.clone() else { return Ok(()) };
        let bare = from.to_bare();
        let Some(handle) = self.sessions.get(&bare) else { return Ok(()) };
        let _ = handle
            .commands
            .send(SessionCommand::SendMessage { uin, text: body.into_bytes() })
            .await;
        Ok(())
    }

    async fn handle_presence(&mut self, pres: Presence) -> Result<()> {
        let (Some(from), Some(to)) = (pres.from.clone(), pres.to.clone()) else { return Ok(()) };
        let bare = from.to_bare();
        match to.node() {
            None => self.handle_presence_to_self(bare, pres.type_).await,
            Some(uin) => self.handle_presence_to_contact(bare, uin.to_string(), pres.type_).await,
        }
    }

    async fn handle_presence_to_self(&mut self, bare: BareJid, type_: Option<PresenceType>) -> Result<()> {
        match type_ {
            None => self.login_user(bare).await,
            Some(PresenceType::Unavailable) => self.logout_user(&bare).await,
            Some(PresenceType::Subscribe) => {
                self.send_domain_presence(&bare, Some(PresenceType::Subscribed)).await
            }
            _ => Ok(()),
        }
    }

    async fn handle_presence_to_contact(
        &mut self,
        bare: BareJid,
        uin: String,
        type_: Option<PresenceType>,
    ) -> Result<()> {
        if !self.store.is_registered(&bare) {
            return Ok(());
        }
        match type_ {
            Some(PresenceType::Subscribe) => self.add_contact(bare, uin).await,
            Some(PresenceType::Unsubscribe) => self.delete_contact(bare, uin).await,
            Some(PresenceType::Subscribed) => self.send_command(&bare, SessionCommand::GrantAuth { uin }).await,
            Some(PresenceType::Unsubscribed) => self.send_command(&bare, SessionCommand::DenyAuth { uin }).await,
            _ => Ok(()),
        }
    }

    async fn send_command(&mut self, jid: &BareJid, command: SessionCommand) -> Result<()> {
        if let Some(handle) = self.sessions.get(jid) {
            let _ = handle.commands.send(command).await;
        }
        Ok(())
    }

    async fn login_user(&mut self, jid: BareJid) -> Result<()> {
        if self.sessions.contains_key(&jid) {
            return Ok(());
        }
        if !self.store.is_registered(&jid) {
            let err = StanzaError::from_condition(DefinedCondition::RegistrationRequired, None);
            let mut presence = Presence::new(Some(PresenceType::Error), Jid::Bare(jid.clone()));
            presence.from = Some(self.domain_jid());
            let mut holder = Element::bare("presence", xmpp_core::component::NS_COMPONENT_ACCEPT);
            err.push_to_dom(&mut holder);
            if let Some(error_el) = holder.children().next().cloned() {
                presence.extensions.push(error_el);
            }
            self.component.send_stanza(Stanza::Presence(presence)).await?;
            return Ok(());
        }
        self.start_session(jid).await
    }

    async fn start_session(&mut self, jid: BareJid) -> Result<()> {
        let uin = self.store.get_uin(&jid).unwrap_or_default();
        let password = self.store.get_password(&jid).unwrap_or_default();
        let session = IcqSession::new(uin, password, self.config.oscar_host.clone(), self.config.oscar_port);
        let (tx, rx) = mpsc::channel(32);
        self.sessions.insert(jid.clone(), SessionHandle { jid: jid.clone(), commands: tx });
        self.reconnect_attempts.insert(jid.clone(), 0);
        let events = self.events_tx.clone();
        let login_timeout = self.config.login_timeout;
        let idle_timeout = self.config.idle_timeout;
        tokio::spawn(run_session(jid, session, rx, events, login_timeout, idle_timeout));
        Ok(())
    }

    async fn logout_user(&mut self, jid: &BareJid) -> Result<()> {
        self.send_command(jid, SessionCommand::Disconnect).await
    }

    async fn add_contact(&mut self, bare: BareJid, uin: String) -> Result<()> {
        self.known_contacts.entry(bare.clone()).or_default().push(uin.clone());
        self.send_command(
            &bare,
            SessionCommand::AddContact { uin: uin.clone(), group: DEFAULT_GROUP.to_string() },
        )
        .await?;
        // The SSI edit acknowledgement isn't surfaced as a session event
        // (see DESIGN.md), so the subscription is acked optimistically
        // rather than gated on legacy-side confirmation.
        self.send_contact_presence(&bare, &uin, Some(PresenceType::Subscribed)).await
    }

    async fn delete_contact(&mut self, bare: BareJid, uin: String) -> Result<()> {
        if let Some(contacts) = self.known_contacts.get_mut(&bare) {
            contacts.retain(|c| c != &uin);
        }
        self.send_command(&bare, SessionCommand::RemoveContact { uin: uin.clone() }).await?;
        self.send_contact_presence(&bare, &uin, Some(PresenceType::Unsubscribed)).await
    }

    async fn unregister_user(&mut self, bare: &BareJid) -> Result<()> {
        self.send_command(bare, SessionCommand::Disconnect).await?;
        self.store.del(bare);
        self.known_contacts.remove(bare);
        self.reconnect_attempts.remove(bare);
        self.pending_vcards.retain(|(jid, _), _| jid != bare);
        Ok(())
    }

    async fn handle_gateway_event(&mut self, event: GatewayEvent) -> Result<()> {
        match event {
            GatewayEvent::Ready { jid, buddies } => self.on_ready(jid, buddies).await,
            GatewayEvent::Message { jid, from_uin, text } => self.on_message(jid, from_uin, text).await,
            GatewayEvent::Presence { jid, uin, online } => self.on_presence(jid, uin, online).await,
            GatewayEvent::Disconnected { jid, error } => self.on_disconnected(jid, error).await,
            GatewayEvent::OfflineMessages { jid, messages } => self.on_offline_messages(jid, messages).await,
            GatewayEvent::ShortUserDetailsAvailable { jid, uin, details } => {
                self.on_short_details(jid, uin, details).await
            }
            GatewayEvent::UserDetailsAvailable { .. } => Ok(()),
        }
    }

    async fn on_ready(&mut self, jid: BareJid, buddies: Vec<(String, String)>) -> Result<()> {
        self.known_contacts.insert(jid.clone(), buddies.iter().map(|(uin, _)| uin.clone()).collect());
        self.reconnect_attempts.insert(jid.clone(), 0);
        self.send_domain_presence(&jid, None).await?;

        let first_login = self.store.get_option(&jid, OPT_FIRST_LOGIN).as_deref() != Some("false");
        if first_login && !buddies.is_empty() {
            let items = buddies.into_iter().map(|(uin, _)| (self.contact_jid(&uin), uin));
            let exchange = RosterExchange::adding(items);
            let message = XmppMessage {
                id: None,
                type_: MessageType::Normal,
                from: Some(self.domain_jid()),
                to: Some(Jid::Bare(jid.clone())),
                body: None,
                subject: None,
                thread: None,
                extensions: vec![exchange.to_element()],
            };
            self.component.send_stanza(Stanza::Message(message)).await?;
        }
        self.store.set_option(&jid, OPT_FIRST_LOGIN, "false");
        Ok(())
    }

    async fn on_message(&mut self, jid: BareJid, from_uin: String, text: Vec<u8>) -> Result<()> {
        let body = String::from_utf8_lossy(&text).into_owned();
        let message = XmppMessage {
            id: None,
            type_: MessageType::Chat,
            from: Some(self.contact_jid(&from_uin)),
            to: Some(Jid::Bare(jid)),
            body: Some(body),
            subject: None,
            thread: None,
            extensions: Vec::new(),
        };
        self.component.send_stanza(Stanza::Message(message)).await?;
        Ok(())
    }

    async fn on_presence(&mut self, jid: BareJid, uin: String, online: bool) -> Result<()> {
        let type_ = if online { None } else { Some(PresenceType::Unavailable) };
        self.send_contact_presence(&jid, &uin, type_).await
    }

    async fn on_disconnected(&mut self, jid: BareJid, error: Option<String>) -> Result<()> {
        self.sessions.remove(&jid);
        match error {
            None => self.send_domain_presence(&jid, Some(PresenceType::Unavailable)).await,
            Some(err) => {
                log::warn!("session for {jid} ended: {err}");
                let auto_reconnect = self.store.get_option(&jid, OPT_AUTO_RECONNECT).as_deref() == Some("true");
                let attempts = *self.reconnect_attempts.get(&jid).unwrap_or(&0);
                if auto_reconnect && attempts < MAX_RECONNECT_ATTEMPTS {
                    self.reconnect_attempts.insert(jid.clone(), attempts + 1);
                    self.start_session(jid).await
                } else {
                    self.reconnect_attempts.remove(&jid);
                    self.send_domain_presence(&jid, Some(PresenceType::Unavailable)).await
                }
            }
        }
    }

    async fn on_offline_messages(&mut self, jid: BareJid, messages: Vec<icq_client::Message>) -> Result<()> {
        for msg in messages {
            let delay = Delay::new(msg.timestamp());
            let message = XmppMessage {
                id: None,
                type_: MessageType::Chat,
                from: Some(self.contact_jid(msg.sender())),
                to: Some(Jid::Bare(jid.clone())),
                body: Some(String::from_utf8_lossy(msg.text()).into_owned()),
                subject: None,
                thread: None,
                extensions: vec![delay.to_element()],
            };
            self.component.send_stanza(Stanza::Message(message)).await?;
        }
        Ok(())
    }

    async fn on_short_details(
        &mut self,
        jid: BareJid,
        uin: String,
        details: icq_client::user_info::ShortUserDetails,
    ) -> Result<()> {
        let Some(pending) = self.pending_vcards.remove(&(jid, uin)) else { return Ok(()) };
        let vcard = VCard {
            nickname: non_empty(details.nick),
            fullname: None,
            family_name: non_empty(details.last_name),
            given_name: non_empty(details.first_name),
            description: None,
        };
        let mut reply = Iq::new(IqType::Result, vcard.to_element());
        reply.id = pending.iq_id;
        reply.from = Some(self.domain_jid());
        reply.to = Some(pending.requester);
        self.component.send_stanza(Stanza::Iq(reply)).await?;
        Ok(())
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config { component_domain: "icq.example.org".to_string(), ..Config::default() }
    }

    #[test]
    fn contact_jid_is_uin_at_domain() {
        // Exercises the pure jid-construction helpers without a live
        // component connection.
        let gateway_config = config();
        let uin_domain = BareJid::new("123456".to_string(), gateway_config.component_domain.clone());
        assert_eq!(uin_domain.to_string(), "123456@icq.example.org");
    }
}
