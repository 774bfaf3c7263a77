//! Runs one user's legacy session as its own task, translating between a
//! [`SessionCommand`] inbox and a stream of [`GatewayEvent`]s the core loop
//! bridges onto XMPP.

use std::time::Duration;

use icq_client::session::{IcqSession, SessionEvent};
use icq_client::user_info::{ShortUserDetails, UserDetails};
use icq_client::Message;
use icq_jid::BareJid;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// A command sent down to a running session task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Relay an outbound instant message to `uin`.
    SendMessage { uin: String, text: Vec<u8> },
    /// Add `uin` to the legacy contact list under `group`.
    AddContact { uin: String, group: String },
    /// Remove `uin` from the legacy contact list.
    RemoveContact { uin: String },
    /// Grant `uin` authorization to add this account.
    GrantAuth { uin: String },
    /// Deny `uin` authorization to add this account.
    DenyAuth { uin: String },
    /// Look up `uin`'s short details (nick/name/email).
    RequestShortDetails { uin: String },
    /// Look up `uin`'s full details.
    RequestFullDetails { uin: String },
    /// Tear the session down; the task exits after this.
    Disconnect,
}

/// Something a running session observed, tagged with the XMPP user it
/// belongs to so the core loop can route it without keeping its own
/// per-task state.
#[derive(Debug)]
pub enum GatewayEvent {
    /// Login finished; `buddies` is the legacy roster as `(uin, group)` pairs.
    Ready { jid: BareJid, buddies: Vec<(String, String)> },
    /// An instant message arrived from `from_uin`.
    Message { jid: BareJid, from_uin: String, text: Vec<u8> },
    /// A buddy's status changed; `None` means they went offline.
    Presence { jid: BareJid, uin: String, online: bool },
    /// The session ended, successfully or not.
    Disconnected { jid: BareJid, error: Option<String> },
    /// Offline messages were delivered, each paired with its sender.
    OfflineMessages { jid: BareJid, messages: Vec<Message> },
    /// A short details lookup completed for `uin`.
    ShortUserDetailsAvailable { jid: BareJid, uin: String, details: ShortUserDetails },
    /// A full details lookup completed for `uin`.
    UserDetailsAvailable { jid: BareJid, uin: String, details: UserDetails },
}

/// A running session task's command side, held by the core loop.
pub struct SessionHandle {
    /// The XMPP user this legacy session is bridged to.
    pub jid: BareJid,
    /// Downward command channel.
    pub commands: mpsc::Sender<SessionCommand>,
}

/// Drives one [`IcqSession`] end to end: connects, reports [`GatewayEvent::Ready`]
/// (or [`GatewayEvent::Disconnected`] on failure), then alternates between
/// draining `commands` and waiting on `session.next_event()` until told to
/// stop or the connection drops.
pub async fn run_session(
    jid: BareJid,
    mut session: IcqSession,
    mut commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::Sender<GatewayEvent>,
    login_timeout: Duration,
    idle_timeout: Duration,
) {
    match timeout(login_timeout, session.connect()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            let _ = events.send(GatewayEvent::Disconnected { jid, error: Some(e.to_string()) }).await;
            return;
        }
        Err(_) => {
            let _ = events
                .send(GatewayEvent::Disconnected { jid, error: Some("login timed out".to_string()) })
                .await;
            return;
        }
    }

    let buddies = session
        .contacts()
        .buddies()
        .map(|c| {
            let group = session
                .contacts()
                .groups()
                .find(|g| g.item_id() == c.group_id())
                .map(|g| g.name().to_string())
                .unwrap_or_default();
            (c.name().to_string(), group)
        })
        .collect();
    if events.send(GatewayEvent::Ready { jid: jid.clone(), buddies }).await.is_err() {
        return;
    }
    if session.request_offline_messages().await.is_err() {
        // Non-fatal: the legacy server may simply have nothing queued.
    }

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                if matches!(command, SessionCommand::Disconnect) {
                    break;
                }
                if let Err(e) = apply_command(&mut session, command).await {
                    let _ = events
                        .send(GatewayEvent::Disconnected { jid: jid.clone(), error: Some(e.to_string()) })
                        .await;
                    return;
                }
            }
            outcome = timeout(idle_timeout, session.next_event()) => {
                match outcome {
                    Ok(Ok(event)) => {
                        if let Some(forwarded) = translate_event(&jid, &session, event) {
                            if events.send(forwarded).await.is_err() {
                                return;
                            }
                        }
                    }
                    Ok(Err(e)) => {
                        let _ = events
                            .send(GatewayEvent::Disconnected { jid: jid.clone(), error: Some(e.to_string()) })
                            .await;
                        return;
                    }
                    Err(_) => {
                        let _ = events
                            .send(GatewayEvent::Disconnected { jid: jid.clone(), error: Some("idle timeout".to_string()) })
                            .await;
                        return;
                    }
                }
            }
        }
    }

    session.disconnect().await;
    let _ = events.send(GatewayEvent::Disconnected { jid, error: None }).await;
}

async fn apply_command(session: &mut IcqSession, command: SessionCommand) -> icq_client::Result<()> {
    match command {
        SessionCommand::SendMessage { uin, text } => session.send_message(&uin, &text).await,
        SessionCommand::AddContact { uin, group } => session.add_contact(&uin, &group).await,
        SessionCommand::RemoveContact { uin } => session.remove_contact(&uin).await,
        SessionCommand::GrantAuth { uin } => session.grant_auth(&uin).await,
        SessionCommand::DenyAuth { uin } => session.deny_auth(&uin).await,
        SessionCommand::RequestShortDetails { uin } => session.request_short_details(&uin).await,
        SessionCommand::RequestFullDetails { uin } => session.request_full_details(&uin).await,
        SessionCommand::Disconnect => unreachable!("handled by the caller before dispatch"),
    }
}

fn translate_event(jid: &BareJid, session: &IcqSession, event: SessionEvent) -> Option<GatewayEvent> {
    match event {
        SessionEvent::Ready => None,
        SessionEvent::Message(msg) => Some(GatewayEvent::Message {
            jid: jid.clone(),
            from_uin: msg.sender().to_string(),
            text: msg.text().to_vec(),
        }),
        SessionEvent::Presence { uin, status } => {
            Some(GatewayEvent::Presence { jid: jid.clone(), uin, online: status.is_some() })
        }
        SessionEvent::Disconnected(e) => {
            Some(GatewayEvent::Disconnected { jid: jid.clone(), error: Some(e.to_string()) })
        }
        SessionEvent::OfflineMessages(messages) => {
            Some(GatewayEvent::OfflineMessages { jid: jid.clone(), messages })
        }
        SessionEvent::ShortUserDetailsAvailable(uin) => {
            let details = session.user_info().short_details(&uin).cloned().unwrap_or_default();
            Some(GatewayEvent::ShortUserDetailsAvailable { jid: jid.clone(), uin, details })
        }
        SessionEvent::UserDetailsAvailable(uin) => {
            let details = session.user_info().full_details(&uin).cloned().unwrap_or_default();
            Some(GatewayEvent::UserDetailsAvailable { jid: jid.clone(), uin, details })
        }
    }
}
