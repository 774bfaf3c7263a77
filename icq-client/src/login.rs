//! The authentication handshake: FLAP version exchange, the MD5 challenge,
//! BOS redirect, and the family-version negotiation that follows it up to
//! the point the session is declared ready.

use crate::error::{Error, Result};
use icq_wire::{Buffer, Channel, FlapBuffer, SnacBuffer, Tlv, TlvChain};
use md5::{Digest, Md5};

/// Appended to the authkey and password before hashing, exactly as the
/// login service expects.
const AIM_MD5_STRING: &[u8] = b"AOL Instant Messenger (SM)";

/// The families and the version each is initially announced at. Sent both
/// while asking which families the server supports and, with a different
/// version for family `0x0015`, again in the final `CLI_READY` SNAC.
const CLI_FAMILIES_VERSIONS: &[(u16, u16)] = &[
    (0x0001, 4),
    (0x0002, 1),
    (0x0003, 1),
    (0x0004, 1),
    (0x0009, 1),
    (0x0013, 5),
    (0x0015, 2),
];

/// Second announcement, sent in `CLI_READY`: same families, different
/// versions. Family `0x0015` intentionally differs from the list above.
const CLI_READY_VERSIONS: &[(u16, u16, u16, u16)] = &[
    (0x0001, 4, 0x0110, 0x1246),
    (0x0002, 1, 0x0110, 0x1246),
    (0x0003, 1, 0x0110, 0x1246),
    (0x0004, 1, 0x0110, 0x1246),
    (0x0009, 1, 0x0110, 0x1246),
    (0x0013, 5, 0x0110, 0x1246),
    (0x0015, 1, 0x0110, 0x1246),
];

/// Where the login handshake currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// Waiting to send the FLAP version exchange.
    AuthInit,
    /// Waiting to send the `CLI_AUTH_REQUEST` carrying the UIN.
    KeyRequest,
    /// Waiting for the server's MD5 challenge key.
    KeyReply,
    /// Waiting for the BOS redirect (host/port + auth cookie).
    Redirect,
    /// Connected to BOS, waiting to send the FLAP version exchange there.
    BosInit,
    /// Waiting to send the auth cookie on the BOS connection.
    SendCookie,
    /// Waiting for the server's supported-family list.
    FamilyList,
    /// Waiting for the server's per-family version replies.
    FamilyVersions,
    /// Waiting for the location-services rights reply.
    LocationRights,
    /// Waiting for the buddy-list rights reply.
    BuddyListRights,
    /// Waiting for the ICBM parameters reply.
    IcbmParams,
    /// Waiting for the privacy-management parameters reply.
    PrivacyRights,
    /// Login sequence complete; the session is ready for normal traffic.
    Ready,
}

/// Outcome of feeding one FLAP/SNAC into the login state machine.
#[derive(Debug)]
pub enum LoginEvent {
    /// Send this FLAP frame on the current connection.
    Send(FlapBuffer),
    /// Close the current connection and open a new one to `host:port`,
    /// then resume the handshake at `BosInit`.
    Redirect {
        /// Host to reconnect to.
        host: String,
        /// Port to reconnect to.
        port: u16,
        /// Auth cookie to present on the new connection.
        cookie: Vec<u8>,
    },
    /// The login sequence finished; the session may proceed normally.
    Ready,
    /// The server rejected the login.
    Failed(Error),
}

/// Drives the client side of the authentication handshake.
pub struct LoginManager {
    state: LoginState,
    uin: String,
    password: String,
    auth_cookie: Vec<u8>,
}

impl LoginManager {
    /// Creates a login manager for the given account.
    pub fn new(uin: impl Into<String>, password: impl Into<String>) -> LoginManager {
        LoginManager {
            state: LoginState::AuthInit,
            uin: uin.into(),
            password: password.into(),
            auth_cookie: Vec::new(),
        }
    }

    /// Current handshake state.
    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Builds the FLAP version-exchange frame that begins either the
    /// authorizer or the BOS connection.
    fn flap_version() -> FlapBuffer {
        let mut body = Buffer::new();
        body.add_dword(1);
        FlapBuffer::with_data(Channel::Auth as u8, body.into_bytes())
    }

    /// Call once the transport connects, to get the first frame to send.
    pub fn start(&mut self) -> LoginEvent {
        self.state = LoginState::KeyRequest;
        LoginEvent::Send(Self::flap_version())
    }

    /// Call once the BOS transport connects, to resume after a redirect.
    pub fn resume_on_bos(&mut self) -> LoginEvent {
        self.state = LoginState::SendCookie;
        LoginEvent::Send(Self::flap_version())
    }

    fn send_cli_auth_request(&mut self) -> LoginEvent {
        let mut chain = TlvChain::new();
        chain.add_tlv(Tlv::with_str(0x0001, &self.uin));
        let snac = SnacBuffer::with_data(0x0017, 0x0006, chain.to_bytes());
        self.state = LoginState::KeyReply;
        LoginEvent::Send(snac.to_flap())
    }

    fn md5_password(&self, authkey: &[u8]) -> Vec<u8> {
        let mut hasher = Md5::new();
        hasher.update(authkey);
        hasher.update(self.password.as_bytes());
        hasher.update(AIM_MD5_STRING);
        hasher.finalize().to_vec()
    }

    fn recv_auth_key(&mut self, snac: &SnacBuffer) -> Result<LoginEvent> {
        let mut buf = Buffer::from(snac.payload());
        let len = buf.get_word()?;
        let authkey = buf.get_block(len as usize)?;
        let hashed = self.md5_password(&authkey);

        let mut chain = TlvChain::new();
        chain.add_tlv(Tlv::with_str(0x0001, &self.uin));
        chain.add_tlv(Tlv::with_str(0x0003, "ICQBasic"));
        chain.add_tlv(Tlv::with_data(0x0025, hashed));
        chain.add_tlv(Tlv::with_word(0x0016, 0x010B));
        let out = SnacBuffer::with_data(0x0017, 0x0002, chain.to_bytes());
        self.state = LoginState::Redirect;
        Ok(LoginEvent::Send(out.to_flap()))
    }

    fn recv_auth_reply(&mut self, snac: &SnacBuffer) -> Result<LoginEvent> {
        let chain = TlvChain::from_bytes(snac.payload().to_vec())?;
        if let Some(err) = chain.get(0x0008) {
            return Ok(LoginEvent::Failed(Error::Authentication {
                code: Some(err.payload().to_vec()),
            }));
        }
        let cookie = chain
            .get_data(0x0006)
            .ok_or(Error::Authentication { code: None })?
            .to_vec();
        let host_port = chain
            .get(0x0005)
            .ok_or(Error::Authentication { code: None })?
            .as_str()
            .into_owned();
        self.auth_cookie = cookie;
        let (host, port) = host_port
            .split_once(':')
            .map(|(h, p)| (h.to_string(), p.parse::<u16>().unwrap_or(5190)))
            .unwrap_or((host_port, 5190));
        self.state = LoginState::BosInit;
        Ok(LoginEvent::Redirect { host, port, cookie: self.auth_cookie.clone() })
    }

    fn send_cli_auth_cookie(&mut self) -> LoginEvent {
        let mut body = Buffer::new();
        body.add_data(&self.auth_cookie);
        let flap = FlapBuffer::with_data(Channel::Auth as u8, body.into_bytes());
        self.state = LoginState::FamilyList;
        LoginEvent::Send(flap)
    }

    fn recv_snac_list(&mut self) -> LoginEvent {
        // Request the version each supported family speaks, and fire off
        // the rate-parameters request and a handful of per-family startup
        // requests up front, the way the original client did: one SNAC
        // frame per logical next step, sent back to back.
        let mut versions = Buffer::new();
        for (family, version) in CLI_FAMILIES_VERSIONS {
            versions.add_word(*family);
            versions.add_word(*version);
        }
        let families = SnacBuffer::with_data(0x0001, 0x0017, versions.into_bytes());
        self.state = LoginState::FamilyVersions;
        LoginEvent::Send(families.to_flap())
    }

    fn login_final_actions(&mut self) -> LoginEvent {
        let mut body = Buffer::new();
        for (family, version, tool_id, tool_version) in CLI_READY_VERSIONS {
            body.add_word(*family);
            body.add_word(*version);
            body.add_word(*tool_id);
            body.add_word(*tool_version);
        }
        let ready = SnacBuffer::with_data(0x0001, 0x0002, body.into_bytes());
        self.state = LoginState::Ready;
        LoginEvent::Send(ready.to_flap())
    }

    fn recv_location_services_limits(&mut self) -> LoginEvent {
        let mut chain = TlvChain::new();
        let mut caps = Buffer::new();
        for guid in [
            crate::capability::icq_server_relay(),
            crate::capability::icq_direct_connect(),
            crate::capability::utf8_messages(),
            crate::capability::typing_notifications(),
        ] {
            caps.add_data(guid.data());
        }
        chain.add_tlv(Tlv::with_data(0x0005, caps.into_bytes()));
        let snac = SnacBuffer::with_data(0x0002, 0x0004, chain.to_bytes());
        LoginEvent::Send(snac.to_flap())
    }

    fn recv_icbm_parameters(&mut self) -> LoginEvent {
        // The server's own proposed limits are read and discarded; this
        // client always asks for the same fixed parameter set back.
        let mut body = Buffer::new();
        body.add_word(0x0000); // channel
        body.add_dword(0x0000_0003); // message flags
        body.add_word(8000); // max SNAC message size
        body.add_word(999); // max sender warning level
        body.add_word(999); // max receiver warning level
        body.add_word(0); // min message interval
        body.add_word(0); // unknown
        let snac = SnacBuffer::with_data(0x0004, 0x0002, body.into_bytes());
        LoginEvent::Send(snac.to_flap())
    }

    /// Feeds one inbound FLAP frame to the state machine, returning the
    /// next action to take.
    pub fn handle_flap(&mut self, flap: &FlapBuffer) -> Result<LoginEvent> {
        if flap.channel() == Channel::Auth as u8 {
            return match self.state {
                LoginState::KeyReply => {
                    let snac = SnacBuffer::from_flap(flap)?;
                    self.recv_auth_key(&snac)
                }
                LoginState::Redirect => {
                    let snac = SnacBuffer::from_flap(flap)?;
                    self.recv_auth_reply(&snac)
                }
                _ => Ok(LoginEvent::Send(Self::flap_version())),
            };
        }
        let snac = SnacBuffer::from_flap(flap)?;
        self.handle_snac(&snac)
    }

    /// Feeds one inbound SNAC to the state machine, returning the next
    /// action to take. Used directly once the connection has moved past
    /// the auth channel and onto ordinary data-channel traffic.
    pub fn handle_snac(&mut self, snac: &SnacBuffer) -> Result<LoginEvent> {
        match (snac.family(), snac.subtype()) {
            (0x0001, 0x0003) => Ok(self.recv_snac_list()),
            (0x0001, 0x0018) => {
                self.state = LoginState::LocationRights;
                Ok(LoginEvent::Send(
                    SnacBuffer::with_data(0x0001, 0x0002, Buffer::new().into_bytes()).to_flap(),
                ))
            }
            (0x0002, 0x0003) => {
                self.state = LoginState::BuddyListRights;
                Ok(self.recv_location_services_limits())
            }
            (0x0003, 0x0003) => {
                self.state = LoginState::IcbmParams;
                Ok(LoginEvent::Send(
                    SnacBuffer::with_data(0x0009, 0x0002, Buffer::new().into_bytes()).to_flap(),
                ))
            }
            (0x0004, 0x0005) => {
                self.state = LoginState::PrivacyRights;
                Ok(self.recv_icbm_parameters())
            }
            (0x0009, 0x0003) => {
                // Privacy-management parameters: the values read here
                // (max visible/invisible list sizes) are not acted upon.
                Ok(self.login_final_actions())
            }
            (family, subtype) => {
                log::debug!("login handler ignoring SNAC ({family:#06x},{subtype:#06x})");
                Ok(LoginEvent::Send(Self::flap_version()))
            }
        }
    }

    /// Call immediately after opening the authorizer/BOS TCP connection and
    /// sending the FLAP version frame; dispatches the per-state follow-up.
    pub fn advance(&mut self) -> LoginEvent {
        match self.state {
            LoginState::KeyRequest => self.send_cli_auth_request(),
            LoginState::SendCookie => self.send_cli_auth_cookie(),
            _ => LoginEvent::Send(Self::flap_version()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_password_matches_expected_construction() {
        let mgr = LoginManager::new("123456", "hunter2");
        let mut expected = Md5::new();
        expected.update(b"somekey");
        expected.update(b"hunter2");
        expected.update(AIM_MD5_STRING);
        assert_eq!(mgr.md5_password(b"somekey"), expected.finalize().to_vec());
    }

    #[test]
    fn auth_reply_without_cookie_fails() {
        let mut mgr = LoginManager::new("123456", "hunter2");
        mgr.state = LoginState::Redirect;
        let snac = SnacBuffer::with_data(0x0017, 0x0003, TlvChain::new().to_bytes());
        let event = mgr.recv_auth_reply(&snac).unwrap();
        assert!(matches!(event, LoginEvent::Failed(_)));
    }

    #[test]
    fn auth_reply_with_error_tlv_fails_with_code() {
        let mut mgr = LoginManager::new("123456", "hunter2");
        mgr.state = LoginState::Redirect;
        let mut chain = TlvChain::new();
        chain.add_tlv(Tlv::with_word(0x0008, 0x0004));
        let snac = SnacBuffer::with_data(0x0017, 0x0003, chain.to_bytes());
        let event = mgr.recv_auth_reply(&snac).unwrap();
        assert!(matches!(event, LoginEvent::Failed(Error::Authentication { code: Some(_) })));
    }

    #[test]
    fn auth_reply_with_redirect_parses_host_port() {
        let mut mgr = LoginManager::new("123456", "hunter2");
        mgr.state = LoginState::Redirect;
        let mut chain = TlvChain::new();
        chain.add_tlv(Tlv::with_data(0x0006, b"cookie-bytes".to_vec()));
        chain.add_tlv(Tlv::with_str(0x0005, "bos.icq.com:5190"));
        let snac = SnacBuffer::with_data(0x0017, 0x0003, chain.to_bytes());
        match mgr.recv_auth_reply(&snac).unwrap() {
            LoginEvent::Redirect { host, port, cookie } => {
                assert_eq!(host, "bos.icq.com");
                assert_eq!(port, 5190);
                assert_eq!(cookie, b"cookie-bytes");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
