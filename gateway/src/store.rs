//! The registration store: which XMPP users are registered with a legacy
//! account, and the handful of per-user options the bridging policy reads.

use std::collections::HashMap;

use icq_jid::BareJid;

/// `first_login` option key: push the legacy roster once SSI loads, then
/// reset to `false`.
pub const OPT_FIRST_LOGIN: &str = "first_login";
/// `auto-reconnect` option key: retry a dropped ICQ session within budget.
pub const OPT_AUTO_RECONNECT: &str = "auto-reconnect";
/// `auto-invite` option key: probe the user's presence on gateway start.
pub const OPT_AUTO_INVITE: &str = "auto-invite";
/// `encoding` option key: codec name for legacy message text.
pub const OPT_ENCODING: &str = "encoding";

/// An opaque key-value registration store. Mutations are expected to be
/// small and synchronous; nothing here is async since the whole gateway
/// runs cooperatively and a store lookup never blocks on I/O worth
/// suspending over.
pub trait UserStore: Send {
    /// Registers `jid` against a legacy account, overwriting any existing
    /// registration.
    fn add(&mut self, jid: &BareJid, uin: &str, password: &str);
    /// Removes `jid`'s registration and every option set for it.
    fn del(&mut self, jid: &BareJid);
    /// True if `jid` has a registration on file.
    fn is_registered(&self, jid: &BareJid) -> bool;
    /// The legacy UIN registered for `jid`, if any.
    fn get_uin(&self, jid: &BareJid) -> Option<String>;
    /// The legacy password registered for `jid`, if any.
    fn get_password(&self, jid: &BareJid) -> Option<String>;
    /// Reads one option for `jid`.
    fn get_option(&self, jid: &BareJid, key: &str) -> Option<String>;
    /// Sets one option for `jid`.
    fn set_option(&mut self, jid: &BareJid, key: &str, value: &str);
    /// Clears every option set for `jid`, leaving the registration itself
    /// intact.
    fn clear_options(&mut self, jid: &BareJid);
    /// Every registered user.
    fn list_users(&self) -> Vec<BareJid>;
    /// Every registered user with `key` set to exactly `value`.
    fn list_users_by_option(&self, key: &str, value: &str) -> Vec<BareJid>;
}

struct Account {
    uin: String,
    password: String,
    options: HashMap<String, String>,
}

/// A plain in-memory [`UserStore`], suitable for tests and for a caller that
/// persists registrations some other way and only needs the trait surface.
#[derive(Default)]
pub struct MemoryUserStore {
    accounts: HashMap<BareJid, Account>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> MemoryUserStore {
        MemoryUserStore::default()
    }
}

impl UserStore for MemoryUserStore {
    fn add(&mut self, jid: &BareJid, uin: &str, password: &str) {
        self.accounts.insert(
            jid.clone(),
            Account { uin: uin.to_string(), password: password.to_string(), options: HashMap::new() },
        );
    }

    fn del(&mut self, jid: &BareJid) {
        self.accounts.remove(jid);
    }

    fn is_registered(&self, jid: &BareJid) -> bool {
        self.accounts.contains_key(jid)
    }

    fn get_uin(&self, jid: &BareJid) -> Option<String> {
        self.accounts.get(jid).map(|a| a.uin.clone())
    }

    fn get_password(&self, jid: &BareJid) -> Option<String> {
        self.accounts.get(jid).map(|a| a.password.clone())
    }

    fn get_option(&self, jid: &BareJid, key: &str) -> Option<String> {
        self.accounts.get(jid).and_then(|a| a.options.get(key).cloned())
    }

    fn set_option(&mut self, jid: &BareJid, key: &str, value: &str) {
        if let Some(account) = self.accounts.get_mut(jid) {
            account.options.insert(key.to_string(), value.to_string());
        }
    }

    fn clear_options(&mut self, jid: &BareJid) {
        if let Some(account) = self.accounts.get_mut(jid) {
            account.options.clear();
        }
    }

    fn list_users(&self) -> Vec<BareJid> {
        self.accounts.keys().cloned().collect()
    }

    fn list_users_by_option(&self, key: &str, value: &str) -> Vec<BareJid> {
        self.accounts
            .iter()
            .filter(|(_, a)| a.options.get(key).map(String::as_str) == Some(value))
            .map(|(jid, _)| jid.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jid(s: &str) -> BareJid {
        s.parse().unwrap()
    }

    #[test]
    fn add_then_lookup_roundtrips() {
        let mut store = MemoryUserStore::new();
        store.add(&jid("alice@example.org"), "123456", "hunter2");
        assert!(store.is_registered(&jid("alice@example.org")));
        assert_eq!(store.get_uin(&jid("alice@example.org")).as_deref(), Some("123456"));
        assert_eq!(store.get_password(&jid("alice@example.org")).as_deref(), Some("hunter2"));
    }

    #[test]
    fn del_drops_registration_and_options() {
        let mut store = MemoryUserStore::new();
        let alice = jid("alice@example.org");
        store.add(&alice, "123456", "hunter2");
        store.set_option(&alice, OPT_FIRST_LOGIN, "true");
        store.del(&alice);
        assert!(!store.is_registered(&alice));
        assert_eq!(store.get_option(&alice, OPT_FIRST_LOGIN), None);
    }

    #[test]
    fn options_are_scoped_per_user() {
        let mut store = MemoryUserStore::new();
        let alice = jid("alice@example.org");
        let bob = jid("bob@example.org");
        store.add(&alice, "1", "p");
        store.add(&bob, "2", "p");
        store.set_option(&alice, OPT_AUTO_RECONNECT, "true");
        assert_eq!(store.get_option(&alice, OPT_AUTO_RECONNECT).as_deref(), Some("true"));
        assert_eq!(store.get_option(&bob, OPT_AUTO_RECONNECT), None);
    }

    #[test]
    fn list_users_by_option_filters_exact_matches() {
        let mut store = MemoryUserStore::new();
        let alice = jid("alice@example.org");
        let bob = jid("bob@example.org");
        store.add(&alice, "1", "p");
        store.add(&bob, "2", "p");
        store.set_option(&alice, OPT_AUTO_INVITE, "true");
        store.set_option(&bob, OPT_AUTO_INVITE, "false");
        let matching = store.list_users_by_option(OPT_AUTO_INVITE, "true");
        assert_eq!(matching, vec![alice]);
    }
}
