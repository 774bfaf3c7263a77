//! Injected configuration. There is no CLI or file parsing here — the
//! external collaborator that builds a [`Config`] and a [`crate::store::UserStore`]
//! is out of scope for this core (spec'd as an "external collaborator").

use std::time::Duration;

/// Everything the gateway needs to run, supplied by its caller.
#[derive(Debug, Clone)]
pub struct Config {
    /// The OSCAR authorizer host new sessions connect to first.
    pub oscar_host: String,
    /// The OSCAR authorizer port.
    pub oscar_port: u16,
    /// The XMPP server host the component connects to.
    pub component_host: String,
    /// The XMPP server's component port.
    pub component_port: u16,
    /// This gateway's own JID, e.g. `icq.example.org`.
    pub component_domain: String,
    /// The shared secret the component handshake is keyed on.
    pub component_secret: String,
    /// DNS-resolution budget before a connect attempt is abandoned.
    pub lookup_timeout: Duration,
    /// TCP-connect budget before a connect attempt is abandoned.
    pub connect_timeout: Duration,
    /// Budget from opening the OSCAR connection to reaching `Connected`.
    pub login_timeout: Duration,
    /// How long a connected session may go without inbound traffic.
    pub idle_timeout: Duration,
    /// Interval between keep-alive pings once connected.
    pub keepalive_timeout: Duration,
    /// Codec used for legacy message text when a user hasn't overridden it
    /// with the `encoding` store option.
    pub default_encoding: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            oscar_host: "login.icq.com".to_string(),
            oscar_port: 5190,
            component_host: "localhost".to_string(),
            component_port: 5347,
            component_domain: "icq.localhost".to_string(),
            component_secret: String::new(),
            lookup_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            login_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(90),
            keepalive_timeout: Duration::from_secs(60),
            default_encoding: "windows-1251".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_budgets() {
        let config = Config::default();
        assert_eq!(config.oscar_host, "login.icq.com");
        assert_eq!(config.oscar_port, 5190);
        assert_eq!(config.login_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(90));
        assert_eq!(config.keepalive_timeout, Duration::from_secs(60));
        assert_eq!(config.default_encoding, "windows-1251");
    }
}
