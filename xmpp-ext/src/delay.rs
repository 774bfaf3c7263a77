//! Legacy delayed delivery (`jabber:x:delay`, superseded elsewhere by
//! `urn:xmpp:delay` but still what this gateway's clients expect): marks a
//! message as having been stored and delivered later than it was sent.

use chrono::{DateTime, NaiveDateTime, Utc};
use icq_jid::Jid;
use icq_xml::Element;

/// The legacy delayed delivery namespace.
pub const NS_DELAY: &str = "jabber:x:delay";

const STAMP_FORMAT: &str = "%Y%m%dT%H:%M:%S";

/// An `<x xmlns='jabber:x:delay'/>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Delay {
    /// The entity that delayed (stored) the message, if known.
    pub from: Option<Jid>,
    /// When the message was originally stored.
    pub stamp: DateTime<Utc>,
    /// An optional human-readable reason.
    pub reason: Option<String>,
}

impl Delay {
    /// Builds a delay stamp with no `from` and no reason.
    pub fn new(stamp: DateTime<Utc>) -> Delay {
        Delay { from: None, stamp, reason: None }
    }

    /// Parses an `<x xmlns='jabber:x:delay'/>` element.
    pub fn from_element(el: &Element) -> Option<Delay> {
        if !el.is("x", NS_DELAY) {
            return None;
        }
        let stamp = NaiveDateTime::parse_from_str(el.attr("stamp")?, STAMP_FORMAT).ok()?;
        Some(Delay {
            from: el.attr("from").and_then(|s| s.parse().ok()),
            stamp: DateTime::<Utc>::from_naive_utc_and_offset(stamp, Utc),
            reason: {
                let text = el.text();
                if text.is_empty() { None } else { Some(text) }
            },
        })
    }

    /// Renders this delay as an `<x xmlns='jabber:x:delay'/>` element.
    pub fn to_element(&self) -> Element {
        let mut builder =
            Element::builder("x", NS_DELAY).attr("stamp", self.stamp.format(STAMP_FORMAT).to_string());
        if let Some(from) = &self.from {
            builder = builder.attr("from", from.to_string());
        }
        if let Some(reason) = &self.reason {
            builder = builder.append_text(reason.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn roundtrips_stamp_in_legacy_format() {
        let stamp = Utc.with_ymd_and_hms(2002, 9, 10, 23, 8, 25).unwrap();
        let delay = Delay::new(stamp);
        let el = delay.to_element();
        assert_eq!(el.attr("stamp"), Some("20020910T23:08:25"));
        let parsed = Delay::from_element(&el).unwrap();
        assert_eq!(parsed.stamp, stamp);
    }

    #[test]
    fn carries_reason_as_element_text() {
        let mut delay = Delay::new(Utc.with_ymd_and_hms(2002, 9, 10, 23, 8, 25).unwrap());
        delay.reason = Some("Offline storage".into());
        let parsed = Delay::from_element(&delay.to_element()).unwrap();
        assert_eq!(parsed.reason.as_deref(), Some("Offline storage"));
    }
}
