//! Well-known capability GUIDs, advertised in the location-rights reply and
//! referenced when building channel-2 ICBM messages.

use icq_wire::Guid;

macro_rules! capability {
    ($name:ident, $text:literal) => {
        /// A well-known OSCAR capability GUID.
        pub fn $name() -> Guid {
            Guid::from_string($text).expect("capability GUID literal is well-formed")
        }
    };
}

capability!(avatar, "09460000-4C7F-11D1-8222-444553540000");
capability!(icq_direct_connect, "09461344-4C7F-11D1-8222-444553540000");
capability!(icq_server_relay, "09461349-4C7F-11D1-8222-444553540000");
capability!(aim_file_transfer, "0946134C-4C7F-11D1-8222-444553540000");
capability!(aim_interop, "0946134D-4C7F-11D1-8222-444553540000");
capability!(utf8_messages, "0946134E-4C7F-11D1-8222-444553540000");
capability!(typing_notifications, "563FC809-0B6F-41BD-9F79-422609DFA2F3");
capability!(rtf_messages, "97B12751-243C-4334-AD22-D6ABF73F1492");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_round_trip_their_text_form() {
        assert_eq!(icq_server_relay().to_string(), "09461349-4C7F-11D1-8222-444553540000");
        assert!(!avatar().is_zero());
    }
}
