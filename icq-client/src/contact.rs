//! SSI (server-side information) contact items: buddies, groups, and the
//! handful of pseudo-items (visibility lists, privacy, the self icon) that
//! share the same wire encoding.

use crate::error::Result;
use icq_wire::{Buffer, Tlv, TlvChain};

/// TLV carrying a group's child item ids (groups only).
const TLV_GROUP_CHILDREN: u16 = 0x00C8;
/// Presence of this TLV marks a buddy as awaiting the contact's authorisation.
const TLV_AWAITING_AUTH: u16 = 0x0066;
/// TLV carrying the locally chosen display name / alias for a buddy.
const TLV_DISPLAY_NAME: u16 = 0x0131;

/// SSI item type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactType {
    /// A contact on the roster.
    Buddy,
    /// A roster group.
    Group,
    /// The "visible to" list.
    Visible,
    /// The "invisible to" list.
    Invisible,
    /// Privacy/permit-deny settings.
    PermitDeny,
    /// Presence-related settings item.
    Presence,
    /// The ignore list.
    Ignore,
    /// The self-icon (avatar) reference.
    SelfIcon,
    /// A tombstone: a deletion the server reports but hasn't purged yet.
    Deleted,
    /// Any type this crate does not assign special meaning to.
    Other(u16),
}

impl ContactType {
    /// Maps a wire type code to a [`ContactType`].
    pub fn from_u16(code: u16) -> ContactType {
        match code {
            0x0000 => ContactType::Buddy,
            0x0001 => ContactType::Group,
            0x0002 => ContactType::Visible,
            0x0003 => ContactType::Invisible,
            0x0004 => ContactType::PermitDeny,
            0x0005 => ContactType::Presence,
            0x000E => ContactType::Ignore,
            0x0013 => ContactType::SelfIcon,
            0x0019 => ContactType::Deleted,
            other => ContactType::Other(other),
        }
    }

    /// Maps this type back to its wire code.
    pub fn to_u16(self) -> u16 {
        match self {
            ContactType::Buddy => 0x0000,
            ContactType::Group => 0x0001,
            ContactType::Visible => 0x0002,
            ContactType::Invisible => 0x0003,
            ContactType::PermitDeny => 0x0004,
            ContactType::Presence => 0x0005,
            ContactType::Ignore => 0x000E,
            ContactType::SelfIcon => 0x0013,
            ContactType::Deleted => 0x0019,
            ContactType::Other(code) => code,
        }
    }
}

/// One SSI item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    name: String,
    group_id: u16,
    item_id: u16,
    ty: u16,
    data: TlvChain,
}

impl Contact {
    /// Builds a new contact with an empty TLV chain.
    pub fn new(name: impl Into<String>, group_id: u16, item_id: u16, ty: ContactType) -> Contact {
        Contact { name: name.into(), group_id, item_id, ty: ty.to_u16(), data: TlvChain::new() }
    }

    /// The contact's name: a UIN for buddies, a display string for groups.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the contact's name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The group this item belongs to (or the group's own id, for groups).
    pub fn group_id(&self) -> u16 {
        self.group_id
    }

    /// Sets the group id.
    pub fn set_group_id(&mut self, group_id: u16) {
        self.group_id = group_id;
    }

    /// The item's own id, unique across all non-group items.
    pub fn item_id(&self) -> u16 {
        self.item_id
    }

    /// Sets the item id.
    pub fn set_item_id(&mut self, item_id: u16) {
        self.item_id = item_id;
    }

    /// The item's type.
    pub fn ty(&self) -> ContactType {
        ContactType::from_u16(self.ty)
    }

    /// Sets the item's type.
    pub fn set_ty(&mut self, ty: ContactType) {
        self.ty = ty.to_u16();
    }

    /// A reference to the item's raw TLV data.
    pub fn data(&self) -> &TlvChain {
        &self.data
    }

    /// A mutable reference to the item's raw TLV data.
    pub fn data_mut(&mut self) -> &mut TlvChain {
        &mut self.data
    }

    /// True for the master (root) group: `group_id == 0 && item_id == 0`.
    pub fn is_master_group(&self) -> bool {
        self.ty() == ContactType::Group && self.group_id == 0 && self.item_id == 0
    }

    /// True if the buddy is awaiting the contact's authorisation.
    pub fn awaiting_auth(&self) -> bool {
        self.data.has(TLV_AWAITING_AUTH)
    }

    /// Marks (or clears) the awaiting-auth flag.
    pub fn set_awaiting_auth(&mut self, awaiting: bool) {
        if awaiting {
            self.data.add_tlv(Tlv::new(TLV_AWAITING_AUTH));
        } else {
            self.data.remove(TLV_AWAITING_AUTH);
        }
    }

    /// The locally chosen display name, if set.
    pub fn display_name(&self) -> Option<std::borrow::Cow<'_, str>> {
        self.data.get(TLV_DISPLAY_NAME).map(Tlv::as_str)
    }

    /// Sets the locally chosen display name.
    pub fn set_display_name(&mut self, name: &str) {
        self.data.add_tlv(Tlv::with_str(TLV_DISPLAY_NAME, name));
    }

    /// A group's list of child item ids (only meaningful for `Group` items).
    pub fn children(&self) -> Vec<u16> {
        let Some(payload) = self.data.get_data(TLV_GROUP_CHILDREN) else {
            return Vec::new();
        };
        let mut buf = Buffer::from(payload);
        let mut out = Vec::new();
        while buf.bytes_available() >= 2 {
            if let Ok(id) = buf.get_word() {
                out.push(id);
            } else {
                break;
            }
        }
        out
    }

    /// Replaces a group's child list.
    pub fn set_children(&mut self, children: &[u16]) {
        let mut buf = Buffer::new();
        for id in children {
            buf.add_word(*id);
        }
        self.data.add_tlv(Tlv::with_data(TLV_GROUP_CHILDREN, buf.into_bytes()));
    }

    /// Encodes this item in the `{name_len, name, gid, iid, type, data_len,
    /// data}` shape shared by the full-list reply and transactional edits.
    pub fn encode(&self) -> bytes::Bytes {
        let mut buf = Buffer::new();
        buf.add_word(self.name.len() as u16);
        buf.add_data(self.name.as_bytes());
        buf.add_word(self.group_id);
        buf.add_word(self.item_id);
        buf.add_word(self.ty);
        let data = self.data.to_bytes();
        buf.add_word(data.len() as u16);
        buf.add_data(&data);
        buf.into_bytes()
    }

    /// Decodes one item from the front of `buffer`, advancing its cursor.
    pub fn decode(buffer: &mut Buffer) -> Result<Contact> {
        let name_len = buffer.get_word()? as usize;
        let name = String::from_utf8_lossy(&buffer.get_block(name_len)?).into_owned();
        let group_id = buffer.get_word()?;
        let item_id = buffer.get_word()?;
        let ty = buffer.get_word()?;
        let data_len = buffer.get_word()? as usize;
        let data = TlvChain::from_bytes(buffer.get_block(data_len)?.to_vec())?;
        Ok(Contact { name, group_id, item_id, ty, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let mut c = Contact::new("12345", 1, 7, ContactType::Buddy);
        c.set_display_name("Buddy Name");
        let bytes = c.encode();
        let mut buf = Buffer::from(bytes);
        let decoded = Contact::decode(&mut buf).unwrap();
        assert_eq!(decoded.name(), "12345");
        assert_eq!(decoded.group_id(), 1);
        assert_eq!(decoded.item_id(), 7);
        assert_eq!(decoded.ty(), ContactType::Buddy);
        assert_eq!(decoded.display_name().as_deref(), Some("Buddy Name"));
    }

    #[test]
    fn master_group_detection() {
        let group = Contact::new("", 0, 0, ContactType::Group);
        assert!(group.is_master_group());
        let not_master = Contact::new("default", 3, 0, ContactType::Group);
        assert!(!not_master.is_master_group());
    }

    #[test]
    fn group_children() {
        let mut group = Contact::new("default", 1, 0, ContactType::Group);
        group.set_children(&[3, 4, 5]);
        assert_eq!(group.children(), vec![3, 4, 5]);
    }

    #[test]
    fn awaiting_auth_flag() {
        let mut c = Contact::new("12345", 1, 7, ContactType::Buddy);
        assert!(!c.awaiting_auth());
        c.set_awaiting_auth(true);
        assert!(c.awaiting_auth());
    }
}
