//! Server-side contact list management: the full-list bootstrap, the
//! transactional add/update/remove protocol, authorization requests, and
//! the free-id allocation a new item needs before it can be added.

use crate::contact::{Contact, ContactType};
use crate::error::{Error, Result};
use icq_wire::{Buffer, SnacBuffer};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Server reply codes for a single SSI edit acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyCode {
    /// The edit applied.
    Success,
    /// The item referenced did not exist.
    NotFound,
    /// An item with that key already exists.
    AlreadyExists,
    /// Generic server-side failure.
    Error,
    /// The account's item limit would be exceeded.
    LimitExceeded,
    /// The edit requires the contact's authorization first.
    AuthRequired,
    /// A code this client does not assign special meaning to.
    Other(u16),
}

impl ModifyCode {
    fn from_u16(code: u16) -> ModifyCode {
        match code {
            0x0000 => ModifyCode::Success,
            0x0002 => ModifyCode::NotFound,
            0x0003 => ModifyCode::AlreadyExists,
            0x000A => ModifyCode::Error,
            0x000C => ModifyCode::LimitExceeded,
            0x000E => ModifyCode::AuthRequired,
            other => ModifyCode::Other(other),
        }
    }
}

/// One pending outgoing edit, kept so the matching ack can be interpreted.
#[derive(Debug, Clone)]
struct PendingEdit {
    contact: Contact,
    is_add: bool,
}

/// Allocates fresh item/group ids without the collision-retry loop the
/// original client used (a random guess, retried on collision, which can
/// spin for a long time as the id space fills up). A monotonic counter
/// paired with a bitmap of ids already seen from the server is equivalent
/// in effect and never needs to retry.
#[derive(Debug, Default)]
pub struct IdAllocator {
    used: BTreeSet<u16>,
    next_hint: u16,
}

impl IdAllocator {
    /// Creates an empty allocator.
    pub fn new() -> IdAllocator {
        IdAllocator { used: BTreeSet::new(), next_hint: 1 }
    }

    /// Marks `id` as taken, e.g. because the server's full list mentioned it.
    pub fn mark_used(&mut self, id: u16) {
        self.used.insert(id);
    }

    /// Marks `id` as free again, e.g. after its item was deleted.
    pub fn release(&mut self, id: u16) {
        self.used.remove(&id);
    }

    /// Returns the next unused id, starting the scan from the last
    /// allocation so repeated calls don't re-scan from 1 every time.
    pub fn allocate(&mut self) -> u16 {
        let mut candidate = self.next_hint.max(1);
        while self.used.contains(&candidate) {
            candidate = candidate.wrapping_add(1).max(1);
        }
        self.used.insert(candidate);
        self.next_hint = candidate.wrapping_add(1).max(1);
        candidate
    }
}

/// In-memory view of the account's contact list, synchronised with the
/// server's transactional edit protocol.
#[derive(Debug, Default)]
pub struct SsiManager {
    items: HashMap<u16, Contact>,
    groups: HashMap<String, u16>,
    item_ids: IdAllocator,
    group_ids: IdAllocator,
    outgoing: VecDeque<PendingEdit>,
    in_transaction: bool,
}

impl SsiManager {
    /// Creates an empty manager.
    pub fn new() -> SsiManager {
        SsiManager::default()
    }

    /// All contact-list items currently known.
    pub fn items(&self) -> impl Iterator<Item = &Contact> {
        self.items.values()
    }

    /// Buddies only.
    pub fn buddies(&self) -> impl Iterator<Item = &Contact> {
        self.items.values().filter(|c| c.ty() == ContactType::Buddy)
    }

    /// Groups only.
    pub fn groups(&self) -> impl Iterator<Item = &Contact> {
        self.items.values().filter(|c| c.ty() == ContactType::Group)
    }

    /// Looks up a group's id by its display name.
    pub fn group_by_name(&self, name: &str) -> Option<u16> {
        self.groups.get(name).copied()
    }

    /// Parses the full contact-list reply (`(0x13,0x06)`), replacing
    /// this manager's view wholesale.
    pub fn handle_full_list(&mut self, snac: &SnacBuffer) -> Result<()> {
        let mut buf = Buffer::from(snac.payload());
        let _version = buf.get_byte()?;
        let count = buf.get_word()?;
        self.items.clear();
        self.groups.clear();
        self.item_ids = IdAllocator::new();
        self.group_ids = IdAllocator::new();

        for _ in 0..count {
            let contact = Contact::decode(&mut buf)?;
            self.index_new_item(contact);
        }
        if buf.bytes_available() >= 4 {
            let _last_change = buf.get_dword()?;
        }
        Ok(())
    }

    fn index_new_item(&mut self, contact: Contact) {
        match contact.ty() {
            ContactType::Group => {
                self.group_ids.mark_used(contact.item_id());
                if !contact.name().is_empty() {
                    self.groups.insert(contact.name().to_string(), contact.item_id());
                }
            }
            _ => {
                self.item_ids.mark_used(contact.item_id());
            }
        }
        self.items.insert(contact.item_id(), contact);
    }

    /// Handles a `(0x13,0x08)` add notification: one or more new items.
    pub fn handle_add(&mut self, snac: &SnacBuffer) -> Result<Vec<Contact>> {
        let mut buf = Buffer::from(snac.payload());
        let mut added = Vec::new();
        while buf.bytes_available() > 0 {
            let contact = Contact::decode(&mut buf)?;
            if contact.ty() == ContactType::Deleted {
                // Tombstone: the server still reports a recently deleted
                // item once. Drop it immediately rather than indexing it.
                continue;
            }
            self.index_new_item(contact.clone());
            added.push(contact);
        }
        Ok(added)
    }

    /// Handles a `(0x13,0x09)` update notification: upserts in place.
    pub fn handle_update(&mut self, snac: &SnacBuffer) -> Result<Vec<Contact>> {
        let mut buf = Buffer::from(snac.payload());
        let mut updated = Vec::new();
        while buf.bytes_available() > 0 {
            let contact = Contact::decode(&mut buf)?;
            self.index_new_item(contact.clone());
            updated.push(contact);
        }
        Ok(updated)
    }

    /// Handles a `(0x13,0x0A)` remove notification.
    pub fn handle_remove(&mut self, snac: &SnacBuffer) -> Result<Vec<Contact>> {
        let mut buf = Buffer::from(snac.payload());
        let mut removed = Vec::new();
        while buf.bytes_available() > 0 {
            let contact = Contact::decode(&mut buf)?;
            if let Some(existing) = self.items.remove(&contact.item_id()) {
                match existing.ty() {
                    ContactType::Group => self.group_ids.release(existing.item_id()),
                    _ => self.item_ids.release(existing.item_id()),
                }
                if existing.ty() == ContactType::Group {
                    self.groups.retain(|_, id| *id != existing.item_id());
                }
            }
            removed.push(contact);
        }
        Ok(removed)
    }

    /// Interprets a `(0x13,0x0E)` edit-acknowledgement SNAC against the
    /// oldest pending edit, dequeuing it.
    pub fn handle_edit_ack(&mut self, snac: &SnacBuffer) -> Result<Option<Contact>> {
        let mut buf = Buffer::from(snac.payload());
        let code = ModifyCode::from_u16(buf.get_word()?);
        let Some(pending) = self.outgoing.pop_front() else {
            return Ok(None);
        };
        match code {
            ModifyCode::Success => {
                if pending.is_add {
                    self.index_new_item(pending.contact.clone());
                }
                Ok(Some(pending.contact))
            }
            ModifyCode::AuthRequired => {
                let mut contact = pending.contact;
                contact.set_awaiting_auth(true);
                Ok(Some(contact))
            }
            other => {
                let code = match other {
                    ModifyCode::NotFound => 0x0002,
                    ModifyCode::AlreadyExists => 0x0003,
                    ModifyCode::Error => 0x000A,
                    ModifyCode::LimitExceeded => 0x000C,
                    ModifyCode::Other(c) => c,
                    _ => unreachable!(),
                };
                Err(Error::Ssi { code })
            }
        }
    }

    /// Builds the `(0x13,0x11)` begin-transaction SNAC.
    pub fn begin_transaction(&mut self) -> SnacBuffer {
        self.in_transaction = true;
        SnacBuffer::new(0x0013, 0x0011)
    }

    /// Builds the `(0x13,0x12)` end-transaction SNAC.
    pub fn finish_transaction(&mut self) -> SnacBuffer {
        self.in_transaction = false;
        SnacBuffer::new(0x0013, 0x0012)
    }

    /// Allocates a fresh item id for a new buddy/group/pseudo-item and
    /// queues it for the matching `(0x13,0x08)` add request, returning
    /// the fully formed contact for the caller to serialise and send.
    pub fn prepare_add(&mut self, name: impl Into<String>, group_id: u16, ty: ContactType) -> Contact {
        let id = if ty == ContactType::Group { self.group_ids.allocate() } else { self.item_ids.allocate() };
        let contact = Contact::new(name, group_id, id, ty);
        self.outgoing.push_back(PendingEdit { contact: contact.clone(), is_add: true });
        contact
    }

    /// Queues a contact for removal, to be serialised into a `(0x13,0x0A)`
    /// request by the caller.
    pub fn prepare_remove(&mut self, contact: Contact) {
        self.outgoing.push_back(PendingEdit { contact, is_add: false });
    }

    /// Builds the `(0x13,0x18)` authorization-request SNAC for `uin`.
    pub fn request_authorization(&self, uin: &str) -> SnacBuffer {
        let mut body = Buffer::new();
        body.add_byte(uin.len() as u8);
        body.add_data(uin.as_bytes());
        body.add_word(0);
        body.add_word(0);
        SnacBuffer::with_data(0x0013, 0x0018, body.into_bytes())
    }

    /// Builds the `(0x13,0x14)` grant-authorization SNAC for `uin`.
    pub fn grant_authorization(&self, uin: &str) -> SnacBuffer {
        let mut body = Buffer::new();
        body.add_byte(uin.len() as u8);
        body.add_data(uin.as_bytes());
        body.add_word(0);
        body.add_word(0);
        SnacBuffer::with_data(0x0013, 0x0014, body.into_bytes())
    }

    /// Builds the `(0x13,0x1A)` deny-authorization SNAC for `uin`.
    pub fn deny_authorization(&self, uin: &str) -> SnacBuffer {
        let mut body = Buffer::new();
        body.add_byte(uin.len() as u8);
        body.add_data(uin.as_bytes());
        body.add_byte(0);
        body.add_word(0);
        body.add_word(0);
        SnacBuffer::with_data(0x0013, 0x001A, body.into_bytes())
    }

    /// Number of edits still awaiting a server acknowledgement.
    pub fn pending_edits(&self) -> usize {
        self.outgoing.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_allocator_never_reuses_while_marked_used() {
        let mut alloc = IdAllocator::new();
        alloc.mark_used(1);
        alloc.mark_used(2);
        assert_eq!(alloc.allocate(), 3);
        assert_eq!(alloc.allocate(), 4);
    }

    #[test]
    fn id_allocator_reclaims_released_ids_eventually() {
        let mut alloc = IdAllocator::new();
        alloc.mark_used(1);
        let allocated = alloc.allocate();
        assert_eq!(allocated, 2);
        alloc.release(allocated);
        alloc.release(1);
        assert_eq!(alloc.allocate(), 1);
    }

    #[test]
    fn edit_ack_success_indexes_added_contact() {
        let mut mgr = SsiManager::new();
        let contact = mgr.prepare_add("12345", 1, ContactType::Buddy);
        let mut body = Buffer::new();
        body.add_word(0x0000);
        let snac = SnacBuffer::with_data(0x0013, 0x000E, body.into_bytes());
        let result = mgr.handle_edit_ack(&snac).unwrap().unwrap();
        assert_eq!(result.item_id(), contact.item_id());
        assert_eq!(mgr.items().count(), 1);
    }

    #[test]
    fn edit_ack_auth_required_sets_flag_without_indexing() {
        let mut mgr = SsiManager::new();
        mgr.prepare_add("12345", 1, ContactType::Buddy);
        let mut body = Buffer::new();
        body.add_word(0x000E);
        let snac = SnacBuffer::with_data(0x0013, 0x000E, body.into_bytes());
        let result = mgr.handle_edit_ack(&snac).unwrap().unwrap();
        assert!(result.awaiting_auth());
        assert_eq!(mgr.items().count(), 0);
    }

    #[test]
    fn edit_ack_other_code_is_an_error() {
        let mut mgr = SsiManager::new();
        mgr.prepare_add("12345", 1, ContactType::Buddy);
        let mut body = Buffer::new();
        body.add_word(0x000C);
        let snac = SnacBuffer::with_data(0x0013, 0x000E, body.into_bytes());
        assert!(matches!(mgr.handle_edit_ack(&snac), Err(Error::Ssi { code: 0x000C })));
    }

    #[test]
    fn remove_releases_id_for_reuse() {
        let mut mgr = SsiManager::new();
        let contact = mgr.prepare_add("12345", 1, ContactType::Buddy);
        let mut body = Buffer::new();
        body.add_word(0x0000);
        let ack = SnacBuffer::with_data(0x0013, 0x000E, body.into_bytes());
        mgr.handle_edit_ack(&ack).unwrap();

        let mut remove_body = Buffer::new();
        remove_body.add_data(&contact.encode());
        let remove_snac = SnacBuffer::with_data(0x0013, 0x000A, remove_body.into_bytes());
        mgr.handle_remove(&remove_snac).unwrap();
        assert_eq!(mgr.items().count(), 0);
    }
}
