//! Buddy presence tracking and user-details lookups delivered over the
//! meta-info channel: short details (nick/name/email), and the richer
//! multi-chunk profile (basic/more/email/work/notes) assembled one
//! `(0x07DA)` chunk at a time.

use crate::error::Result;
use crate::meta_info::{MetaInfoManager, MetaInfoType};
use icq_wire::{Buffer, SnacBuffer};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// A buddy's online status, as reported in the presence TLVs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnlineStatus {
    /// Not on the buddy list's online roster at all.
    #[default]
    Offline,
    /// Visible and reachable.
    Online,
    /// Marked away.
    Away,
    /// Do not disturb.
    DoNotDisturb,
    /// Not available.
    NotAvailable,
    /// Occupied.
    Occupied,
    /// Free for chat.
    FreeForChat,
    /// Invisible to this account.
    Invisible,
}

impl OnlineStatus {
    fn from_word(code: u16) -> OnlineStatus {
        match code & 0x00FF {
            0x0000 => OnlineStatus::Online,
            0x0001 => OnlineStatus::Away,
            0x0002 => OnlineStatus::DoNotDisturb,
            0x0003 => OnlineStatus::NotAvailable,
            0x0010 => OnlineStatus::Occupied,
            0x0020 => OnlineStatus::FreeForChat,
            0x0100 => OnlineStatus::Invisible,
            _ => OnlineStatus::Online,
        }
    }
}

/// Signals which cache a completed meta-info request landed in, so a
/// caller can tell a short-details answer from a full-details one without
/// re-querying both caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailsReady {
    /// `short_details(uin)` now has an answer.
    Short(String),
    /// `full_details(uin)` now has an answer.
    Full(String),
}

/// The shallow details the short-info meta-info lookup returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortUserDetails {
    /// Nickname.
    pub nick: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address.
    pub email: String,
}

/// The fuller profile assembled across several meta-info chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDetails {
    /// Nickname.
    pub nick: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Primary email, as reported by the basic-info chunk.
    pub email: String,
    /// Every email on file, including any marked private.
    pub emails: Vec<String>,
    /// Home city.
    pub home_city: String,
    /// Home state/province.
    pub home_state: String,
    /// Home phone.
    pub home_phone: String,
    /// Home fax.
    pub home_fax: String,
    /// Home street address.
    pub home_address: String,
    /// Home postal code.
    pub home_zip: String,
    /// Cell phone.
    pub cell_phone: String,
    /// Age in years, if reported.
    pub age: Option<u16>,
    /// Homepage URL.
    pub homepage: String,
    /// Birth date, if reported (year, month, day).
    pub birth_date: Option<(u16, u8, u8)>,
    /// City of origin.
    pub original_city: String,
    /// State/province of origin.
    pub original_state: String,
    /// Work city.
    pub work_city: String,
    /// Work state/province.
    pub work_state: String,
    /// Work phone.
    pub work_phone: String,
    /// Work fax.
    pub work_fax: String,
    /// Work street address.
    pub work_address: String,
    /// Work postal code.
    pub work_zip: String,
    /// Employer name.
    pub work_company: String,
    /// Department within the employer.
    pub work_department: String,
    /// Job title.
    pub work_position: String,
    /// Employer's webpage.
    pub work_webpage: String,
    /// Free-text "about me" notes.
    pub notes: String,
}

/// Meta-info chunk subtypes a full-details lookup assembles, in the order
/// they may arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DetailChunk {
    /// `0x00C8`: basic info.
    Basic,
    /// `0x00DC`: more info.
    More,
    /// `0x00EB`: email addresses.
    Email,
    /// `0x00D2`: work info.
    Work,
    /// `0x00E6`: notes.
    Notes,
}

impl DetailChunk {
    fn from_subtype(subtype: u16) -> Option<DetailChunk> {
        match subtype {
            0x00C8 => Some(DetailChunk::Basic),
            0x00DC => Some(DetailChunk::More),
            0x00EB => Some(DetailChunk::Email),
            0x00D2 => Some(DetailChunk::Work),
            0x00E6 => Some(DetailChunk::Notes),
            _ => None,
        }
    }
}

/// Presence and profile cache, driven by SNAC family 0x01/0x03 presence
/// notifications and family 0x15 meta-info lookups.
#[derive(Debug, Default)]
pub struct UserInfoManager {
    status: HashMap<String, OnlineStatus>,
    short_details: HashMap<String, ShortUserDetails>,
    full_details: HashMap<String, UserDetails>,
    present_fields: HashMap<String, BTreeSet<DetailChunk>>,
    pending_details: UserDetails,
    pending_fields: BTreeSet<DetailChunk>,
    uin_requests: VecDeque<String>,
}

impl UserInfoManager {
    /// Creates an empty manager.
    pub fn new() -> UserInfoManager {
        UserInfoManager::default()
    }

    /// The last known online status for `uin`, defaulting to offline.
    pub fn status(&self, uin: &str) -> OnlineStatus {
        self.status.get(uin).copied().unwrap_or_default()
    }

    /// Cached short details for `uin`, if already fetched.
    pub fn short_details(&self, uin: &str) -> Option<&ShortUserDetails> {
        self.short_details.get(uin)
    }

    /// Cached full details for `uin`, if already fetched.
    pub fn full_details(&self, uin: &str) -> Option<&UserDetails> {
        self.full_details.get(uin)
    }

    /// Which chunks of `uin`'s full details actually arrived from the
    /// server, so a caller can tell a field that's genuinely unset from one
    /// the server never reported at all.
    pub fn present_fields(&self, uin: &str) -> Option<&BTreeSet<DetailChunk>> {
        self.present_fields.get(uin)
    }

    /// Drops cached short details so the next request re-fetches them.
    pub fn clear_short_details(&mut self, uin: &str) {
        self.short_details.remove(uin);
    }

    /// Drops cached full details so the next request re-fetches them.
    pub fn clear_full_details(&mut self, uin: &str) {
        self.full_details.remove(uin);
    }

    /// Parses a `(0x03,0x0B)` user-online or `(0x03,0x0C)` user-offline
    /// notification, updating the cached status for every UIN it reports.
    pub fn handle_presence_snac(&mut self, snac: &SnacBuffer) -> Result<Vec<(String, Option<OnlineStatus>)>> {
        let mut buf = Buffer::from(snac.payload());
        let online = snac.subtype() == 0x000B;
        let mut changes = Vec::new();
        while buf.bytes_available() > 8 {
            let uin_len = buf.get_byte()? as usize;
            let uin = String::from_utf8_lossy(&buf.get_block(uin_len)?).into_owned();
            let warning = buf.get_word()?;
            let _ = warning;
            let num_tlvs = buf.get_word()?;
            let mut status = None;
            for _ in 0..num_tlvs {
                let ty = buf.get_word()?;
                let len = buf.get_word()? as usize;
                let payload = buf.get_block(len)?;
                if ty == 0x0006 && payload.len() >= 2 {
                    let code = u16::from_be_bytes([payload[0], payload[1]]);
                    status = Some(OnlineStatus::from_word(code));
                }
            }
            let reported = if online { status.or(Some(OnlineStatus::Online)) } else { None };
            match reported {
                Some(s) => {
                    self.status.insert(uin.clone(), s);
                }
                None => {
                    self.status.insert(uin.clone(), OnlineStatus::Offline);
                }
            }
            changes.push((uin, reported));
        }
        Ok(changes)
    }

    /// Queues a short-details request and returns the SNAC to send, unless
    /// a cached answer already exists.
    pub fn request_short_details(&mut self, meta: &mut MetaInfoManager, uin: &str) -> Option<SnacBuffer> {
        if self.short_details.contains_key(uin) {
            return None;
        }
        self.uin_requests.push_back(uin.to_string());
        Some(meta.request_short_user_info(uin))
    }

    /// Queues a full-details request and returns the SNAC to send, unless
    /// a cached answer already exists.
    pub fn request_full_details(&mut self, meta: &mut MetaInfoManager, uin: &str) -> Option<SnacBuffer> {
        if self.full_details.contains_key(uin) {
            return None;
        }
        self.uin_requests.push_back(uin.to_string());
        let mut body = Buffer::new();
        body.add_le_word(0x04D0);
        body.add_le_dword(uin.parse::<u32>().unwrap_or(0));
        Some(meta.build_request(MetaInfoType::Other(0x04D0), &body.into_bytes()))
    }

    /// Dispatches a meta-info reply's inner chunk (type `0x07DA`) to the
    /// right field parser, completing a pending details request when the
    /// terminal affiliations chunk (`0x00FA`) arrives.
    pub fn handle_meta_info(&mut self, ty: MetaInfoType, mut data: Buffer) -> Result<Option<DetailsReady>> {
        if !matches!(ty, MetaInfoType::Other(0x07DA)) {
            return Ok(None);
        }
        let subtype = data.get_le_word()?;
        let success = data.get_byte()?;
        if success != 0x0A {
            return Ok(None);
        }
        if let Some(chunk) = DetailChunk::from_subtype(subtype) {
            self.pending_fields.insert(chunk);
        }
        match subtype {
            0x0104 => Ok(self.process_short_user_info(&mut data)?.map(DetailsReady::Short)),
            0x00C8 => {
                self.process_basic_info(&mut data)?;
                Ok(None)
            }
            0x00DC => {
                self.process_more_info(&mut data)?;
                Ok(None)
            }
            0x00EB => {
                self.process_email_info(&mut data)?;
                Ok(None)
            }
            0x00D2 => {
                self.process_work_info(&mut data)?;
                Ok(None)
            }
            0x00E6 => {
                self.process_notes_info(&mut data)?;
                Ok(None)
            }
            0x00FA => Ok(self.finish_full_details().map(DetailsReady::Full)),
            other => {
                log::debug!("unhandled meta-info subtype {other:#06x}");
                Ok(None)
            }
        }
    }

    fn read_le_string(buf: &mut Buffer) -> Result<String> {
        let len = buf.get_le_word()? as usize;
        let len = len.saturating_sub(1);
        let bytes = buf.get_block(len)?;
        buf.seek_forward(1); // null terminator
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn process_short_user_info(&mut self, buf: &mut Buffer) -> Result<Option<String>> {
        let nick = Self::read_le_string(buf)?;
        let first_name = Self::read_le_string(buf)?;
        let last_name = Self::read_le_string(buf)?;
        let email = Self::read_le_string(buf)?;
        let Some(uin) = self.uin_requests.pop_front() else {
            log::debug!("short user-info reply with no pending request");
            return Ok(None);
        };
        self.short_details.insert(uin.clone(), ShortUserDetails { nick, first_name, last_name, email });
        Ok(Some(uin))
    }

    fn process_basic_info(&mut self, buf: &mut Buffer) -> Result<()> {
        self.pending_details.nick = Self::read_le_string(buf)?;
        self.pending_details.first_name = Self::read_le_string(buf)?;
        self.pending_details.last_name = Self::read_le_string(buf)?;
        self.pending_details.email = Self::read_le_string(buf)?;
        self.pending_details.home_city = Self::read_le_string(buf)?;
        self.pending_details.home_state = Self::read_le_string(buf)?;
        self.pending_details.home_phone = Self::read_le_string(buf)?;
        self.pending_details.home_fax = Self::read_le_string(buf)?;
        self.pending_details.home_address = Self::read_le_string(buf)?;
        self.pending_details.cell_phone = Self::read_le_string(buf)?;
        self.pending_details.home_zip = Self::read_le_string(buf)?;
        Ok(())
    }

    fn process_more_info(&mut self, buf: &mut Buffer) -> Result<()> {
        self.pending_details.age = Some(buf.get_word()?);
        let _gender = buf.get_byte()?;
        self.pending_details.homepage = Self::read_le_string(buf)?;
        let year = buf.get_le_word()?;
        let month = buf.get_byte()?;
        let day = buf.get_byte()?;
        self.pending_details.birth_date = Some((year, month, day));
        buf.seek_forward(3); // three language codes, not tracked
        buf.seek_forward(2); // unknown
        self.pending_details.original_city = Self::read_le_string(buf)?;
        self.pending_details.original_state = Self::read_le_string(buf)?;
        Ok(())
    }

    fn process_email_info(&mut self, buf: &mut Buffer) -> Result<()> {
        let count = buf.get_byte()?;
        for _ in 0..count {
            buf.seek_forward(1); // is-private flag, not tracked
            let email = Self::read_le_string(buf)?;
            self.pending_details.emails.push(email);
        }
        Ok(())
    }

    fn process_work_info(&mut self, buf: &mut Buffer) -> Result<()> {
        self.pending_details.work_city = Self::read_le_string(buf)?;
        self.pending_details.work_state = Self::read_le_string(buf)?;
        self.pending_details.work_phone = Self::read_le_string(buf)?;
        self.pending_details.work_fax = Self::read_le_string(buf)?;
        self.pending_details.work_address = Self::read_le_string(buf)?;
        self.pending_details.work_zip = Self::read_le_string(buf)?;
        buf.seek_forward(2); // country code, not tracked
        self.pending_details.work_company = Self::read_le_string(buf)?;
        self.pending_details.work_department = Self::read_le_string(buf)?;
        self.pending_details.work_position = Self::read_le_string(buf)?;
        buf.seek_forward(2); // occupation code, not tracked
        self.pending_details.work_webpage = Self::read_le_string(buf)?;
        Ok(())
    }

    fn process_notes_info(&mut self, buf: &mut Buffer) -> Result<()> {
        self.pending_details.notes = Self::read_le_string(buf)?;
        Ok(())
    }

    fn finish_full_details(&mut self) -> Option<String> {
        let fields = std::mem::take(&mut self.pending_fields);
        let Some(uin) = self.uin_requests.pop_front() else {
            log::debug!("user-details reply with no pending request");
            self.pending_details = UserDetails::default();
            return None;
        };
        let details = std::mem::take(&mut self.pending_details);
        self.full_details.insert(uin.clone(), details);
        self.present_fields.insert(uin.clone(), fields);
        Some(uin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_string(buf: &mut Buffer, s: &str) {
        buf.add_le_word((s.len() + 1) as u16);
        buf.add_data(s.as_bytes());
        buf.add_byte(0);
    }

    #[test]
    fn short_user_info_completes_pending_request() {
        let mut mgr = UserInfoManager::new();
        mgr.uin_requests.push_back("12345".to_string());
        let mut buf = Buffer::new();
        le_string(&mut buf, "nickname");
        le_string(&mut buf, "First");
        le_string(&mut buf, "Last");
        le_string(&mut buf, "user@example.com");
        let mut reader = Buffer::from(buf.data());
        mgr.process_short_user_info(&mut reader).unwrap();
        let details = mgr.short_details("12345").unwrap();
        assert_eq!(details.nick, "nickname");
        assert_eq!(details.email, "user@example.com");
    }

    #[test]
    fn presence_notification_updates_status() {
        let mut mgr = UserInfoManager::new();
        let mut body = Buffer::new();
        let uin = b"12345";
        body.add_byte(uin.len() as u8);
        body.add_data(uin);
        body.add_word(0); // warning level
        body.add_word(1); // one TLV
        body.add_word(0x0006); // status TLV
        body.add_word(2);
        body.add_word(0x0001); // away
        let snac = SnacBuffer::with_data(0x0003, 0x000B, body.into_bytes());
        mgr.handle_presence_snac(&snac).unwrap();
        assert_eq!(mgr.status("12345"), OnlineStatus::Away);
    }

    #[test]
    fn full_details_assemble_across_chunks() {
        let mut mgr = UserInfoManager::new();
        mgr.uin_requests.push_back("999".to_string());
        let mut buf = Buffer::new();
        le_string(&mut buf, "nick");
        le_string(&mut buf, "first");
        le_string(&mut buf, "last");
        le_string(&mut buf, "e@mail");
        le_string(&mut buf, "city");
        le_string(&mut buf, "state");
        le_string(&mut buf, "phone");
        le_string(&mut buf, "fax");
        le_string(&mut buf, "address");
        le_string(&mut buf, "cell");
        le_string(&mut buf, "zip");
        let mut reader = Buffer::from(buf.data());
        mgr.process_basic_info(&mut reader).unwrap();
        let finished = mgr.finish_full_details();
        assert_eq!(finished.as_deref(), Some("999"));
        let details = mgr.full_details("999").unwrap();
        assert_eq!(details.nick, "nick");
        assert_eq!(details.home_city, "city");
    }
}
