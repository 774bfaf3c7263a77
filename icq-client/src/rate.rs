//! Server-enforced rate limiting: the server partitions SNAC families into
//! a handful of rate classes, each with its own token-bucket-like level and
//! a queue of deferred sends once a class is over its alert threshold.

use icq_wire::{Buffer, SnacBuffer};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Safety margin (ms) added on top of a class's alert level before this
/// client will risk sending into it.
const RATE_SAFETY_TIME: u32 = 50;

/// One rate-limited family/subtype pair, as advertised by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateGroupMember {
    /// SNAC family.
    pub family: u16,
    /// SNAC subtype.
    pub subtype: u16,
}

/// Parameters and live state for one server-defined rate class.
#[derive(Debug, Clone)]
pub struct RateClass {
    id: u16,
    window_size: u32,
    clear_level: u32,
    alert_level: u32,
    limit_level: u32,
    disconnect_level: u32,
    current_level: u32,
    max_level: u32,
    members: Vec<RateGroupMember>,
    last_send: Option<Instant>,
    queue: VecDeque<SnacBuffer>,
}

impl RateClass {
    /// Builds a rate class from the parameters the server sent in its
    /// `(0x01,0x07)` reply.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u16,
        window_size: u32,
        clear_level: u32,
        alert_level: u32,
        limit_level: u32,
        disconnect_level: u32,
        current_level: u32,
        max_level: u32,
    ) -> RateClass {
        RateClass {
            id,
            window_size: window_size.max(1),
            clear_level,
            alert_level,
            limit_level,
            disconnect_level,
            current_level,
            max_level,
            members: Vec::new(),
            last_send: None,
            queue: VecDeque::new(),
        }
    }

    /// This class's id, as referenced by family/subtype membership lists
    /// and by the server's rate-change notifications.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// The family/subtype pairs this class governs.
    pub fn members(&self) -> &[RateGroupMember] {
        &self.members
    }

    /// Registers a family/subtype pair under this class.
    pub fn add_member(&mut self, family: u16, subtype: u16) {
        self.members.push(RateGroupMember { family, subtype });
    }

    /// True if `family`/`subtype` is governed by this class.
    pub fn governs(&self, family: u16, subtype: u16) -> bool {
        self.members.iter().any(|m| m.family == family && m.subtype == subtype)
    }

    /// The class's current level estimate.
    pub fn current_level(&self) -> u32 {
        self.current_level
    }

    fn calc_new_level(&self, time_diff_ms: u32) -> u32 {
        ((self.window_size - 1) * self.current_level + time_diff_ms) / self.window_size
    }

    /// Folds in the passage of time since the last send, as the server's
    /// own rate-change notifications also do.
    pub fn update_rate_info(&mut self, now: Instant) {
        let elapsed = self
            .last_send
            .map(|last| now.saturating_duration_since(last).as_millis() as u32)
            .unwrap_or(self.window_size);
        self.current_level = self.calc_new_level(elapsed);
        self.last_send = Some(now);
    }

    /// Applies an updated parameter set from a `(0x01,0x0A)` rate change.
    pub fn apply_update(
        &mut self,
        window_size: u32,
        clear_level: u32,
        alert_level: u32,
        limit_level: u32,
        disconnect_level: u32,
        current_level: u32,
        max_level: u32,
    ) {
        self.window_size = window_size.max(1);
        self.clear_level = clear_level;
        self.alert_level = alert_level;
        self.limit_level = limit_level;
        self.disconnect_level = disconnect_level;
        self.current_level = current_level;
        self.max_level = max_level;
    }

    /// Whether a SNAC in this class can go out immediately right now,
    /// given `now`'s estimated new level.
    pub fn can_send_now(&self, now: Instant) -> bool {
        let elapsed = self
            .last_send
            .map(|last| now.saturating_duration_since(last).as_millis() as u32)
            .unwrap_or(self.window_size);
        let projected = self.calc_new_level(elapsed);
        projected >= self.alert_level + RATE_SAFETY_TIME && projected >= self.disconnect_level
    }

    /// How long to wait before a send in this class is expected to clear
    /// the alert threshold, given the current level.
    ///
    /// This is the one place the original implementation had a stray
    /// `exit(1)` sitting right before the wait-time computation — clearly a
    /// leftover debugging trap, since terminating the whole process on a
    /// rate limit would defeat the entire point of having one. This client
    /// keeps the same formula but enqueues and waits instead of aborting.
    pub fn time_to_next_send(&self) -> Duration {
        let max_level = self.alert_level + RATE_SAFETY_TIME;
        let wait_ms = (self.window_size * max_level)
            .saturating_sub((self.window_size - 1) * self.current_level);
        Duration::from_millis(wait_ms as u64)
    }

    /// Queues a SNAC for later delivery once this class clears.
    pub fn enqueue(&mut self, snac: SnacBuffer) {
        self.queue.push_back(snac);
    }

    /// Pops the next queued SNAC, if any are waiting.
    pub fn dequeue(&mut self) -> Option<SnacBuffer> {
        self.queue.pop_front()
    }

    /// Number of SNACs currently queued for this class.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Unused clear/limit levels, kept for completeness with the server's
    /// parameter set even though this client does not act on them directly.
    pub fn clear_level_value(&self) -> u32 {
        self.clear_level
    }

    /// The class's configured limit level.
    pub fn limit_level_value(&self) -> u32 {
        self.limit_level
    }

    /// The class's configured max level.
    pub fn max_level_value(&self) -> u32 {
        self.max_level
    }
}

/// Tracks all of the account's rate classes and routes outbound SNACs
/// through the right one, queuing when a class is over its alert level.
#[derive(Debug, Default)]
pub struct RateManager {
    classes: Vec<RateClass>,
}

impl RateManager {
    /// Creates an empty rate manager; classes are populated from the
    /// `(0x01,0x07)` reply via [`RateManager::handle_server_rates`].
    pub fn new() -> RateManager {
        RateManager::default()
    }

    /// Parses a `(0x01,0x07)` rate-parameters reply and replaces the
    /// manager's class list wholesale.
    pub fn handle_server_rates(&mut self, snac: &SnacBuffer) -> icq_wire::Result<()> {
        let mut buf = Buffer::from(snac.payload());
        let num_classes = buf.get_word()?;
        let mut classes = Vec::with_capacity(num_classes as usize);
        for _ in 0..num_classes {
            let id = buf.get_word()?;
            let window_size = buf.get_dword()?;
            let clear_level = buf.get_dword()?;
            let alert_level = buf.get_dword()?;
            let limit_level = buf.get_dword()?;
            let disconnect_level = buf.get_dword()?;
            let current_level = buf.get_dword()?;
            let max_level = buf.get_dword()?;
            buf.seek_forward(4); // last time, unused by this client
            buf.seek_forward(1); // current state, unused by this client
            classes.push(RateClass::new(
                id,
                window_size,
                clear_level,
                alert_level,
                limit_level,
                disconnect_level,
                current_level,
                max_level,
            ));
        }
        for _ in 0..num_classes {
            let class_id = buf.get_word()?;
            let num_members = buf.get_word()?;
            let mut members = Vec::with_capacity(num_members as usize);
            for _ in 0..num_members {
                let family = buf.get_word()?;
                let subtype = buf.get_word()?;
                members.push((family, subtype));
            }
            if let Some(class) = classes.iter_mut().find(|c| c.id() == class_id) {
                for (family, subtype) in members {
                    class.add_member(family, subtype);
                }
            }
        }
        self.classes = classes;
        Ok(())
    }

    /// Parses a `(0x01,0x0A)` rate-change notification and folds it into
    /// the matching class.
    pub fn handle_rate_change(&mut self, snac: &SnacBuffer) -> icq_wire::Result<()> {
        let mut buf = Buffer::from(snac.payload());
        let _msg_code = buf.get_word()?;
        let class_id = buf.get_word()?;
        let window_size = buf.get_dword()?;
        let clear_level = buf.get_dword()?;
        let alert_level = buf.get_dword()?;
        let limit_level = buf.get_dword()?;
        let disconnect_level = buf.get_dword()?;
        let current_level = buf.get_dword()?;
        let max_level = buf.get_dword()?;
        if let Some(class) = self.classes.iter_mut().find(|c| c.id() == class_id) {
            class.apply_update(
                window_size,
                clear_level,
                alert_level,
                limit_level,
                disconnect_level,
                current_level,
                max_level,
            );
        }
        Ok(())
    }

    /// Finds the class governing `family`/`subtype`, if the server told us
    /// about one.
    pub fn find_class(&mut self, family: u16, subtype: u16) -> Option<&mut RateClass> {
        self.classes.iter_mut().find(|c| c.governs(family, subtype))
    }

    /// Finds a class by its own id, e.g. to drain its queue once its timer
    /// fires.
    pub fn find_class_by_id(&mut self, id: u16) -> Option<&mut RateClass> {
        self.classes.iter_mut().find(|c| c.id() == id)
    }

    /// Decides whether to send `snac` immediately or queue it, updating
    /// the owning class's level either way. Returns `Some(snac)` if it
    /// should be sent right now.
    pub fn dispatch(&mut self, snac: SnacBuffer, now: Instant) -> Option<SnacBuffer> {
        let family = snac.family();
        let subtype = snac.subtype();
        let Some(class) = self.find_class(family, subtype) else {
            return Some(snac);
        };
        if class.can_send_now(now) {
            class.update_rate_info(now);
            Some(snac)
        } else {
            class.enqueue(snac);
            None
        }
    }

    /// All classes, for building an ack listing their ids.
    pub fn classes(&self) -> &[RateClass] {
        &self.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calc_new_level_matches_formula() {
        let class = RateClass::new(1, 20, 2000, 2300, 2400, 2450, 4000, 6000);
        assert_eq!(class.calc_new_level(100), (19 * 4000 + 100) / 20);
    }

    #[test]
    fn can_send_now_respects_safety_margin() {
        let mut class = RateClass::new(1, 10, 2000, 2300, 2400, 2450, 6000, 6000);
        class.update_rate_info(Instant::now());
        assert!(class.can_send_now(Instant::now()));
    }

    #[test]
    fn queue_is_fifo() {
        let mut class = RateClass::new(1, 20, 2000, 2300, 2400, 2450, 0, 6000);
        class.enqueue(SnacBuffer::new(0x0004, 0x0006));
        class.enqueue(SnacBuffer::new(0x0004, 0x0007));
        assert_eq!(class.dequeue().unwrap().subtype(), 0x0006);
        assert_eq!(class.dequeue().unwrap().subtype(), 0x0007);
        assert!(class.dequeue().is_none());
    }

    #[test]
    fn dispatch_routes_unknown_family_through_immediately() {
        let mut mgr = RateManager::new();
        let snac = SnacBuffer::new(0x0004, 0x0006);
        assert!(mgr.dispatch(snac, Instant::now()).is_some());
    }
}
