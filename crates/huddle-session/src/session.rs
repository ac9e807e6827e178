//! A single named session: its master and its member list.

use crate::{ConnectionId, Member};

/// One named collaboration session.
///
/// The member list is ordered by join time, master first, but the order
/// carries no delivery meaning — removal may swap-remove. Identity is
/// the member's [`ConnectionId`].
///
/// Invariants, maintained by [`SessionRegistry`](crate::SessionRegistry):
/// - the master is always in the member list until teardown;
/// - a session exists in the registry exactly as long as its master's
///   connection is live.
#[derive(Debug)]
pub struct Session {
    master: ConnectionId,
    members: Vec<Member>,
}

impl Session {
    /// Creates a session whose master is also its sole initial member.
    /// The session's name lives in the registry key, not here.
    pub(crate) fn new(master: Member) -> Self {
        Self {
            master: master.id(),
            members: vec![master],
        }
    }

    /// The connection that created this session.
    pub fn master(&self) -> ConnectionId {
        self.master
    }

    /// Whether `id` is this session's master.
    pub fn is_master(&self, id: ConnectionId) -> bool {
        self.master == id
    }

    /// Whether `id` is currently a member.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.iter().any(|m| m.id() == id)
    }

    /// Number of current members, master included.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Clones the handles of every member except `excluded`.
    ///
    /// This is the broadcaster's view: fan-out goes to everyone but the
    /// sender, and the clones let delivery happen after the registry
    /// lock is released.
    pub fn recipients_except(&self, excluded: ConnectionId) -> Vec<Member> {
        self.members
            .iter()
            .filter(|m| m.id() != excluded)
            .cloned()
            .collect()
    }

    pub(crate) fn members(&self) -> &[Member] {
        &self.members
    }

    pub(crate) fn add_member(&mut self, member: Member) {
        self.members.push(member);
    }

    /// Removes `id` from the member list. Returns `false` if it was not
    /// a member. Order is not preserved.
    pub(crate) fn remove_member(&mut self, id: ConnectionId) -> bool {
        match self.members.iter().position(|m| m.id() == id) {
            Some(index) => {
                self.members.swap_remove(index);
                true
            }
            None => false,
        }
    }
}
