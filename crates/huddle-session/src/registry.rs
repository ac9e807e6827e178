//! Session registry: create, join, leave, and teardown.

use std::collections::HashMap;

use crate::{ConnectionId, Member, Session, SessionError};

/// Outcome of removing a connection from a session.
///
/// Removal is driven by disconnects, so "the session is already gone"
/// is an expected answer rather than an error: when a master disconnect
/// tears a session down, every evicted member's own cleanup still runs
/// and finds nothing left to leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The departing connection was the master. The session has been
    /// unregistered and every other member was asked to close.
    SessionTornDown {
        /// How many remaining members were force-closed.
        members_closed: usize,
    },
    /// A non-master member left; the session lives on.
    MemberRemoved,
    /// The connection was not in the session's member list.
    NotAMember,
    /// No session is registered under that name.
    SessionNotFound,
}

/// Process-wide mapping from session name to live session.
///
/// All methods are plain synchronous state transitions; the server
/// serializes access with a mutex so each call is one atomic critical
/// section. Application-level rejections (duplicate name, unknown name,
/// duplicate join) come back as [`SessionError`] and leave the registry
/// untouched — the connection that sent the bad request stays open.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session with `master` as creator and sole member.
    ///
    /// # Errors
    /// [`SessionError::NameTaken`] if a session by that name already
    /// exists; the existing session is untouched.
    pub fn create_session(
        &mut self,
        name: &str,
        master: Member,
    ) -> Result<(), SessionError> {
        if self.sessions.contains_key(name) {
            return Err(SessionError::NameTaken(name.to_string()));
        }

        let master_id = master.id();
        self.sessions.insert(name.to_string(), Session::new(master));
        tracing::info!(session = %name, master = %master_id, "session created");
        Ok(())
    }

    /// Appends `member` to an existing session.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if no session has that name.
    /// - [`SessionError::AlreadyMember`] if this connection is already
    ///   in the member list (idempotent: the list is unchanged).
    pub fn join_session(
        &mut self,
        name: &str,
        member: Member,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(name)
            .ok_or_else(|| SessionError::NotFound(name.to_string()))?;

        if session.contains(member.id()) {
            return Err(SessionError::AlreadyMember {
                member: member.id(),
                session: name.to_string(),
            });
        }

        let member_id = member.id();
        session.add_member(member);
        tracing::info!(
            session = %name,
            member = %member_id,
            members = session.member_count(),
            "member joined session"
        );
        Ok(())
    }

    /// Removes a connection from the named session.
    ///
    /// If the connection is the session's master this is a teardown:
    /// every other member is asked to close and the session is deleted.
    /// Otherwise only that one member is removed. Both the unknown-name
    /// and not-a-member cases are no-ops reported through [`Departure`].
    pub fn remove_member(
        &mut self,
        name: &str,
        id: ConnectionId,
    ) -> Departure {
        let Some(session) = self.sessions.get_mut(name) else {
            return Departure::SessionNotFound;
        };

        if session.is_master(id) {
            let session = self
                .sessions
                .remove(name)
                .expect("session was just looked up");
            let mut members_closed = 0;
            for member in session.members() {
                if member.id() != id {
                    member.request_close();
                    members_closed += 1;
                }
            }
            tracing::info!(
                session = %name,
                members_closed,
                sessions_remaining = self.sessions.len(),
                "master disconnected, session torn down"
            );
            return Departure::SessionTornDown { members_closed };
        }

        if session.remove_member(id) {
            tracing::info!(
                session = %name,
                member = %id,
                members = session.member_count(),
                "member removed from session"
            );
            Departure::MemberRemoved
        } else {
            Departure::NotAMember
        }
    }

    /// Returns the session registered under `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&Session> {
        self.sessions.get(name)
    }

    /// Number of currently registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
