use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    common::types::{ChannelId, GuildId, Shared},
    session::Session,
};

pub type SessionHandle = Shared<Session>;

/// Pending deferred-destroy timer for one guild.
struct DestroyTimer {
    id: u64,
    token: CancellationToken,
}

/// Owns every live session, at most one per guild.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<GuildId, SessionHandle>,
    timers: DashMap<GuildId, DestroyTimer>,
    next_timer_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, guild_id: &GuildId) -> Option<SessionHandle> {
        self.sessions.get(guild_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, guild_id: &GuildId) -> bool {
        self.sessions.contains_key(guild_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns the guild's session, creating an idle one if absent. The
    /// second value is true when this call created it.
    ///
    /// Insertion happens under the map's entry lock, so concurrent callers
    /// for the same guild always receive the same session.
    pub fn get_or_create(&self, guild_id: &GuildId, channel_id: ChannelId) -> (SessionHandle, bool) {
        match self.sessions.entry(guild_id.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let handle = Arc::new(Mutex::new(Session::new(guild_id.clone(), channel_id)));
                entry.insert(handle.clone());
                tracing::debug!("Created session for guild {}", guild_id);
                (handle, true)
            }
        }
    }

    pub fn remove(&self, guild_id: &GuildId) -> Option<SessionHandle> {
        self.sessions.remove(guild_id).map(|(_, handle)| handle)
    }

    /// Removes the guild's entry only if it is still `handle`.
    pub fn remove_if_same(&self, guild_id: &GuildId, handle: &SessionHandle) -> bool {
        self.sessions
            .remove_if(guild_id, |_, current| Arc::ptr_eq(current, handle))
            .is_some()
    }

    /// Starts a new destroy timer for the guild, cancelling any pending one.
    pub fn arm_timer(&self, guild_id: &GuildId) -> (u64, CancellationToken) {
        let id = self.next_timer_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self.timers.insert(
            guild_id.clone(),
            DestroyTimer {
                id,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        (id, token)
    }

    /// Cancels the guild's pending destroy timer, if any.
    pub fn cancel_timer(&self, guild_id: &GuildId) -> bool {
        match self.timers.remove(guild_id) {
            Some((_, timer)) => {
                timer.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Forgets a timer that fired, unless a newer one replaced it.
    pub fn finish_timer(&self, guild_id: &GuildId, id: u64) {
        self.timers.remove_if(guild_id, |_, timer| timer.id == id);
    }

    pub fn has_timer(&self, guild_id: &GuildId) -> bool {
        self.timers.contains_key(guild_id)
    }
}
