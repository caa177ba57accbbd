//! Command dispatch: maps a user's command onto their guild's session and
//! applies the playback state machine.

use std::{sync::Arc, time::Duration};

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::{
    common::types::{ChannelId, GuildId, UserId},
    locator::UserLocator,
    node::{AudioClient, Resolution},
    protocol::{Track, TrackEndReason},
    session::{PlaybackState, Session, SessionHandle, SessionRegistry},
};

pub mod error;
pub mod status;

pub use error::CommandError;
pub use status::{CurrentTrack, PlayOutcome, StatusSnapshot};

type Locked = OwnedMutexGuard<Session>;

#[derive(Clone)]
pub struct Dispatcher {
    locator: UserLocator,
    registry: Arc<SessionRegistry>,
    audio: Arc<dyn AudioClient>,
    grace: Duration,
}

impl Dispatcher {
    pub fn new(
        locator: UserLocator,
        registry: Arc<SessionRegistry>,
        audio: Arc<dyn AudioClient>,
        grace: Duration,
    ) -> Self {
        Self {
            locator,
            registry,
            audio,
            grace,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Resolves `query` and queues the result in the user's voice guild,
    /// starting playback when the session is idle.
    pub async fn play(
        &self,
        user_id: UserId,
        query: &str,
        hint: Option<&GuildId>,
    ) -> Result<PlayOutcome, CommandError> {
        let location = self.locator.locate(user_id, hint)?;
        let query = query.trim();
        if query.is_empty() {
            return Err(CommandError::NoMatches);
        }

        let (title, tracks) = match self.audio.resolve(query).await.map_err(CommandError::external)? {
            Resolution::NoMatches => return Err(CommandError::NoMatches),
            Resolution::Track(track) => (track.label(), vec![track]),
            Resolution::Playlist { name, tracks } => {
                (format!("Playlist: {} ({} tracks)", name, tracks.len()), tracks)
            }
        };
        let guild_id = location.guild_id;
        let enqueued = tracks.len();

        let (handle, mut session, created) = self.live_session(&guild_id, location.channel_id).await;
        self.registry.cancel_timer(&guild_id);

        if !session.connected {
            if let Err(e) = self.audio.connect(&guild_id, session.voice_channel_id).await {
                warn!("Voice connect failed for guild {}: {}", guild_id, e);
                if session.is_drained() {
                    self.teardown(&guild_id, &handle, &mut session).await;
                }
                return Err(CommandError::external(e));
            }
            session.connected = true;
        }

        let mut tracks = tracks.into_iter();
        let started = match (session.state, tracks.next()) {
            (PlaybackState::Idle, Some(head)) => {
                if let Err(e) = self.audio.play(&guild_id, &head).await {
                    warn!("Failed to start {} in guild {}: {}", head.label(), guild_id, e);
                    if session.is_drained() {
                        self.schedule_destroy(&guild_id);
                    }
                    return Err(CommandError::external(e));
                }
                session.begin(head);
                true
            }
            (_, head) => {
                session.queue.extend(head);
                false
            }
        };
        session.queue.extend(tracks);

        info!(
            "Queued {} for user {} in guild {} (created={}, started={}, queue={})",
            title,
            user_id,
            guild_id,
            created,
            started,
            session.queue_len()
        );
        Ok(PlayOutcome {
            guild_id,
            title,
            enqueued,
            started,
        })
    }

    pub async fn pause(&self, user_id: UserId, hint: Option<&GuildId>) -> Result<(), CommandError> {
        let (guild_id, mut session) = self.active_session(user_id, hint).await?;
        match session.state {
            PlaybackState::Paused => Err(CommandError::AlreadyPaused),
            PlaybackState::Idle => Err(CommandError::NothingPlaying),
            PlaybackState::Playing => {
                self.audio
                    .set_paused(&guild_id, true)
                    .await
                    .map_err(CommandError::external)?;
                session.state = PlaybackState::Paused;
                debug!("Paused guild {}", guild_id);
                Ok(())
            }
        }
    }

    pub async fn resume(&self, user_id: UserId, hint: Option<&GuildId>) -> Result<(), CommandError> {
        let (guild_id, mut session) = self.active_session(user_id, hint).await?;
        if session.state != PlaybackState::Paused {
            return Err(CommandError::NotPaused);
        }

        self.audio
            .set_paused(&guild_id, false)
            .await
            .map_err(CommandError::external)?;
        session.state = PlaybackState::Playing;
        debug!("Resumed guild {}", guild_id);
        Ok(())
    }

    /// Moves to the next queued track, or to idle when nothing follows.
    /// Returns the label of the track now playing.
    pub async fn skip(&self, user_id: UserId, hint: Option<&GuildId>) -> Result<Option<String>, CommandError> {
        let (guild_id, mut session) = match self.active_session(user_id, hint).await {
            Err(CommandError::NoActiveSession) => return Err(CommandError::NothingPlaying),
            other => other?,
        };
        if session.state == PlaybackState::Idle {
            return Err(CommandError::NothingPlaying);
        }

        if let Some(next) = session.queue.pop_front() {
            if let Err(e) = self.audio.play(&guild_id, &next).await {
                session.queue.push_front(next);
                return Err(CommandError::external(e));
            }
            let label = next.label();
            session.begin(next);
            debug!("Skipped to {} in guild {}", label, guild_id);
            return Ok(Some(label));
        }

        self.audio.stop(&guild_id).await.map_err(CommandError::external)?;
        session.finish();
        self.schedule_destroy(&guild_id);
        debug!("Skipped last track in guild {}", guild_id);
        Ok(None)
    }

    /// Clears the queue and stops playback. The session is destroyed after
    /// the grace window unless a new play arrives first.
    pub async fn stop(&self, user_id: UserId, hint: Option<&GuildId>) -> Result<(), CommandError> {
        let (guild_id, mut session) = self.active_session(user_id, hint).await?;
        if session.current.is_some() {
            self.audio.stop(&guild_id).await.map_err(CommandError::external)?;
        }
        session.clear();
        self.schedule_destroy(&guild_id);
        info!(
            "Stopped guild {}, destroying in {:?} unless reused",
            guild_id, self.grace
        );
        Ok(())
    }

    pub async fn status(&self, user_id: UserId, hint: Option<&GuildId>) -> StatusSnapshot {
        let guild_id = match self
            .locator
            .locate_controller(user_id, hint, |g| self.registry.contains(g))
        {
            Ok(guild_id) => guild_id,
            Err(CommandError::NoActiveSession) => return StatusSnapshot::disconnected(None),
            Err(e) => return StatusSnapshot::disconnected(None).with_error(e.to_string()),
        };

        let directory = self.locator.directory();
        let guild_name = directory.guild_name(&guild_id);
        let Some(handle) = self.registry.get(&guild_id) else {
            return StatusSnapshot::disconnected(guild_name);
        };

        let session = handle.lock().await;
        if session.closed {
            return StatusSnapshot::disconnected(guild_name);
        }
        let channel = directory
            .channel_name(&guild_id, session.voice_channel_id)
            .unwrap_or_else(|| session.voice_channel_id.to_string());
        StatusSnapshot::from_session(&session, self.audio.position(&guild_id), guild_name, channel)
    }

    /// Track end reported by the node. Advances the queue, or tears the
    /// session down at once when nothing is left.
    pub async fn on_track_end(&self, guild_id: &GuildId, track: &Track, reason: TrackEndReason) {
        if !reason.may_start_next() {
            debug!("Track end in guild {} ({:?}), nothing to do", guild_id, reason);
            return;
        }
        let Some(handle) = self.registry.get(guild_id) else {
            return;
        };
        let mut session = handle.clone().lock_owned().await;
        if session.closed || !session.is_current(track) {
            debug!("Ignoring stale track end in guild {}", guild_id);
            return;
        }

        while let Some(next) = session.queue.pop_front() {
            match self.audio.play(guild_id, &next).await {
                Ok(()) => {
                    debug!("Advanced to {} in guild {}", next.label(), guild_id);
                    session.begin(next);
                    return;
                }
                Err(e) => warn!("Failed to start {} in guild {}: {}", next.label(), guild_id, e),
            }
        }

        info!("Queue ended in guild {}", guild_id);
        self.teardown(guild_id, &handle, &mut session).await;
    }

    /// Locks the guild's session, creating it if needed. A handle that was
    /// torn down while we waited for its lock is replaced by a fresh one.
    async fn live_session(
        &self,
        guild_id: &GuildId,
        channel_id: ChannelId,
    ) -> (SessionHandle, Locked, bool) {
        loop {
            let (handle, created) = self.registry.get_or_create(guild_id, channel_id);
            let session = handle.clone().lock_owned().await;
            if !session.closed {
                return (handle, session, created);
            }
        }
    }

    async fn active_session(
        &self,
        user_id: UserId,
        hint: Option<&GuildId>,
    ) -> Result<(GuildId, Locked), CommandError> {
        let guild_id = self
            .locator
            .locate_controller(user_id, hint, |g| self.registry.contains(g))?;
        let handle = self
            .registry
            .get(&guild_id)
            .ok_or(CommandError::NoActiveSession)?;
        let session = handle.lock_owned().await;
        if session.closed {
            return Err(CommandError::NoActiveSession);
        }
        Ok((guild_id, session))
    }

    fn schedule_destroy(&self, guild_id: &GuildId) {
        let (id, token) = self.registry.arm_timer(guild_id);
        let this = self.clone();
        let guild_id = guild_id.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(this.grace) => {}
            }
            this.registry.finish_timer(&guild_id, id);
            this.expire(&guild_id).await;
        });
    }

    /// Grace window elapsed: destroy only if the session is still drained.
    async fn expire(&self, guild_id: &GuildId) {
        let Some(handle) = self.registry.get(guild_id) else {
            return;
        };
        let mut session = handle.clone().lock_owned().await;
        if session.closed || !session.is_drained() {
            debug!("Guild {} was reused during the grace window", guild_id);
            return;
        }
        self.teardown(guild_id, &handle, &mut session).await;
    }

    /// Closes the session, destroys the player and drops the registry entry.
    /// Runs with the session lock held so waiters observe `closed`.
    async fn teardown(&self, guild_id: &GuildId, handle: &SessionHandle, session: &mut Session) {
        session.closed = true;
        session.clear();
        self.registry.cancel_timer(guild_id);

        if let Err(e) = self.audio.destroy(guild_id).await {
            warn!("Failed to destroy player for guild {}: {}", guild_id, e);
        }
        self.registry.remove_if_same(guild_id, handle);
        info!("Destroyed session for guild {}", guild_id);
    }
}
