use thiserror::Error;

/// User-facing command failures. None of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("User not found in any guild. Make sure the bot is in the same server as you.")]
    UserNotFound,
    #[error("You must be in a voice channel to play music.")]
    NotInVoice,
    #[error("You are active in {0} servers; pass a guildId to choose one.")]
    AmbiguousGuild(usize),
    #[error("No tracks found for your search query.")]
    NoMatches,
    #[error("No active music player found")]
    NoActiveSession,
    #[error("Music is already paused")]
    AlreadyPaused,
    #[error("Music is not paused")]
    NotPaused,
    #[error("No music is currently playing")]
    NothingPlaying,
    #[error("Missing userId or botId")]
    MissingCredentials,
    /// Failure reported by the audio node or gateway, message kept verbatim.
    #[error("{0}")]
    External(String),
}

impl CommandError {
    pub fn external(err: impl std::fmt::Display) -> Self {
        Self::External(err.to_string())
    }
}
