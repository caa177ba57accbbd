use std::sync::Arc;

use crate::{
    common::types::{ChannelId, GuildId, UserId},
    dispatch::CommandError,
};

/// What the directory knows about one member of one guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemberState {
    pub voice_channel: Option<ChannelId>,
}

/// Read side of the chat-platform membership and voice-state cache.
pub trait GuildDirectory: Send + Sync {
    fn guild_ids(&self) -> Vec<GuildId>;
    fn member(&self, guild_id: &GuildId, user_id: UserId) -> Option<MemberState>;
    fn guild_name(&self, guild_id: &GuildId) -> Option<String>;
    fn channel_name(&self, guild_id: &GuildId, channel_id: ChannelId) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceLocation {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
}

/// Finds the guild a user is issuing commands for.
#[derive(Clone)]
pub struct UserLocator {
    directory: Arc<dyn GuildDirectory>,
}

impl UserLocator {
    pub fn new(directory: Arc<dyn GuildDirectory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Arc<dyn GuildDirectory> {
        &self.directory
    }

    fn candidates(&self, hint: Option<&GuildId>) -> Vec<GuildId> {
        match hint {
            Some(guild_id) => vec![guild_id.clone()],
            None => self.directory.guild_ids(),
        }
    }

    /// The single guild where the user is a member and sits in a voice
    /// channel. Presence in several such guilds is reported, not resolved.
    pub fn locate(&self, user_id: UserId, hint: Option<&GuildId>) -> Result<VoiceLocation, CommandError> {
        let mut is_member = false;
        let mut matches = Vec::new();

        for guild_id in self.candidates(hint) {
            let Some(member) = self.directory.member(&guild_id, user_id) else {
                continue;
            };
            is_member = true;
            if let Some(channel_id) = member.voice_channel {
                matches.push(VoiceLocation {
                    guild_id,
                    channel_id,
                });
            }
        }

        match matches.len() {
            0 if !is_member => Err(CommandError::UserNotFound),
            0 => Err(CommandError::NotInVoice),
            1 => Ok(matches.remove(0)),
            n => Err(CommandError::AmbiguousGuild(n)),
        }
    }

    /// Guild targeted by a control command. Voice presence decides first;
    /// a user outside voice still reaches the one guild where both they are
    /// a member and a session is active.
    pub fn locate_controller(
        &self,
        user_id: UserId,
        hint: Option<&GuildId>,
        has_session: impl Fn(&GuildId) -> bool,
    ) -> Result<GuildId, CommandError> {
        match self.locate(user_id, hint) {
            Ok(location) => Ok(location.guild_id),
            Err(CommandError::NotInVoice) => {
                let mut active: Vec<GuildId> = self
                    .candidates(hint)
                    .into_iter()
                    .filter(|guild_id| self.directory.member(guild_id, user_id).is_some())
                    .filter(|guild_id| has_session(guild_id))
                    .collect();

                match active.len() {
                    0 => Err(CommandError::NoActiveSession),
                    1 => Ok(active.remove(0)),
                    n => Err(CommandError::AmbiguousGuild(n)),
                }
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemberCache;

    const USER: UserId = UserId(42);

    fn locator(cache: MemberCache) -> UserLocator {
        UserLocator::new(Arc::new(cache))
    }

    #[test]
    fn test_not_a_member_anywhere() {
        let cache = MemberCache::new();
        cache.upsert_guild(GuildId::from("g1"), "Guild One");
        cache.upsert_member(&GuildId::from("g1"), UserId(7), None);

        assert_eq!(locator(cache).locate(USER, None), Err(CommandError::UserNotFound));
    }

    #[test]
    fn test_member_but_not_in_voice() {
        let cache = MemberCache::new();
        cache.upsert_guild(GuildId::from("g1"), "Guild One");
        cache.upsert_member(&GuildId::from("g1"), USER, None);

        assert_eq!(locator(cache).locate(USER, None), Err(CommandError::NotInVoice));
    }

    #[test]
    fn test_single_voice_match() {
        let cache = MemberCache::new();
        cache.upsert_guild(GuildId::from("g1"), "Guild One");
        cache.upsert_guild(GuildId::from("g2"), "Guild Two");
        cache.upsert_member(&GuildId::from("g1"), USER, None);
        cache.upsert_member(&GuildId::from("g2"), USER, Some(ChannelId(99)));

        assert_eq!(
            locator(cache).locate(USER, None),
            Ok(VoiceLocation {
                guild_id: GuildId::from("g2"),
                channel_id: ChannelId(99),
            })
        );
    }

    #[test]
    fn test_voice_in_two_guilds_is_ambiguous() {
        let cache = MemberCache::new();
        for (guild, channel) in [("g1", 1), ("g2", 2)] {
            cache.upsert_guild(GuildId::from(guild), guild);
            cache.upsert_member(&GuildId::from(guild), USER, Some(ChannelId(channel)));
        }
        let locator = locator(cache);

        assert_eq!(locator.locate(USER, None), Err(CommandError::AmbiguousGuild(2)));
        assert_eq!(
            locator.locate(USER, Some(&GuildId::from("g1"))).map(|l| l.channel_id),
            Ok(ChannelId(1))
        );
    }

    #[test]
    fn test_hint_for_unknown_guild() {
        let cache = MemberCache::new();
        cache.upsert_guild(GuildId::from("g1"), "Guild One");
        cache.upsert_member(&GuildId::from("g1"), USER, Some(ChannelId(1)));

        assert_eq!(
            locator(cache).locate(USER, Some(&GuildId::from("nope"))),
            Err(CommandError::UserNotFound)
        );
    }

    #[test]
    fn test_controller_falls_back_to_active_session() {
        let cache = MemberCache::new();
        cache.upsert_guild(GuildId::from("g1"), "Guild One");
        cache.upsert_guild(GuildId::from("g2"), "Guild Two");
        cache.upsert_member(&GuildId::from("g1"), USER, None);
        cache.upsert_member(&GuildId::from("g2"), USER, None);
        let locator = locator(cache);

        let only_g2 = |g: &GuildId| g.0 == "g2";
        assert_eq!(
            locator.locate_controller(USER, None, only_g2),
            Ok(GuildId::from("g2"))
        );
        assert_eq!(
            locator.locate_controller(USER, None, |_| false),
            Err(CommandError::NoActiveSession)
        );
        assert_eq!(
            locator.locate_controller(USER, None, |_| true),
            Err(CommandError::AmbiguousGuild(2))
        );
    }

    #[test]
    fn test_controller_prefers_voice_presence() {
        let cache = MemberCache::new();
        cache.upsert_guild(GuildId::from("g1"), "Guild One");
        cache.upsert_member(&GuildId::from("g1"), USER, Some(ChannelId(5)));

        assert_eq!(
            locator(cache).locate_controller(USER, None, |_| false),
            Ok(GuildId::from("g1"))
        );
    }
}
