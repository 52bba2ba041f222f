use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bot {
    pub username: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "dmChannelID", default)]
    pub dm_channel_id: String,
}

impl Bot {
    pub fn new(
        username: impl Into<String>,
        display_name: impl Into<String>,
        dm_channel_id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
            dm_channel_id: dm_channel_id.into(),
        }
    }
}

/// Bots available to the current user, plus which one new conversations go to.
///
/// `None` means the list has not been fetched yet (or was invalidated by a config change),
/// which is different from an empty list: an empty list means nothing is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotRoster {
    bots: Option<Vec<Bot>>,
    active: Option<String>,
    preferred: Option<String>,
}

impl BotRoster {
    pub fn new(preferred: Option<String>) -> Self {
        Self {
            bots: None,
            active: None,
            preferred: preferred.filter(|name| !name.trim().is_empty()),
        }
    }

    pub fn replace(&mut self, bots: Option<Vec<Bot>>) {
        self.bots = bots;
    }

    pub fn bots(&self) -> Option<&[Bot]> {
        self.bots.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.bots.is_some()
    }

    pub fn is_unconfigured(&self) -> bool {
        self.bots.as_ref().is_some_and(Vec::is_empty)
    }

    /// Explicit choice first, then the configured default, then the first bot listed.
    pub fn active_bot(&self) -> Option<&Bot> {
        let bots = self.bots.as_deref()?;
        find_by_username(bots, self.active.as_deref())
            .or_else(|| find_by_username(bots, self.preferred.as_deref()))
            .or_else(|| bots.first())
    }

    pub fn set_active(&mut self, username: &str) -> bool {
        let known = self
            .bots()
            .is_some_and(|bots| bots.iter().any(|bot| bot.username == username));
        if known {
            self.active = Some(username.to_string());
        }
        known
    }

    pub fn label_for_channel(&self, channel_id: &str) -> String {
        self.bots()
            .and_then(|bots| bots.iter().find(|bot| bot.dm_channel_id == channel_id))
            .map(|bot| bot.display_name.clone())
            .unwrap_or_default()
    }
}

fn find_by_username<'a>(bots: &'a [Bot], username: Option<&str>) -> Option<&'a Bot> {
    let username = username?;
    bots.iter().find(|bot| bot.username == username)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(preferred: Option<&str>) -> BotRoster {
        let mut roster = BotRoster::new(preferred.map(str::to_string));
        roster.replace(Some(vec![
            Bot::new("ai", "Copilot", "dm-ai"),
            Bot::new("helper", "Helper", "dm-helper"),
        ]));
        roster
    }

    #[test]
    fn active_bot_prefers_explicit_then_default_then_first() {
        assert_eq!(roster(None).active_bot().unwrap().username, "ai");
        assert_eq!(roster(Some("helper")).active_bot().unwrap().username, "helper");
        assert_eq!(roster(Some("gone")).active_bot().unwrap().username, "ai");

        let mut roster = roster(Some("helper"));
        assert!(roster.set_active("ai"));
        assert!(!roster.set_active("missing"));
        assert_eq!(roster.active_bot().unwrap().username, "ai");
    }

    #[test]
    fn unloaded_and_empty_rosters_differ() {
        let mut roster = BotRoster::default();
        assert!(!roster.is_loaded());
        assert!(!roster.is_unconfigured());
        assert!(roster.active_bot().is_none());

        roster.replace(Some(Vec::new()));
        assert!(roster.is_unconfigured());
    }

    #[test]
    fn labels_come_from_dm_channel_owner() {
        let roster = roster(None);
        assert_eq!(roster.label_for_channel("dm-helper"), "Helper");
        assert_eq!(roster.label_for_channel("town-square"), "");
    }

    #[test]
    fn bots_deserialize_from_webapp_shape() {
        let bot: Bot = serde_json::from_str(
            r#"{"username":"ai","displayName":"Copilot","dmChannelID":"dm-1"}"#,
        )
        .unwrap();
        assert_eq!(bot, Bot::new("ai", "Copilot", "dm-1"));
    }
}
