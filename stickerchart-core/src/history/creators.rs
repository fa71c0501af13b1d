//! Creator attribution for sticker history.
//!
//! Creator keys only drive grouping and labels; they are never used to
//! decide who may do what.

use std::collections::{BTreeSet, HashMap};

use crate::config::HistoryConfig;

/// Key used for stickers whose creator cannot be inferred at all.
pub const LOCAL_CREATOR_KEY: &str = "local";

/// Everything known about who added which sticker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatorDirectory {
    /// Sticker id -> creator identifier, from sync metadata
    pub creators: HashMap<String, String>,
    /// Participant identifier -> display name
    pub display_names: HashMap<String, String>,
    /// Identifier of the user on this device, when known
    pub device_user: Option<String>,
}

impl CreatorDirectory {
    /// Key used for stickers with no known creator.
    ///
    /// The device identity when known. Otherwise, if every sticker with a
    /// known creator names the same single identity, that identity: a
    /// best-effort guess that this device belongs to the only participant
    /// seen so far, which concurrent edits from other devices can defeat.
    /// Failing both, [`LOCAL_CREATOR_KEY`].
    pub fn local_creator_key<'a, I>(&self, sticker_ids: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        if let Some(device_user) = &self.device_user {
            return device_user.clone();
        }

        let mut known: BTreeSet<&str> = sticker_ids
            .into_iter()
            .filter_map(|id| self.creators.get(id).map(String::as_str))
            .collect();

        if known.len() == 1 {
            if let Some(only) = known.pop_first() {
                return only.to_string();
            }
        }
        LOCAL_CREATOR_KEY.to_string()
    }

    /// Creator key for one sticker, given the precomputed local key
    pub fn creator_key(&self, sticker_id: &str, local_key: &str) -> String {
        self.creators
            .get(sticker_id)
            .cloned()
            .unwrap_or_else(|| local_key.to_string())
    }

    /// Whether a creator key refers to the user of this device
    pub fn is_local(&self, creator_key: &str) -> bool {
        creator_key == LOCAL_CREATOR_KEY || self.device_user.as_deref() == Some(creator_key)
    }

    /// Label for a creator key: the local label for this device's user,
    /// then the participant's name, then the shared label.
    pub fn display_name(&self, creator_key: &str, config: &HistoryConfig) -> String {
        if self.is_local(creator_key) {
            return config.local_label.clone();
        }
        self.display_names
            .get(creator_key)
            .cloned()
            .unwrap_or_else(|| config.shared_label.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(creators: &[(&str, &str)]) -> CreatorDirectory {
        CreatorDirectory {
            creators: creators
                .iter()
                .map(|(s, c)| (s.to_string(), c.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_device_identity_wins() {
        let mut dir = directory(&[("s1", "X")]);
        dir.device_user = Some("me".to_string());

        let local = dir.local_creator_key(["s1", "s2", "s3"]);
        assert_eq!(local, "me");
        assert_eq!(dir.creator_key("s2", &local), "me");
        assert_eq!(dir.creator_key("s1", &local), "X");
    }

    #[test]
    fn test_single_known_creator_is_adopted() {
        let dir = directory(&[("s1", "X"), ("s2", "X")]);
        let local = dir.local_creator_key(["s1", "s2", "s3"]);
        assert_eq!(local, "X");
        assert_eq!(dir.creator_key("s3", &local), "X");
    }

    #[test]
    fn test_multiple_known_creators_fall_back_to_local() {
        let dir = directory(&[("s1", "X"), ("s2", "Y")]);
        let local = dir.local_creator_key(["s1", "s2", "s3"]);
        assert_eq!(local, LOCAL_CREATOR_KEY);
        assert_eq!(dir.creator_key("s3", &local), "local");
    }

    #[test]
    fn test_creators_of_absent_stickers_are_ignored() {
        let dir = directory(&[("gone", "Y"), ("s1", "X")]);
        assert_eq!(dir.local_creator_key(["s1", "s2"]), "X");
    }

    #[test]
    fn test_no_known_creators() {
        let dir = CreatorDirectory::default();
        assert_eq!(dir.local_creator_key(["s1"]), LOCAL_CREATOR_KEY);
    }

    #[test]
    fn test_display_names() {
        let config = HistoryConfig::default();
        let mut dir = CreatorDirectory::default();
        dir.device_user = Some("me".to_string());
        dir.display_names
            .insert("X".to_string(), "Grandma".to_string());

        assert_eq!(dir.display_name("local", &config), "You");
        assert_eq!(dir.display_name("me", &config), "You");
        assert_eq!(dir.display_name("X", &config), "Grandma");
        assert_eq!(dir.display_name("Z", &config), "Shared user");
    }
}
