use crate::models::{FeedEntry, Reason};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Merges resolver output into one reason list per recipient.
///
/// Scoped to a single fan-out and written only after every lookup has
/// finished, so it needs no synchronisation.
///
/// Ordering within a recipient: the USER reason (if any) comes first, TAG
/// reasons follow in the order their tags were added. The author is never a
/// recipient, even with self-follow or self-subscribe rows present.
#[derive(Debug)]
pub struct ReasonAggregator {
    author_id: Uuid,
    author_username: String,
    recipients: Vec<Uuid>,
    reasons: HashMap<Uuid, Vec<Reason>>,
}

impl ReasonAggregator {
    pub fn new(author_id: Uuid, author_username: impl Into<String>) -> Self {
        Self {
            author_id,
            author_username: author_username.into(),
            recipients: Vec::new(),
            reasons: HashMap::new(),
        }
    }

    /// Give every follower a USER reason naming the author
    pub fn add_followers(&mut self, followers: &[Uuid]) {
        for &follower_id in followers {
            let reason = Reason::User(self.author_username.clone());
            if let Some(reasons) = self.slot(follower_id) {
                if !reasons.iter().any(Reason::is_user) {
                    reasons.insert(0, reason);
                }
            }
        }
    }

    /// Append a TAG reason for every subscriber of `tag_name`
    pub fn add_tag_subscribers(&mut self, tag_name: &str, subscribers: &[Uuid]) {
        for &subscriber_id in subscribers {
            let reason = Reason::Tag(tag_name.to_string());
            if let Some(reasons) = self.slot(subscriber_id) {
                if !reasons.contains(&reason) {
                    reasons.push(reason);
                }
            }
        }
    }

    /// One entry per recipient, in first-seen order
    pub fn into_entries(mut self, post_id: Uuid) -> Vec<FeedEntry> {
        self.recipients
            .into_iter()
            .filter_map(|user_id| {
                self.reasons.remove(&user_id).map(|reasons| FeedEntry {
                    post_id,
                    user_id,
                    reasons,
                })
            })
            .collect()
    }

    fn slot(&mut self, user_id: Uuid) -> Option<&mut Vec<Reason>> {
        if user_id == self.author_id {
            debug!(author_id = %self.author_id, "Skipping author as fan-out recipient");
            return None;
        }

        match self.reasons.entry(user_id) {
            Entry::Occupied(entry) => Some(entry.into_mut()),
            Entry::Vacant(entry) => {
                self.recipients.push(user_id);
                Some(entry.insert(Vec::new()))
            }
        }
    }
}
