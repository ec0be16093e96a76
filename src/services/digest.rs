//! Digest formatting and per-target delivery policy.
//!
//! Pure functions: no I/O, total over their inputs. Formatting failures
//! are impossible by construction, so a poll cycle that reaches this
//! stage always ends up with a deliverable message.

use crate::models::{DeliveryPolicy, MonitoredTarget, Settings, Tweet, TweetAuthor};

/// Combined likes + retweets above which a tweet gets the fire marker.
const ENGAGEMENT_THRESHOLD: u32 = 100;

/// Instruction line used when a target carries no prompt override.
const DEFAULT_PROMPT: &str = "Review these new tweets and surface anything noteworthy.";

/// Effective delivery policy for a target.
///
/// Unknown targets (polled ad hoc, never registered) fall back to the
/// global default mode with no channel and no prompt override.
pub fn resolve_policy(target: Option<&MonitoredTarget>, settings: &Settings) -> DeliveryPolicy {
    match target {
        Some(t) => DeliveryPolicy {
            mode: t.delivery_mode,
            channel: t.channel_override.clone(),
            prompt: t.prompt_override.clone(),
        },
        None => DeliveryPolicy {
            mode: settings.default_delivery_mode,
            channel: None,
            prompt: None,
        },
    }
}

/// Render a batch of tweets into a digest message.
///
/// Tweets render in the order given (the poller passes oldest first).
/// Authors are matched by id; a tweet whose author is missing from the
/// expansion renders as `@unknown`.
pub fn format_digest(tweets: &[Tweet], authors: &[TweetAuthor], policy: &DeliveryPolicy) -> String {
    let prompt = policy.prompt.as_deref().unwrap_or(DEFAULT_PROMPT);

    let mut message = format!(
        "📱 Timeline Update ({} tweets)\n\n{}\n\n---\n\n",
        tweets.len(),
        prompt
    );

    for tweet in tweets {
        let username = authors
            .iter()
            .find(|a| a.id == tweet.author_id)
            .map(|a| a.username.as_str())
            .unwrap_or("unknown");

        let fire = if tweet.engagement() > ENGAGEMENT_THRESHOLD {
            " 🔥"
        } else {
            ""
        };

        message.push_str(&format!("@{}{}:\n{}\n\n", username, fire, tweet.text));
    }

    message
}
