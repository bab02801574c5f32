//! Console front end: inbound events come from stdin, outbound messages go
//! to stdout.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    anyhow::Context as _,
    async_trait::async_trait,
    courier_channels::ChatClient,
    courier_common::types::{AdminRef, InboundEvent, SentMessage, ThreadInfo, UserInfo},
};

/// Sender and thread used for plain-text input lines.
#[derive(Debug, Clone)]
pub struct LineDefaults {
    pub sender_id: String,
    pub thread_id: String,
}

/// Turn one line of input into an event.
///
/// A line starting with `{` is parsed as a JSON event. `re:<id> text`
/// replies to message `<id>`. Anything else is a plain message from the
/// default sender. Blank lines yield `None`.
pub fn parse_line(
    line: &str,
    defaults: &LineDefaults,
    seq: u64,
) -> anyhow::Result<Option<InboundEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.starts_with('{') {
        let event = serde_json::from_str(line).context("invalid event JSON")?;
        return Ok(Some(event));
    }

    let message_id = format!("in-{seq}");
    if let Some(rest) = line.strip_prefix("re:") {
        let (target, body) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let event =
            InboundEvent::message(&defaults.thread_id, &defaults.sender_id, message_id, body)
                .replying_to(target);
        return Ok(Some(event));
    }
    Ok(Some(InboundEvent::message(
        &defaults.thread_id,
        &defaults.sender_id,
        message_id,
        line,
    )))
}

/// [`ChatClient`] that prints outgoing messages.
///
/// Thread participants are the senders seen so far; thread admins come from
/// the command line.
pub struct ConsoleClient {
    next_id: AtomicU64,
    thread_admins: Vec<String>,
    participants: Mutex<HashMap<String, HashSet<String>>>,
}

impl ConsoleClient {
    pub fn new(thread_admins: Vec<String>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            thread_admins,
            participants: Mutex::new(HashMap::new()),
        }
    }

    /// Record the sender as a participant of the event's thread.
    pub fn observe(&self, event: &InboundEvent) {
        if event.sender_id.is_empty() || event.thread_id.is_empty() {
            return;
        }
        self.participants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.thread_id.clone())
            .or_default()
            .insert(event.sender_id.clone());
    }

    fn next_message_id(&self) -> String {
        format!("out-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[async_trait]
impl ChatClient for ConsoleClient {
    async fn send_message(
        &self,
        text: &str,
        thread_id: &str,
        reply_to: Option<&str>,
    ) -> anyhow::Result<SentMessage> {
        let message_id = self.next_message_id();
        match reply_to {
            Some(target) => println!("[{thread_id}] {message_id} (re {target}): {text}"),
            None => println!("[{thread_id}] {message_id}: {text}"),
        }
        Ok(SentMessage { message_id })
    }

    async fn get_user_info(&self, user_id: &str) -> anyhow::Result<UserInfo> {
        Ok(UserInfo {
            name: user_id.to_string(),
        })
    }

    async fn get_thread_info(&self, thread_id: &str) -> anyhow::Result<ThreadInfo> {
        let participants = self
            .participants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(thread_id)
            .map(|set| {
                let mut ids: Vec<String> = set.iter().cloned().collect();
                ids.sort();
                ids
            })
            .unwrap_or_default();
        Ok(ThreadInfo {
            name: Some(thread_id.to_string()),
            participant_ids: participants,
            admin_ids: self
                .thread_admins
                .iter()
                .map(|id| AdminRef::from(id.as_str()))
                .collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, courier_common::types::EventKind};

    fn defaults() -> LineDefaults {
        LineDefaults {
            sender_id: "me".into(),
            thread_id: "console".into(),
        }
    }

    #[test]
    fn plain_line_is_a_message() {
        let event = parse_line("  !ping  ", &defaults(), 3).unwrap().unwrap();
        assert_eq!(event.kind, EventKind::Message);
        assert_eq!(event.message_id, "in-3");
        assert_eq!(event.sender_id, "me");
        assert_eq!(event.text(), "!ping");
    }

    #[test]
    fn reply_syntax_targets_message() {
        let event = parse_line("re:out-2 seven", &defaults(), 4).unwrap().unwrap();
        assert_eq!(event.replied_to(), Some("out-2"));
        assert_eq!(event.text(), "seven");
    }

    #[test]
    fn json_line_is_taken_verbatim() {
        let line = r#"{"type":"message","senderID":"u9","threadID":"t9","messageID":"x","body":"hi"}"#;
        let event = parse_line(line, &defaults(), 0).unwrap().unwrap();
        assert_eq!(event.sender_id, "u9");
        assert_eq!(event.thread_id, "t9");
    }

    #[test]
    fn blank_and_broken_lines() {
        assert!(parse_line("   ", &defaults(), 0).unwrap().is_none());
        assert!(parse_line("{ nope", &defaults(), 0).is_err());
    }

    #[tokio::test]
    async fn thread_info_tracks_seen_senders() {
        let client = ConsoleClient::new(vec!["mod".into()]);
        client.observe(&InboundEvent::message("t1", "mod", "m1", "hi"));
        client.observe(&InboundEvent::message("t1", "u1", "m2", "hi"));
        client.observe(&InboundEvent::message("t2", "u2", "m3", "hi"));

        let info = client.get_thread_info("t1").await.unwrap();
        assert_eq!(info.participant_ids, ["mod", "u1"]);
        assert!(info.is_admin_participant("mod"));
        assert!(!client.get_thread_info("t2").await.unwrap().is_admin_participant("mod"));
    }

    #[tokio::test]
    async fn message_ids_are_unique() {
        let client = ConsoleClient::new(Vec::new());
        let a = client.send_message("a", "t1", None).await.unwrap();
        let b = client.send_message("b", "t1", Some("in-1")).await.unwrap();
        assert_ne!(a.message_id, b.message_id);
    }
}
