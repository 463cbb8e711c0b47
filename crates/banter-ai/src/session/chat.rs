//! Turn orchestration: normalize input, call the gateway, store the reply.

use banter_common::{BanterError, SessionId, StoreError};
use tracing::{debug, warn};

use crate::content::{normalize, Attachment};
use crate::{ChatClient, ModelSettings, Reply, Role, Turn};

use super::store::SessionStore;

impl SessionStore {
    /// Run one batch turn against the active session.
    ///
    /// Nothing is appended until the gateway reply is in hand, so a
    /// failed call leaves the session exactly as it was.
    pub async fn run_turn(
        &mut self,
        client: &dyn ChatClient,
        settings: &ModelSettings,
        text: &str,
        files: &[Attachment],
    ) -> Result<Reply, BanterError> {
        let (id, mut turns) = self.active_turns()?;
        let user_turn = Turn {
            role: Role::User,
            content: normalize(text, files)?,
        };
        turns.push(user_turn.clone());

        let reply = client.send_message(&turns, settings).await?;
        self.commit(id, user_turn, &reply).await?;
        Ok(reply)
    }

    /// Run one streaming turn against the active session, forwarding
    /// each text fragment to `on_fragment` for progressive display.
    ///
    /// The session is only touched after the stream is fully drained; an
    /// error or abandonment mid-stream discards the partial reply.
    pub async fn run_turn_streaming(
        &mut self,
        client: &dyn ChatClient,
        settings: &ModelSettings,
        text: &str,
        files: &[Attachment],
        mut on_fragment: impl FnMut(&str),
    ) -> Result<Reply, BanterError> {
        let (id, mut turns) = self.active_turns()?;
        let user_turn = Turn {
            role: Role::User,
            content: normalize(text, files)?,
        };
        turns.push(user_turn.clone());

        let mut stream = client.open_stream(&turns, settings).await?;
        while let Some(fragment) = stream.next_fragment().await? {
            on_fragment(&fragment);
        }

        let reply = stream.finish();
        self.commit(id, user_turn, &reply).await?;
        Ok(reply)
    }

    fn active_turns(&self) -> Result<(SessionId, Vec<Turn>), StoreError> {
        let session = self.active().ok_or(StoreError::NoActiveSession)?;
        Ok((session.id(), session.turns().to_vec()))
    }

    /// Append the completed exchange and persist. Only the final answer
    /// is stored; the thinking trace stays display-only.
    async fn commit(
        &mut self,
        id: SessionId,
        user_turn: Turn,
        reply: &Reply,
    ) -> Result<(), StoreError> {
        self.append_turn(id, user_turn)?;
        self.append_turn(id, Turn::assistant(reply.text.clone()))?;

        debug!(
            input_tokens = reply.usage.input_tokens,
            output_tokens = reply.usage.output_tokens,
            "turn complete"
        );

        if let Err(e) = self.persist().await {
            // In-memory state stays authoritative; the next successful
            // persist rewrites everything.
            warn!("persist failed, keeping in-memory state: {e}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::backend::{MemoryBackend, StoreBackend};
    use super::*;
    use crate::{GatewayError, ReplyStream, StreamEvent, TokenUsage};
    use async_trait::async_trait;

    /// Gateway double: replays a canned reply, or fails on demand.
    struct ScriptedClient {
        text: String,
        thinking: Option<String>,
        fail: bool,
    }

    impl ScriptedClient {
        fn replying(text: &str, thinking: Option<&str>) -> Self {
            Self {
                text: text.into(),
                thinking: thinking.map(String::from),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                text: String::new(),
                thinking: None,
                fail: true,
            }
        }

        fn events(&self) -> Vec<StreamEvent> {
            let mut events = Vec::new();
            if let Some(thinking) = &self.thinking {
                events.push(StreamEvent::Thinking(thinking.clone()));
            }
            // Split the canned text into two deltas to exercise accumulation.
            let mid = self.text.len() / 2;
            events.push(StreamEvent::Text(self.text[..mid].to_string()));
            events.push(StreamEvent::Text(self.text[mid..].to_string()));
            events.push(StreamEvent::Usage(TokenUsage {
                input_tokens: 3,
                output_tokens: 4,
            }));
            events
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn send_message(
            &self,
            _turns: &[Turn],
            _settings: &ModelSettings,
        ) -> Result<Reply, GatewayError> {
            if self.fail {
                return Err(GatewayError::Api("HTTP 500: boom".into()));
            }
            Ok(Reply {
                text: self.text.clone(),
                thinking: self.thinking.clone(),
                usage: TokenUsage {
                    input_tokens: 3,
                    output_tokens: 4,
                },
            })
        }

        async fn open_stream(
            &self,
            _turns: &[Turn],
            _settings: &ModelSettings,
        ) -> Result<ReplyStream, GatewayError> {
            if self.fail {
                return Err(GatewayError::Network("connection reset".into()));
            }
            Ok(ReplyStream::from_events(self.events()))
        }
    }

    fn seeded_store() -> SessionStore {
        let mut store = SessionStore::in_memory();
        store.create_session();
        store
    }

    #[tokio::test]
    async fn batch_turn_appends_user_then_assistant() {
        let mut store = seeded_store();
        let client = ScriptedClient::replying("the answer", Some("working it out"));

        let reply = store
            .run_turn(&client, &ModelSettings::default(), "question?", &[])
            .await
            .unwrap();
        assert_eq!(reply.text, "the answer");
        assert_eq!(reply.thinking.as_deref(), Some("working it out"));

        let turns = store.active().unwrap().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], Turn::user("question?"));
        // Only the final answer is stored, never the reasoning trace.
        assert_eq!(turns[1], Turn::assistant("the answer"));
    }

    #[tokio::test]
    async fn streamed_fragments_match_batch_text() {
        let client = ScriptedClient::replying("identical reply", Some("trace"));

        let mut store = seeded_store();
        let batch = store
            .run_turn(&client, &ModelSettings::default(), "q", &[])
            .await
            .unwrap();

        let mut store = seeded_store();
        let mut collected = String::new();
        let streamed = store
            .run_turn_streaming(&client, &ModelSettings::default(), "q", &[], |fragment| {
                collected.push_str(fragment)
            })
            .await
            .unwrap();

        assert_eq!(collected, batch.text);
        assert_eq!(streamed.text, batch.text);
        assert_eq!(
            store.active().unwrap().turns().last(),
            Some(&Turn::assistant("identical reply"))
        );
    }

    #[tokio::test]
    async fn gateway_failure_appends_nothing() {
        let backend = MemoryBackend::new();
        let mut store = SessionStore::new(Box::new(backend.clone()));
        let id = store.create_session();
        store.append_turn(id, Turn::user("old")).unwrap();
        store.append_turn(id, Turn::assistant("reply")).unwrap();
        store.persist().await.unwrap();

        let err = store
            .run_turn(&ScriptedClient::failing(), &ModelSettings::default(), "q", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BanterError::Gateway(_)));

        // Neither the in-memory turns nor the persisted record grew.
        assert_eq!(store.active().unwrap().turns().len(), 2);
        assert_eq!(backend.load().await.unwrap()[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn stream_open_failure_appends_nothing() {
        let mut store = seeded_store();
        let err = store
            .run_turn_streaming(
                &ScriptedClient::failing(),
                &ModelSettings::default(),
                "q",
                &[],
                |_| {},
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BanterError::Gateway(_)));
        assert!(store.active().unwrap().turns().is_empty());
    }

    #[tokio::test]
    async fn unsupported_attachment_appends_nothing() {
        let mut store = seeded_store();
        let client = ScriptedClient::replying("never sent", None);
        let files = vec![Attachment::new("malware.exe", vec![0x4d, 0x5a])];

        let err = store
            .run_turn(&client, &ModelSettings::default(), "look at this", &files)
            .await
            .unwrap_err();
        assert!(matches!(err, BanterError::Attachment(_)));
        assert!(store.active().unwrap().turns().is_empty());
    }

    #[tokio::test]
    async fn attachments_travel_in_the_user_turn() {
        let mut store = seeded_store();
        let client = ScriptedClient::replying("a cat photo", None);
        let files = vec![Attachment::new("cat.png", vec![1, 2, 3])];

        store
            .run_turn(&client, &ModelSettings::default(), "what is this?", &files)
            .await
            .unwrap();

        let turns = store.active().unwrap().turns();
        assert_eq!(turns[0].content.attachment_count(), 1);
        assert_eq!(turns[0].content.text(), "what is this?");
    }

    #[tokio::test]
    async fn successful_turn_is_persisted() {
        let backend = MemoryBackend::new();
        let mut store = SessionStore::new(Box::new(backend.clone()));
        store.create_session();

        store
            .run_turn(
                &ScriptedClient::replying("saved", None),
                &ModelSettings::default(),
                "persist me",
                &[],
            )
            .await
            .unwrap();

        let records = backend.load().await.unwrap();
        assert_eq!(records[0].messages.len(), 2);
        assert_eq!(records[0].messages[1], Turn::assistant("saved"));
    }
}
