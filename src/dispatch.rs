//! Deferred tool-result scanning and delivery.
//!
//! Certain tool invocations produce results that must reach the user as
//! separate outbound messages *after* the main response was sent. On
//! every send event the dispatcher re-reads the session's persisted
//! history, finds the newest not-yet-delivered tool result with a
//! registered handler, delivers it, and durably records the delivery so
//! restarts and session resets cause neither duplicates nor gaps.

pub mod handlers;
pub mod state;

pub use handlers::{
    AnswerTextHandler, AudioResultHandler, HandlerRegistry, ImageResultHandler, ToolResultHandler,
};
pub use state::{ProcessedState, StateStore};

use crate::context::ChatRole;
use crate::error::Result;
use crate::history::HistorySource;
use crate::transport::Transport;
use crate::SessionId;

/// What a trigger did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// One tool result was delivered (or consumed as malformed).
    Delivered { position: usize },
    /// Nothing pending for this session.
    NonePending,
}

/// Scans history on send events and delivers at most one tool result
/// per trigger.
pub struct ToolResultDispatcher {
    registry: HandlerRegistry,
    store: StateStore,
}

impl ToolResultDispatcher {
    pub fn new(registry: HandlerRegistry, store: StateStore) -> Self {
        Self { registry, store }
    }

    /// Run one trigger for `session`. Called once per outbound-send event.
    pub async fn on_send_event(
        &mut self,
        session: &SessionId,
        history: &dyn HistorySource,
        transport: &dyn Transport,
    ) -> Result<DispatchOutcome> {
        if self.registry.is_empty() {
            return Ok(DispatchOutcome::NonePending);
        }

        let entries = history.history(session).await?;
        let length = entries.len();

        let recorded = self.store.get(session.as_ref()).last_history_length;
        if length < recorded {
            tracing::info!(
                session = %session,
                observed = length,
                recorded,
                "history shrank; clearing processed positions"
            );
            self.store.reset_positions(session.as_ref()).await?;
        }
        if length != recorded {
            self.store
                .set_history_length(session.as_ref(), length)
                .await?;
        }

        let processed = self.store.get(session.as_ref()).processed_positions;
        for position in (0..length).rev() {
            let entry = &entries[position];
            if entry.role != ChatRole::Tool {
                continue;
            }
            let Some(tool_call_id) = entry.tool_call_id.as_deref() else {
                continue;
            };
            let Some(handler) = self.registry.find(tool_call_id) else {
                continue;
            };

            if processed.contains(&position) {
                // The newest registered match was already resolved, which
                // implies older matches of the same turn were too.
                return Ok(DispatchOutcome::NonePending);
            }

            if let Err(error) = handler
                .deliver(session, &entry.content, transport)
                .await
            {
                tracing::warn!(
                    %error,
                    position,
                    tool_call_id = %tool_call_id,
                    "tool-result delivery failed; marking processed anyway"
                );
            }
            self.store.mark_processed(session.as_ref(), position).await?;
            return Ok(DispatchOutcome::Delivered { position });
        }

        Ok(DispatchOutcome::NonePending)
    }

    /// Read-only view of the delivery state (for hosts and tests).
    pub fn state(&self, session: &str) -> ProcessedState {
        self.store.get(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryEntry;
    use crate::transport::test_support::RecordingTransport;
    use crate::OutboundMessage;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedHistory(Vec<HistoryEntry>);

    #[async_trait]
    impl HistorySource for FixedHistory {
        async fn history(&self, _session: &SessionId) -> Result<Vec<HistoryEntry>> {
            Ok(self.0.clone())
        }
    }

    fn session() -> SessionId {
        SessionId::from("tg:7")
    }

    async fn dispatcher_with(prefix: &str) -> (ToolResultDispatcher, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(dir.path().join("state.json")).await;

        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(AnswerTextHandler::new(prefix.to_string())));
        (ToolResultDispatcher::new(registry, store), dir)
    }

    fn history_with_tool_at_3() -> FixedHistory {
        FixedHistory(vec![
            HistoryEntry::text(ChatRole::System, "be helpful"),
            HistoryEntry::text(ChatRole::User, "search for rust news"),
            HistoryEntry::text(ChatRole::Assistant, "on it"),
            HistoryEntry::tool("search-web-1", r#"{"answerText": "rust 1.x released"}"#),
            HistoryEntry::text(ChatRole::Assistant, "done"),
        ])
    }

    #[tokio::test]
    async fn delivers_exactly_once_per_history_entry() {
        let (mut dispatcher, _state_dir) = dispatcher_with("search-").await;
        let history = history_with_tool_at_3();
        let transport = RecordingTransport::default();

        let outcome = dispatcher
            .on_send_event(&session(), &history, &transport)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Delivered { position: 3 });
        assert_eq!(
            transport.sent(),
            vec![OutboundMessage::Text("rust 1.x released".into())]
        );
        assert_eq!(
            dispatcher.state("tg:7").processed_positions,
            std::collections::BTreeSet::from([3])
        );

        // Second trigger with unchanged history sends nothing.
        let outcome = dispatcher
            .on_send_event(&session(), &history, &transport)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::NonePending);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn shrunken_history_resets_processed_positions() {
        let (mut dispatcher, _state_dir) = dispatcher_with("search-").await;
        let transport = RecordingTransport::default();

        // Seed {3, 7}: deliver position 3 while the history is short, then
        // position 7 after the conversation grows.
        let entry = |i: usize| {
            if i == 3 || i == 7 {
                HistoryEntry::tool(format!("search-{i}"), format!(r#"{{"answerText": "{i}"}}"#))
            } else {
                HistoryEntry::text(ChatRole::User, format!("msg {i}"))
            }
        };
        let four = FixedHistory((0..4).map(entry).collect());
        let ten = FixedHistory((0..10).map(entry).collect());

        let outcome = dispatcher
            .on_send_event(&session(), &four, &transport)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Delivered { position: 3 });
        let outcome = dispatcher
            .on_send_event(&session(), &ten, &transport)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Delivered { position: 7 });
        assert_eq!(
            dispatcher.state("tg:7").processed_positions,
            std::collections::BTreeSet::from([3, 7])
        );
        assert_eq!(dispatcher.state("tg:7").last_history_length, 10);

        // Reset: a two-entry history clears positions and re-records length.
        let short = FixedHistory(vec![
            HistoryEntry::text(ChatRole::User, "fresh start"),
            HistoryEntry::text(ChatRole::Assistant, "hello again"),
        ]);
        let outcome = dispatcher
            .on_send_event(&session(), &short, &transport)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::NonePending);

        let state = dispatcher.state("tg:7");
        assert!(state.processed_positions.is_empty());
        assert_eq!(state.last_history_length, 2);
    }

    #[tokio::test]
    async fn scan_stops_at_the_first_processed_match() {
        let (mut dispatcher, _state_dir) = dispatcher_with("search-").await;
        let transport = RecordingTransport::default();

        // Two registered tool entries; the newer one gets delivered first.
        let history = FixedHistory(vec![
            HistoryEntry::tool("search-old", r#"{"answerText": "old"}"#),
            HistoryEntry::text(ChatRole::Assistant, "…"),
            HistoryEntry::tool("search-new", r#"{"answerText": "new"}"#),
        ]);

        let outcome = dispatcher
            .on_send_event(&session(), &history, &transport)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Delivered { position: 2 });

        // The next trigger meets the processed newest match and stops:
        // the older entry at position 0 is never revisited.
        let outcome = dispatcher
            .on_send_event(&session(), &history, &transport)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::NonePending);
        assert_eq!(
            transport.sent(),
            vec![OutboundMessage::Text("new".into())]
        );
    }

    #[tokio::test]
    async fn malformed_payload_is_consumed_not_retried() {
        let (mut dispatcher, _state_dir) = dispatcher_with("search-").await;
        let transport = RecordingTransport::default();
        let history = FixedHistory(vec![HistoryEntry::tool("search-bad", "not json")]);

        let outcome = dispatcher
            .on_send_event(&session(), &history, &transport)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Delivered { position: 0 });
        assert!(transport.sent().is_empty());

        let outcome = dispatcher
            .on_send_event(&session(), &history, &transport)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::NonePending);
    }

    #[tokio::test]
    async fn unregistered_tools_are_ignored() {
        let (mut dispatcher, _state_dir) = dispatcher_with("search-").await;
        let transport = RecordingTransport::default();
        let history = FixedHistory(vec![HistoryEntry::tool(
            "weather-1",
            r#"{"answerText": "sunny"}"#,
        )]);

        let outcome = dispatcher
            .on_send_event(&session(), &history, &transport)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::NonePending);
        assert!(transport.sent().is_empty());
    }
}
