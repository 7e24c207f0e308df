//! Mock implementations of the bot's external seams.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use coonbot::utils::ai_client::{AiResult, CompletionRequest, ImageRequest, LanguageModel, Provider};
use coonbot::utils::gateway::{
    ChatGateway, ChatMessage, GatewayError, GatewayResult, MemberInfo,
};
use mockall::mock;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};
use tokio::time::Instant;

// Language model whose answers each test scripts.
mock! {
    pub Model {}

    #[async_trait]
    impl LanguageModel for Model {
        async fn complete(&self, provider: Provider, request: CompletionRequest) -> AiResult<String>;
        async fn complete_with_image(&self, provider: Provider, request: ImageRequest) -> AiResult<String>;
    }
}

/// Something the bot did to the channel, stamped with (test) time.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Typing(Instant),
    Sent(Instant, String),
}

/// A channel that records every send and typing call.
#[derive(Default)]
pub struct RecordingChannel {
    pub actions: Mutex<Vec<Action>>,
    /// Zero-based send attempts that fail.
    pub failing_sends: HashSet<usize>,
    attempts: Mutex<usize>,
}

impl RecordingChannel {
    pub fn failing(sends: impl IntoIterator<Item = usize>) -> Self {
        Self {
            failing_sends: sends.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(Instant, String)> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Sent(at, text) => Some((at, text)),
                Action::Typing(_) => None,
            })
            .collect()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl ChatGateway for RecordingChannel {
    async fn send_message(&self, _channel: ChannelId, text: &str) -> GatewayResult<MessageId> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts - 1
        };
        if self.failing_sends.contains(&attempt) {
            return Err(GatewayError::Rejected("Missing Permissions".to_string()));
        }
        self.actions
            .lock()
            .unwrap()
            .push(Action::Sent(Instant::now(), text.to_string()));
        Ok(MessageId::new(attempt as u64 + 1))
    }

    async fn show_typing(&self, _channel: ChannelId) -> GatewayResult<()> {
        self.actions
            .lock()
            .unwrap()
            .push(Action::Typing(Instant::now()));
        Ok(())
    }

    async fn fetch_recent_messages(
        &self,
        _channel: ChannelId,
        _limit: usize,
    ) -> GatewayResult<Vec<ChatMessage>> {
        Ok(Vec::new())
    }

    async fn fetch_message(
        &self,
        _channel: ChannelId,
        id: MessageId,
    ) -> GatewayResult<ChatMessage> {
        Err(GatewayError::Rejected(format!("unknown message {id}")))
    }

    async fn fetch_member(&self, _guild: GuildId, user: UserId) -> GatewayResult<MemberInfo> {
        Err(GatewayError::Rejected(format!("unknown member {user}")))
    }
}
