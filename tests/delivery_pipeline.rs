//! End-to-end tests of reply delivery: segmentation, length enforcement and
//! pacing against a recording channel.

mod common;

use std::time::Duration;

use common::fixtures::{PIZZA_REPLY, SAMPLE_CHANNEL_ID, completion_body, long_reply};
use common::mocks::{Action, MockModel, RecordingChannel};
use common::test_utils;
use coonbot::utils::ai_client::{AiClient, AiError, Provider};
use coonbot::utils::delivery::pacing::{MAX_MESSAGE_DELAY, MIN_MESSAGE_DELAY};
use coonbot::utils::delivery::{DeliveryPipeline, DeliveryReport, PacingConfig};
use poise::serenity_prelude::ChannelId;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn channel() -> ChannelId {
    ChannelId::new(SAMPLE_CHANNEL_ID)
}

fn model_answering(response: &'static str) -> MockModel {
    let mut model = MockModel::new();
    model
        .expect_complete()
        .returning(move |_, _| Ok(response.to_string()));
    model
}

fn model_failing() -> MockModel {
    let mut model = MockModel::new();
    model
        .expect_complete()
        .returning(|provider, _| Err(AiError::Timeout(provider)));
    model
}

/// A short reply goes out as a single message, untouched, with no typing.
#[tokio::test(start_paused = true)]
async fn test_short_reply_single_message() {
    test_utils::init();
    // Arrange
    let gateway = RecordingChannel::default();
    let mut model = MockModel::new();
    model.expect_complete().never();
    let pacing = PacingConfig::default();

    // Act
    let report = DeliveryPipeline::new(&gateway, &model, &pacing)
        .deliver(channel(), PIZZA_REPLY, &CancellationToken::new())
        .await;

    // Assert
    assert_eq!(gateway.sent_texts(), vec![PIZZA_REPLY.to_string()]);
    assert_eq!(gateway.actions().len(), 1);
    assert_eq!(report.delivered, 1);
}

/// Suggested chunks arrive in order, paced, each follow-up announced by typing.
#[tokio::test(start_paused = true)]
async fn test_suggested_chunks_are_paced() {
    test_utils::init();
    // Arrange
    let gateway = RecordingChannel::default();
    let model = model_answering(
        "Honestly it comes down to the crust.<<<BREAK>>>Sauce is second.<<<BREAK>>>Brooklyn style. Fight me.",
    );
    let pacing = PacingConfig::default();

    // Act
    let report = DeliveryPipeline::new(&gateway, &model, &pacing)
        .deliver(channel(), &long_reply(), &CancellationToken::new())
        .await;

    // Assert
    assert_eq!(
        gateway.sent_texts(),
        vec![
            "Honestly it comes down to the crust.",
            "Sauce is second.",
            "Brooklyn style. Fight me.",
        ]
    );
    let sent = gateway.sent();
    for pair in sent.windows(2) {
        let gap = pair[1].0 - pair[0].0;
        assert!(gap >= MIN_MESSAGE_DELAY && gap <= MAX_MESSAGE_DELAY, "gap {gap:?}");
    }

    // Send, then typing before every later send.
    let kinds: Vec<&str> = gateway
        .actions()
        .iter()
        .map(|a| match a {
            Action::Typing(_) => "typing",
            Action::Sent(..) => "sent",
        })
        .collect();
    assert_eq!(kinds, vec!["sent", "typing", "sent", "typing", "sent"]);
    assert_eq!(
        report,
        DeliveryReport {
            attempted: 3,
            delivered: 3,
            failed: 0,
            cancelled: false
        }
    );
}

/// With the provider down, paragraphs are split deterministically and an
/// oversized paragraph is cut to the platform limit.
#[tokio::test(start_paused = true)]
async fn test_fallback_and_length_enforcement() {
    test_utils::init();
    // Arrange
    let gateway = RecordingChannel::default();
    let model = model_failing();
    let pacing = PacingConfig::default();
    let intro = "Short intro.".to_string();
    let wall = "w".repeat(2500);
    let reply = format!("{intro}\n\n{wall}");

    // Act
    DeliveryPipeline::new(&gateway, &model, &pacing)
        .deliver(channel(), &reply, &CancellationToken::new())
        .await;

    // Assert
    let sizes: Vec<usize> = gateway
        .sent_texts()
        .iter()
        .map(|t| t.chars().count())
        .collect();
    assert_eq!(sizes, vec![intro.len(), 2000, 500]);
    assert_eq!(gateway.sent_texts().concat(), format!("{intro}{wall}"));
}

/// A rejected send is reported but does not stop the rest of the reply.
#[tokio::test(start_paused = true)]
async fn test_failed_send_is_skipped() {
    test_utils::init();
    // Arrange
    let gateway = RecordingChannel::failing([0]);
    let model = model_answering("one<<<BREAK>>>two");
    let pacing = PacingConfig::default();

    // Act
    let report = DeliveryPipeline::new(&gateway, &model, &pacing)
        .deliver(channel(), &long_reply(), &CancellationToken::new())
        .await;

    // Assert
    assert_eq!(gateway.sent_texts(), vec!["two".to_string()]);
    assert_eq!(report.failed, 1);
    assert_eq!(report.delivered, 1);
}

/// Cancelling mid-delivery (as shutdown does) stops further sends and typing.
#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_remaining_chunks() {
    test_utils::init();
    // Arrange
    let gateway = RecordingChannel::default();
    let model = model_answering("a<<<BREAK>>>b<<<BREAK>>>c");
    let pacing = PacingConfig::default();
    let shutdown = CancellationToken::new();
    let cancel = shutdown.child_token();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        trigger.cancel();
    });

    // Act
    let report = DeliveryPipeline::new(&gateway, &model, &pacing)
        .deliver(channel(), &long_reply(), &cancel)
        .await;
    let actions_at_return = gateway.actions().len();
    tokio::time::sleep(Duration::from_secs(30)).await;

    // Assert
    assert_eq!(gateway.sent_texts(), vec!["a".to_string()]);
    assert!(report.cancelled);
    assert_eq!(gateway.actions().len(), actions_at_return);
}

/// The real HTTP client drives segmentation against a stand-in provider.
#[tokio::test]
async fn test_segmentation_through_http_provider() {
    test_utils::init();
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("First half.<<<BREAK>>>Second half.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = AiClient::with_endpoints(
        (server.uri().as_str(), Some("xai-test-key".to_string())),
        (server.uri().as_str(), None),
    );
    assert!(client.is_configured(Provider::Grok));

    let gateway = RecordingChannel::default();
    let pacing = PacingConfig {
        min_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
        ..PacingConfig::default()
    };

    // Act
    let report = DeliveryPipeline::new(&gateway, &client, &pacing)
        .deliver(channel(), &long_reply(), &CancellationToken::new())
        .await;

    // Assert
    assert_eq!(
        gateway.sent_texts(),
        vec!["First half.".to_string(), "Second half.".to_string()]
    );
    assert_eq!(report.delivered, 2);
}
