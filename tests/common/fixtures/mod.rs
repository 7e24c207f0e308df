//! Sample replies and provider payloads used across tests.

use serde_json::json;

/// Channel every test delivers into.
pub const SAMPLE_CHANNEL_ID: u64 = 987654321;

/// Three short paragraphs, well under the segmentation threshold.
pub const PIZZA_REPLY: &str =
    "Pizza is great.\n\nThe crust matters most.\n\nBrooklyn style wins.";

/// A reply long enough to be worth segmenting, built from three paragraphs.
pub fn long_reply() -> String {
    [
        "Honestly the whole debate comes down to the crust. ".repeat(6),
        "Sauce is second, and people who put the cheese under it are wrong. ".repeat(4),
        "Anyway, Brooklyn style. Fight me.".to_string(),
    ]
    .map(|p| p.trim().to_string())
    .join("\n\n")
}

/// A provider body in the `/chat/completions` shape.
pub fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}
