use url::Url;

use super::*;
use crate::utils::ai_client::DEFAULT_MAX_TOKENS;
use crate::utils::gateway::ChatGateway;
use crate::utils::personas::persona;

/// Where the invoking message points for an image, before looking at the
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageContext {
    /// The command message carries an attachment.
    Attachment(String),
    /// The command replies to a message, which may or may not carry one.
    Reply(Option<String>),
    /// Neither; the first argument may still be a link.
    Bare,
}

/// The image to analyze and the custom question, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTarget {
    pub url: Option<String>,
    pub prompt: Option<String>,
}

fn is_web_url(token: &str) -> bool {
    Url::parse(token).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Picks the image and prompt. Attachments win over a reply, which wins over
/// a URL argument; the remaining arguments form the prompt.
pub fn pick_image(context: ImageContext, args: &[String]) -> ImageTarget {
    match context {
        ImageContext::Attachment(url) => ImageTarget {
            url: Some(url),
            prompt: join_args(args),
        },
        ImageContext::Reply(url) => ImageTarget {
            url,
            prompt: join_args(args),
        },
        ImageContext::Bare => match args.split_first() {
            Some((first, rest)) if is_web_url(first) => ImageTarget {
                url: Some(first.clone()),
                prompt: join_args(rest),
            },
            _ => ImageTarget {
                url: None,
                prompt: join_args(args),
            },
        },
    }
}

/// Get Coonbot's take on an image
///
/// Attach an image, reply to a message with one, or pass a link:
/// `!image_opinion [grok|openai] [url] [question]`
#[poise::command(prefix_command, category = "AI")]
pub async fn image_opinion(
    ctx: Context<'_>,
    #[description = "Optional provider, image URL and question"]
    #[rest]
    args: Option<String>,
) -> CommandResult {
    let tokens = split_args(args.as_deref());
    let (provider, rest) = extract_provider(&tokens, Provider::OpenAi);

    let context = match invoking_message(ctx) {
        Some(msg) if !msg.attachments.is_empty() => {
            ImageContext::Attachment(msg.attachments[0].url.clone())
        }
        Some(msg) => match msg.message_reference.as_ref().and_then(|r| r.message_id) {
            Some(reply_id) => match gateway(ctx).fetch_message(ctx.channel_id(), reply_id).await {
                Ok(replied) => ImageContext::Reply(replied.attachment_urls.into_iter().next()),
                Err(e) => {
                    error!(error = %e, "failed to fetch referenced message");
                    ctx.say(format!("Could not fetch replied message: {e}"))
                        .await?;
                    return Ok(());
                }
            },
            None => ImageContext::Bare,
        },
        None => ImageContext::Bare,
    };

    let ImageTarget {
        url: Some(image_url),
        prompt,
    } = pick_image(context, rest)
    else {
        ctx.say(
            "Please attach an image, provide a valid image URL (starting with http/https), \
             or reply to a message with an image.",
        )
        .await?;
        return Ok(());
    };

    ctx.say("Analyzing image, one sec...").await?;
    if provider == Provider::OpenAi {
        send_thinking_message(ctx, provider, provider.vision_model()).await?;
    }

    let request = ImageRequest {
        image_url,
        system: persona(provider),
        prompt,
        max_tokens: DEFAULT_MAX_TOKENS,
    };

    answer_image(ctx, provider, request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(text: &str) -> Vec<String> {
        split_args(Some(text))
    }

    #[test]
    fn test_attachment_wins_and_all_args_are_prompt() {
        let target = pick_image(
            ImageContext::Attachment("https://cdn.example/cat.png".into()),
            &args("https://elsewhere.example/dog.png is this cute"),
        );

        assert_eq!(target.url.as_deref(), Some("https://cdn.example/cat.png"));
        assert_eq!(
            target.prompt.as_deref(),
            Some("https://elsewhere.example/dog.png is this cute")
        );
    }

    #[test]
    fn test_reply_without_attachment_has_no_image() {
        let target = pick_image(ImageContext::Reply(None), &args("https://a.example/x.png"));
        assert_eq!(target.url, None);
    }

    #[test]
    fn test_url_argument_with_question() {
        let target = pick_image(
            ImageContext::Bare,
            &args("http://img.example/pic.jpg rate my fit"),
        );

        assert_eq!(
            target,
            ImageTarget {
                url: Some("http://img.example/pic.jpg".into()),
                prompt: Some("rate my fit".into()),
            }
        );
    }

    #[test]
    fn test_non_url_argument_is_only_a_prompt() {
        let target = pick_image(ImageContext::Bare, &args("ftp://old.example/pic.jpg nice?"));

        assert_eq!(target.url, None);
        assert_eq!(target.prompt.as_deref(), Some("ftp://old.example/pic.jpg nice?"));
    }

    #[test]
    fn test_malformed_link_is_not_an_image() {
        let target = pick_image(ImageContext::Bare, &args("https:// nope"));
        assert_eq!(target.url, None);
    }

    #[test]
    fn test_nothing_at_all() {
        assert_eq!(
            pick_image(ImageContext::Bare, &[]),
            ImageTarget {
                url: None,
                prompt: None
            }
        );
    }
}
