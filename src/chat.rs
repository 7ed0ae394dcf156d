//! Chat-completion characters: the poet, the critic, and the daydream artist

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One message in a chat history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user", or "assistant"
    pub role: String,

    /// Message text
    pub content: String,
}

/// A chat completion, with token accounting for cost logging
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Assistant message text
    pub content: String,

    /// Total tokens billed for the exchange
    pub total_tokens: u64,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    usage: CompletionUsage,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct CompletionUsage {
    total_tokens: u64,
}

/// A stateful chat character: a fixed system prompt plus running history
///
/// Single-turn characters (poet, critic) call [`ChatCharacter::reset`]
/// before each exchange; the daydream artist keeps its history across a
/// session so consecutive daydreams drift.
pub struct ChatCharacter {
    client: reqwest::Client,
    api_key: String,
    model: String,
    system_prompt: String,
    messages: Vec<ChatMessage>,
}

impl ChatCharacter {
    /// Create a character with its system prompt
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: String, model: String, system_prompt: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for chat".to_string(),
            ));
        }

        let mut character = Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            system_prompt,
            messages: Vec::new(),
        };
        character.reset();

        Ok(character)
    }

    /// Drop the history back to just the system prompt
    pub fn reset(&mut self) {
        self.messages = vec![ChatMessage {
            role: "system".to_string(),
            content: self.system_prompt.clone(),
        }];
    }

    /// Send a user message and record the assistant reply in the history
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails or returns no choices
    pub async fn send(&mut self, message: &str) -> Result<ChatResponse> {
        self.messages.push(ChatMessage {
            role: "user".to_string(),
            content: message.to_string(),
        });

        let request = CompletionRequest {
            model: &self.model,
            messages: &self.messages,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::Chat(format!("chat error {status}: {body}")));
        }

        let completion: CompletionResponse = response.json().await?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Chat("no choices in completion".to_string()))?;

        self.messages.push(choice.message.clone());

        tracing::debug!(
            model = %self.model,
            total_tokens = completion.usage.total_tokens,
            "chat exchange complete"
        );

        Ok(ChatResponse {
            content: choice.message.content,
            total_tokens: completion.usage.total_tokens,
        })
    }
}

/// Get one verse from the poet for a theme
///
/// # Errors
///
/// Returns error if the chat call fails
pub async fn one_verse(
    poet: &mut ChatCharacter,
    base_prompt: &str,
    theme: &str,
) -> Result<String> {
    // Single-turn character, no history wanted
    poet.reset();
    let response = poet.send(&format!("{base_prompt} {theme}")).await?;
    Ok(response.content)
}

/// Collect several verses and let the critic pick the best
///
/// The critic is asked to answer with a poem number; the first digit found
/// in its verdict selects the verse. A verdict with no digit falls back to a
/// random verse rather than failing the creation.
///
/// # Errors
///
/// Returns error if any chat call fails
pub async fn best_verse(
    poet: &mut ChatCharacter,
    critic: &mut ChatCharacter,
    base_prompt: &str,
    theme: &str,
    num_verses: usize,
) -> Result<String> {
    let mut verses = Vec::with_capacity(num_verses);
    for _ in 0..num_verses {
        verses.push(one_verse(poet, base_prompt, theme).await?);
    }

    critic.reset();

    let mut critic_message = format!("Theme: {theme}\n");
    for (i, verse) in verses.iter().enumerate() {
        critic_message.push_str(&format!("Poem {}: {verse}\n", i + 1));
    }

    tracing::info!(
        message = %critic_message.trim().replace('\n', "/"),
        "critic message"
    );

    let verdict = critic.send(&critic_message).await?.content;
    tracing::info!(verdict = %verdict, "critic verdict");

    match parse_critic_choice(&verdict, verses.len()) {
        Some(index) => Ok(verses.swap_remove(index)),
        None => {
            tracing::warn!("no usable poem number in critic verdict, picking at random");
            let index = rand::Rng::gen_range(&mut rand::thread_rng(), 0..verses.len());
            Ok(verses.swap_remove(index))
        }
    }
}

/// Extract the chosen poem index (0-based) from a critic verdict
///
/// Takes the first ASCII digit in the verdict; out-of-range numbers and
/// digit-free verdicts yield `None`.
#[must_use]
pub fn parse_critic_choice(verdict: &str, num_verses: usize) -> Option<usize> {
    let digit = verdict.chars().find(char::is_ascii_digit)?;
    let number = digit.to_digit(10)? as usize;

    if number >= 1 && number <= num_verses {
        Some(number - 1)
    } else {
        None
    }
}
