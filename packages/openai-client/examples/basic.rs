//! Basic chat completion usage.
//!
//! Run with OPENAI_API_KEY set:
//!     cargo run -p openai-client --example basic

use openai_client::{ChatRequest, Message, OpenAIClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = OpenAIClient::from_env()?;

    let response = client
        .chat_completion(
            ChatRequest::new("gpt-4.1")
                .message(Message::system("You are a helpful assistant."))
                .message(Message::user("What is a content strategy, in one sentence?"))
                .temperature(0.7)
                .max_tokens(100),
        )
        .await?;

    println!("Response: {}", response.content);
    if let Some(usage) = response.usage {
        println!("Tokens used: {}", usage.total_tokens);
    }

    Ok(())
}
