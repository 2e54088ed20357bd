#[derive(Debug, Clone)]
pub struct ChatMessage(String);

impl ChatMessage {
    pub fn parse(message: String) -> Result<ChatMessage, String> {
        let message = message.trim();

        if message.is_empty() {
            return Err("chat message is empty".to_string());
        }

        Ok(Self(message.to_string()))
    }
}

impl AsRef<str> for ChatMessage {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
