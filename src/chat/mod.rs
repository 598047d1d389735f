pub mod event;
pub mod render;
pub mod telegram;

use async_trait::async_trait;

use crate::error::AppError;
use render::RenderInstruction;

/// Outgoing half of the chat transport. Session workers reply through this
/// seam, so the dispatcher stays independent of the concrete Telegram
/// client.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_message(
        &self,
        chat_id: i64,
        instruction: &RenderInstruction,
    ) -> Result<(), AppError>;

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        instruction: &RenderInstruction,
    ) -> Result<(), AppError>;
}
