//! 渠道适配器：Telegram 长轮询与 Instagram Webhook

#[cfg(feature = "instagram")]
pub mod instagram;
pub mod telegram;

pub use telegram::TelegramChannel;

#[cfg(feature = "instagram")]
pub use instagram::{create_router as create_instagram_router, IgState, InstagramChannel};
