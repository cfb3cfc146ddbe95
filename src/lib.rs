pub mod api;
pub mod auth;
pub mod bot;
pub mod config;
pub mod responder;

// Re-export the main error types for convenience
pub use api::youtube::ApiError;
pub use auth::AuthError;
pub use bot::BotError;

// Re-export the core domain types
pub use api::live_chat::{
    ChatMessage, ChatPage, LiveChatId, MessageKind, OutboundReply, PageToken, VideoId,
};
pub use api::youtube::{ChatApi, YouTubeChatApi};
pub use auth::{AuthMode, Credential, CredentialStore, OauthTokenProvider, TokenProvider};
pub use bot::{BotOptions, LiveChatBot, RunSummary, StopReason};
pub use config::{AppConfig, ConfigManager};
pub use responder::{Clock, MessageResponder, SystemClock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Test that the main modules are accessible
        assert!(std::any::type_name::<api::live_chat::ChatPage>().contains("ChatPage"));
        assert!(std::any::type_name::<api::youtube::YouTubeChatApi>().contains("YouTubeChatApi"));
        assert!(std::any::type_name::<auth::CredentialStore>().contains("CredentialStore"));
    }

    #[test]
    fn test_error_types_re_exported() {
        // Test that error types are available from the crate root
        let _api_error = ApiError::NotFound;
        let _auth_error = AuthError::NotRefreshable;
        let _bot_error = BotError::PermissionDenied;
    }

    #[test]
    fn test_data_structures_creation() {
        let video_id = VideoId("dQw4w9WgXcQ".to_string());
        assert_eq!(video_id.0, "dQw4w9WgXcQ");

        let message = ChatMessage {
            author: "Alice".to_string(),
            text: "hello".to_string(),
            kind: MessageKind::TextMessage,
        };
        assert_eq!(message.kind, MessageKind::TextMessage);

        let reply = OutboundReply {
            live_chat_id: LiveChatId("chat".to_string()),
            text: "Hello Alice! 👋".to_string(),
        };
        assert!(reply.text.starts_with("Hello"));
    }
}
