// Chat module
// Retrieval, prompt assembly and generation for one conversation turn

pub mod conversation;
pub mod generator;
pub mod prompt;
pub mod retriever;
pub mod session;

pub use conversation::{Conversation, ConversationTurn, Speaker};
pub use generator::{ChatClient, GenerationError, ResponseGenerator};
pub use prompt::{DISCLAIMER, HISTORY_WINDOW, compose_prompt};
pub use retriever::{
    ContextRetriever, NO_RELEVANT_INFORMATION, RetrievalDiagnostics, RetrievalResult,
    TracingDiagnostics,
};
pub use session::{ChatSession, SessionState, TurnRenderer};
