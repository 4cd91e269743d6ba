
use itertools::Itertools;

use super::conversation::ConversationTurn;

/// Number of prior turns shown to the model
pub const HISTORY_WINDOW: usize = 6;

/// Closing line every answer is asked to carry
pub const DISCLAIMER: &str = "Note: This information is for general awareness and not legal advice.";

/// `"{speaker}: {message}"` per turn, oldest first, at most [`HISTORY_WINDOW`] turns
#[inline]
pub fn render_history(turns: &[ConversationTurn]) -> String {
    let start = turns.len().saturating_sub(HISTORY_WINDOW);
    turns[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.speaker, turn.message))
        .join("\n")
}

/// Instruction text sent to the language model for one question
#[inline]
pub fn compose_prompt(history: &[ConversationTurn], context: &str, query: &str) -> String {
    let history = render_history(history);

    format!(
        "You are a knowledgeable and conversational AI legal assistant.\n\
         Your specialization is in Indian women's legal rights.\n\
         Use the context below and the conversation so far to respond naturally and accurately.\n\
         \n\
         --- Previous conversation ---\n\
         {history}\n\
         \n\
         --- Knowledge base context ---\n\
         {context}\n\
         \n\
         --- User Query ---\n\
         {query}\n\
         \n\
         Your task:\n\
         - If the user asks for a shorter answer, summarize concisely (2–3 lines).\n\
         - If the user asks for details, give a structured explanation.\n\
         - Always maintain politeness and clarity.\n\
         - End with: \"{DISCLAIMER}\"\n"
    )
}
