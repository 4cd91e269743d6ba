
use tracing::{debug, warn};

use super::conversation::{Conversation, ConversationTurn, Speaker};
use super::generator::ResponseGenerator;
use super::prompt::{HISTORY_WINDOW, compose_prompt};
use super::retriever::{ContextRetriever, DEFAULT_N_RESULTS};
use crate::{LawError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Generating,
}

/// Presentation of a running session
pub trait TurnRenderer: Send {
    fn render_turn(&mut self, turn: &ConversationTurn);

    fn set_state(&mut self, state: SessionState);

    /// Shown in place of the assistant's answer
    fn render_error(&mut self, error: &LawError);
}

/// Retrieve, compose and generate for each user message
pub struct ChatSession {
    retriever: ContextRetriever,
    generator: Box<dyn ResponseGenerator>,
    n_results: usize,
    state: SessionState,
}

impl ChatSession {
    #[inline]
    pub fn new(retriever: ContextRetriever, generator: Box<dyn ResponseGenerator>) -> Self {
        Self {
            retriever,
            generator,
            n_results: DEFAULT_N_RESULTS,
            state: SessionState::Idle,
        }
    }

    #[inline]
    pub fn with_n_results(mut self, n_results: usize) -> Self {
        self.n_results = n_results;
        self
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn retriever(&self) -> &ContextRetriever {
        &self.retriever
    }

    /// Answer `query` given the turns that came before it
    #[inline]
    pub async fn answer(&self, history: &[ConversationTurn], query: &str) -> Result<String> {
        let retrieval = self.retriever.retrieve(query, self.n_results).await?;
        debug!(
            "Composing prompt with {} history turns and {} chunks",
            history.len(),
            retrieval.metadatas.len()
        );

        let prompt = compose_prompt(history, &retrieval.context, query);
        Ok(self.generator.generate(&prompt)?)
    }

    /// Run one user turn
    ///
    /// The user's message is always recorded. The answer is recorded only
    /// when every step succeeds; on failure the error is rendered and
    /// returned, and the conversation can continue.
    #[inline]
    pub async fn submit(
        &mut self,
        conversation: &mut Conversation,
        input: &str,
        renderer: &mut dyn TurnRenderer,
    ) -> Result<String> {
        let history = conversation.recent(HISTORY_WINDOW).to_vec();

        conversation.push(Speaker::You, input);
        if let Some(turn) = conversation.turns().last() {
            renderer.render_turn(turn);
        }

        self.transition(SessionState::Generating, renderer);
        let result = self.answer(&history, input).await;
        self.transition(SessionState::Idle, renderer);

        match result {
            Ok(answer) => {
                conversation.push(Speaker::Bot, answer.clone());
                if let Some(turn) = conversation.turns().last() {
                    renderer.render_turn(turn);
                }
                Ok(answer)
            }
            Err(e) => {
                warn!("Chat turn failed: {}", e);
                renderer.render_error(&e);
                Err(e)
            }
        }
    }

    fn transition(&mut self, state: SessionState, renderer: &mut dyn TurnRenderer) {
        self.state = state;
        renderer.set_state(state);
    }
}
