use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use showroom_core::catalog::{CarRecord, SearchPage};
use showroom_core::errors::ServiceError;
use showroom_core::filters::{FilterSet, Pagination, CONVERSATION_PAGE_SIZE};
use showroom_core::history::{SearchHistory, SearchRecord};
use showroom_core::preferences::PreferenceMap;

use crate::extract::{is_refinement_request, PreferenceExtractor};
use crate::format;
use crate::generation::TextGenerator;
use crate::prompts;

/// Where a conversation stands after its latest turn. Terminal only at
/// connection close; `NoResults` and `ResultsPresented` both accept
/// further refinement turns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConversationState {
    #[default]
    Collecting,
    Searching,
    ResultsPresented,
    NoResults,
}

/// Catalog access as the conversation sees it. The gateway and the CLI
/// adapt the real store behind this seam; tests script it.
#[async_trait]
pub trait CarSearcher: Send + Sync {
    async fn search(
        &self,
        filters: &FilterSet,
        pagination: &Pagination,
    ) -> Result<SearchPage, ServiceError>;
}

/// Conversational state owned by one connection: the accumulated
/// preference map, the bounded search history, and the latest result
/// page kept for refinement context.
#[derive(Default)]
pub struct ConversationSession {
    pub preferences: PreferenceMap,
    pub history: SearchHistory,
    pub last_results: Vec<CarRecord>,
    pub state: ConversationState,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self { history: SearchHistory::new(), ..Self::default() }
    }
}

/// Drives one turn of the conversation: extract, merge, then either ask
/// the highest-priority clarifying question or search and present.
pub struct ConversationEngine {
    generator: Arc<dyn TextGenerator>,
    extractor: PreferenceExtractor,
    searcher: Arc<dyn CarSearcher>,
}

impl ConversationEngine {
    pub fn new(generator: Arc<dyn TextGenerator>, searcher: Arc<dyn CarSearcher>) -> Self {
        Self {
            extractor: PreferenceExtractor::new(generator.clone()),
            generator,
            searcher,
        }
    }

    /// Processes one user turn. Failures inside the turn never escape:
    /// they are logged and converted into an apologetic reply, and the
    /// connection stays usable.
    pub async fn take_turn(&self, session: &mut ConversationSession, user_input: &str) -> String {
        match self.try_turn(session, user_input).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    event_name = "agent.conversation.turn_failed",
                    error = %error,
                    "conversation turn degraded to an apology"
                );
                session.state = ConversationState::Collecting;
                format::TURN_FAILURE_MESSAGE.to_string()
            }
        }
    }

    async fn try_turn(
        &self,
        session: &mut ConversationSession,
        user_input: &str,
    ) -> Result<String, ServiceError> {
        let refinement = is_refinement_request(user_input, !session.last_results.is_empty());
        let context: &[CarRecord] = if refinement { &session.last_results } else { &[] };

        let extracted = self.extractor.extract(user_input, context).await;
        session.preferences = PreferenceMap::merged(&session.preferences, &extracted);

        if !session.preferences.has_any_value() {
            session.state = ConversationState::Collecting;
            return Ok(self.clarifying_question(&session.preferences).await);
        }

        session.state = ConversationState::Searching;
        let filters = FilterSet::from_preferences(&session.preferences);
        let pagination =
            Pagination { page_size: CONVERSATION_PAGE_SIZE, ..Pagination::default() };

        debug!(
            event_name = "agent.conversation.search",
            refinement,
            "searching the catalog for the conversational surface"
        );
        let page = self.searcher.search(&filters, &pagination).await?;

        if page.total > 0 {
            session.history.record(SearchRecord {
                timestamp: Utc::now(),
                filters,
                page: pagination.page,
                page_size: pagination.page_size,
                result_count: page.total,
                success: true,
            });
            session.last_results = page.results.clone();
            session.state = ConversationState::ResultsPresented;
            Ok(format::format_results(&page.results, &session.preferences))
        } else {
            session.state = ConversationState::NoResults;
            Ok(format::NO_RESULTS_MESSAGE.to_string())
        }
    }

    /// Asks about the first missing fact, phrased by the generator when
    /// it cooperates and by a fixed template when it does not.
    async fn clarifying_question(&self, preferences: &PreferenceMap) -> String {
        let missing = preferences.missing_info();
        let Some(first_missing) = missing.first().copied() else {
            return prompts::READY_ACKNOWLEDGEMENT.to_string();
        };

        let request = prompts::question_request(preferences, &missing);
        match self.generator.generate(&request).await {
            Ok(question) if !question.trim().is_empty() => question,
            Ok(_) => prompts::question_template(first_missing).to_string(),
            Err(error) => {
                warn!(
                    event_name = "agent.conversation.question_fallback",
                    error = %error,
                    "question generation fell back to a template"
                );
                prompts::question_template(first_missing).to_string()
            }
        }
    }
}
