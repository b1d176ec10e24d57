use chrono::Utc;

use showroom_agent::conversation::ConversationSession;
use showroom_core::filters::{FilterSet, Pagination};
use showroom_core::history::SearchRecord;

use crate::room::{assign_room, ConnectionIdentity};

/// Everything one live connection owns: its resolved identity and room,
/// and the conversational state (accumulated preferences, bounded
/// search history, last result page). Exclusively owned by the
/// connection's task; no locking needed.
pub struct ConnectionSession {
    pub identity: ConnectionIdentity,
    pub room: String,
    pub conversation: ConversationSession,
}

impl ConnectionSession {
    pub fn new(identity: ConnectionIdentity) -> Self {
        let room = assign_room(&identity);
        Self { identity, room, conversation: ConversationSession::new() }
    }

    pub fn user_label(&self) -> String {
        self.identity.user_label()
    }

    /// Feeds the bounded history. Only `search_cars` outcomes arrive
    /// here; failed searches are recorded with a zero count and the
    /// success flag down.
    pub fn record_search(
        &mut self,
        filters: FilterSet,
        pagination: &Pagination,
        result_count: u64,
        success: bool,
    ) {
        self.conversation.history.record(SearchRecord {
            timestamp: Utc::now(),
            filters,
            page: pagination.page,
            page_size: pagination.page_size,
            result_count,
            success,
        });
    }

    pub fn search_count(&self) -> usize {
        self.conversation.history.len()
    }
}

#[cfg(test)]
mod tests {
    use showroom_core::filters::{FilterSet, Pagination};

    use super::ConnectionSession;
    use crate::room::ConnectionIdentity;

    #[test]
    fn session_resolves_its_room_on_creation() {
        let session = ConnectionSession::new(ConnectionIdentity {
            user_id: Some("7".to_string()),
            anonymous_id: None,
            session_key: Some("abc".to_string()),
        });
        assert_eq!(session.room, "user_7_abc");
        assert_eq!(session.user_label(), "user:7");
        assert_eq!(session.search_count(), 0);
    }

    #[test]
    fn recorded_searches_accumulate_in_the_bounded_history() {
        let mut session = ConnectionSession::new(ConnectionIdentity::default());
        for _ in 0..60 {
            session.record_search(FilterSet::default(), &Pagination::default(), 3, true);
        }
        assert_eq!(session.search_count(), 50, "history is capped at fifty entries");
    }
}
