// Concierge Engine — Record Store
//
// The seam behind the todos and calendar tools. Persistence lives outside
// this crate; the engine only reads through this trait. The in-memory
// implementation backs single-process deployments and tests.

use crate::atoms::error::EngineResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    /// RFC 3339 start time.
    pub start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Open todos, oldest first.
    async fn todos(&self) -> EngineResult<Vec<TodoItem>>;

    /// Upcoming calendar events, soonest first.
    async fn calendar_events(&self) -> EngineResult<Vec<CalendarEvent>>;
}

// ── In-memory implementation ───────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryRecordStore {
    todos: RwLock<Vec<TodoItem>>,
    events: RwLock<Vec<CalendarEvent>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_todo(&self, item: TodoItem) {
        self.todos.write().await.push(item);
    }

    pub async fn add_event(&self, event: CalendarEvent) {
        self.events.write().await.push(event);
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn todos(&self) -> EngineResult<Vec<TodoItem>> {
        Ok(self.todos.read().await.iter().filter(|t| !t.done).cloned().collect())
    }

    async fn calendar_events(&self) -> EngineResult<Vec<CalendarEvent>> {
        let mut events = self.events.read().await.clone();
        events.sort_by(|a, b| a.start.cmp(&b.start));
        Ok(events)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_todos_filters_done() {
        let store = InMemoryRecordStore::new();
        store.add_todo(TodoItem { title: "buy milk".into(), due: None, done: false }).await;
        store.add_todo(TodoItem { title: "old task".into(), due: None, done: true }).await;
        let todos = store.todos().await.unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "buy milk");
    }

    #[tokio::test]
    async fn test_events_sorted_by_start() {
        let store = InMemoryRecordStore::new();
        store
            .add_event(CalendarEvent {
                title: "later".into(),
                start: "2026-09-02T10:00:00Z".into(),
                location: None,
            })
            .await;
        store
            .add_event(CalendarEvent {
                title: "sooner".into(),
                start: "2026-09-01T10:00:00Z".into(),
                location: None,
            })
            .await;
        let events = store.calendar_events().await.unwrap();
        assert_eq!(events[0].title, "sooner");
    }
}
