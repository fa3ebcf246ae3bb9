use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{RunEvent, RunEventKind};

/// Almacenamiento de eventos append-only.
///
/// Se comparte entre batches que corren en paralelo, por eso trabaja con
/// `&self`.
pub trait EventStore: Send + Sync {
    /// Agrega un evento y devuelve el evento completo (con seq y ts).
    fn append_kind(&self, batch_id: Uuid, kind: RunEventKind) -> RunEvent;
    /// Lista eventos de un batch (orden ascendente por seq).
    fn list(&self, batch_id: Uuid) -> Vec<RunEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: DashMap<Uuid, Vec<RunEvent>>,
}

impl InMemoryEventStore {
    pub fn batch_ids(&self) -> Vec<Uuid> {
        self.inner.iter().map(|e| *e.key()).collect()
    }
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&self, batch_id: Uuid, kind: RunEventKind) -> RunEvent {
        let mut events = self.inner.entry(batch_id).or_default();
        let ev = RunEvent { seq: events.len() as u64,
                            batch_id,
                            kind,
                            ts: Utc::now() };
        events.push(ev.clone());
        ev
    }

    fn list(&self, batch_id: Uuid) -> Vec<RunEvent> {
        self.inner.get(&batch_id).map(|e| e.value().clone()).unwrap_or_default()
    }
}

impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    fn append_kind(&self, batch_id: Uuid, kind: RunEventKind) -> RunEvent {
        (**self).append_kind(batch_id, kind)
    }

    fn list(&self, batch_id: Uuid) -> Vec<RunEvent> {
        (**self).list(batch_id)
    }
}
