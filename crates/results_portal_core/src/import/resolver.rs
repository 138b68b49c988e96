//! Find-or-create resolution of sessions, classes and exams named in a sheet.
//!
//! A resolver lives for exactly one import run. Its cache maps each lookup key
//! to the id the store handed back, so a file that names the same exam on
//! hundreds of rows costs one lookup (and at most one insert) per entity.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{is_upcoming_on, NewClass, NewExam};
use crate::ports::{PortResult, ResultStore};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Session(String),
    Class(String, Option<Uuid>),
    Exam(String, String),
}

/// Entities inserted by a run because no existing record matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CreatedEntities {
    pub sessions: usize,
    pub classes: usize,
    pub exams: usize,
}

pub struct EntityResolver<'a> {
    store: &'a dyn ResultStore,
    today: NaiveDate,
    cache: HashMap<CacheKey, Uuid>,
    created: CreatedEntities,
}

impl<'a> EntityResolver<'a> {
    /// `today` decides the `is_upcoming` flag of exams created by this run.
    pub fn new(store: &'a dyn ResultStore, today: NaiveDate) -> Self {
        Self {
            store,
            today,
            cache: HashMap::new(),
            created: CreatedEntities::default(),
        }
    }

    pub fn created(&self) -> CreatedEntities {
        self.created
    }

    /// Returns `None` for a blank name.
    pub async fn resolve_session(&mut self, name: &str) -> PortResult<Option<Uuid>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let key = CacheKey::Session(name.to_string());
        if let Some(id) = self.cache.get(&key) {
            return Ok(Some(*id));
        }

        let id = match self.store.find_session_by_name(name).await? {
            Some(session) => session.id,
            None => {
                let session = self.store.insert_session(name).await?;
                debug!("Created session '{}' ({})", name, session.id);
                self.created.sessions += 1;
                session.id
            }
        };
        self.cache.insert(key, id);
        Ok(Some(id))
    }

    /// Must run after the session is resolved; the session id is stored on
    /// newly created classes. Lookup itself matches by name only.
    pub async fn resolve_class(
        &mut self,
        name: &str,
        session_id: Option<Uuid>,
    ) -> PortResult<Option<Uuid>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let key = CacheKey::Class(name.to_string(), session_id);
        if let Some(id) = self.cache.get(&key) {
            return Ok(Some(*id));
        }

        let id = match self.store.find_class_by_name(name).await? {
            Some(class) => class.id,
            None => {
                let class = self
                    .store
                    .insert_class(NewClass {
                        name: name.to_string(),
                        session_id,
                    })
                    .await?;
                debug!("Created class '{}' ({})", name, class.id);
                self.created.classes += 1;
                class.id
            }
        };
        self.cache.insert(key, id);
        Ok(Some(id))
    }

    /// Needs both a name and a date; either blank yields `None`.
    pub async fn resolve_exam(
        &mut self,
        name: &str,
        date: &str,
        class_id: Option<Uuid>,
        session_id: Option<Uuid>,
    ) -> PortResult<Option<Uuid>> {
        let (name, date) = (name.trim(), date.trim());
        if name.is_empty() || date.is_empty() {
            return Ok(None);
        }
        let key = CacheKey::Exam(name.to_string(), date.to_string());
        if let Some(id) = self.cache.get(&key) {
            return Ok(Some(*id));
        }

        let id = match self.store.find_exam(name, date).await? {
            Some(exam) => exam.id,
            None => {
                let exam = self
                    .store
                    .insert_exam(NewExam {
                        exam_name: name.to_string(),
                        exam_date: date.to_string(),
                        class_id,
                        session_id,
                        is_upcoming: is_upcoming_on(date, self.today),
                    })
                    .await?;
                debug!("Created exam '{}' on {} ({})", name, date, exam.id);
                self.created.exams += 1;
                exam.id
            }
        };
        self.cache.insert(key, id);
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn repeated_names_hit_the_store_once() {
        let store = MemoryStore::new();
        let mut resolver = EntityResolver::new(&store, today());

        let first = resolver.resolve_session("2026").await.unwrap();
        let second = resolver.resolve_session(" 2026 ").await.unwrap();
        assert_eq!(first, second);

        let c1 = resolver.resolve_class("Class 5", first).await.unwrap();
        let c2 = resolver.resolve_class("Class 5", first).await.unwrap();
        assert_eq!(c1, c2);

        let e1 = resolver
            .resolve_exam("GK 2026", "2026-02-08", c1, first)
            .await
            .unwrap();
        let e2 = resolver
            .resolve_exam("GK 2026", "2026-02-08", c1, first)
            .await
            .unwrap();
        assert_eq!(e1, e2);

        let calls = store.calls();
        assert_eq!(calls.session_lookups, 1);
        assert_eq!(calls.session_inserts, 1);
        assert_eq!(calls.class_lookups, 1);
        assert_eq!(calls.class_inserts, 1);
        assert_eq!(calls.exam_lookups, 1);
        assert_eq!(calls.exam_inserts, 1);
        assert_eq!(
            resolver.created(),
            CreatedEntities {
                sessions: 1,
                classes: 1,
                exams: 1
            }
        );
    }

    #[tokio::test]
    async fn existing_entities_are_reused() {
        let store = MemoryStore::new();
        let existing = store.insert_session("2025").await.unwrap();

        let mut resolver = EntityResolver::new(&store, today());
        let id = resolver.resolve_session("2025").await.unwrap();

        assert_eq!(id, Some(existing.id));
        assert_eq!(resolver.created().sessions, 0);
    }

    #[tokio::test]
    async fn blank_names_resolve_to_none() {
        let store = MemoryStore::new();
        let mut resolver = EntityResolver::new(&store, today());

        assert_eq!(resolver.resolve_session("   ").await.unwrap(), None);
        assert_eq!(resolver.resolve_class("", None).await.unwrap(), None);
        assert_eq!(
            resolver.resolve_exam("GK", "", None, None).await.unwrap(),
            None
        );
        assert_eq!(store.calls().session_lookups, 0);
    }

    #[tokio::test]
    async fn class_name_is_shared_across_sessions() {
        let store = MemoryStore::new();
        let mut resolver = EntityResolver::new(&store, today());

        let s1 = resolver.resolve_session("2025").await.unwrap();
        let s2 = resolver.resolve_session("2026").await.unwrap();
        let c1 = resolver.resolve_class("Class 5", s1).await.unwrap();
        let c2 = resolver.resolve_class("Class 5", s2).await.unwrap();

        assert_eq!(c1, c2);
        assert_eq!(resolver.created().classes, 1);
    }

    #[tokio::test]
    async fn new_exams_carry_the_upcoming_flag() {
        let store = MemoryStore::new();
        let mut resolver = EntityResolver::new(&store, today());

        let future = resolver
            .resolve_exam("GK", "2026-02-08", None, None)
            .await
            .unwrap()
            .unwrap();
        let past = resolver
            .resolve_exam("GK", "2025-02-08", None, None)
            .await
            .unwrap()
            .unwrap();

        assert!(store.get_exam(future).await.unwrap().is_upcoming);
        assert!(!store.get_exam(past).await.unwrap().is_upcoming);
    }
}
