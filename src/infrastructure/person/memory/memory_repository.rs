use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::person::{Person, PersonRepository, PersonRepositoryError};

/// Process-local person storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersonRepository {
    people: Arc<RwLock<HashMap<Uuid, Person>>>,
}

impl InMemoryPersonRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PersonRepository for InMemoryPersonRepository {
    async fn save(&self, mut person: Person) -> Result<Person, PersonRepositoryError> {
        let id = match person.id() {
            Some(id) => *id,
            None => {
                let id = Uuid::new_v4();
                person.set_id(id);
                id
            }
        };
        self.people.write().await.insert(id, person.clone());
        Ok(person)
    }

    async fn find_all(&self) -> Result<Vec<Person>, PersonRepositoryError> {
        let mut people: Vec<Person> = self.people.read().await.values().cloned().collect();
        people.sort_by(|a, b| {
            a.created_date()
                .cmp(&b.created_date())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(people)
    }

    async fn find_one(&self, id: &Uuid) -> Result<Option<Person>, PersonRepositoryError> {
        Ok(self.people.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), PersonRepositoryError> {
        self.people.write().await.remove(id);
        Ok(())
    }
}
