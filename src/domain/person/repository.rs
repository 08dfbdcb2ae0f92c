use super::person::Person;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum PersonRepositoryError {
    #[error("repository failure: {0}")]
    InternalError(String),
}

/// Storage port for persons. Implementations own the canonical copy and any
/// concurrency control on it.
#[async_trait::async_trait]
pub trait PersonRepository: PersonClone + Send + Sync {
    /// Inserts or replaces `person`, assigning a fresh id when it has none.
    async fn save(&self, person: Person) -> Result<Person, PersonRepositoryError>;
    async fn find_all(&self) -> Result<Vec<Person>, PersonRepositoryError>;
    async fn find_one(&self, id: &Uuid) -> Result<Option<Person>, PersonRepositoryError>;
    /// Removing an id that is not stored is not an error.
    async fn delete(&self, id: &Uuid) -> Result<(), PersonRepositoryError>;
}
pub trait PersonClone {
    fn clone_box(&self) -> Box<dyn PersonRepository>;
}

impl<T> PersonClone for T
where
    T: 'static + PersonRepository + Clone,
{
    fn clone_box(&self) -> Box<dyn PersonRepository> {
        Box::new(self.clone())
    }
}

// We can now implement Clone manually by forwarding to clone_box.
impl Clone for Box<dyn PersonRepository> {
    fn clone(&self) -> Box<dyn PersonRepository> {
        self.clone_box()
    }
}

#[cfg(test)]
pub mod mock {
    use async_trait::async_trait;
    use mockall::mock;
    use uuid::Uuid;

    use super::{PersonRepository, PersonRepositoryError};
    use crate::domain::person::Person;

    mock! {
        pub Repository {}
        impl Clone for Repository {
            fn clone(&self) -> Self;
        }
        #[async_trait]
        impl PersonRepository for Repository {
            async fn save(&self, person: Person) -> Result<Person, PersonRepositoryError>;
            async fn find_all(&self) -> Result<Vec<Person>, PersonRepositoryError>;
            async fn find_one(&self, id: &Uuid) -> Result<Option<Person>, PersonRepositoryError>;
            async fn delete(&self, id: &Uuid) -> Result<(), PersonRepositoryError>;
        }
    }
}
