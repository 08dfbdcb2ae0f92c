use super::{
    person::Person,
    repository::{PersonRepository, PersonRepositoryError},
};
use chrono::{Local, NaiveDateTime, SubsecRound};
use thiserror::Error;
use tracing::Span;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum PersonManagerError {
    #[error("a person submitted for creation cannot carry an id")]
    IdentifierAlreadySet,
    #[error("person {0} not found")]
    PersonNotFound(Uuid),
    #[error(transparent)]
    Repository(#[from] PersonRepositoryError),
}

/// CRUD rules for persons on top of an injected repository.
///
/// Every operation runs inside the span handed over at construction, so the
/// host decides how the component's logs are scoped.
#[derive(Clone)]
pub struct PersonManager {
    repository: Box<dyn PersonRepository>,
    span: Span,
}

// Stored timestamps keep microsecond precision, like a TIMESTAMP column.
fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(6)
}

impl PersonManager {
    pub fn new(repository: Box<dyn PersonRepository>, span: Span) -> Self {
        return PersonManager { repository, span };
    }

    /// Stores a new person and returns it with its assigned id.
    #[tracing::instrument(parent = &self.span, skip_all)]
    pub async fn create_person(&self, mut person: Person) -> Result<Person, PersonManagerError> {
        tracing::info!(?person, "request to create person");
        if person.id().is_some() {
            return Err(PersonManagerError::IdentifierAlreadySet);
        }
        person.set_created_date(Some(now()));
        person.set_modified_date(None);
        Ok(self.repository.save(person).await?)
    }

    #[tracing::instrument(parent = &self.span, skip_all)]
    pub async fn get_people(&self) -> Result<Vec<Person>, PersonManagerError> {
        tracing::info!("request to fetch all persons");
        Ok(self.repository.find_all().await?)
    }

    #[tracing::instrument(parent = &self.span, skip(self))]
    pub async fn get_person_by_id(&self, id: &Uuid) -> Result<Person, PersonManagerError> {
        tracing::info!("request to fetch person");
        self.repository
            .find_one(id)
            .await?
            .ok_or(PersonManagerError::PersonNotFound(*id))
    }

    /// Replaces the stored person `id` with `person`, keeping its creation date.
    #[tracing::instrument(parent = &self.span, skip(self, person))]
    pub async fn update_person(
        &self,
        id: &Uuid,
        mut person: Person,
    ) -> Result<(), PersonManagerError> {
        tracing::info!(?person, "request to update person");
        let stored = self
            .repository
            .find_one(id)
            .await?
            .ok_or(PersonManagerError::PersonNotFound(*id))?;
        person.set_id(*id);
        person.set_created_date(stored.created_date().copied());
        person.set_modified_date(Some(now()));
        self.repository.save(person).await?;
        Ok(())
    }

    /// Deletes without checking that `id` exists first.
    #[tracing::instrument(parent = &self.span, skip(self))]
    pub async fn delete_person(&self, id: &Uuid) -> Result<(), PersonManagerError> {
        tracing::info!("request to delete person");
        Ok(self.repository.delete(id).await?)
    }
}

#[cfg(test)]
pub mod tests {
    use chrono::NaiveDate;
    use mockall::predicate::eq;
    use serde_json::json;
    use tracing::Span;
    use uuid::Uuid;

    use crate::domain::person::{
        Attributes, MockRepository, Person, PersonManager, PersonManagerError,
        PersonRepositoryError,
    };

    fn manager(repository: MockRepository) -> PersonManager {
        PersonManager::new(Box::new(repository), Span::none())
    }

    fn named(name: &str) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("name".to_owned(), json!(name));
        attributes
    }

    #[tokio::test]
    async fn test_create_person_with_id_is_rejected_before_save() {
        let mut repository = MockRepository::new();
        repository.expect_save().never();
        let person = Person::new(Some(Uuid::new_v4()), named("Ama"), None, None);

        let res = manager(repository).create_person(person).await;

        assert_eq!(res, Err(PersonManagerError::IdentifierAlreadySet));
    }

    #[tokio::test]
    async fn test_create_person_stamps_created_date() {
        let assigned = Uuid::new_v4();
        let mut repository = MockRepository::new();
        repository
            .expect_save()
            .times(1)
            .withf(|p| p.id().is_none() && p.modified_date().is_none())
            .returning(move |mut p| {
                p.set_id(assigned);
                Ok(p)
            });
        let before = super::now();

        let created = manager(repository)
            .create_person(Person::new(None, named("Ama"), None, None))
            .await
            .unwrap();

        let after = super::now();
        assert_eq!(created.id(), Some(&assigned));
        assert_eq!(created.attributes(), &named("Ama"));
        let created_date = *created.created_date().unwrap();
        assert!(created_date >= before && created_date <= after);
    }

    #[tokio::test]
    async fn test_create_person_ignores_client_dates() {
        let mut repository = MockRepository::new();
        repository.expect_save().times(1).returning(|p| Ok(p));
        let forged = NaiveDate::from_ymd_opt(1999, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        let created = manager(repository)
            .create_person(Person::new(None, named("Ama"), Some(forged), Some(forged)))
            .await
            .unwrap();

        assert_ne!(created.created_date(), Some(&forged));
        assert_eq!(created.modified_date(), None);
    }

    #[tokio::test]
    async fn test_get_person_not_found() {
        let id = Uuid::new_v4();
        let mut repository = MockRepository::new();
        repository
            .expect_find_one()
            .with(eq(id))
            .times(1)
            .returning(|_| Ok(None));

        let res = manager(repository).get_person_by_id(&id).await;

        assert_eq!(res, Err(PersonManagerError::PersonNotFound(id)));
    }

    #[tokio::test]
    async fn test_update_person_not_found_does_not_save() {
        let id = Uuid::new_v4();
        let mut repository = MockRepository::new();
        repository.expect_find_one().times(1).returning(|_| Ok(None));
        repository.expect_save().never();

        let res = manager(repository)
            .update_person(&id, Person::new(None, named("Ama K."), None, None))
            .await;

        assert_eq!(res, Err(PersonManagerError::PersonNotFound(id)));
    }

    #[tokio::test]
    async fn test_update_person_keeps_created_date() {
        let id = Uuid::new_v4();
        let created_date = NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_opt(10, 15, 30)
            .unwrap();
        let stored = Person::new(Some(id), named("Ama"), Some(created_date), None);
        let before = super::now();
        let mut repository = MockRepository::new();
        repository
            .expect_find_one()
            .with(eq(id))
            .times(1)
            .returning(move |_| Ok(Some(stored.clone())));
        repository
            .expect_save()
            .times(1)
            .withf(move |p| {
                p.id() == Some(&id)
                    && p.created_date() == Some(&created_date)
                    && p.modified_date().is_some_and(|m| *m >= before)
                    && p.attributes() == &named("Ama K.")
            })
            .returning(|p| Ok(p));

        let res = manager(repository)
            .update_person(&id, Person::new(None, named("Ama K."), None, None))
            .await;

        assert_eq!(res, Ok(()));
    }

    #[tokio::test]
    async fn test_delete_person_skips_existence_check() {
        let id = Uuid::new_v4();
        let mut repository = MockRepository::new();
        repository.expect_find_one().never();
        repository
            .expect_delete()
            .with(eq(id))
            .times(1)
            .returning(|_| Ok(()));

        assert_eq!(manager(repository).delete_person(&id).await, Ok(()));
    }

    #[tokio::test]
    async fn test_repository_error_is_propagated() {
        let mut repository = MockRepository::new();
        repository
            .expect_find_all()
            .returning(|| Err(PersonRepositoryError::InternalError("down".to_owned())));

        let res = manager(repository).get_people().await;

        assert_eq!(
            res,
            Err(PersonManagerError::Repository(
                PersonRepositoryError::InternalError("down".to_owned())
            ))
        );
    }
}
