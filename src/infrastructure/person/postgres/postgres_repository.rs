use std::{future::Future, str::FromStr, time::Duration};

use chrono::NaiveDateTime;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    types::Json,
    Error, PgPool, Row,
};
use tokio::time;
use uuid::Uuid;

use crate::domain::person::{Attributes, Person, PersonRepository, PersonRepositoryError};

// Saves are upserts and lookups use `fetch_optional`, so no database error is
// a domain outcome.
impl From<Error> for PersonRepositoryError {
    fn from(value: Error) -> Self {
        Self::InternalError(value.to_string())
    }
}

impl TryFrom<PgRow> for Person {
    type Error = PersonRepositoryError;

    fn try_from(value: PgRow) -> Result<Self, Self::Error> {
        let id: &str = value.try_get("id")?;
        let Json(attributes): Json<Attributes> = value.try_get("attributes")?;
        let created_date: NaiveDateTime = value.try_get("created_date")?;
        let modified_date: Option<NaiveDateTime> = value.try_get("modified_date")?;
        return Ok(Person::new(
            Some(Uuid::from_str(id.trim()).map_err(|_| {
                PersonRepositoryError::InternalError(format!("Invalid id format for person {}", id))
            })?),
            attributes,
            Some(created_date),
            modified_date,
        ));
    }
}

/// Person storage in a PostgreSQL `person` table. Every statement is bounded
/// by `timeout`.
#[derive(Debug, Clone)]
pub struct PostgresPersonRepository {
    pool: PgPool,
    timeout: Duration,
}

async fn bounded<T, F>(timeout: Duration, query: F) -> Result<T, PersonRepositoryError>
where
    F: Future<Output = Result<T, Error>>,
{
    Ok(time::timeout(timeout, query)
        .await
        .map_err(|e| PersonRepositoryError::InternalError(e.to_string()))??)
}

async fn init_table_async(pool: &PgPool, timeout: Duration) -> Result<(), PersonRepositoryError> {
    let create_table_query = r#"CREATE TABLE IF NOT EXISTS person (
        id CHAR(36) PRIMARY KEY,
        attributes JSONB NOT NULL,
        created_date TIMESTAMP NOT NULL,
        modified_date TIMESTAMP
    )"#;
    bounded(timeout, sqlx::query(create_table_query).execute(pool)).await?;
    Ok(())
}

impl PostgresPersonRepository {
    pub async fn new(url: &str, timeout: u64) -> Result<Self, PersonRepositoryError> {
        let timeout = Duration::from_millis(timeout);
        let pool = bounded(
            timeout,
            PgPoolOptions::new().acquire_timeout(timeout).connect(url),
        )
        .await?;
        init_table_async(&pool, timeout).await?;
        tracing::info!("person table ready");
        Ok(Self { pool, timeout })
    }
}

#[async_trait::async_trait]
impl PersonRepository for PostgresPersonRepository {
    async fn save(&self, mut person: Person) -> Result<Person, PersonRepositoryError> {
        let id = match person.id() {
            Some(id) => *id,
            None => {
                let id = Uuid::new_v4();
                person.set_id(id);
                id
            }
        };
        bounded(
            self.timeout,
            sqlx::query(
                r#"INSERT INTO person (id, attributes, created_date, modified_date)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id) DO UPDATE SET
                    attributes = EXCLUDED.attributes,
                    created_date = EXCLUDED.created_date,
                    modified_date = EXCLUDED.modified_date;"#,
            )
            .bind(id.to_string())
            .bind(Json(person.attributes()))
            .bind(person.created_date().copied())
            .bind(person.modified_date().copied())
            .execute(&self.pool),
        )
        .await?;
        Ok(person)
    }

    async fn find_all(&self) -> Result<Vec<Person>, PersonRepositoryError> {
        let rows = bounded(
            self.timeout,
            sqlx::query(
                "SELECT id, attributes, created_date, modified_date FROM person ORDER BY created_date, id;",
            )
            .fetch_all(&self.pool),
        )
        .await?;
        rows.into_iter().map(Person::try_from).collect()
    }

    async fn find_one(&self, id: &Uuid) -> Result<Option<Person>, PersonRepositoryError> {
        let row = bounded(
            self.timeout,
            sqlx::query(
                "SELECT id, attributes, created_date, modified_date FROM person WHERE id = $1;",
            )
            .bind(id.to_string())
            .fetch_optional(&self.pool),
        )
        .await?;
        row.map(Person::try_from).transpose()
    }

    async fn delete(&self, id: &Uuid) -> Result<(), PersonRepositoryError> {
        bounded(
            self.timeout,
            sqlx::query("DELETE FROM person WHERE id = $1")
                .bind(id.to_string())
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}
