use chrono::NaiveDateTime;
use hyper::Method;
use serde::{Deserialize, Serialize};
use serde_json::value;
use uuid::Uuid;

use crate::{
    application::api::{
        date_time_codec,
        route::{RouteParams, RouteTable},
        router::{ApiError, ApiResponse},
    },
    domain::person::{Attributes, Person, PersonManager, PersonManagerError},
};

pub const PERSONS_PATH: &str = "/v1.0/persons";
const PERSON_PATH: &str = "/v1.0/persons/{id}";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PersonHandler {
    Create,
    List,
    Get,
    Update,
    Delete,
}

pub fn routes() -> RouteTable<PersonHandler> {
    RouteTable::new()
        .route(Method::POST, PERSONS_PATH, PersonHandler::Create)
        .route(Method::GET, PERSONS_PATH, PersonHandler::List)
        .route(Method::GET, PERSON_PATH, PersonHandler::Get)
        .route(Method::PUT, PERSON_PATH, PersonHandler::Update)
        .route(Method::DELETE, PERSON_PATH, PersonHandler::Delete)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonInput {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, with = "date_time_codec::option")]
    created_date: Option<NaiveDateTime>,
    #[serde(default, with = "date_time_codec::option")]
    modified_date: Option<NaiveDateTime>,
    #[serde(flatten)]
    attributes: Attributes,
}

impl TryFrom<PersonInput> for Person {
    type Error = ApiError;

    fn try_from(value: PersonInput) -> Result<Self, Self::Error> {
        let id = match value.id.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                Uuid::parse_str(raw)
                    .map_err(|_| ApiError::BadRequest(format!("invalid person id `{}`", raw)))?,
            ),
        };
        Ok(Person::new(
            id,
            value.attributes,
            value.created_date,
            value.modified_date,
        ))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersonOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(flatten)]
    attributes: Attributes,
    #[serde(
        with = "date_time_codec::option",
        skip_serializing_if = "Option::is_none"
    )]
    created_date: Option<NaiveDateTime>,
    #[serde(
        with = "date_time_codec::option",
        skip_serializing_if = "Option::is_none"
    )]
    modified_date: Option<NaiveDateTime>,
}

impl From<Person> for PersonOutput {
    fn from(value: Person) -> Self {
        return Self {
            id: value.id().map(|id| id.to_string()),
            created_date: value.created_date().copied(),
            modified_date: value.modified_date().copied(),
            attributes: value.attributes().clone(),
        };
    }
}

impl From<PersonManagerError> for ApiError {
    fn from(value: PersonManagerError) -> Self {
        match value {
            PersonManagerError::IdentifierAlreadySet => {
                ApiError::BadRequest("a new person cannot carry an id".to_owned())
            }
            PersonManagerError::PersonNotFound(_) => ApiError::NotFound,
            PersonManagerError::Repository(e) => ApiError::Internal(e.to_string()),
        }
    }
}

fn parse_person(body: &[u8]) -> Result<Person, ApiError> {
    let input: PersonInput = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid person payload: {}", e)))?;
    input.try_into()
}

fn path_id(params: &RouteParams) -> Result<Uuid, ApiError> {
    params
        .id
        .ok_or(ApiError::Internal("route registered without an id".to_owned()))
}

fn to_body<T: Serialize>(data: T) -> Result<value::Value, ApiError> {
    value::to_value(data)
        .map_err(|e| ApiError::Internal(format!("cannot serialize persons: {}", e)))
}

pub async fn router(
    handler: PersonHandler,
    params: &RouteParams,
    body: &[u8],
    person_manager: &PersonManager,
) -> Result<ApiResponse, ApiError> {
    match handler {
        PersonHandler::Create => {
            let person = parse_person(body)?;
            let created = person_manager.create_person(person).await?;
            let id = created.id().ok_or(ApiError::Internal(
                "repository did not assign an id".to_owned(),
            ))?;
            Ok(ApiResponse::created(format!("{}/{}", PERSONS_PATH, id)))
        }
        PersonHandler::List => {
            let people: Vec<PersonOutput> = person_manager
                .get_people()
                .await?
                .into_iter()
                .map(PersonOutput::from)
                .collect();
            Ok(ApiResponse::ok(to_body(people)?))
        }
        PersonHandler::Get => {
            let person: PersonOutput = person_manager
                .get_person_by_id(&path_id(params)?)
                .await?
                .into();
            Ok(ApiResponse::ok(to_body(person)?))
        }
        PersonHandler::Update => {
            let id = path_id(params)?;
            let person = parse_person(body)?;
            person_manager.update_person(&id, person).await?;
            Ok(ApiResponse::no_content())
        }
        PersonHandler::Delete => {
            person_manager.delete_person(&path_id(params)?).await?;
            Ok(ApiResponse::no_content())
        }
    }
}
