use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Free-form attributes carried by a person next to its managed fields.
pub type Attributes = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    id: Option<Uuid>,
    attributes: Attributes,
    created_date: Option<NaiveDateTime>,
    modified_date: Option<NaiveDateTime>,
}

impl Person {
    pub fn new(
        id: Option<Uuid>,
        attributes: Attributes,
        created_date: Option<NaiveDateTime>,
        modified_date: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            id,
            attributes,
            created_date,
            modified_date,
        }
    }

    pub fn id(&self) -> Option<&Uuid> {
        self.id.as_ref()
    }
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
    pub fn created_date(&self) -> Option<&NaiveDateTime> {
        self.created_date.as_ref()
    }
    pub fn modified_date(&self) -> Option<&NaiveDateTime> {
        self.modified_date.as_ref()
    }

    pub fn set_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }
    pub fn set_created_date(&mut self, created_date: Option<NaiveDateTime>) {
        self.created_date = created_date;
    }
    pub fn set_modified_date(&mut self, modified_date: Option<NaiveDateTime>) {
        self.modified_date = modified_date;
    }
}
