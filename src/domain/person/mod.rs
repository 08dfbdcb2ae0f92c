mod manager;
mod person;
mod repository;

pub use manager::{PersonManager, PersonManagerError};
pub use person::{Attributes, Person};
pub use repository::{PersonRepository, PersonRepositoryError};
#[cfg(test)]
pub use repository::mock::MockRepository;
