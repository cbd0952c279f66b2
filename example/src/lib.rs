mod dog_api_client;
mod error;

pub mod data;

pub use dog_api_client::{DogApiClient, DogApiClientBuilder};
pub use error::Error;
