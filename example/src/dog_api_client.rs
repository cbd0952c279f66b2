use crate::data::{cat::Cat, dog::Dog};
use crate::error::Error;
use reqwest::{self, header};

const DEFAULT_DOMAIN_NAME: &str = "http://dogs.example.com";

/// Builder used to build a DogApiClient instance
#[derive(Debug, Clone, Default)]
pub struct DogApiClientBuilder {
    domain_name: Option<String>,
    http_client: Option<reqwest::Client>,
}

impl DogApiClientBuilder {
    /// Create a new DogApiClientBuilder instance.
    pub fn new() -> Self {
        Self {
            domain_name: None,
            http_client: None,
        }
    }

    /// Use the given domain_name when building a DogApiClient instance.
    ///
    /// # Arguments
    /// `domain_name` - a domain name to use when calling the API.
    ///
    /// # Returns
    /// This builder.
    pub fn with_domain_name<T: Into<String>>(mut self, domain_name: T) -> Self {
        self.domain_name = Some(domain_name.into());
        self
    }

    /// Use the given reqwest client when building a DogApiClient instance.
    ///
    /// # Arguments
    /// `client` - a pre-configured reqwest client.
    ///
    /// # Returns
    /// This builder.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Consume the builder and create a DogApiClient instance using all of the previously configured values or
    /// their defaults.
    ///
    /// # Returns
    /// A DogApiClient instance.
    pub fn build(mut self) -> DogApiClient {
        DogApiClient {
            http: self.http_client.take().unwrap_or_default(),
            domain_name: self
                .domain_name
                .take()
                .unwrap_or_else(|| String::from(DEFAULT_DOMAIN_NAME)),
        }
    }
}

/// Struct that represents a Dog API client.
#[derive(Default, Debug, Clone)]
pub struct DogApiClient {
    http: reqwest::Client,
    domain_name: String,
}

impl DogApiClient {
    /// Create a DogApiClient with the default reqwest client.
    ///
    /// # Returns
    /// A DogApiClient.
    pub fn new() -> Self {
        DogApiClient {
            http: reqwest::Client::new(),
            domain_name: String::from(DEFAULT_DOMAIN_NAME),
        }
    }

    /// Gets all dogs from the Dog API.
    ///
    /// # Arguments
    /// `from` - the day to list dogs from.
    ///
    /// # Returns
    /// All of the dogs the API knows about.
    pub async fn get_me_dogs<T: AsRef<str>>(&self, from: T) -> Result<Vec<Dog>, Error> {
        let dogs = self
            .http
            .get(&format!("{}/dogs", self.domain_name))
            .query(&[("from", from.as_ref())])
            .header(header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(dogs)
    }

    /// Gets the cats with the given ids from the Dog API.
    ///
    /// # Arguments
    /// `cat_ids` - ids of the cats to fetch. It should contain at least one id.
    ///
    /// # Returns
    /// The requested cats.
    pub async fn get_me_cats(&self, cat_ids: &[u64]) -> Result<Vec<Cat>, Error> {
        Self::check_cat_ids(cat_ids)?;

        let query = cat_ids
            .iter()
            .map(|id| ("catId[]", id.to_string()))
            .collect::<Vec<_>>();
        let cats = self
            .http
            .get(&format!("{}/cats", self.domain_name))
            .query(&query)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(cats)
    }

    fn check_cat_ids(cat_ids: &[u64]) -> Result<(), Error> {
        if cat_ids.is_empty() {
            Err(Error::NoCatIdsRequested)
        } else {
            Ok(())
        }
    }
}
