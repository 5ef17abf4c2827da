use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::{Address, CountryLookup, PostcodeApiError, PostcodeClient};
use crate::config::PostcodeApiSettings;

/// reqwest-backed implementation of [`PostcodeClient`] with a bounded
/// request timeout, so a slow or unreachable service still resolves the
/// request instead of hanging it.
pub struct HttpPostcodeClient {
    http: Client,
    settings: PostcodeApiSettings,
}

impl HttpPostcodeClient {
    pub fn new(settings: PostcodeApiSettings) -> Result<Self, PostcodeApiError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| PostcodeApiError::Unreachable(err.to_string()))?;

        Ok(Self { http, settings })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.hostname.trim_end_matches('/'), path)
    }

    fn authorization(&self) -> &str {
        self.settings.authorization.as_deref().unwrap_or("")
    }
}

impl PostcodeClient for HttpPostcodeClient {
    async fn lookup(&self, postcode: &str) -> Result<Vec<Address>, PostcodeApiError> {
        let response = self
            .http
            .get(self.endpoint(&self.settings.lookup_path))
            .query(&[("postcode", postcode)])
            .header(AUTHORIZATION, self.authorization())
            .send()
            .await
            .map_err(|err| PostcodeApiError::Unreachable(err.to_string()))?;

        read_json(response).await
    }

    async fn validate(&self, postcode: &str) -> Result<CountryLookup, PostcodeApiError> {
        // Postcodes are format-validated before this call, so a space is the
        // only character needing escaping in the path segment.
        let encoded = postcode.replace(' ', "%20");
        let path = format!("{}/{}", self.settings.validate_path, encoded);
        let response = self
            .http
            .get(self.endpoint(&path))
            .header(AUTHORIZATION, self.authorization())
            .send()
            .await
            .map_err(|err| PostcodeApiError::Unreachable(err.to_string()))?;

        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PostcodeApiError> {
    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(PostcodeApiError::Status {
            status: status.as_u16(),
            detail,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|err| PostcodeApiError::Unreachable(err.to_string()))
}
