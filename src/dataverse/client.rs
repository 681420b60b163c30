//! CRUD client for the equipment table.
//!
//! Every call obtains a bearer token from the cache first, then issues the
//! HTTP verb with the fixed OData protocol headers. No retries happen here;
//! retry policy belongs to the caller.

use reqwest::{Method, RequestBuilder, Response};

use crate::config::AppConfig;

use super::model::{EquipmentPatch, EquipmentRecord, ListEnvelope, NewEquipment};
use super::query::{self, EquipmentFilters};
use super::token::{ClientCredentialsExchanger, TokenCache};
use super::DataverseError;

/// Preference applied to every call: formatted-value annotations on reads.
const PREFER_ANNOTATIONS: &str = "odata.include-annotations=\"*\"";
/// Writes additionally ask Dataverse to send the affected record back.
/// Preferences share one comma-separated `Prefer` header.
const PREFER_ANNOTATIONS_AND_REPRESENTATION: &str =
    "odata.include-annotations=\"*\", return=representation";

pub struct RecordClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    tokens: TokenCache<ClientCredentialsExchanger>,
}

impl RecordClient {
    pub fn new(http: reqwest::Client, config: &AppConfig) -> Self {
        let exchanger = ClientCredentialsExchanger::new(http.clone(), config);
        Self {
            http,
            base_url: config.dataverse_url.clone(),
            api_version: config.api_version.clone(),
            tokens: TokenCache::new(exchanger),
        }
    }

    fn url(&self, relative: &str) -> String {
        format!("{}/api/data/v{}/{relative}", self.base_url, self.api_version)
    }

    /// Common headers for every Dataverse call.
    async fn request(
        &self,
        method: Method,
        relative: &str,
        prefer: &'static str,
    ) -> Result<RequestBuilder, DataverseError> {
        let token = self.tokens.get_token().await?;
        Ok(self
            .http
            .request(method, self.url(relative))
            .bearer_auth(token.token)
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
            .header("Accept", "application/json")
            .header("Prefer", prefer))
    }

    async fn check(&self, response: Response) -> Result<Response, DataverseError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        log::error!("Dataverse request failed with {status}: {body}");
        Err(DataverseError::RequestFailed {
            status: status.as_u16(),
            body,
        })
    }

    /// List equipment matching the given substring filters, newest first.
    pub async fn list(
        &self,
        filters: &EquipmentFilters,
    ) -> Result<Vec<EquipmentRecord>, DataverseError> {
        let request = self
            .request(Method::GET, &query::list_path(filters), PREFER_ANNOTATIONS)
            .await?;
        let response = request.send().await.map_err(DataverseError::Unavailable)?;
        let response = self.check(response).await?;
        let envelope: ListEnvelope = response
            .json()
            .await
            .map_err(|e| DataverseError::BadResponse(format!("list response: {e}")))?;
        Ok(envelope.value)
    }

    /// Fetch a single record by identifier.
    pub async fn get(&self, id: &str) -> Result<EquipmentRecord, DataverseError> {
        let request = self
            .request(Method::GET, &query::entity_path(id), PREFER_ANNOTATIONS)
            .await?;
        let response = request.send().await.map_err(DataverseError::Unavailable)?;
        let response = self.check(response).await?;
        response
            .json()
            .await
            .map_err(|e| DataverseError::BadResponse(format!("record response: {e}")))
    }

    /// Create a record from a sparse attribute set. `Prefer:
    /// return=representation` makes Dataverse send the created record back.
    pub async fn create(&self, payload: &NewEquipment) -> Result<EquipmentRecord, DataverseError> {
        let request = self
            .request(
                Method::POST,
                query::ENTITY_SET,
                PREFER_ANNOTATIONS_AND_REPRESENTATION,
            )
            .await?
            .json(payload);
        let response = request.send().await.map_err(DataverseError::Unavailable)?;
        let response = self.check(response).await?;
        response
            .json()
            .await
            .map_err(|e| DataverseError::BadResponse(format!("create response: {e}")))
    }

    /// Apply a sparse update; attributes left out of the patch are untouched.
    pub async fn update(
        &self,
        id: &str,
        payload: &EquipmentPatch,
    ) -> Result<EquipmentRecord, DataverseError> {
        let request = self
            .request(
                Method::PATCH,
                &query::entity_ref(id),
                PREFER_ANNOTATIONS_AND_REPRESENTATION,
            )
            .await?
            .json(payload);
        let response = request.send().await.map_err(DataverseError::Unavailable)?;
        let response = self.check(response).await?;
        response
            .json()
            .await
            .map_err(|e| DataverseError::BadResponse(format!("update response: {e}")))
    }

    /// Delete a record. Dataverse answers 204 on success.
    pub async fn delete(&self, id: &str) -> Result<(), DataverseError> {
        let request = self
            .request(Method::DELETE, &query::entity_ref(id), PREFER_ANNOTATIONS)
            .await?;
        let response = request.send().await.map_err(DataverseError::Unavailable)?;
        self.check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_preference_is_one_combined_header_value() {
        // Writes keep the annotation preference and add return=representation
        // in the same header, not a second Prefer line.
        assert!(PREFER_ANNOTATIONS_AND_REPRESENTATION.starts_with(PREFER_ANNOTATIONS));
        assert!(PREFER_ANNOTATIONS_AND_REPRESENTATION.ends_with("return=representation"));
        assert_eq!(
            PREFER_ANNOTATIONS_AND_REPRESENTATION.matches(',').count(),
            1
        );
    }
}
