use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{FaceError, FaceIdentityProvider, FaceMatch};

/// REST client for the managed face-recognition service. One collection
/// per organization, named `org-{id}`.
pub struct RestFaceProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestFaceProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client construction only fails on invalid TLS config");

        Self {
            http,
            base_url,
            api_key,
        }
    }

    fn collection(organization_id: u64) -> String {
        format!("org-{}", organization_id)
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    collection: &'a str,
    image: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    matches: Vec<SearchMatch>,
}

#[derive(Deserialize)]
struct SearchMatch {
    face_id: String,
    similarity: f32,
}

#[derive(Serialize)]
struct IndexRequest<'a> {
    collection: &'a str,
    image: String,
    external_id: &'a str,
}

#[derive(Deserialize)]
struct IndexResponse {
    face_id: String,
}

#[async_trait]
impl FaceIdentityProvider for RestFaceProvider {
    async fn identify(
        &self,
        organization_id: u64,
        image: &[u8],
    ) -> Result<Option<FaceMatch>, FaceError> {
        let collection = Self::collection(organization_id);
        let response = self
            .http
            .post(format!("{}/faces/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&SearchRequest {
                collection: &collection,
                image: BASE64.encode(image),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FaceError::Rejected(format!(
                "search returned status {}",
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await?;

        Ok(body.matches.into_iter().next().map(|m| FaceMatch {
            face_token: m.face_id,
            similarity: m.similarity,
        }))
    }

    async fn enroll(
        &self,
        organization_id: u64,
        image: &[u8],
        external_id: &str,
    ) -> Result<String, FaceError> {
        let collection = Self::collection(organization_id);
        let response = self
            .http
            .post(format!("{}/faces", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&IndexRequest {
                collection: &collection,
                image: BASE64.encode(image),
                external_id,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FaceError::Rejected(format!(
                "enroll returned status {}",
                response.status()
            )));
        }

        let body: IndexResponse = response.json().await?;

        Ok(body.face_id)
    }

    async fn forget(&self, organization_id: u64, face_token: &str) -> Result<(), FaceError> {
        let response = self
            .http
            .delete(format!("{}/faces/{}", self.base_url, face_token))
            .bearer_auth(&self.api_key)
            .query(&[("collection", Self::collection(organization_id))])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FaceError::Rejected(format!(
                "delete returned status {}",
                response.status()
            )));
        }

        Ok(())
    }
}
