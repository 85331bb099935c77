//! Docker Registry v2 API client. Grounded on
//! `original_source/builder/search_tool.py`.

use crate::error::RegistryResult;
use crate::types::AgentLabels;
use serde_json::Value;

const OCI_INDEX_ACCEPT: &str = "application/vnd.oci.image.index.v1+json";
const OCI_MANIFEST_ACCEPT: &str = "application/vnd.oci.image.manifest.v1+json";
const DOCKER_MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.v2+json";
const ATTESTATION_ANNOTATION: &str = "vnd.docker.reference.type";

pub struct ContainerRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl ContainerRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn list_agents(&self) -> RegistryResult<Vec<String>> {
        let url = format!("{}/_catalog", self.base_url);
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("error listing container registry agents: {}", e);
                return Ok(Vec::new());
            }
        };
        let data: Value = match response.error_for_status() {
            Ok(r) => r.json().await.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("container registry catalog request failed: {}", e);
                return Ok(Vec::new());
            }
        };
        Ok(data
            .get("repositories")
            .and_then(Value::as_array)
            .map(|repos| repos.iter().filter_map(|r| r.as_str().map(str::to_string)).collect())
            .unwrap_or_default())
    }

    /// Fetches image labels for `agent_name:tag`, handling both OCI
    /// multi-arch indexes (skipping attestation manifests, picking the
    /// first platform manifest) and single Docker v2 manifests.
    pub async fn get_agent_metadata(&self, agent_name: &str, tag: &str) -> RegistryResult<AgentLabels> {
        let manifest_url = format!("{}/{}/manifests/{}", self.base_url, agent_name, tag);

        let index_response = self
            .client
            .get(&manifest_url)
            .header("Accept", OCI_INDEX_ACCEPT)
            .send()
            .await?;

        let manifest: Value = if index_response.status().is_success() {
            let index: Value = index_response.json().await.unwrap_or_default();
            if let Some(manifests) = index.get("manifests").and_then(Value::as_array) {
                let platform_digest = manifests
                    .iter()
                    .find(|m| {
                        m.get("annotations")
                            .and_then(|a| a.get(ATTESTATION_ANNOTATION))
                            .and_then(Value::as_str)
                            != Some("attestation-manifest")
                    })
                    .and_then(|m| m.get("digest"))
                    .and_then(Value::as_str)
                    .map(str::to_string);

                let Some(digest) = platform_digest else {
                    return Ok(AgentLabels::default());
                };

                let platform_url = format!("{}/{}/manifests/{}", self.base_url, agent_name, digest);
                self.client
                    .get(&platform_url)
                    .header("Accept", OCI_MANIFEST_ACCEPT)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?
            } else {
                index
            }
        } else {
            self.client
                .get(&manifest_url)
                .header("Accept", DOCKER_MANIFEST_ACCEPT)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?
        };

        let Some(config_digest) = manifest.get("config").and_then(|c| c.get("digest")).and_then(Value::as_str) else {
            return Ok(AgentLabels::default());
        };

        let blob_url = format!("{}/{}/blobs/{}", self.base_url, agent_name, config_digest);
        let config: Value = match self.client.get(&blob_url).send().await {
            Ok(r) => match r.error_for_status() {
                Ok(r) => r.json().await.unwrap_or_default(),
                Err(_) => return Ok(AgentLabels::default()),
            },
            Err(_) => return Ok(AgentLabels::default()),
        };

        let labels = config.get("config").and_then(|c| c.get("Labels")).cloned().unwrap_or_default();
        Ok(serde_json::from_value(labels).unwrap_or_default())
    }
}
