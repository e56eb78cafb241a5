use serde::Deserialize;

use crate::core::error::ChatError;
use crate::utils::url::construct_api_url;

#[derive(Deserialize, Debug, Clone)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created: Option<u64>,
}

#[derive(Deserialize, Debug)]
pub struct ModelsResponse {
    pub data: Vec<ModelInfo>,
}

/// List the models an OpenAI-compatible backend currently serves.
pub async fn fetch_models(
    client: &reqwest::Client,
    base_url: &str,
    provider_name: &str,
) -> Result<ModelsResponse, ChatError> {
    let models_url = construct_api_url(base_url, "models");
    let response = client
        .get(models_url)
        .header("Content-Type", "application/json")
        .send()
        .await
        .map_err(|err| ChatError::from_reqwest(provider_name, err))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ChatError::transport(
            provider_name,
            Some(status.as_u16()),
            error_text,
        ));
    }

    response
        .json::<ModelsResponse>()
        .await
        .map_err(|err| ChatError::decode("model list", err.to_string()))
}

/// Keep only zero-cost models (ids ending in `:free`), newest first.
pub fn free_models(models: Vec<ModelInfo>) -> Vec<ModelInfo> {
    let mut free: Vec<ModelInfo> = models
        .into_iter()
        .filter(|m| m.id.ends_with(":free"))
        .collect();
    sort_models(&mut free);
    free
}

pub fn sort_models(models: &mut [ModelInfo]) {
    models.sort_by(|a, b| match (a.created, b.created) {
        (Some(a_created), Some(b_created)) => b_created.cmp(&a_created).then(a.id.cmp(&b.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
}
