//! HTTP fetchers for the config schema and the model catalog.

use std::time::Duration;

use anyhow::Context;
use log::debug;
use occonfig::catalog::{self, MODELS_URL, ModelsData, SCHEMA_URL, TtlCache};
use serde_json::Value;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// GET `url` and parse the body as JSON.
pub fn fetch_json(url: &str) -> anyhow::Result<Value> {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(FETCH_TIMEOUT))
        .build();
    let agent = ureq::Agent::new_with_config(config);

    debug!("GET {url}");
    let mut response = agent.get(url).call().with_context(|| format!("GET {url}"))?;
    let body = response
        .body_mut()
        .read_to_string()
        .with_context(|| format!("reading response of {url}"))?;
    serde_json::from_str(&body).with_context(|| format!("{url} did not return JSON"))
}

/// Config schema through `cache`, falling back to the bundled one offline.
pub fn schema(cache: &TtlCache) -> Value {
    catalog::load_schema(cache, || fetch_json(SCHEMA_URL))
}

/// Model catalog through `cache`.
pub fn models(cache: &TtlCache) -> Option<ModelsData> {
    catalog::load_models(cache, || fetch_json(MODELS_URL))
}

/// Model catalog fetched now, falling back to the cached copy offline.
pub fn refresh_models(cache: &TtlCache) -> Option<ModelsData> {
    catalog::refresh_models(cache, || fetch_json(MODELS_URL))
}
