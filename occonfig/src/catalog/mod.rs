//! Provider and model catalog.
//!
//! The catalog comes from the `models.dev` API and is cached on disk as a
//! serialized [`ModelsData`]. Schema and catalog documents are both obtained
//! through a [`TtlCache`], so callers decide how a document is fetched.

use std::{collections::HashSet, time::Duration};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    data::schema::fallback_schema_document,
    scroll::{FlatItem, group_into_flat_list},
};

pub mod cache;

pub use cache::{CacheError, TtlCache};

pub const SCHEMA_URL: &str = "https://opencode.ai/config.json";
pub const MODELS_URL: &str = "https://models.dev/api.json";

pub const SCHEMA_CACHE_KEY: &str = "schema.json";
pub const MODELS_CACHE_KEY: &str = "models.json";

pub const SCHEMA_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const MODELS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub tool_call: bool,
    pub vision: bool,
    pub streaming: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    pub name: String,
    pub provider_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_input: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_output: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
}

impl Model {
    /// `provider/model`, the form used by the `model` config fields.
    pub fn full_id(&self) -> String {
        format!("{}/{}", self.provider_id, self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelsData {
    pub providers: Vec<Provider>,
    pub models: Vec<Model>,
}

impl ModelsData {
    pub fn provider(&self, id: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn models_of<'a>(&'a self, provider_id: &'a str) -> impl Iterator<Item = &'a Model> + 'a {
        self.models.iter().filter(move |m| m.provider_id == provider_id)
    }
}

/// Parse the `models.dev` document
/// `{providerId: {name, env, models: {modelId: {...}}}}`.
///
/// Providers without models are dropped, names default to ids, and limit and
/// cost fields are read in either snake_case or camelCase.
pub fn parse_models_api(raw: &Value) -> ModelsData {
    let mut data = ModelsData::default();
    let Some(root) = raw.as_object() else {
        return data;
    };

    for (provider_id, provider) in root {
        let Some(provider) = provider.as_object() else {
            continue;
        };
        let Some(models) = provider.get("models").and_then(Value::as_object) else {
            continue;
        };
        if models.is_empty() {
            continue;
        }

        data.providers.push(Provider {
            id: provider_id.clone(),
            name: string_field(provider, "name").unwrap_or_else(|| provider_id.clone()),
            env: provider.get("env").and_then(Value::as_array).map(|env| {
                env.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            }),
        });

        for (model_id, model) in models {
            let Some(model) = model.as_object() else {
                continue;
            };
            data.models.push(Model {
                id: model_id.clone(),
                name: string_field(model, "name").unwrap_or_else(|| model_id.clone()),
                provider_id: provider_id.clone(),
                family: string_field(model, "family"),
                context: model.get("context").and_then(Value::as_f64),
                output_limit: number_field(model, "output_limit", "outputLimit"),
                cost_input: number_field(model, "cost_input", "costInput"),
                cost_output: number_field(model, "cost_output", "costOutput"),
                capabilities: model
                    .get("capabilities")
                    .and_then(Value::as_object)
                    .map(|caps| Capabilities {
                        tool_call: truthy(caps.get("tool_call").or_else(|| caps.get("toolCall"))),
                        vision: truthy(caps.get("vision")),
                        streaming: truthy(caps.get("streaming")),
                    }),
            });
        }
    }
    data
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn number_field(map: &Map<String, Value>, snake: &str, camel: &str) -> Option<f64> {
    map.get(snake)
        .and_then(Value::as_f64)
        .or_else(|| map.get(camel).and_then(Value::as_f64))
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Models whose full id or display name contains `query`, case-insensitively.
pub fn filter_models<'a>(models: &'a [Model], query: &str) -> Vec<&'a Model> {
    let query = query.to_lowercase();
    models
        .iter()
        .filter(|m| {
            m.full_id().to_lowercase().contains(&query) || m.name.to_lowercase().contains(&query)
        })
        .collect()
}

/// Stable partition putting detected models first.
pub fn order_detected<'a>(models: Vec<&'a Model>, detected: &HashSet<String>) -> Vec<&'a Model> {
    if detected.is_empty() {
        return models;
    }
    let (mut first, rest): (Vec<_>, Vec<_>) =
        models.into_iter().partition(|m| detected.contains(&m.full_id()));
    first.extend(rest);
    first
}

/// Group `ordered` models under provider headers for the picker.
///
/// Unless `show_all` is set, only detected models are listed when any were
/// detected.
pub fn build_flat_list<'a>(
    data: &ModelsData,
    ordered: &[&'a Model],
    show_all: bool,
    detected: &HashSet<String>,
) -> Vec<FlatItem<&'a Model>> {
    let visible = ordered
        .iter()
        .copied()
        .filter(|m| show_all || detected.is_empty() || detected.contains(&m.full_id()));

    group_into_flat_list(
        visible,
        |m| m.provider_id.as_str(),
        |m| m.full_id(),
        |provider_id| {
            data.provider(provider_id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| provider_id.to_string())
        },
    )
}

/// Raw config schema: cached, fetched, stale, or the bundled fallback.
pub fn load_schema<F>(cache: &TtlCache, fetch: F) -> Value
where
    F: FnOnce() -> anyhow::Result<Value>,
{
    match cache.get_or_fetch(SCHEMA_CACHE_KEY, SCHEMA_TTL, fetch) {
        Ok(schema) => schema,
        Err(e) => {
            warn!("using bundled schema: {e}");
            fallback_schema_document()
        }
    }
}

/// Model catalog, or `None` when it was never fetched and cannot be now.
///
/// `fetch` returns the raw API document; the parsed catalog is what gets
/// cached.
pub fn load_models<F>(cache: &TtlCache, fetch: F) -> Option<ModelsData>
where
    F: FnOnce() -> anyhow::Result<Value>,
{
    decode_models(cache.get_or_fetch(MODELS_CACHE_KEY, MODELS_TTL, parsed(fetch)))
}

/// Like [`load_models`] but ignores the cache age.
pub fn refresh_models<F>(cache: &TtlCache, fetch: F) -> Option<ModelsData>
where
    F: FnOnce() -> anyhow::Result<Value>,
{
    decode_models(cache.refresh(MODELS_CACHE_KEY, parsed(fetch)))
}

fn parsed<F>(fetch: F) -> impl FnOnce() -> anyhow::Result<Value>
where
    F: FnOnce() -> anyhow::Result<Value>,
{
    move || Ok(serde_json::to_value(parse_models_api(&fetch()?))?)
}

fn decode_models(result: Result<Value, CacheError>) -> Option<ModelsData> {
    let value = match result {
        Ok(value) => value,
        Err(e) => {
            warn!("model catalog unavailable: {e}");
            return None;
        }
    };
    match serde_json::from_value(value) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!("cached model catalog is malformed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;

    fn api() -> Value {
        json!({
            "openai": {
                "name": "OpenAI",
                "env": ["OPENAI_API_KEY"],
                "models": {
                    "gpt-5": {
                        "name": "GPT-5",
                        "family": "gpt",
                        "context": 400000,
                        "output_limit": 128000,
                        "costInput": 1.25,
                        "capabilities": {"toolCall": true, "vision": 1}
                    },
                    "gpt-5-nano": {}
                }
            },
            "empty": {"name": "Empty", "models": {}},
            "broken": "not an object",
            "xai": {"models": {"grok-4": {"name": "Grok 4", "cost_output": 15}}}
        })
    }

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_models_api() {
        let data = parse_models_api(&api());
        let ids: Vec<&str> = data.providers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["openai", "xai"]);
        assert_eq!(data.providers[0].env, Some(vec!["OPENAI_API_KEY".to_string()]));
        assert_eq!(data.providers[1].name, "xai");

        let gpt = &data.models[0];
        assert_eq!(gpt.full_id(), "openai/gpt-5");
        assert_eq!(gpt.family.as_deref(), Some("gpt"));
        assert_eq!(gpt.output_limit, Some(128000.0));
        assert_eq!(gpt.cost_input, Some(1.25));
        assert_eq!(
            gpt.capabilities,
            Some(Capabilities {
                tool_call: true,
                vision: true,
                streaming: false
            })
        );

        assert_eq!(data.models[1].name, "gpt-5-nano");
        assert_eq!(data.models[1].capabilities, None);
        assert_eq!(data.models[2].cost_output, Some(15.0));
        assert!(parse_models_api(&json!([1, 2])).models.is_empty());
    }

    #[test]
    fn test_filter_and_order() {
        let data = parse_models_api(&api());
        let found = filter_models(&data.models, "GROK");
        assert_eq!(found.len(), 1);
        assert_eq!(filter_models(&data.models, "openai/").len(), 2);
        assert_eq!(filter_models(&data.models, "").len(), 3);

        let ordered = order_detected(filter_models(&data.models, ""), &set(&["xai/grok-4"]));
        assert_eq!(ordered[0].id, "grok-4");
        assert_eq!(ordered[1].id, "gpt-5");
    }

    #[test]
    fn test_build_flat_list() {
        let data = parse_models_api(&api());
        let detected = set(&["xai/grok-4"]);
        let ordered = order_detected(filter_models(&data.models, ""), &detected);

        let flat = build_flat_list(&data, &ordered, false, &detected);
        assert_eq!(flat.len(), 2);
        assert_eq!(
            flat[0],
            FlatItem::Header {
                group_id: "xai".to_string(),
                label: "xai".to_string()
            }
        );

        let flat = build_flat_list(&data, &ordered, true, &detected);
        assert_eq!(flat.len(), 5);
        assert!(matches!(&flat[2], FlatItem::Header { label, .. } if label == "OpenAI"));

        let flat = build_flat_list(&data, &ordered, false, &HashSet::new());
        assert_eq!(flat.len(), 5);
    }

    #[test]
    fn test_load_models_caches_parsed_catalog() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = TtlCache::new(dir.path());

        let data = load_models(&cache, || Ok(api())).expect("catalog");
        assert_eq!(data.models.len(), 3);

        let cached = load_models(&cache, || Err(anyhow!("not called"))).expect("cached");
        assert_eq!(cached, data);

        let refreshed = refresh_models(&cache, || Err(anyhow!("offline"))).expect("stale");
        assert_eq!(refreshed, data);
    }

    #[test]
    fn test_load_without_network() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = TtlCache::new(dir.path());
        assert_eq!(load_models(&cache, || Err(anyhow!("offline"))), None);

        let schema = load_schema(&cache, || Err(anyhow!("offline")));
        assert_eq!(schema, fallback_schema_document());
    }
}
