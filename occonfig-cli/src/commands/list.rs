use anyhow::bail;
use occonfig::catalog::ModelsData;
use serde_json::Value;

use super::Context;

/// List `resource`. The catalog is only loaded for `providers` and `models`.
pub fn run<F>(
    ctx: &Context,
    resource: &str,
    provider: Option<&str>,
    load_catalog: F,
) -> anyhow::Result<String>
where
    F: FnOnce() -> Option<ModelsData>,
{
    match resource {
        "providers" => Ok(providers(load_catalog())),
        "models" => Ok(models(load_catalog(), provider)),
        "agents" => {
            let snapshot = ctx.snapshot()?;
            Ok(match snapshot.data.get("agent").and_then(Value::as_object) {
                Some(agents) if !agents.is_empty() => join(agents.keys()),
                _ => "No agents configured".to_string(),
            })
        }
        "keys" => {
            let snapshot = ctx.snapshot()?;
            if snapshot.data.is_empty() {
                Ok("Config is empty".to_string())
            } else {
                Ok(join(snapshot.data.keys()))
            }
        }
        other => bail!("Unknown resource \"{other}\". Valid: providers, models, agents, keys"),
    }
}

fn providers(catalog: Option<ModelsData>) -> String {
    let Some(catalog) = catalog.filter(|c| !c.providers.is_empty()) else {
        return "No providers found (network unavailable?)".to_string();
    };
    let lines = catalog.providers.iter().map(|p| {
        if p.name == p.id {
            p.id.clone()
        } else {
            format!("{}  ({})", p.id, p.name)
        }
    });
    join(lines)
}

fn models(catalog: Option<ModelsData>, provider: Option<&str>) -> String {
    let Some(catalog) = catalog.filter(|c| !c.models.is_empty()) else {
        return "No models found (network unavailable?)".to_string();
    };
    let ids: Vec<String> = catalog
        .models
        .iter()
        .filter(|m| provider.is_none_or(|p| m.provider_id == p))
        .map(|m| m.full_id())
        .collect();
    if ids.is_empty() {
        return format!("No models found for provider \"{}\"", provider.unwrap_or_default());
    }
    ids.join("\n")
}

fn join<S: AsRef<str>>(lines: impl IntoIterator<Item = S>) -> String {
    lines
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::Sandbox;
    use occonfig::catalog::parse_models_api;
    use serde_json::json;

    fn catalog() -> Option<ModelsData> {
        Some(parse_models_api(&json!({
            "openai": {"name": "OpenAI", "models": {"gpt-5": {}, "gpt-5-nano": {}}},
            "xai": {"models": {"grok-4": {}}}
        })))
    }

    #[test]
    fn test_list_catalog() {
        let sandbox = Sandbox::new(None);
        let ctx = &sandbox.ctx;

        let out = run(ctx, "providers", None, catalog).expect("providers");
        assert_eq!(out, "openai  (OpenAI)\nxai");

        let out = run(ctx, "models", None, catalog).expect("models");
        assert_eq!(out, "openai/gpt-5\nopenai/gpt-5-nano\nxai/grok-4");

        let out = run(ctx, "models", Some("xai"), catalog).expect("filtered");
        assert_eq!(out, "xai/grok-4");

        let out = run(ctx, "models", Some("nope"), catalog).expect("empty filter");
        assert_eq!(out, "No models found for provider \"nope\"");

        let out = run(ctx, "providers", None, || None).expect("offline");
        assert_eq!(out, "No providers found (network unavailable?)");
    }

    #[test]
    fn test_list_config() {
        let sandbox = Sandbox::new(Some(r#"{"theme": "nord", "agent": {"build": {}, "plan": {}}}"#));
        let ctx = &sandbox.ctx;

        assert_eq!(run(ctx, "keys", None, || None).expect("keys"), "theme\nagent");
        assert_eq!(run(ctx, "agents", None, || None).expect("agents"), "build\nplan");

        let empty = Sandbox::new(None);
        assert_eq!(run(&empty.ctx, "keys", None, || None).expect("keys"), "Config is empty");
        assert_eq!(
            run(&empty.ctx, "agents", None, || None).expect("agents"),
            "No agents configured"
        );
    }

    #[test]
    fn test_unknown_resource() {
        let sandbox = Sandbox::new(None);
        let err = run(&sandbox.ctx, "themes", None, || None).expect_err("unknown");
        assert_eq!(
            err.to_string(),
            "Unknown resource \"themes\". Valid: providers, models, agents, keys"
        );
    }
}
