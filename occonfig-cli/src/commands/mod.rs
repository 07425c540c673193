//! Command implementations. Each returns the text to print on success.

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use occonfig::{
    ConfigError,
    catalog::TtlCache,
    data::{
        modification::{Modification, coerce_value, split_path, value_at},
        scope::{ConfigScope, ScopeSnapshot},
    },
    paths::{ConfigLocations, ScopeRequest},
    writer::create_new_config,
};
use serde_json::Value;

use crate::{
    cli::{Cli, Commands},
    remote,
};

pub mod list;
pub mod tree;
pub mod validate;

/// Where the command operates.
#[derive(Debug, Clone)]
pub struct Context {
    pub locations: ConfigLocations,
    pub request: ScopeRequest,
}

impl Context {
    pub fn new(locations: ConfigLocations, request: ScopeRequest) -> Self {
        Self { locations, request }
    }

    pub fn resolve(&self) -> (ConfigScope, PathBuf) {
        self.locations.resolve(self.request)
    }

    pub fn cache(&self) -> TtlCache {
        self.locations.cache()
    }

    /// The config file of the requested scope, as currently on disk.
    pub fn snapshot(&self) -> anyhow::Result<ScopeSnapshot> {
        let (_, path) = self.resolve();
        Ok(ScopeSnapshot::load(&path)?)
    }
}

/// Run the parsed command line against the real environment.
pub fn execute(cli: Cli) -> anyhow::Result<String> {
    let locations = ConfigLocations::from_env()?;
    let ctx = Context::new(locations, cli.scope_request());

    match cli.command {
        Commands::Get { path } => get(&ctx, &path),
        Commands::Set { path, value } => set(&ctx, &path, &value),
        Commands::Delete { path } => delete(&ctx, &path),
        Commands::List {
            resource,
            provider,
            refresh,
        } => {
            let cache = ctx.cache();
            list::run(&ctx, &resource, provider.as_deref(), || {
                if refresh {
                    remote::refresh_models(&cache)
                } else {
                    remote::models(&cache)
                }
            })
        }
        Commands::Validate => validate::run(&ctx, &remote::schema(&ctx.cache())),
        Commands::Path => Ok(path(&ctx)),
        Commands::Tree {
            all,
            expand,
            search,
        } => {
            let options = tree::TreeOptions {
                all,
                expand,
                search,
            };
            tree::run(&ctx, remote::schema(&ctx.cache()), &options)
        }
        Commands::Init => init(&ctx),
    }
}

pub fn get(ctx: &Context, dot_path: &str) -> anyhow::Result<String> {
    let snapshot = ctx.snapshot()?;
    let value = value_at(&snapshot.data, &split_path(dot_path))
        .ok_or_else(|| ConfigError::PathNotFound(dot_path.to_string()))?;
    Ok(render_value(value)?)
}

/// Strings print bare, containers as indented JSON.
pub fn render_value(value: &Value) -> serde_json::Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Object(_) | Value::Array(_) => serde_json::to_string_pretty(value),
        other => Ok(other.to_string()),
    }
}

pub fn set(ctx: &Context, dot_path: &str, raw_value: &str) -> anyhow::Result<String> {
    let value = coerce_value(raw_value);
    let shown = serde_json::to_string(&value)?;

    let mut snapshot = ctx.snapshot()?;
    snapshot.push(Modification::from_dot_path(dot_path, Some(value)));
    save(&mut snapshot)?;
    Ok(format!("Set {dot_path} = {shown}"))
}

pub fn delete(ctx: &Context, dot_path: &str) -> anyhow::Result<String> {
    let mut snapshot = ctx.snapshot()?;
    if value_at(&snapshot.data, &split_path(dot_path)).is_none() {
        return Err(ConfigError::PathNotFound(dot_path.to_string()).into());
    }
    snapshot.push(Modification::from_dot_path(dot_path, None));
    save(&mut snapshot)?;
    Ok(format!("Deleted: {dot_path}"))
}

fn save(snapshot: &mut ScopeSnapshot) -> anyhow::Result<()> {
    let path = snapshot.file_path.clone();
    snapshot
        .save()
        .with_context(|| format!("writing {}", path.display()))
}

pub fn path(ctx: &Context) -> String {
    ctx.resolve().1.display().to_string()
}

pub fn init(ctx: &Context) -> anyhow::Result<String> {
    let (scope, path) = ctx.resolve();
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    create_new_config(&path)?;
    Ok(format!("Created {scope} config {}", path.display()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    /// A home directory and a git repository to run commands in.
    pub(crate) struct Sandbox {
        pub dir: tempfile::TempDir,
        pub ctx: Context,
    }

    impl Sandbox {
        pub(crate) fn new(global_config: Option<&str>) -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            let home = dir.path().join("home");
            let repo = dir.path().join("repo");
            fs::create_dir_all(repo.join(".git")).expect("repo");
            if let Some(text) = global_config {
                let config_dir = home.join(".config/opencode");
                fs::create_dir_all(&config_dir).expect("config dir");
                fs::write(config_dir.join("opencode.jsonc"), text).expect("global config");
            }
            let ctx = Context::new(ConfigLocations::new(home, repo), ScopeRequest::Auto);
            Self { dir, ctx }
        }

        pub(crate) fn global_path(&self) -> PathBuf {
            self.ctx.locations.resolve_global_path()
        }
    }

    #[test]
    fn test_get_values() {
        let sandbox = Sandbox::new(Some(
            r#"{
  // comment
  "theme": "nord",
  "share": null,
  "server": {"port": 4096},
  "skills": ["a", "b"]
}"#,
        ));
        let ctx = &sandbox.ctx;

        assert_eq!(get(ctx, "theme").expect("theme"), "nord");
        assert_eq!(get(ctx, "share").expect("share"), "null");
        assert_eq!(get(ctx, "server.port").expect("port"), "4096");
        assert_eq!(get(ctx, "server").expect("server"), "{\n  \"port\": 4096\n}");
        assert_eq!(get(ctx, "skills.1").expect("skill"), "b");

        let err = get(ctx, "server.hostname").expect_err("missing");
        assert_eq!(err.to_string(), "Path not found: server.hostname");
    }

    #[test]
    fn test_set_and_get_round_trip() {
        let sandbox = Sandbox::new(Some("{\n  // keep\n  \"theme\": \"nord\"\n}\n"));
        let ctx = &sandbox.ctx;

        assert_eq!(set(ctx, "server.port", "80").expect("set"), "Set server.port = 80");
        assert_eq!(set(ctx, "theme", "dark").expect("set"), "Set theme = \"dark\"");
        assert_eq!(set(ctx, "autoupdate", "false").expect("set"), "Set autoupdate = false");

        assert_eq!(get(ctx, "server.port").expect("get"), "80");
        assert_eq!(get(ctx, "theme").expect("get"), "dark");
        let text = fs::read_to_string(sandbox.global_path()).expect("read");
        assert!(text.contains("// keep"));
    }

    #[test]
    fn test_set_creates_missing_file() {
        let sandbox = Sandbox::new(None);
        let ctx = &sandbox.ctx;
        assert!(!sandbox.global_path().exists());

        set(ctx, "model", "openai/gpt-5").expect("set");
        let text = fs::read_to_string(sandbox.global_path()).expect("created");
        assert!(text.contains("\"$schema\""));
        assert_eq!(get(ctx, "model").expect("get"), "openai/gpt-5");
    }

    #[test]
    fn test_set_on_malformed_file_keeps_readable_keys() {
        let sandbox = Sandbox::new(Some("{\"theme\":\"nord\"\n\"model\":\"a/b\"}"));
        let ctx = &sandbox.ctx;

        assert_eq!(get(ctx, "model").expect("readable despite the typo"), "a/b");
        set(ctx, "server.port", "8080").expect("set");

        assert_eq!(get(ctx, "theme").expect("theme"), "nord");
        assert_eq!(get(ctx, "model").expect("model"), "a/b");
        assert_eq!(get(ctx, "server.port").expect("port"), "8080");
        assert!(ctx.snapshot().expect("reload").parse_errors.is_empty());
    }

    #[test]
    fn test_deeply_nested_file_is_an_error() {
        let sandbox = Sandbox::new(Some(&"[".repeat(200_000)));
        let err = get(&sandbox.ctx, "theme").expect_err("unreadable");
        assert!(format!("{err:#}").contains("nesting"));
        assert!(set(&sandbox.ctx, "theme", "nord").is_err());
    }

    #[test]
    fn test_delete() {
        let sandbox = Sandbox::new(Some("{\"theme\": \"nord\", \"model\": \"a/b\"}"));
        let ctx = &sandbox.ctx;

        assert_eq!(delete(ctx, "theme").expect("delete"), "Deleted: theme");
        assert!(get(ctx, "theme").is_err());
        assert_eq!(get(ctx, "model").expect("model"), "a/b");

        let err = delete(ctx, "theme").expect_err("already gone");
        assert_eq!(err.to_string(), "Path not found: theme");
    }

    #[test]
    fn test_path_and_init() {
        let sandbox = Sandbox::new(None);
        let project = Context::new(sandbox.ctx.locations.clone(), ScopeRequest::Project);

        let expected = sandbox.dir.path().join("repo").join("opencode.jsonc");
        assert_eq!(path(&project), expected.display().to_string());

        let created = init(&project).expect("init");
        assert!(created.starts_with("Created project config"));
        assert!(init(&project).is_err());

        // the project file now wins in auto scope
        assert_eq!(path(&sandbox.ctx), expected.display().to_string());
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!(true)).expect("bool"), "true");
        assert_eq!(render_value(&json!(1.5)).expect("float"), "1.5");
        assert_eq!(render_value(&json!([1])).expect("array"), "[\n  1\n]");
        assert_eq!(render_value(&json!("x")).expect("string"), "x");
    }
}
