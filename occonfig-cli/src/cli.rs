use clap::{Parser, Subcommand};
use occonfig::paths::ScopeRequest;

/// Inspect and edit opencode configuration files.
#[derive(Parser, Debug)]
#[command(name = "occonfig", version, about)]
pub struct Cli {
    /// Use the global config (~/.config/opencode)
    #[arg(long, global = true, conflicts_with = "project")]
    pub global: bool,

    /// Use the project config (nearest opencode.jsonc up to the git root)
    #[arg(long, global = true)]
    pub project: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the value at a dot path
    Get { path: String },
    /// Set the value at a dot path
    Set {
        path: String,
        /// `true`/`false`, a number, or any other text as a string
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Remove the key at a dot path
    Delete { path: String },
    /// List providers, models, agents or keys
    List {
        resource: String,
        /// Only list models of this provider
        #[arg(long)]
        provider: Option<String>,
        /// Fetch the model catalog even if the cached copy is fresh
        #[arg(long)]
        refresh: bool,
    },
    /// Check the config against the schema
    Validate,
    /// Print the resolved config file path
    Path,
    /// Print the config tree reconciled with the schema
    Tree {
        /// Include keys that are not set
        #[arg(long)]
        all: bool,
        /// Expand every branch
        #[arg(long)]
        expand: bool,
        /// List keys whose name, path or description contains QUERY
        #[arg(long, value_name = "QUERY")]
        search: Option<String>,
    },
    /// Create the config file if it does not exist
    Init,
}

impl Cli {
    pub fn scope_request(&self) -> ScopeRequest {
        if self.global {
            ScopeRequest::Global
        } else if self.project {
            ScopeRequest::Project
        } else {
            ScopeRequest::Auto
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scope_flags() {
        let cli = Cli::try_parse_from(["occonfig", "get", "theme", "--global"]).expect("parse");
        assert_eq!(cli.scope_request(), ScopeRequest::Global);
        assert_eq!(cli.command, Commands::Get { path: "theme".into() });

        let cli = Cli::try_parse_from(["occonfig", "--project", "path"]).expect("parse");
        assert_eq!(cli.scope_request(), ScopeRequest::Project);

        let cli = Cli::try_parse_from(["occonfig", "validate"]).expect("parse");
        assert_eq!(cli.scope_request(), ScopeRequest::Auto);

        assert!(Cli::try_parse_from(["occonfig", "--global", "--project", "path"]).is_err());
    }

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["occonfig", "set", "server.port", "-1"]).expect("parse");
        assert_eq!(
            cli.command,
            Commands::Set {
                path: "server.port".into(),
                value: "-1".into()
            }
        );

        let cli = Cli::try_parse_from(["occonfig", "list", "models", "--provider", "openai"])
            .expect("parse");
        assert_eq!(
            cli.command,
            Commands::List {
                resource: "models".into(),
                provider: Some("openai".into()),
                refresh: false,
            }
        );

        let cli = Cli::try_parse_from(["occonfig", "tree", "--all"]).expect("parse");
        assert_eq!(
            cli.command,
            Commands::Tree {
                all: true,
                expand: false,
                search: None
            }
        );

        let cli = Cli::try_parse_from(["occonfig", "tree", "--search", "port"]).expect("parse");
        assert!(matches!(&cli.command, Commands::Tree { search: Some(q), .. } if q == "port"));

        let cli = Cli::try_parse_from(["occonfig", "list", "models", "--refresh"]).expect("parse");
        assert!(matches!(cli.command, Commands::List { refresh: true, .. }));

        assert!(Cli::try_parse_from(["occonfig"]).is_err());
    }
}
