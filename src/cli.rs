use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kmanifest")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Track Kubernetes manifests declaratively through kubectl", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub kube: KubeArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings that override the config file
#[derive(Args, Debug, Default)]
pub struct KubeArgs {
    /// State file location [default: ~/.local/state/kmanifest/state.toml]
    #[arg(long, global = true, value_name = "PATH")]
    pub state: Option<String>,

    /// kubectl executable to use instead of the one on PATH
    #[arg(long, global = true, value_name = "PATH")]
    pub kubectl: Option<String>,

    /// Kubeconfig file passed to kubectl
    #[arg(long, global = true, value_name = "PATH")]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context passed to kubectl
    #[arg(long, global = true, value_name = "NAME")]
    pub context: Option<String>,

    /// Give up on a kubectl call after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or update the object described by a manifest
    Apply(ManifestArgs),

    /// Re-read tracked objects and pick up drift
    Refresh {
        /// Only refresh this resource
        name: Option<String>,
    },

    /// Delete a tracked object and stop tracking it
    Destroy {
        /// Resource name
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Start tracking an existing object by its self-link
    Import {
        /// Name to track the object under
        name: String,

        /// Self-link of the object
        selflink: String,
    },

    /// Show how a manifest differs from what is tracked
    Diff(ManifestArgs),

    /// Show tracked resources
    Show {
        /// Only show this resource
        name: Option<String>,
    },

    /// Print a manifest in canonical form
    Normalize {
        /// Manifest file (YAML or JSON)
        file: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ManifestArgs {
    /// Manifest file (YAML or JSON)
    pub file: PathBuf,

    /// Name to track the resource under [default: file stem]
    #[arg(short, long)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kmanifest",
            "apply",
            "cm.yaml",
            "--context",
            "staging",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.kube.context.as_deref(), Some("staging"));
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.file, PathBuf::from("cm.yaml"));
                assert!(args.name.is_none());
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_import_args() {
        let cli = Cli::try_parse_from([
            "kmanifest",
            "import",
            "demo",
            "api/v1/namespaces/default/configmaps/demo",
        ])
        .unwrap();
        match cli.command {
            Command::Import { name, selflink } => {
                assert_eq!(name, "demo");
                assert_eq!(selflink, "api/v1/namespaces/default/configmaps/demo");
            }
            _ => panic!("expected import"),
        }
    }
}
