//! Command-line surface (component J, ambient): a config file path plus a
//! handful of operational overrides, in the teacher's `clap`-derive style.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "bsky-turbocharger", about = "Hydrates a Bluesky jetstream firehose with profile/post context")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    pub config: String,

    /// Override `hydration.modulo` from the config file.
    #[arg(long)]
    pub modulo: Option<i64>,

    /// Override `hydration.shard` from the config file.
    #[arg(long)]
    pub shard: Option<i64>,

    /// Number of tokio worker threads. Defaults to the tokio runtime's own
    /// default (the number of available cores) when unset.
    #[arg(long)]
    pub workers: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path_is_config_toml() {
        let cli = Cli::parse_from(["bsky-turbocharger"]);
        assert_eq!(cli.config, "config.toml");
        assert!(cli.modulo.is_none());
        assert!(cli.shard.is_none());
    }

    #[test]
    fn shard_and_modulo_overrides_parse() {
        let cli = Cli::parse_from(["bsky-turbocharger", "--modulo", "4", "--shard", "2"]);
        assert_eq!(cli.modulo, Some(4));
        assert_eq!(cli.shard, Some(2));
    }
}
