use clap::Parser;
use comicglass_config::Overrides;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Serves a browsable HTML index of a comic and book library.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Config file (TOML, YAML or JSON). Defaults to the platform config
    /// directory, e.g. ~/.config/comicglass/config.toml
    #[arg(short, long, env = "COMICGLASS_CONFIG")]
    pub config: Option<PathBuf>,
    /// Library root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,
    /// Address to listen on
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,
    /// Maximum number of directories kept in the listing cache
    #[arg(long)]
    pub max_entries: Option<NonZeroUsize>,
    /// Don't walk the library at startup
    #[arg(long)]
    pub no_prewarm: bool,
    /// Log as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}
impl Args {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            root: self.root.clone(),
            listen: self.listen,
            max_entries: self.max_entries,
            // Flags can only switch things off (or on); absent means "leave it
            // to the config".
            prewarm: self.no_prewarm.then_some(false),
            json_logs: self.json_logs.then_some(true),
        }
    }
}
