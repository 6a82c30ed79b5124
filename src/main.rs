use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use shufflecli::{cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Rebuild the shuffle playlist
    Shuffle(ShuffleOptions),

    /// Show or reset triage decisions
    Preferences(PreferencesOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct ShuffleOptions {
    /// Do not collect tracks from triaged playlists
    #[clap(long)]
    pub skip_playlists: bool,

    /// Do not collect liked songs
    #[clap(long)]
    pub skip_liked: bool,

    /// Do not collect top tracks of followed artists
    #[clap(long)]
    pub skip_artists: bool,

    /// Do not collect tracks of saved albums
    #[clap(long)]
    pub skip_albums: bool,

    /// Collect and shuffle, but leave the playlist untouched
    #[clap(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
#[command(
    about = "Show or reset triage decisions",
    args_conflicts_with_subcommands = true // disallow mixing list filters with `reset`
)]
pub struct PreferencesOptions {
    /// Only show playlist decisions
    #[clap(long)]
    pub playlists: bool,

    /// Only show artist decisions
    #[clap(long)]
    pub artists: bool,

    #[command(subcommand)]
    pub command: Option<PreferencesSubcommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PreferencesSubcommand {
    /// Forget decisions so they are asked again on the next run
    Reset(PreferencesResetOpts),
}

#[derive(Parser, Debug, Clone)]
pub struct PreferencesResetOpts {
    /// Reset playlist decisions
    #[clap(long)]
    pub playlists: bool,

    /// Reset artist decisions
    #[clap(long)]
    pub artists: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Auth => cli::auth().await,
        Command::Shuffle(opt) => {
            cli::shuffle(cli::ShuffleSettings {
                skip_playlists: opt.skip_playlists,
                skip_liked: opt.skip_liked,
                skip_artists: opt.skip_artists,
                skip_albums: opt.skip_albums,
                dry_run: opt.dry_run,
            })
            .await
        }
        Command::Preferences(opt) => match opt.command {
            Some(PreferencesSubcommand::Reset(r)) => {
                cli::reset_preferences(r.playlists, r.artists).await
            }
            None => cli::preferences(opt.playlists, opt.artists).await,
        },
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
