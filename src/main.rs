use clap::{
    ArgAction, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use bandruption::{cli, config, error};

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
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in to Spotify through a browser popup
    Login,

    /// Forget the Spotify session
    Logout,

    /// Show Spotify session and access information
    Status,

    /// Print the Spotify access token for the application session
    Token,

    /// Link a Spotify account to the application session
    Link,

    /// Remove the linked Spotify account
    Unlink,

    /// Manage the application session
    Session(SessionOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct SessionOptions {
    #[command(subcommand)]
    pub command: SessionSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SessionSubcommand {
    /// Store the application session
    Set(SessionSetOpts),

    /// Remove the application session
    Clear,
}

#[derive(Parser, Debug, Clone)]
pub struct SessionSetOpts {
    /// Application user id
    #[clap(long)]
    pub user_id: String,

    /// Bearer token of the application session
    #[clap(long)]
    pub token: String,

    /// Identity provider of the session; can be repeated
    #[clap(long = "provider", action = ArgAction::Append, num_args = 1)]
    pub providers: Vec<String>,
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
        Command::Login => cli::login().await,
        Command::Logout => cli::logout().await,
        Command::Status => cli::status().await,
        Command::Token => cli::token().await,
        Command::Link => cli::link().await,
        Command::Unlink => cli::unlink().await,
        Command::Session(opt) => match opt.command {
            SessionSubcommand::Set(s) => cli::set_session(s.user_id, s.token, s.providers).await,
            SessionSubcommand::Clear => cli::clear_session().await,
        },
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
