use clap::{Args, Parser, Subcommand};

use crate::api::SkillFocus;
use crate::mods::ModSet;

#[derive(Debug, Parser)]
#[command(
    name = "osutrack",
    version,
    about = "Browse tracked osu! replays and run adaptive training sessions"
)]
pub struct Cli {
    /// Base URL of the replay tracker server.
    #[arg(
        long,
        global = true,
        env = "OSUTRACK_SERVER",
        default_value = "http://127.0.0.1:5000"
    )]
    pub server: String,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Args)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 20)]
    pub limit: u32,
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recent scores, newest first.
    Scores {
        #[arg(long)]
        player: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Aggregate stats and top plays for one player.
    Profile {
        player: String,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    Beatmaps {
        #[command(flatten)]
        page: PageArgs,
    },
    Players,
    /// Ask the server for one training map.
    Recommend {
        #[arg(long)]
        sr: f64,
        #[arg(long, default_value_t = 200.0)]
        bpm: f64,
        #[arg(long, default_value = "NM")]
        mods: ModSet,
        #[arg(long, default_value = "balanced")]
        focus: SkillFocus,
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },
    /// Suggested star rating from the player's recent plays.
    Suggest {
        player: String,
        #[arg(long, default_value = "NM")]
        mods: ModSet,
        #[arg(long, default_value = "balanced")]
        focus: SkillFocus,
    },
    /// Scan the replay folder for new plays.
    Scan {
        #[arg(long)]
        wait: bool,
    },
    /// Sync the beatmap database from osu!.db.
    Sync {
        #[arg(long)]
        wait: bool,
    },
    Status,
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// Interactive training session (default).
    Train,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    Show,
    Set {
        #[arg(long)]
        osu_folder: Option<String>,
        #[arg(long)]
        default_player: Option<String>,
    },
}
