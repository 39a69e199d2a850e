mod listing;
mod tui;


use std::thread;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::api::{
    ApiClient, ConfigUpdate, ListQuery, RecommendQuery, SkillFocus, Task, TaskStatus,
    TrackerBackend,
};
use crate::cli::{Cli, Command, ConfigCommand, PageArgs};
use crate::db::Database;
use crate::mods::{ModSet, format_mods};
use crate::paths::database_file_path;
use crate::session::{DEFAULT_POLL_INTERVAL, PollOutcome, ProgressPoller};
use crate::stats::{aggregate_stats, group_thousands, round2};

use self::listing::{
    beatmap_difficulty, beatmap_title, bpm_text, format_played_at, pp_text,
    replay_difficulty, replay_title, score_text, sort_beatmaps, sort_by_pp_desc, stars_text,
    stat_text, total_pages, truncate,
};

const PROFILE_FETCH_LIMIT: u32 = 100;

pub fn run(cli: Cli) -> Result<()> {
    let client = ApiClient::new(&cli.server);
    info!(server = client.base_url(), "osutrack starting");

    match cli.command {
        Some(Command::Scores { player, page }) => run_scores(&client, player, &page)?,
        Some(Command::Profile { player, top }) => run_profile(&client, &player, top)?,
        Some(Command::Beatmaps { page }) => run_beatmaps(&client, &page)?,
        Some(Command::Players) => run_players(&client)?,
        Some(Command::Recommend {
            sr,
            bpm,
            mods,
            focus,
            exclude,
        }) => run_recommend(&client, sr, bpm, &mods, focus, exclude)?,
        Some(Command::Suggest {
            player,
            mods,
            focus,
        }) => run_suggest(&client, &player, &mods, focus)?,
        Some(Command::Scan { wait }) => run_task(&client, Task::Scan, wait)?,
        Some(Command::Sync { wait }) => run_task(&client, Task::Sync, wait)?,
        Some(Command::Status) => run_status(&client)?,
        Some(Command::Config { action }) => run_config(&client, action)?,
        Some(Command::Train) | None => {
            let db = open_db()?;
            tui::run_tui(client, &db)?
        }
    }

    Ok(())
}

fn list_query(page: &PageArgs, player_name: Option<String>) -> ListQuery {
    ListQuery {
        page: page.page,
        limit: page.limit,
        search: page.search.clone(),
        player_name,
    }
}

fn run_scores(client: &ApiClient, player: Option<String>, page: &PageArgs) -> Result<()> {
    let query = list_query(page, player);
    let result = client.replays(&query).context("failed to load scores")?;
    if result.replays.is_empty() {
        println!("No replays found. Try `osutrack scan`.");
        return Ok(());
    }

    print_replay_table(&result.replays);
    if let Some(pages) = total_pages(result.total, query.limit) {
        println!("\nPage {} of {pages}", query.page.max(1));
    } else {
        println!("\nDisplaying {} scores.", result.replays.len());
    }
    Ok(())
}

fn print_replay_table(replays: &[crate::api::Replay]) {
    println!(
        "{:<4} {:<40} {:<24} {:<14} {:<8} {:<10} {:<8} {:<10} {:<16}",
        "RANK", "BEATMAP", "DIFFICULTY", "PLAYER", "ACC", "PP", "MODS", "SCORE", "PLAYED"
    );
    for replay in replays {
        println!(
            "{:<4} {:<40} {:<24} {:<14} {:<8} {:<10} {:<8} {:<10} {:<16}",
            replay.display_rank(),
            truncate(&replay_title(replay), 40),
            truncate(&replay_difficulty(replay.beatmap.as_ref()), 24),
            truncate(&replay.player_name, 14),
            format!("{:.2}%", replay.accuracy()),
            pp_text(replay.pp),
            format_mods(replay.mods_used),
            score_text(replay.total_score),
            format_played_at(replay.played_at.as_deref()),
        );
    }
}

fn run_profile(client: &ApiClient, player: &str, top: usize) -> Result<()> {
    let stats = client
        .player_stats(player)
        .with_context(|| format!("failed to load stats for {player}"))?;
    let mut replays = client
        .replays(&ListQuery {
            page: 1,
            limit: PROFILE_FETCH_LIMIT,
            search: None,
            player_name: Some(player.to_string()),
        })
        .with_context(|| format!("failed to load scores for {player}"))?
        .replays;
    sort_by_pp_desc(&mut replays);
    let local = aggregate_stats(&replays);

    println!("{player}'s Profile");
    println!("  Total PP:      {}", group_thousands(stats.total_pp.round() as u64));
    println!("  Play Count:    {}", group_thousands(stats.play_count));
    println!("  Top Play:      {}pp", round2(stats.top_play_pp));
    println!("  Mean Accuracy: {:.2}%", local.mean_accuracy);

    if replays.is_empty() {
        println!("\nNo scores found for this player.");
        return Ok(());
    }
    println!();
    let shown = top.max(1).min(replays.len());
    print_replay_table(&replays[..shown]);
    println!("\nDisplaying {shown} of {} scores for {player}.", replays.len());
    Ok(())
}

fn run_beatmaps(client: &ApiClient, page: &PageArgs) -> Result<()> {
    let query = list_query(page, None);
    let mut result = client.beatmaps(&query).context("failed to load beatmaps")?;
    if result.beatmaps.is_empty() {
        println!("No beatmaps found. Try `osutrack sync`.");
        return Ok(());
    }
    sort_beatmaps(&mut result.beatmaps);

    println!(
        "{:<44} {:<28} {:<8} {:<5} {:<5} {:<5} {:<5} {:<20}",
        "BEATMAP", "DIFFICULTY", "STARS", "CS", "AR", "OD", "HP", "BPM"
    );
    for beatmap in &result.beatmaps {
        println!(
            "{:<44} {:<28} {:<8} {:<5} {:<5} {:<5} {:<5} {:<20}",
            truncate(&beatmap_title(beatmap), 44),
            truncate(&beatmap_difficulty(beatmap), 28),
            stars_text(beatmap.stars),
            stat_text(beatmap.cs),
            stat_text(beatmap.ar),
            stat_text(beatmap.od),
            stat_text(beatmap.hp),
            bpm_text(beatmap),
        );
    }
    if let Some(pages) = total_pages(result.total, query.limit) {
        println!("\nPage {} of {pages}", query.page.max(1));
    }
    Ok(())
}

fn run_players(client: &ApiClient) -> Result<()> {
    let players = client.players().context("failed to load players")?;
    if players.is_empty() {
        println!("No players found. Try `osutrack scan`.");
        return Ok(());
    }
    for player in players {
        println!("{player}");
    }
    Ok(())
}

fn run_recommend(
    client: &ApiClient,
    sr: f64,
    bpm: f64,
    mods: &ModSet,
    focus: SkillFocus,
    exclude: Vec<String>,
) -> Result<()> {
    if !sr.is_finite() || !bpm.is_finite() || sr <= 0.0 || bpm <= 0.0 {
        bail!("Please enter valid SR and BPM values.");
    }
    let query = RecommendQuery {
        star_rating: sr,
        max_bpm: bpm,
        mods: mods.bits(),
        exclude,
        focus,
    };
    match client
        .recommend(&query)
        .context("failed to fetch a recommendation")?
    {
        Some(beatmap) => {
            println!("{}", beatmap_title(&beatmap));
            println!("  {}", beatmap_difficulty(&beatmap));
            println!("  Stars: {}   BPM: {}", stars_text(beatmap.stars), bpm_text(&beatmap));
            println!("  Mods:  {mods}   Focus: {}", focus.as_str());
            println!("  Hash:  {}", beatmap.md5_hash);
            if let (Some(folder), Some(audio)) = (&beatmap.folder_name, &beatmap.audio_file)
                && let Some(url) = client.song_file_url(folder, audio)
            {
                println!("  Audio: {url}");
            }
        }
        None => println!("No new map found. Try adjusting the values."),
    }
    Ok(())
}

fn run_suggest(client: &ApiClient, player: &str, mods: &ModSet, focus: SkillFocus) -> Result<()> {
    match client
        .suggest_sr(player, mods.bits(), focus)
        .context("failed to fetch an SR suggestion")?
    {
        Some(suggestion) => println!(
            "Suggestion based on your last {} {}-focused plays: {:.2} ★",
            suggestion.plays_considered,
            focus.as_str(),
            suggestion.suggested_sr
        ),
        None => println!("No plays found with this mod combination."),
    }
    Ok(())
}

fn run_task(client: &ApiClient, task: Task, wait: bool) -> Result<()> {
    let started = match task {
        Task::Scan => client.start_scan(),
        Task::Sync => client.start_sync(),
    };
    match started {
        Ok(accepted) if accepted.status.is_empty() => println!("Started {}.", task.label()),
        Ok(accepted) => println!("{}", accepted.status),
        // A task that is already running can still be waited on.
        Err(err) if err.status() == Some(409) => println!("{err}"),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to start {}", task.label()));
        }
    }
    if !wait {
        return Ok(());
    }

    let mut poller = ProgressPoller::default();
    poller.start(&[task], DEFAULT_POLL_INTERVAL, Instant::now());
    while poller.is_active() {
        thread::sleep(DEFAULT_POLL_INTERVAL);
        match poller.poll_if_due(client, Instant::now()) {
            PollOutcome::Idle => {}
            PollOutcome::Failed(message) => bail!("progress polling failed: {message}"),
            PollOutcome::Tick(tick) => {
                let progress = tick.snapshot.task(task);
                println!("  {}", progress.summary());
                if let Some((_, status)) = tick.finished.first() {
                    match status {
                        TaskStatus::Complete => println!("{} complete.", task.label()),
                        _ => bail!("{} failed: {}", task.label(), progress.message),
                    }
                }
            }
        }
    }
    Ok(())
}

fn run_status(client: &ApiClient) -> Result<()> {
    let status = client
        .progress_status()
        .context("failed to load task status")?;
    println!("{:<6} {:<10} {}", "TASK", "STATUS", "PROGRESS");
    for task in [Task::Scan, Task::Sync] {
        let progress = status.task(task);
        println!(
            "{:<6} {:<10} {}",
            task.label(),
            progress.status.label(),
            progress.summary()
        );
    }
    Ok(())
}

fn run_config(client: &ApiClient, action: ConfigCommand) -> Result<()> {
    match action {
        ConfigCommand::Show => {
            let config = client.config().context("failed to load server config")?;
            println!("Server ({})", client.base_url());
            println!("  osu_folder:     {}", or_unset(&config.osu_folder));
            println!("  default_player: {}", or_unset(&config.default_player));

            let db = open_db()?;
            let prefs = db.list()?;
            println!("\nLocal preferences");
            if prefs.is_empty() {
                println!("  (defaults)");
            }
            for entry in prefs {
                println!("  {:<16} {:<12} {}", entry.key, or_unset(&entry.value), entry.updated_at);
            }
        }
        ConfigCommand::Set {
            osu_folder,
            default_player,
        } => {
            let update = ConfigUpdate {
                osu_folder,
                default_player,
            };
            if update == ConfigUpdate::default() {
                bail!("nothing to set: pass --osu-folder and/or --default-player");
            }
            let message = client
                .save_config(&update)
                .context("failed to save server config")?;
            println!("{message}");
        }
    }
    Ok(())
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() { "(unset)" } else { value }
}

fn open_db() -> Result<Database> {
    let db_path = database_file_path()?;
    let db = Database::open(&db_path)?;
    db.migrate()?;
    Ok(db)
}
