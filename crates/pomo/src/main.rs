//! pomo - Focus/rest interval timer
//!
//! Usage:
//!   pomo                        Run the interactive timer
//!   pomo --focus 50 --rest 10   Run with different durations (not saved)
//!   pomo status                 Show settings and today's sessions
//!   pomo stats [--date D]       Show sessions for one day
//!   pomo stats --days 7         Show totals for the last N days
//!   pomo daily | weekly         Open today's daily / this week's weekly note
//!   pomo config show|path|set   Inspect or change the configuration
//!   pomo log <MESSAGE>          Append an event line to the session log

use anyhow::{bail, Context, Result};
use chrono::{Days, Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use pomo::app::{App, AppEvent, SettingsUpdate};
use pomo::config::ConfigStore;
use pomo::notes::Notes;
use pomo::opener::{SystemOpener, UrlOpener};
use pomo::session::{Outcome, SessionLog};
use pomo::sound::SoundPlayer;
use pomo::stats::SessionStats;
use pomo::timer::{CompletedPhase, Phase};
use pomo_core::{format, Paths};

/// pomo - Focus/rest interval timer
#[derive(Parser)]
#[command(name = "pomo")]
#[command(about = "Focus/rest interval timer with a session log and Obsidian notes")]
#[command(version)]
#[command(after_help = r#"WHEN TO USE:
    Around any block of focused work. Every finished focus period is logged
    with its outcome, and optionally mirrored into an Obsidian vault.

RUN COMMANDS (type and press Enter):
    f [MIN [REST]] [TEXT]   Start focusing, optionally on TEXT
    r                       Start a rest period
    p                       Pause / resume
    x                       Reset the current phase
    s                       Stop focusing early (logged as early stop)
    d / w                   Open the daily / weekly note
    q                       Quit

EXAMPLES:
    pomo                            # Start the timer
    pomo --focus 50 --rest 10       # Longer cycle for this run only
    pomo stats --days 7             # Last week's totals
    pomo config set focus 30        # Change the saved focus duration
    pomo config set vault-name work # Point notes at another vault

FILES:
    Configuration:  ~/.config/pomo/config.json
    Session log:    ~/.local/share/pomo/pomodoro_sessions.log
"#)]
struct Cli {
    /// Focus period in minutes for this run (not saved)
    #[arg(long, global = true, value_name = "MINUTES", value_parser = clap::value_parser!(u32).range(1..))]
    focus: Option<u32>,

    /// Rest period in minutes for this run (not saved)
    #[arg(long, global = true, value_name = "MINUTES", value_parser = clap::value_parser!(u32).range(1..))]
    rest: Option<u32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive timer (default)
    Run,

    /// Show current settings and today's sessions
    #[command(alias = "st")]
    Status,

    /// Show session statistics
    Stats {
        /// Day to report on (YYYY-MM-DD, default: today)
        #[arg(long, conflicts_with = "days")]
        date: Option<NaiveDate>,

        /// Report totals over the last N days instead
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
    },

    /// Open today's daily note
    Daily,

    /// Open this week's weekly note
    Weekly,

    /// Inspect or change the configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Append an event line to the session log
    Log {
        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the configuration as JSON (default)
    Show,
    /// Print the configuration file path
    Path,
    /// Change one setting
    Set {
        /// focus, rest, focus-sound, focus-volume, rest-sound, rest-volume,
        /// notes, vault-name, vault-path, daily-path, weekly-path,
        /// sessions-path, always-on-top
        key: String,
        value: String,
    },
}

// ANSI color codes
const RED: &str = "\x1b[0;31m";
const GREEN: &str = "\x1b[0;32m";
const YELLOW: &str = "\x1b[0;33m";
const CYAN: &str = "\x1b[0;36m";
const MAGENTA: &str = "\x1b[0;35m";
const BOLD: &str = "\x1b[1m";
const NC: &str = "\x1b[0m";

/// Check if stdout is a TTY and colors should be used
fn use_colors() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}

/// Conditionally apply color
fn color(code: &str, text: &str) -> String {
    if use_colors() {
        format!("{}{}{}", code, text, NC)
    } else {
        text.to_string()
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with the countdown line
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = Paths::new();
    let mut config = ConfigStore::load(&paths.config_file());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            config.override_durations(cli.focus, cli.rest);
            cmd_run(config, &paths)
        }
        Commands::Status => {
            config.override_durations(cli.focus, cli.rest);
            cmd_status(&config, &paths)
        }
        Commands::Stats { date, days } => cmd_stats(&paths, date, days),
        Commands::Daily => cmd_open_note(&config, &paths, NoteKind::Daily),
        Commands::Weekly => cmd_open_note(&config, &paths, NoteKind::Weekly),
        Commands::Config { action } => cmd_config(&mut config, action.unwrap_or(ConfigAction::Show)),
        Commands::Log { message } => cmd_log(&paths, &message.join(" ")),
    }
}

/// Run the interactive timer until `q` or end of input
fn cmd_run(config: ConfigStore, paths: &Paths) -> Result<()> {
    let log = SessionLog::open(&paths.session_log());
    let sink = SoundPlayer::new(config.config(), paths);
    let opener: Rc<dyn UrlOpener> = Rc::new(SystemOpener::new());
    let app = App::new(config, log, Box::new(sink), opener);

    // One thread drives the state machine; nothing here needs to be Send
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    rt.block_on(run_loop(app))
}

async fn run_loop(mut app: App) -> Result<()> {
    let interactive = use_colors();
    print_banner(&app);

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for event in app.tick() {
                    match event {
                        AppEvent::Display(remaining) => {
                            if interactive {
                                render(&app, remaining)?;
                            }
                        }
                        AppEvent::VerdictRequested(completed) => {
                            clear_line(interactive);
                            print_verdict_prompt(&completed);
                        }
                        AppEvent::RestFinished => {
                            clear_line(interactive);
                            println!("{} Rest is over. Type 'f' to focus again.", color(GREEN, "[ok]"));
                        }
                    }
                }
            }
            line = input.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                clear_line(interactive);

                if app.pending_verdict().is_some() {
                    if let Some(outcome) = parse_verdict(&line) {
                        if let Some(count) = app.resolve_verdict(outcome) {
                            println!(
                                "{} Session {} logged ({})",
                                color(GREEN, "[ok]"),
                                count,
                                outcome.label()
                            );
                        }
                        continue;
                    }
                }

                if !handle_command(&mut app, parse_command(&line)) {
                    break;
                }
            }
        }
    }

    clear_line(interactive);
    if let Some(count) = app.resolve_verdict(Outcome::Unspecified) {
        println!("{} Session {} logged without an outcome", color(CYAN, "[info]"), count);
    }
    Ok(())
}

/// Apply one run-loop command. Returns `false` to quit.
fn handle_command(app: &mut App, command: LineCommand) -> bool {
    match command {
        LineCommand::Focus {
            description,
            focus,
            rest,
        } => {
            app.start_focus(&description, focus, rest);
            let timer = app.timer();
            println!(
                "{} Focus for {}{}",
                color(MAGENTA, "[focus]"),
                format::minutes(timer.planned_focus_secs() / 60),
                if description.is_empty() {
                    String::new()
                } else {
                    format!(": {}", description)
                }
            );
        }
        LineCommand::Rest => {
            app.start_rest();
            println!(
                "{} Rest for {}",
                color(GREEN, "[rest]"),
                format::minutes(app.timer().planned_rest_secs() / 60)
            );
        }
        LineCommand::PauseResume => {
            app.pause_resume();
            println!("{} {}", color(CYAN, "[info]"), app.timer().status().label());
        }
        LineCommand::Reset => {
            app.reset();
            println!(
                "{} Reset to {}",
                color(CYAN, "[info]"),
                format::clock(app.timer().remaining_secs())
            );
        }
        LineCommand::StopEarly => match app.stop_early() {
            Some(count) => println!("{} Session {} logged (early stop)", color(YELLOW, "[stop]"), count),
            None => println!("{} No focus period to stop", color(CYAN, "[info]")),
        },
        LineCommand::Daily => {
            if !app.open_daily_note() {
                println!("{} Could not open the daily note", color(RED, "[error]"));
            }
        }
        LineCommand::Weekly => {
            if !app.open_weekly_note() {
                println!("{} Could not open the weekly note", color(RED, "[error]"));
            }
        }
        LineCommand::Help => print_run_help(),
        LineCommand::Quit => return false,
        LineCommand::Empty => {}
        LineCommand::Unknown(word) => {
            println!("{} Unknown command '{}', type 'h' for help", color(RED, "[error]"), word);
        }
    }
    true
}

/// Overwrite the countdown line in place
fn render(app: &App, remaining: u64) -> Result<()> {
    let timer = app.timer();
    let label = match timer.phase() {
        Phase::Focus => color(MAGENTA, timer.status().label()),
        Phase::Rest => color(GREEN, timer.status().label()),
    };
    let mut stdout = std::io::stdout();
    write!(
        stdout,
        "\r\x1b[K{} {} [{}%] {}",
        label,
        color(BOLD, &format::clock(remaining)),
        timer.progress_percent(),
        format::truncate(timer.description(), 40)
    )?;
    stdout.flush()?;
    Ok(())
}

fn clear_line(interactive: bool) {
    if interactive {
        print!("\r\x1b[K");
    }
}

fn print_banner(app: &App) {
    println!("{}", color(&format!("{}{}", BOLD, MAGENTA), "POMO"));
    println!();
    println!(
        "  {}  {} minutes",
        color(CYAN, "Focus:"),
        app.config().focus_period()
    );
    println!(
        "  {}   {} minutes",
        color(CYAN, "Rest:"),
        app.config().rest_period()
    );
    println!("  {} {}", color(CYAN, "Sessions:"), app.log().count());
    println!();
    println!("Type 'f' to start focusing, 'h' for help");
}

fn print_run_help() {
    println!("  f [MIN [REST]] [TEXT]  start focusing");
    println!("  r                      start a rest period");
    println!("  p                      pause / resume");
    println!("  x                      reset the current phase");
    println!("  s                      stop focusing early");
    println!("  d / w                  open daily / weekly note");
    println!("  q                      quit");
}

fn print_verdict_prompt(completed: &CompletedPhase) {
    println!(
        "{} Focus period complete after {}",
        color(GREEN, "[ok]"),
        format::duration(completed.elapsed_secs)
    );
    if !completed.description.is_empty() {
        println!("  {}  {}", color(CYAN, "Task:"), completed.description);
    }
    println!("Was it successful? [y]es / [n]o / skip");
}

/// Commands accepted by the interactive loop
#[derive(Debug, PartialEq, Eq)]
enum LineCommand {
    Focus {
        description: String,
        focus: Option<u32>,
        rest: Option<u32>,
    },
    Rest,
    PauseResume,
    Reset,
    StopEarly,
    Daily,
    Weekly,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_command(line: &str) -> LineCommand {
    let line = line.trim();
    let (head, args) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line, ""));

    match head.to_lowercase().as_str() {
        "" => LineCommand::Empty,
        "f" | "focus" => parse_focus(args),
        "r" | "rest" => LineCommand::Rest,
        "p" | "pause" => LineCommand::PauseResume,
        "x" | "reset" => LineCommand::Reset,
        "s" | "stop" => LineCommand::StopEarly,
        "d" | "daily" => LineCommand::Daily,
        "w" | "weekly" => LineCommand::Weekly,
        "h" | "help" | "?" => LineCommand::Help,
        "q" | "quit" | "exit" => LineCommand::Quit,
        other => LineCommand::Unknown(other.to_string()),
    }
}

/// `f [MIN [REST]] [TEXT]`: up to two leading numbers are durations
fn parse_focus(args: &str) -> LineCommand {
    let mut words = args.split_whitespace().peekable();
    let mut minutes = Vec::with_capacity(2);
    while minutes.len() < 2 {
        match words.peek().and_then(|w| w.parse::<u32>().ok()) {
            Some(m) => {
                minutes.push(m);
                words.next();
            }
            None => break,
        }
    }

    LineCommand::Focus {
        description: words.collect::<Vec<_>>().join(" "),
        focus: minutes.first().copied(),
        rest: minutes.get(1).copied(),
    }
}

/// Answer to the success prompt, if the line is one
fn parse_verdict(line: &str) -> Option<Outcome> {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(Outcome::Success),
        "n" | "no" => Some(Outcome::Failed),
        "skip" | "-" => Some(Outcome::Unspecified),
        _ => None,
    }
}

/// Show settings and today's sessions
fn cmd_status(config: &ConfigStore, paths: &Paths) -> Result<()> {
    let log = SessionLog::open(&paths.session_log());
    let today = log.daily_stats(Local::now().date_naive());

    println!("{}", color(&format!("{}{}", BOLD, MAGENTA), "POMO STATUS"));
    println!();
    println!("  {}      {} minutes", color(CYAN, "Focus:"), config.focus_period());
    println!("  {}       {} minutes", color(CYAN, "Rest:"), config.rest_period());
    println!("  {}      {}", color(CYAN, "Today:"), today.count);
    if !today.focus_areas.is_empty() {
        let areas: Vec<_> = today.focus_areas.iter().map(String::as_str).collect();
        println!("  {}  {}", color(CYAN, "Focus on:"), areas.join(", "));
    }
    println!("  {}   {}", color(CYAN, "Logged:"), log.count());
    println!(
        "  {}      {}",
        color(CYAN, "Notes:"),
        if config.is_obsidian_enabled() {
            format!("on (vault '{}')", config.obsidian().vault_name)
        } else {
            "off".to_string()
        }
    );
    println!();
    println!("  {}     {}", color(CYAN, "Config:"), config.path().display());
    println!("  {}        {}", color(CYAN, "Log:"), log.path().display());

    Ok(())
}

/// Show one day's sessions or totals over several days
fn cmd_stats(paths: &Paths, date: Option<NaiveDate>, days: Option<u32>) -> Result<()> {
    let log = SessionLog::open(&paths.session_log());
    let today = Local::now().date_naive();

    let Some(days) = days else {
        let date = date.unwrap_or(today);
        let daily = log.daily_stats(date);

        println!("{}Sessions on {}{}", BOLD, date.format("%Y-%m-%d"), NC);
        println!();
        println!("  {}  {}", color(CYAN, "Completed:"), daily.count);
        if daily.is_empty() {
            return Ok(());
        }
        println!("  {}", color(CYAN, "Focus areas:"));
        for area in &daily.focus_areas {
            println!("    - {}", area);
        }
        return Ok(());
    };

    let since = today
        .checked_sub_days(Days::new(u64::from(days - 1)))
        .unwrap_or(NaiveDate::MIN);
    let sessions = log
        .sessions_since(since)
        .context("Failed to read session log")?;
    let stats = SessionStats::from_sessions(&sessions);
    let (hours, mins) = stats.total_time();

    println!("{}Focus Statistics (Last {} days){}", BOLD, days, NC);
    println!();
    println!("  {}    {}", color(CYAN, "Total Sessions:"), stats.total_sessions);
    println!(
        "  {}        {} ({}%)",
        color(CYAN, "Successful:"),
        stats.successful_sessions,
        stats.success_rate
    );
    println!("  {}       {}", color(CYAN, "Early stops:"), stats.early_stops);
    println!("  {}  {}h {}m", color(CYAN, "Total Focus Time:"), hours, mins);

    if stats.total_sessions > 0 {
        println!();
        println!(
            "  {}   {} minutes",
            color(CYAN, "Average Session:"),
            stats.average_duration
        );
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum NoteKind {
    Daily,
    Weekly,
}

/// Open a note without starting the timer
fn cmd_open_note(config: &ConfigStore, paths: &Paths, kind: NoteKind) -> Result<()> {
    if !config.is_obsidian_enabled() {
        bail!("Notes integration is disabled. Enable it with 'pomo config set notes true'.");
    }

    let notes = Notes::new(config.obsidian().clone(), Rc::new(SystemOpener::new()));
    let (opened, name) = match kind {
        NoteKind::Daily => (notes.open_daily_note(), "daily"),
        NoteKind::Weekly => (notes.open_weekly_note(), "weekly"),
    };
    if !opened {
        bail!("Could not open the {} note (run with RUST_LOG=info for details)", name);
    }

    let log = SessionLog::open(&paths.session_log());
    log.log_event(&format!("Opened {} note", name))
        .context("Failed to write session log")?;
    println!("{} Opened {} note", color(GREEN, "[ok]"), name);
    Ok(())
}

fn cmd_config(config: &mut ConfigStore, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let json = serde_json::to_string_pretty(config.config())
                .context("Failed to serialize configuration")?;
            println!("{}", json);
        }
        ConfigAction::Path => println!("{}", config.path().display()),
        ConfigAction::Set { key, value } => {
            let update = parse_setting(&key, &value)?;
            update
                .apply_to(config)
                .with_context(|| format!("Invalid value for {}", key))?;
            println!("{} {} = {}", color(GREEN, "[ok]"), key, value);
        }
    }
    Ok(())
}

/// Translate `config set KEY VALUE` into a settings update
fn parse_setting(key: &str, value: &str) -> Result<SettingsUpdate> {
    let minutes = || {
        value
            .parse::<u32>()
            .with_context(|| format!("'{}' is not a number of minutes", value))
    };
    let volume = || {
        value
            .parse::<f64>()
            .with_context(|| format!("'{}' is not a volume between 0.0 and 1.0", value))
    };
    let text = || Some(value.to_string());

    let mut update = SettingsUpdate::default();
    match key {
        "focus" => update.focus_minutes = Some(minutes()?),
        "rest" => update.rest_minutes = Some(minutes()?),
        "focus-sound" => update.focus_sound = text(),
        "focus-volume" => update.focus_volume = Some(volume()?),
        "rest-sound" => update.rest_sound = text(),
        "rest-volume" => update.rest_volume = Some(volume()?),
        "notes" => update.notes_enabled = Some(parse_bool(value)?),
        "vault-name" => update.vault_name = text(),
        "vault-path" => update.vault_path = text(),
        "daily-path" => update.daily_notes_path = text(),
        "weekly-path" => update.weekly_notes_path = text(),
        "sessions-path" => update.sessions_notes_path = text(),
        "always-on-top" => update.always_on_top = Some(parse_bool(value)?),
        _ => bail!("Unknown setting '{}'. See 'pomo config set --help'.", key),
    }
    Ok(update)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => bail!("'{}' is not true or false", value),
    }
}

/// Append a free-form event line
fn cmd_log(paths: &Paths, message: &str) -> Result<()> {
    let log = SessionLog::open(&paths.session_log());
    log.log_event(message).context("Failed to write session log")?;
    println!("{} Logged", color(GREEN, "[ok]"));
    Ok(())
}
