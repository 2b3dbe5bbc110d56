use clap::{crate_authors, crate_name, crate_version, Arg, Command as ClapCommand};
use log::*;
use quicksplit::controller::{InputEvent, InputRouter};
use quicksplit::persistence::*;
use quicksplit::session::{Session, Ticker};
use quicksplit::splits::{Phase, SegmentRank};
use quicksplit::{format_signed_delta_ms, format_wall_clock_from_ms};
use simplelog::{Config, WriteLogger};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use std::fs;

fn main() -> ExitCode {
    let appname = env!("CARGO_PKG_NAME");
    let after_help_msg = format!(
        "Files are placed under:
* $HOME/.{appname}            (game records, bindings, logs)
* $HOME/.config/.{appname}    (application configuration)

Game records are JSON files; pass the file name found in the data folder with \
--game, or set default_game_name in the configuration file.

Commands are read from stdin, one input per line, routed through the bindings \
file. Type 'quit' to exit; attempts are saved when closing the application."
    );
    let cmd = ClapCommand::new(crate_name!())
        .author(crate_authors!())
        .version(crate_version!())
        .about("Splits timer without the window dressing")
        .arg(
            Arg::new("game")
                .short('g')
                .long("game")
                .help("File name of the game record to load from the data folder")
                .takes_value(true)
                .value_name("GAME"),
        )
        .arg(
            Arg::new("bindings")
                .short('b')
                .long("bindings")
                .help("Path of the bindings file (defaults to <data folder>/bindings.json)")
                .takes_value(true)
                .value_name("BINDINGS"),
        )
        .after_help(after_help_msg.as_str());
    let m = cmd.get_matches();

    // don't log until --help is parsed
    let default_log_file_path = match default_log_file_path() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(parent) = default_log_file_path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        }
    }
    let f = match fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&default_log_file_path)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let _ = WriteLogger::init(LevelFilter::Info, Config::default(), f);
    info!("{appname} start");

    let config = match parse_config() {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // a missing or corrupt record refuses to start rather than running with
    // fabricated bests
    let game_name = match m.value_of("game") {
        Some(name) => name.to_string(),
        None => match (config.use_default_game, config.default_game_name.as_deref()) {
            (true, Some(name)) => name.to_string(),
            _ => {
                eprintln!(
                    "No game record given. Pass --game <file name> or set \
default_game_name in the configuration file."
                );
                return ExitCode::FAILURE;
            }
        },
    };
    let game = match find_game_by_name(&game_name, &config) {
        Ok(g) => g,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let game_path = config.data_folder_path.join(&game_name);

    let bindings_path = match m.value_of("bindings") {
        Some(p) => PathBuf::from(p),
        None => config.data_folder_path.join("bindings.json"),
    };
    if !bindings_path.exists() {
        if let Err(e) = save_bindings_to_file(&default_bindings(), &bindings_path) {
            error!("{e}");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
        info!("Wrote default bindings to {}", bindings_path.display());
    }
    let bindings = match load_bindings_from_file(&bindings_path) {
        Ok(b) => b,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let mut router = InputRouter::new();
    if let Err(e) = router.import_mapping(&bindings) {
        error!("{e}");
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    println!("{} - {}", game.title, game.sub_title);
    let mut session = Session::new(game);
    session.on_finish(|| println!("Run finished!"));
    session.on_reset(|| println!("Run reset."));

    let session = Arc::new(Mutex::new(session));
    let mut ticker = Ticker::spawn(session.clone(), Duration::from_millis(1));

    // headless presentation loop: stdin lines become input events
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("stdin: {e}");
                break;
            }
        };
        let value = line.trim();
        if value.is_empty() {
            continue;
        }
        if value == "quit" || value == "exit" {
            break;
        }
        let event = InputEvent::simple("stdin", value);
        match router.route(&event) {
            Some(command) => {
                let mut session = match session.lock() {
                    Ok(s) => s,
                    Err(e) => {
                        error!("session mutex poisoned: {e}");
                        break;
                    }
                };
                session.handle_control(command);
                print_status(&session);
            }
            None if !router.is_listening() => println!("(locked)"),
            None => debug!("unmapped input '{value}'"),
        }
    }

    ticker.shutdown();
    let session = match session.lock() {
        Ok(mut s) => {
            s.quit();
            s
        }
        Err(e) => {
            error!("session mutex poisoned: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = save_game_to_file(session.game(), &game_path) {
        error!("{e}");
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }
    info!("{appname} exit");
    ExitCode::SUCCESS
}

/// Print the split table and current time, the stand-in for the GUI
fn print_status(session: &Session) {
    let game = session.game();
    let splits = session.splits();
    let padding = game
        .splits
        .iter()
        .map(|s| s.split_name.len())
        .max()
        .unwrap_or(0);

    for (i, record) in game.splits.iter().enumerate() {
        let live = splits.live(i);
        let marker = if splits.phase() == Phase::Running && i == splits.current_index() {
            ">"
        } else {
            " "
        };
        let delta = match live.delta_ms {
            Some(d) => format_signed_delta_ms(d),
            None => String::new(),
        };
        let comparison = if game.display_pb {
            format_wall_clock_from_ms(record.pb_time_ms)
        } else {
            format_wall_clock_from_ms(record.pb_segment_total_ms)
        };
        println!(
            "{marker} {:<padding$}  {:<12} {:<12} {}",
            record.split_name,
            delta,
            comparison,
            rank_tag(live.rank),
        );
    }
    println!(
        "  elapsed: {}  attempts: {} (session {})",
        format_wall_clock_from_ms(session.current_elapsed_ms()),
        game.lifetime_attempts,
        game.session_attempts,
    );
}

fn rank_tag(rank: SegmentRank) -> &'static str {
    match rank {
        SegmentRank::Neutral => "",
        SegmentRank::GoldAhead => "[gold]",
        SegmentRank::GoldBehind => "[gold, behind]",
        SegmentRank::SavedTime => "[saved]",
        SegmentRank::LostTime => "[lost]",
        SegmentRank::Ahead => "[ahead]",
    }
}
