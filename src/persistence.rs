//! File-backed configuration: application config, game records and binding
//! lists
use crate::command::Command;
use crate::controller::{Binding, InputKind};
use crate::game::Game;
use log::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::{fmt, fs};
use walkdir::WalkDir;

// Note: assumes a unix-like environment with $HOME set

/// Returns "$HOME/.config/.quicksplit" expanded
pub fn default_config_path() -> Result<PathBuf, Error> {
    let home = std::env::var("HOME").map_err(|e| Error::User(format!("{e}")))?;
    Ok(PathBuf::from(format!("{home}/.config/.quicksplit")))
}

/// Returns "$HOME/.quicksplit" expanded
pub fn default_data_folder() -> Result<PathBuf, Error> {
    let home = std::env::var("HOME").map_err(|e| Error::User(format!("{e}")))?;
    Ok(PathBuf::from(format!("{home}/.quicksplit")))
}

/// Returns "$HOME/.quicksplit/logs.txt"
pub fn default_log_file_path() -> Result<PathBuf, Error> {
    Ok(default_data_folder()?.join("logs.txt"))
}

#[derive(Serialize, Deserialize)]
pub struct Configuration {
    pub data_folder_path: PathBuf,
    // open the default game without asking
    pub use_default_game: bool,
    pub default_game_name: Option<String>,
}

impl Configuration {
    fn new(data_folder_path: PathBuf) -> Configuration {
        Configuration {
            data_folder_path,
            use_default_game: false,
            default_game_name: None,
        }
    }
}

#[derive(Debug)]
pub enum Error {
    ConfigFileOpen(String),
    ConfigFileRead(String),
    ConfigCreate(String),
    DataFolder(String),
    GameFile(String),
    BindingsFile(String),
    User(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg: String = match self {
            Error::ConfigFileOpen(msg) => {
                format!("Could not open configuration file: {msg}")
            }
            Error::ConfigFileRead(msg) => {
                format!("Could not read configuration file: {msg}")
            }
            Error::ConfigCreate(msg) => {
                format!("Error while creating configuration: {msg}")
            }
            Error::DataFolder(msg) => {
                format!("Error while using data folder: {msg}")
            }
            Error::GameFile(msg) => {
                format!("Error while using game record file: {msg}")
            }
            Error::BindingsFile(msg) => {
                format!("Error while using bindings file: {msg}")
            }
            Error::User(msg) => {
                format!("Error while configuring user files: {msg}")
            }
        };
        write!(f, "{msg}")
    }
}

/// Parse the configuration file, creating a default one (and the data folder)
/// on first launch
pub fn parse_config() -> Result<Configuration, Error> {
    let config_path = default_config_path()?;
    let data_folder = default_data_folder()?;
    if !data_folder.exists() {
        fs::create_dir_all(&data_folder).map_err(|e| Error::DataFolder(format!("{e}")))?;
        info!("Created data folder {}", data_folder.display());
    }
    if !config_path.exists() {
        let config = Configuration::new(data_folder);
        save_config_to_file(&config, &config_path)?;
        return Ok(config);
    }

    trace!("Parsing configuration file");
    let mut file = File::open(&config_path).map_err(|e| Error::ConfigFileOpen(e.to_string()))?;
    let mut config = String::new();
    file.read_to_string(&mut config)
        .map_err(|e| Error::ConfigFileRead(e.to_string()))?;
    let config: Configuration =
        toml::from_str(config.as_str()).map_err(|e| Error::ConfigFileRead(e.to_string()))?;
    Ok(config)
}

/// Save `configuration` to `path` as TOML
pub fn save_config_to_file(configuration: &Configuration, path: &Path) -> Result<(), Error> {
    let mut file = File::create(path).map_err(|e| Error::ConfigFileOpen(format!("{e}")))?;
    let config_content =
        toml::to_string(configuration).map_err(|e| Error::ConfigCreate(format!("{e}")))?;
    file.write_all(config_content.as_bytes())
        .map_err(|e| Error::ConfigCreate(format!("{e}")))?;
    info!("Configuration file saved");
    Ok(())
}

/// Search the data folder for a game record file named `name`
pub fn find_game_by_name(name: &str, config: &Configuration) -> Result<Game, Error> {
    if name.is_empty() {
        return Err(Error::GameFile("Game name cannot be empty.".to_string()));
    }
    let data_folder_path = &config.data_folder_path;
    debug!("parsing {}", data_folder_path.display());
    for entry in WalkDir::new(data_folder_path) {
        let e = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping entry that could not be parsed");
                debug!("Skipped entry error: {e}");
                continue;
            }
        };
        let file_name = e
            .path()
            .file_name()
            .ok_or("could not get file name")
            .map_err(|e| Error::GameFile(e.to_string()))?;
        let file_name = file_name
            .to_str()
            .ok_or("Error converting file name")
            .map_err(|e| Error::GameFile(e.to_string()))?;
        if file_name == name {
            info!("Found game record {file_name}");
            return Game::from_json_file(e.path()).map_err(|e| Error::GameFile(format!("{e}")));
        }
    }
    Err(Error::GameFile(format!(
        "Did not find game record with name {name}"
    )))
}

/// Load a game record from an explicit path, failing fast on a malformed file
pub fn load_game_from_file(path: &Path) -> Result<Game, Error> {
    Game::from_json_file(path).map_err(|e| Error::GameFile(format!("{e}")))
}

/// Save `game` next to where it was loaded from
pub fn save_game_to_file(game: &Game, path: &Path) -> Result<(), Error> {
    game.to_json_file(path)
        .map_err(|e| Error::GameFile(format!("{e}")))?;
    info!("Game record saved to {}", path.display());
    Ok(())
}

/// Parse a bindings file: a JSON array of `{source, type, value, event}`
pub fn load_bindings_from_file(path: &Path) -> Result<Vec<Binding>, Error> {
    let file = File::open(path).map_err(|e| Error::BindingsFile(format!("{e}")))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| Error::BindingsFile(format!("{e}")))
}

/// Save a binding list as JSON
pub fn save_bindings_to_file(bindings: &[Binding], path: &Path) -> Result<(), Error> {
    let file = File::create(path).map_err(|e| Error::BindingsFile(format!("{e}")))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, bindings)
        .map_err(|e| Error::BindingsFile(format!("{e}")))?;
    info!("Bindings saved to {}", path.display());
    Ok(())
}

/// The binding table written on first launch, one key per command
pub fn default_bindings() -> Vec<Binding> {
    let assignments = [
        ("s", Command::StartSplit),
        ("u", Command::Unsplit),
        ("p", Command::Pause),
        ("c", Command::Resume),
        ("x", Command::Stop),
        ("r", Command::Reset),
        ("k", Command::Skip),
        ("l", Command::Lock),
    ];
    assignments
        .into_iter()
        .map(|(value, event)| Binding {
            source: "stdin".to_string(),
            kind: InputKind::Simple,
            value: value.to_string(),
            event,
        })
        .collect()
}
