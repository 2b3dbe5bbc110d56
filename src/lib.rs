use std::fmt;

pub mod clock;
pub mod command;
pub mod controller;
pub mod game;
pub mod persistence;
pub mod session;
pub mod splits;
pub mod timer;

#[derive(Debug)]
pub enum Error {
    Timer(String),
    Splits(String),
    Binding(String),
    Game(String),
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg: String = match self {
            Error::Timer(msg) => format!("Timer: {msg}"),
            Error::Splits(msg) => format!("Splits: {msg}"),
            Error::Binding(msg) => format!("Binding: {msg}"),
            Error::Game(msg) => format!("Game: {msg}"),
            Error::Other(msg) => format!("Other: {msg}"),
        };
        write!(f, "{msg}")
    }
}

/// Formats elapsed milliseconds as compact wall-clock time, dropping leading
/// zero hour/minute groups. Negative values are prefixed with '-' (used for
/// time-save deltas).
///
/// `0 -> "00.000"`, `60000 -> "01:00.000"`, `-500 -> "-00.500"`
pub fn format_wall_clock_from_ms(millis: i64) -> String {
    let sign = if millis < 0 { "-" } else { "" };
    let millis = millis.abs();
    let (s, ms) = (millis / 1000, millis % 1000);
    let (m, s) = (s / 60, s % 60);
    let (h, m) = (m / 60, m % 60);

    if h != 0 {
        format!("{sign}{h:02}:{m:02}:{s:02}.{ms:03}")
    } else if m != 0 {
        format!("{sign}{m:02}:{s:02}.{ms:03}")
    } else {
        format!("{sign}{s:02}.{ms:03}")
    }
}

/// Formats elapsed milliseconds as full-length `hh:mm:ss.mmm`
pub fn format_wall_clock_full(millis: i64) -> String {
    let sign = if millis < 0 { "-" } else { "" };
    let millis = millis.abs();
    let (s, ms) = (millis / 1000, millis % 1000);
    let (m, s) = (s / 60, s % 60);
    let (h, m) = (m / 60, m % 60);

    format!("{sign}{h:02}:{m:02}:{s:02}.{ms:03}")
}

/// Formats a time difference with an explicit sign, '+' meaning time lost
/// against the comparison and '-' meaning time saved
pub fn format_signed_delta_ms(delta: i64) -> String {
    if delta >= 0 {
        format!("+{}", format_wall_clock_from_ms(delta))
    } else {
        format_wall_clock_from_ms(delta)
    }
}
