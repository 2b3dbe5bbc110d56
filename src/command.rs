//! The closed set of control commands the rest of the application reacts to
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A timer control command, produced by the input router and consumed by the
/// run timer and the split sequence.
///
/// The wire names (`STARTSPLIT`, ...) are the ones stored in binding files,
/// so both the strum and serde representations use them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
pub enum Command {
    #[strum(serialize = "STARTSPLIT")]
    #[serde(rename = "STARTSPLIT")]
    StartSplit,
    #[strum(serialize = "UNSPLIT")]
    #[serde(rename = "UNSPLIT")]
    Unsplit,
    #[strum(serialize = "PAUSE")]
    #[serde(rename = "PAUSE")]
    Pause,
    #[strum(serialize = "RESUME")]
    #[serde(rename = "RESUME")]
    Resume,
    #[strum(serialize = "STOP")]
    #[serde(rename = "STOP")]
    Stop,
    #[strum(serialize = "RESET")]
    #[serde(rename = "RESET")]
    Reset,
    #[strum(serialize = "SKIP")]
    #[serde(rename = "SKIP")]
    Skip,
    #[strum(serialize = "LOCK")]
    #[serde(rename = "LOCK")]
    Lock,
}
