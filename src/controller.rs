//! The input router: raw input events in, control commands out
use crate::command::Command;
use crate::Error;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether an input is a plain character or a special key/button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Simple,
    Complex,
}

/// Opaque identity of an input as some listener reported it. Listeners
/// themselves live outside this crate; the router only compares identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputEvent {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub value: String,
}

impl InputEvent {
    pub fn simple(source: &str, value: &str) -> InputEvent {
        InputEvent {
            source: source.to_string(),
            kind: InputKind::Simple,
            value: value.to_string(),
        }
    }

    pub fn complex(source: &str, value: &str) -> InputEvent {
        InputEvent {
            source: source.to_string(),
            kind: InputKind::Complex,
            value: value.to_string(),
        }
    }
}

/// Persisted form of one input-to-command assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub value: String,
    pub event: Command,
}

/// Maps input events to control commands, with a lock toggle that suppresses
/// everything except the unlock press itself. At most one input per command;
/// reassigning a command drops its old input, while stealing an input that is
/// bound to a different command is rejected without touching either binding.
pub struct InputRouter {
    mapping: HashMap<InputEvent, Command>,
    listening: bool,
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl InputRouter {
    pub fn new() -> InputRouter {
        InputRouter {
            mapping: HashMap::new(),
            listening: true,
        }
    }

    /// Route one raw input. `LOCK` is handled locally and never forwarded;
    /// every other command is forwarded only while listening.
    pub fn route(&mut self, event: &InputEvent) -> Option<Command> {
        let command = *self.mapping.get(event)?;
        if command == Command::Lock {
            self.toggle_listening();
            return None;
        }
        if !self.listening {
            debug!("suppressed {command} while locked");
            return None;
        }
        Some(command)
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn toggle_listening(&mut self) {
        self.listening = !self.listening;
        info!(
            "input routing {}",
            if self.listening { "unlocked" } else { "locked" }
        );
    }

    pub fn pause_listening(&mut self) {
        self.listening = false;
    }

    pub fn resume_listening(&mut self) {
        self.listening = true;
    }

    pub fn get_mapping(&self) -> &HashMap<InputEvent, Command> {
        &self.mapping
    }

    /// Replace the whole table. Rejected if any command appears twice.
    pub fn update_mapping(&mut self, mapping: HashMap<InputEvent, Command>) -> Result<(), Error> {
        if !mapping.values().all_unique() {
            return Err(Error::Binding(
                "every command needs its own input".to_string(),
            ));
        }
        self.mapping = mapping;
        Ok(())
    }

    /// Bind `event` to `command`. The command's previous input, if any, is
    /// unassigned (last write wins). Binding an input already assigned to a
    /// different command fails with both assignments left intact.
    pub fn add_mapping(&mut self, event: InputEvent, command: Command) -> Result<(), Error> {
        if let Some(bound) = self.mapping.get(&event) {
            if *bound != command {
                return Err(Error::Binding(format!(
                    "input '{}' is already bound to {bound}",
                    event.value
                )));
            }
            return Ok(());
        }
        self.mapping.retain(|_, bound| *bound != command);
        self.mapping.insert(event, command);
        Ok(())
    }

    /// Unassign `event`; a missing assignment is not an error
    pub fn remove_mapping(&mut self, event: &InputEvent) {
        self.mapping.remove(event);
    }

    /// The persisted list-of-records form, ordered by command name so the
    /// output is stable
    pub fn export_mapping(&self) -> Vec<Binding> {
        self.mapping
            .iter()
            .map(|(event, command)| Binding {
                source: event.source.clone(),
                kind: event.kind,
                value: event.value.clone(),
                event: *command,
            })
            .sorted_by_key(|binding| binding.event.to_string())
            .collect()
    }

    /// Rebuild the table from its persisted form. Records with an empty value
    /// are unbound commands and are skipped.
    pub fn import_mapping(&mut self, bindings: &[Binding]) -> Result<(), Error> {
        let mut mapping = HashMap::new();
        for binding in bindings {
            if binding.value.is_empty() {
                continue;
            }
            let event = InputEvent {
                source: binding.source.clone(),
                kind: binding.kind,
                value: binding.value.clone(),
            };
            mapping.insert(event, binding.event);
        }
        self.update_mapping(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router_with_defaults() -> InputRouter {
        let mut router = InputRouter::new();
        router
            .add_mapping(InputEvent::simple("kb", "s"), Command::StartSplit)
            .unwrap();
        router
            .add_mapping(InputEvent::simple("kb", "r"), Command::Reset)
            .unwrap();
        router
            .add_mapping(InputEvent::simple("kb", "l"), Command::Lock)
            .unwrap();
        router
    }

    #[test]
    fn routes_mapped_inputs() {
        let mut router = router_with_defaults();
        let split = InputEvent::simple("kb", "s");
        assert_eq!(router.route(&split), Some(Command::StartSplit));
        assert_eq!(router.route(&InputEvent::simple("kb", "x")), None);
    }

    #[test]
    fn lock_suppresses_everything_but_itself() {
        let mut router = router_with_defaults();
        let split = InputEvent::simple("kb", "s");
        let lock = InputEvent::simple("kb", "l");

        assert_eq!(router.route(&lock), None);
        assert!(!router.is_listening());
        assert_eq!(router.route(&split), None);

        // unlock fires even while locked
        assert_eq!(router.route(&lock), None);
        assert!(router.is_listening());
        assert_eq!(router.route(&split), Some(Command::StartSplit));
    }

    #[test]
    fn reassigning_a_command_drops_its_old_input() {
        let mut router = router_with_defaults();
        router
            .add_mapping(InputEvent::simple("kb", "n"), Command::StartSplit)
            .unwrap();
        assert_eq!(router.route(&InputEvent::simple("kb", "s")), None);
        assert_eq!(
            router.route(&InputEvent::simple("kb", "n")),
            Some(Command::StartSplit)
        );
    }

    #[test]
    fn stealing_a_bound_input_is_rejected_without_mutation() {
        let mut router = router_with_defaults();
        let before = router.get_mapping().clone();

        // "r" already belongs to RESET
        let result = router.add_mapping(InputEvent::simple("kb", "r"), Command::Pause);
        assert!(result.is_err());
        assert_eq!(router.get_mapping(), &before);
        assert_eq!(
            router.route(&InputEvent::simple("kb", "r")),
            Some(Command::Reset)
        );
    }

    #[test]
    fn rebinding_an_input_to_its_own_command_is_fine() {
        let mut router = router_with_defaults();
        router
            .add_mapping(InputEvent::simple("kb", "s"), Command::StartSplit)
            .unwrap();
        assert_eq!(
            router.route(&InputEvent::simple("kb", "s")),
            Some(Command::StartSplit)
        );
    }

    #[test]
    fn removing_a_mapping_stops_it_firing() {
        let mut router = router_with_defaults();
        router.remove_mapping(&InputEvent::simple("kb", "s"));
        assert_eq!(router.route(&InputEvent::simple("kb", "s")), None);
    }

    #[test]
    fn export_import_round_trips() {
        let router = router_with_defaults();
        let exported = router.export_mapping();

        let mut rebuilt = InputRouter::new();
        rebuilt.import_mapping(&exported).unwrap();
        assert_eq!(rebuilt.get_mapping(), router.get_mapping());
        assert_eq!(rebuilt.export_mapping(), exported);
    }

    #[test]
    fn import_skips_unbound_records() {
        let bindings = vec![
            Binding {
                source: "kb".to_string(),
                kind: InputKind::Simple,
                value: "s".to_string(),
                event: Command::StartSplit,
            },
            Binding {
                source: "kb".to_string(),
                kind: InputKind::Simple,
                value: String::new(),
                event: Command::Skip,
            },
        ];
        let mut router = InputRouter::new();
        router.import_mapping(&bindings).unwrap();
        assert_eq!(router.get_mapping().len(), 1);
    }

    #[test]
    fn duplicate_commands_fail_a_bulk_update() {
        let mut mapping = HashMap::new();
        mapping.insert(InputEvent::simple("kb", "a"), Command::Pause);
        mapping.insert(InputEvent::simple("kb", "b"), Command::Pause);
        let mut router = InputRouter::new();
        assert!(router.update_mapping(mapping).is_err());
    }

    #[test]
    fn binding_list_serializes_with_wire_field_names() {
        let router = router_with_defaults();
        let json = serde_json::to_string(&router.export_mapping()).unwrap();
        assert!(json.contains("\"type\":\"simple\""));
        assert!(json.contains("\"event\":\"STARTSPLIT\""));

        let parsed: Vec<Binding> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, router.export_mapping());
    }
}
