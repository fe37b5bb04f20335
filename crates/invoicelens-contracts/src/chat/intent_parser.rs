use super::command_registry::{
    CommandSpec, NO_ARG_COMMANDS, RAW_ARG_COMMANDS, SINGLE_PATH_COMMANDS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Noop,
    SetPrompt,
    Upload,
    ClearUpload,
    Submit,
    Help,
    Quit,
}

/// One parsed line of page input.
///
/// `arg` carries the prompt text for [`Action::SetPrompt`] and the file path
/// for [`Action::Upload`]. A slash line that names no known command is prompt
/// text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub action: Action,
    pub raw: String,
    pub arg: String,
}

impl Intent {
    fn new(action: Action, raw: &str) -> Self {
        Self {
            action,
            raw: raw.to_string(),
            arg: String::new(),
        }
    }

    fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = arg.into();
        self
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<Action> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

/// Quoted paths go through shell-style splitting; unquoted ones are kept
/// verbatim so backslash separators survive.
fn parse_single_path_arg(arg: &str) -> String {
    let trimmed = arg.trim();
    if !trimmed.contains(|ch: char| ch == '"' || ch == '\'') {
        return trimmed.to_string();
    }
    let parts = parse_path_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new(Action::Noop, text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
                return Intent::new(action, text).with_arg(arg);
            }

            if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
                return Intent::new(action, text).with_arg(parse_single_path_arg(arg));
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }
        }
    }

    Intent::new(Action::SetPrompt, text).with_arg(raw_trimmed)
}
