use super::intent_parser::Action;

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: Action,
}

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "prompt",
    action: Action::SetPrompt,
}];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "upload",
    action: Action::Upload,
}];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "clear",
        action: Action::ClearUpload,
    },
    CommandSpec {
        command: "submit",
        action: Action::Submit,
    },
    CommandSpec {
        command: "help",
        action: Action::Help,
    },
    CommandSpec {
        command: "quit",
        action: Action::Quit,
    },
    CommandSpec {
        command: "exit",
        action: Action::Quit,
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/prompt",
    "/upload",
    "/clear",
    "/submit",
    "/help",
    "/quit",
];
