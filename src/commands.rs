/// Fixed replies for recognized commands, keyed by name without the `/`.
const COMMANDS: &[(&str, &str)] = &[
    (
        "start",
        "Hello! I'm your AI nutritionist bot. How can I help you today?",
    ),
    (
        "help",
        "You can ask me questions about nutrition, meal plans, or anything related to healthy eating.",
    ),
];

pub const UNKNOWN_COMMAND_REPLY: &str =
    "I don't know that command. Please ask me a question about nutrition or use /start or /help.";

/// Exact, case-sensitive lookup. Unknown names get [`UNKNOWN_COMMAND_REPLY`].
pub fn reply_for(name: &str) -> &'static str {
    COMMANDS
        .iter()
        .find(|(command, _)| *command == name)
        .map(|(_, reply)| *reply)
        .unwrap_or(UNKNOWN_COMMAND_REPLY)
}

/// Names of all recognized commands.
pub fn names() -> impl Iterator<Item = &'static str> {
    COMMANDS.iter().map(|(name, _)| *name)
}
