//! Usage guides served through MCP `prompts/list` and `prompts/get`.

use serde::Serialize;

/// A static prompt explaining when and how to call one tool.
#[derive(Debug, Clone, Serialize)]
pub struct UsagePrompt {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    pub text: &'static str,
}

const FAILURE_HINT: &str = "If the response's `ok` field is `false`, treat the call as failed \
and show the `error` field to the user.";

const TOKEN_HINT: &str =
    " - **token**: optional. Only needed when no default bot token is configured.\n";

/// All usage prompts, sorted by name.
pub fn usage_prompts() -> Vec<UsagePrompt> {
    vec![
        UsagePrompt {
            name: "slack_add_reactions_usage",
            description: "When and how to call slack_add_reactions",
            text: "Call `slack_add_reactions` to acknowledge or mark a message with emoji, for \
example a :white_check_mark: once a request is handled or :eyes: while it is being looked at.\n\n\
Inputs:\n\
 - **channel**: channel ID (e.g. `C12345678`) or `#name`.\n\
 - **timestamp**: `ts` of the message to react to.\n\
 - **emojis**: list of emoji names, colons optional (`tada` or `:tada:`).\n",
        },
        UsagePrompt {
            name: "slack_post_message_usage",
            description: "When and how to call slack_post_message",
            text: "Call `slack_post_message` to send a text notification to a Slack channel for \
the user: build or deploy status, a summary after an automated task, or an incident update.\n\n\
Inputs:\n\
 - **channel**: channel ID (e.g. `C12345678`) or `#name`.\n\
 - **text**: plain-text message body.\n",
        },
        UsagePrompt {
            name: "slack_read_channel_messages_usage",
            description: "When and how to call slack_read_channel_messages",
            text: "Call `slack_read_channel_messages` to fetch recent history from a channel, \
for context on an ongoing discussion or to find something shared earlier.\n\n\
Inputs:\n\
 - **channel**: channel ID (e.g. `C12345678`) or `#name`.\n\
 - **limit**: optional, maximum number of messages (default 100).\n\
 - **oldest** / **latest**: optional Unix timestamps bounding the range.\n\
 - **inclusive**: optional, include messages exactly at the bounds.\n\n\
Messages are returned in the `messages` field; `has_more` tells whether older ones exist.",
        },
        UsagePrompt {
            name: "slack_read_emojis_usage",
            description: "When and how to call slack_read_emojis",
            text: "Call `slack_read_emojis` to find out which emoji, custom ones especially, \
exist in the workspace before reacting or writing them in a message.\n\n\
The `emoji` field maps each name to an image URL, or to `alias:<name>` for aliases.",
        },
        UsagePrompt {
            name: "slack_read_thread_messages_usage",
            description: "When and how to call slack_read_thread_messages",
            text: "Call `slack_read_thread_messages` to read a whole thread, for summarising it \
or following up on replies to an announcement.\n\n\
Inputs:\n\
 - **channel**: channel ID (e.g. `C12345678`) or `#name`.\n\
 - **thread_ts**: `ts` of the parent message.\n\
 - **limit**: optional, maximum number of messages (default 100).\n\n\
Messages are returned in the `messages` field, parent first.",
        },
        UsagePrompt {
            name: "slack_thread_reply_usage",
            description: "When and how to call slack_thread_reply",
            text: "Call `slack_thread_reply` to continue a conversation inside an existing \
thread, or to split a long answer into several replies.\n\n\
Inputs:\n\
 - **channel**: channel ID (e.g. `C12345678`) or `#name`.\n\
 - **thread_ts**: `ts` of the parent message.\n\
 - **texts**: list of messages, each posted as its own reply in order.\n\n\
`responses` holds one Slack response per message; check each one's `ok`.",
        },
    ]
}

/// Look up a prompt by name.
pub fn find_prompt(name: &str) -> Option<UsagePrompt> {
    usage_prompts().into_iter().find(|p| p.name == name)
}

/// Full prompt text, with the shared token and failure guidance appended.
pub fn render_prompt(prompt: &UsagePrompt) -> String {
    let mut text = prompt.text.trim_end().to_string();
    text.push_str("\n\nAlso:\n");
    text.push_str(TOKEN_HINT);
    text.push('\n');
    text.push_str(FAILURE_HINT);
    text
}
