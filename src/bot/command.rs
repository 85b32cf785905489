//! Parsing of chat text into typed commands.

use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start { token: Option<String> },
    Subscribe,
    GenerateKey,
    Status,
    GetLaunchLinks,
    Add { url: String, name: String, launch_link: String },
    Remove { name: String },
    Broadcast { text: String },
    SetInterval { seconds: u64 },
    Help,
}

impl Command {
    /// Parses `/name[@bot] args...`. Arguments are whitespace separated;
    /// `/broadcast` keeps the rest of the line joined by single spaces.
    pub fn parse(text: &str) -> Result<Self, ServiceError> {
        let (name, args) = split_command(text)?;

        match name.as_str() {
            "start" => Ok(Command::Start {
                token: args.first().map(|t| t.to_string()),
            }),
            "subscribe" => Ok(Command::Subscribe),
            "generatekey" => Ok(Command::GenerateKey),
            "status" => Ok(Command::Status),
            "getlaunchlinks" => Ok(Command::GetLaunchLinks),
            "help" => Ok(Command::Help),
            "add" => match args.as_slice() {
                [url, name, launch_link] => Ok(Command::Add {
                    url: url.to_string(),
                    name: name.to_string(),
                    launch_link: launch_link.to_string(),
                }),
                _ => Err(usage("/add <url> <name> <launch link>")),
            },
            "remove" => match args.as_slice() {
                [name] => Ok(Command::Remove {
                    name: name.to_string(),
                }),
                _ => Err(usage("/remove <name>")),
            },
            "broadcast" => {
                if args.is_empty() {
                    Err(usage("/broadcast <text>"))
                } else {
                    Ok(Command::Broadcast {
                        text: args.join(" "),
                    })
                }
            }
            "setinterval" => match args.as_slice() {
                [raw] => raw
                    .parse::<u64>()
                    .map(|seconds| Command::SetInterval { seconds })
                    .map_err(|_| ServiceError::Validation(format!("'{raw}' is not a number of seconds."))),
                _ => Err(usage("/setinterval <seconds>")),
            },
            other => Err(ServiceError::Validation(format!(
                "Unknown command /{other}. Send /help for the command list."
            ))),
        }
    }
}

/// Admin-only commands, checked before their arguments are validated.
const ADMIN_COMMANDS: [&str; 4] = ["add", "remove", "broadcast", "setinterval"];

/// Whether `text` invokes an admin-only command, regardless of its arguments.
pub fn is_admin_only(text: &str) -> bool {
    split_command(text)
        .map(|(name, _)| ADMIN_COMMANDS.contains(&name.as_str()))
        .unwrap_or(false)
}

fn split_command(text: &str) -> Result<(String, Vec<&str>), ServiceError> {
    let mut parts = text.split_whitespace();
    let head = parts
        .next()
        .ok_or_else(|| ServiceError::Validation("Empty message. Send /help for the command list.".to_string()))?;
    let Some(name) = head.strip_prefix('/') else {
        return Err(ServiceError::Validation(
            "Commands start with '/'. Send /help for the command list.".to_string(),
        ));
    };
    let name = name.split('@').next().unwrap_or_default().to_lowercase();
    Ok((name, parts.collect()))
}

fn usage(form: &str) -> ServiceError {
    ServiceError::Validation(format!("Usage: {form}"))
}

pub const HELP_TEXT: &str = "\
Commands:
/start [token] - start the bot, optionally with an admin token
/subscribe - receive availability notifications
/getlaunchlinks - list application launch links
/status - show the current status of every application
/generatekey - issue an admin token to pass to /start
Admin commands:
/add <url> <name> <launch link> - add an application
/remove <name> - remove an application
/broadcast <text> - send a message to every subscriber
/setinterval <seconds> - set the check interval (at least 60 seconds)";
