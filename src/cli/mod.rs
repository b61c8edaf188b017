use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub mod status;
pub use status::StatusDisplay;


/// Clock-accurate playlist player
#[derive(Parser)]
#[command(name = "trackdeck")]
#[command(about = "A CLI playlist player that derives playback position from the audio device clock")]
#[command(version = "0.1.0")]
pub struct CliApp {
    /// Directory to populate the playlist from
    #[arg(long)]
    pub music_dir: Option<PathBuf>,

    /// HTTP base URL to fetch tracks from instead of a local directory
    #[arg(long)]
    pub source_url: Option<String>,

    /// Output device name
    #[arg(long)]
    pub device: Option<String>,

    /// Optional command to run before entering the interactive loop
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available transport and catalog commands
#[derive(Debug, Clone, Subcommand, PartialEq)]
pub enum Commands {
    /// Start or resume playback of the selected track
    Play,
    /// Pause playback while preserving position
    Pause,
    /// Stop playback and reset position
    Stop,
    /// Toggle between playing and paused
    #[command(alias = "playpause")]
    Toggle,
    /// Seek to a time position in the selected track
    Seek {
        /// Time offset (e.g., "1:30", "90", "90s")
        position: String,
    },
    /// Set output gain (0-100)
    Gain {
        /// Gain level (0-100)
        level: u8,
    },
    /// Fetch and register a track
    Add {
        /// Track filename
        name: String,
    },
    /// Select a track for playback
    Load {
        /// Track filename
        name: String,
    },
    /// Advance to the next track in the playlist
    Next,
    /// Go back to the previous track in the playlist
    #[command(alias = "previous")]
    Prev,
    /// List playlist entries
    List,
    /// Display current player status
    Status,
    /// Continuously update status until interrupted
    Watch,
}

/// Errors from parsing interactive command lines
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("empty command")]
    EmptyCommand,

    #[error("unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("'{command}' requires a {argument}")]
    MissingArgument { command: String, argument: String },

    #[error("invalid {argument} '{value}' (expected {expected})")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: String,
    },

    #[error("help requested")]
    HelpRequested,
}

impl CliApp {
    /// Parse a line of interactive input into a command
    pub fn parse_command(input: &str) -> Result<Commands, ParseError> {
        let args: Vec<&str> = input.trim().split_whitespace().collect();
        if args.is_empty() {
            return Err(ParseError::EmptyCommand);
        }

        match args[0] {
            "play" => Ok(Commands::Play),
            "pause" => Ok(Commands::Pause),
            "stop" => Ok(Commands::Stop),
            "toggle" | "playpause" | "pp" => Ok(Commands::Toggle),
            "next" => Ok(Commands::Next),
            "prev" | "previous" => Ok(Commands::Prev),
            "list" => Ok(Commands::List),
            "status" => Ok(Commands::Status),
            "watch" => Ok(Commands::Watch),
            "seek" => {
                if args.len() > 1 {
                    Ok(Commands::Seek {
                        position: args[1].to_string(),
                    })
                } else {
                    Err(ParseError::MissingArgument {
                        command: "seek".to_string(),
                        argument: "position".to_string(),
                    })
                }
            }
            "gain" | "volume" => {
                if args.len() > 1 {
                    match args[1].parse::<u8>() {
                        Ok(level) if level <= 100 => Ok(Commands::Gain { level }),
                        Ok(_) | Err(_) => Err(ParseError::InvalidArgument {
                            argument: "gain level".to_string(),
                            value: args[1].to_string(),
                            expected: "0-100".to_string(),
                        }),
                    }
                } else {
                    Err(ParseError::MissingArgument {
                        command: "gain".to_string(),
                        argument: "level".to_string(),
                    })
                }
            }
            "add" => {
                if args.len() > 1 {
                    Ok(Commands::Add {
                        name: args[1..].join(" "),
                    })
                } else {
                    Err(ParseError::MissingArgument {
                        command: "add".to_string(),
                        argument: "filename".to_string(),
                    })
                }
            }
            "load" => {
                if args.len() > 1 {
                    Ok(Commands::Load {
                        name: args[1..].join(" "),
                    })
                } else {
                    Err(ParseError::MissingArgument {
                        command: "load".to_string(),
                        argument: "filename".to_string(),
                    })
                }
            }
            "help" | "?" => Err(ParseError::HelpRequested),
            command => Err(ParseError::UnknownCommand {
                command: command.to_string(),
            }),
        }
    }

    /// Parse a seek position like "1:30", "90", or "90s" into a duration
    pub fn parse_seek_position(position: &str) -> Result<Duration, ParseError> {
        let invalid = || ParseError::InvalidArgument {
            argument: "position".to_string(),
            value: position.to_string(),
            expected: "M:SS, seconds, or <seconds>s".to_string(),
        };

        if let Some((minutes, seconds)) = position.split_once(':') {
            let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
            let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
            if !(0.0..60.0).contains(&seconds) {
                return Err(invalid());
            }
            Ok(Duration::from_secs_f64(minutes as f64 * 60.0 + seconds))
        } else {
            let trimmed = position.strip_suffix('s').unwrap_or(position);
            let seconds: f64 = trimmed.parse().map_err(|_| invalid())?;
            if seconds < 0.0 {
                return Err(invalid());
            }
            Ok(Duration::from_secs_f64(seconds))
        }
    }

    /// Print interactive mode help
    pub fn display_help() {
        println!("Available commands:");
        println!("  play              Start or resume playback");
        println!("  pause             Pause playback, keeping position");
        println!("  stop              Stop playback and reset position");
        println!("  toggle            Toggle play/pause");
        println!("  seek <position>   Seek to position (1:30, 90, 90s)");
        println!("  gain <0-100>      Set output gain");
        println!("  add <name>        Fetch and register a track");
        println!("  load <name>       Select a track");
        println!("  next / prev       Move through the playlist");
        println!("  list              Show the playlist");
        println!("  status            Show player status");
        println!("  watch             Live status until Enter/Ctrl-C");
        println!("  help              Show this help");
        println!("  exit / quit       Leave the player");
    }
}
