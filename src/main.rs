mod cli;
mod audio;
mod playback;
mod config;
mod error;
mod models;
mod logging;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};

use audio::{AudioOutput, CpalOutput, DirFetcher, HttpFetcher, MediaFetcher};
use cli::{CliApp, Commands, ParseError, StatusDisplay};
use config::ConfigManager;
use error::PlayerError;
use playback::Playlist;

/// Main application controller that coordinates the playlist core with the
/// CLI surface. Playback order lives here, not in the core: the playlist
/// only knows about the currently selected track.
pub struct AppController {
    playlist: Playlist,
    order: Vec<String>,
    cursor: usize,
    config_manager: ConfigManager,
    device_name: Option<String>,
    poll_interval: Duration,
}

impl AppController {
    /// Create a new application controller
    pub fn new(cli: &CliApp) -> Result<Self, PlayerError> {
        if let Err(e) = logging::init() {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        let mut config_manager = ConfigManager::new()?;
        config_manager.update_config(|config| {
            if let Some(dir) = &cli.music_dir {
                config.music_dir = dir.clone();
            }
            if let Some(url) = &cli.source_url {
                config.source_url = Some(url.clone());
            }
            if let Some(device) = &cli.device {
                config.preferred_device = Some(device.clone());
            }
        })?;
        let config = config_manager.get_config().clone();

        let mut output = match CpalOutput::new(config.preferred_device.as_deref()) {
            Ok(output) => output,
            Err(e) if config.preferred_device.is_some() => {
                warn!(
                    "could not open preferred device {:?}: {}; using default",
                    config.preferred_device, e
                );
                CpalOutput::new(None)?
            }
            Err(e) => return Err(e.into()),
        };
        output.set_gain(config.default_gain);
        let device_name = output.device_name().map(|n| n.to_string());

        // The playlist is populated from the local music directory unless an
        // HTTP base URL is configured, mirroring a playlist served by a
        // static file server.
        let (fetcher, order): (Arc<dyn MediaFetcher>, Vec<String>) = match &config.source_url {
            Some(url) => (Arc::new(HttpFetcher::new(url.clone())), Vec::new()),
            None => {
                let fetcher = DirFetcher::new(&config.music_dir);
                let order = fetcher.list().unwrap_or_else(|e| {
                    warn!(
                        "could not list music directory {}: {}",
                        config.music_dir.display(),
                        e
                    );
                    Vec::new()
                });
                (Arc::new(fetcher), order)
            }
        };

        let playlist = Playlist::new(Box::new(output), fetcher);

        info!("application controller initialized");

        Ok(Self {
            playlist,
            order,
            cursor: 0,
            config_manager,
            device_name,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(10)),
        })
    }

    /// Load the catalog and select the first track
    pub async fn initialize(&mut self) -> Result<(), PlayerError> {
        if self.order.is_empty() {
            println!("Playlist is empty - use 'add <name>' to register tracks");
            return Ok(());
        }

        println!("Loading {} track(s)...", self.order.len());
        let names = self.order.clone();
        self.playlist.add_all(&names).await;

        let first = self.order[0].clone();
        self.playlist.load(&first).await;
        self.cursor = 0;
        println!("Selected: {}", first);

        Ok(())
    }

    /// Execute a single command. Watch is handled by the interactive loop.
    pub async fn execute_command(&mut self, command: Commands) -> Result<(), PlayerError> {
        match command {
            Commands::Play => {
                self.playlist.play(None)?;
                self.announce();
            }
            Commands::Pause => {
                self.playlist.pause();
                let status = self.playlist.status();
                println!("Paused at {}", status.position_formatted());
            }
            Commands::Stop => {
                self.playlist.stop();
                println!("Stopped");
            }
            Commands::Toggle => {
                self.playlist.play_pause()?;
                if self.playlist.playing() {
                    self.announce();
                } else {
                    println!("Paused at {}", self.playlist.status().position_formatted());
                }
            }
            Commands::Seek { position } => {
                let target = CliApp::parse_seek_position(&position)?;
                let duration = self.playlist.duration();
                if duration.is_zero() {
                    println!("Nothing to seek in - no track with a known duration is selected");
                } else {
                    let fraction =
                        (target.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0);
                    self.playlist.seek(fraction)?;
                    println!(
                        "Position: {}",
                        self.playlist.status().position_formatted()
                    );
                }
            }
            Commands::Gain { level } => {
                let gain = level as f32 / 100.0;
                self.playlist.set_gain(gain);
                println!("Gain: {}%", level);
            }
            Commands::Add { name } => {
                let track = self.playlist.add(&name).await;
                if !self.order.contains(&name) {
                    self.order.push(name.clone());
                }
                println!(
                    "Added {} ({})",
                    track.name(),
                    crate::models::format_mmss(track.duration())
                );
            }
            Commands::Load { name } => {
                self.playlist.load(&name).await;
                match self.order.iter().position(|n| n == &name) {
                    Some(index) => self.cursor = index,
                    None => {
                        self.order.push(name.clone());
                        self.cursor = self.order.len() - 1;
                    }
                }
                println!("Selected: {}", name);
            }
            Commands::Next => self.step(true).await?,
            Commands::Prev => self.step(false).await?,
            Commands::List => {
                let current = if self.order.is_empty() {
                    None
                } else {
                    Some(self.cursor)
                };
                StatusDisplay::display_track_list(&self.order, current);
            }
            Commands::Status => {
                StatusDisplay::display_status(&self.playlist.status(), self.device_name.as_deref());
            }
            Commands::Watch => {
                // Modal; the interactive loop flips into watch mode instead.
            }
        }

        Ok(())
    }

    /// Move to a neighboring playlist entry. At either end this reloads the
    /// current entry from the start. Playback continues if it was active.
    async fn step(&mut self, forward: bool) -> Result<(), PlayerError> {
        if self.order.is_empty() {
            println!("Playlist is empty");
            return Ok(());
        }

        let was_playing = self.playlist.playing();
        self.cursor = if forward {
            (self.cursor + 1).min(self.order.len() - 1)
        } else {
            self.cursor.saturating_sub(1)
        };

        let name = self.order[self.cursor].clone();
        self.playlist.load(&name).await;
        if was_playing {
            self.playlist.play(None)?;
            self.announce();
        } else {
            println!("Selected: {}", name);
        }

        Ok(())
    }

    /// React to the end of a track discovered by the position poll: advance
    /// to the next entry, or stop after the last one.
    async fn poll_tick(&mut self) -> Result<(), PlayerError> {
        if !self.playlist.ended() {
            return Ok(());
        }

        if self.cursor + 1 < self.order.len() {
            self.cursor += 1;
            let name = self.order[self.cursor].clone();
            self.playlist.load(&name).await;
            self.playlist.play(None)?;
            println!();
            self.announce();
        } else {
            self.playlist.stop();
            println!("\nPlaylist finished");
        }

        Ok(())
    }

    fn announce(&self) {
        if let Some(track) = self.playlist.current_track() {
            println!("Playing: {}", track.name());
        }
    }

    /// Run the interactive command loop
    pub async fn run_interactive_mode(
        &mut self,
        initial: Option<Commands>,
    ) -> Result<(), PlayerError> {
        println!("trackdeck v0.1.0");
        println!("Type 'help' for available commands, 'exit' or 'quit' to quit.");
        println!();

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let shutdown_flag_clone = Arc::clone(&shutdown_flag);

        ctrlc::set_handler(move || {
            shutdown_flag_clone.store(true, Ordering::Relaxed);
        })
        .expect("Error setting Ctrl-C handler");

        // Non-blocking input via a dedicated stdin thread
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => {
                        let _ = tx.send(String::new());
                        break;
                    }
                    Ok(_) => {
                        let _ = tx.send(line.trim().to_string());
                    }
                }
            }
        });

        let mut interval = tokio::time::interval(self.poll_interval);
        let mut watch_mode = false;
        let mut awaiting_input = false;

        if let Some(command) = initial {
            if command == Commands::Watch {
                watch_mode = true;
            } else if let Err(e) = self.execute_command(command).await {
                StatusDisplay::display_error(&e);
            }
        }

        loop {
            if shutdown_flag.load(Ordering::Relaxed) {
                println!();
                break;
            }

            if !watch_mode && !awaiting_input {
                print!("> ");
                let _ = std::io::Write::flush(&mut std::io::stdout());
                awaiting_input = true;
            }

            tokio::select! {
                biased;

                line = rx.recv() => {
                    awaiting_input = false;
                    if watch_mode {
                        watch_mode = false;
                        println!();
                    }
                    match line {
                        Some(line) if line.is_empty() => continue,
                        Some(line) => {
                            if line == "exit" || line == "quit" {
                                println!("Goodbye!");
                                break;
                            }
                            match CliApp::parse_command(&line) {
                                Ok(Commands::Watch) => {
                                    watch_mode = true;
                                }
                                Ok(command) => {
                                    if let Err(e) = self.execute_command(command).await {
                                        error!("command failed: {}", e);
                                        StatusDisplay::display_error(&e);
                                    }
                                }
                                Err(ParseError::HelpRequested) => {
                                    CliApp::display_help();
                                }
                                Err(e) => {
                                    eprintln!("Error: {}", e);
                                    println!("Type 'help' for available commands.");
                                }
                            }
                        }
                        None => {
                            // stdin closed
                            println!();
                            break;
                        }
                    }
                }

                // The position poll: bounded end-of-track detection latency
                // and the live watch view share this tick.
                _ = interval.tick() => {
                    if let Err(e) = self.poll_tick().await {
                        error!("poll failed: {}", e);
                    }
                    if watch_mode {
                        print!("\r\x1b[2K{}", StatusDisplay::watch_line(&self.playlist.status()));
                        let _ = std::io::Write::flush(&mut std::io::stdout());
                    }
                }
            }
        }

        self.shutdown()?;

        Ok(())
    }

    /// Stop playback and persist the session's settings
    fn shutdown(&mut self) -> Result<(), PlayerError> {
        self.playlist.stop();

        let gain = self.playlist.gain();
        if let Err(e) = self.config_manager.set_gain(gain) {
            warn!("could not save configuration: {}", e);
        }

        println!("Shutdown complete.");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), PlayerError> {
    let cli = CliApp::parse();

    let mut app = match AppController::new(&cli) {
        Ok(app) => app,
        Err(e) => {
            StatusDisplay::display_error(&e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.initialize().await {
        error!("failed to initialize application: {}", e);
        StatusDisplay::display_error(&e);
        std::process::exit(1);
    }

    let initial = cli.command.clone();
    if let Err(e) = app.run_interactive_mode(initial).await {
        StatusDisplay::display_error(&e);
        std::process::exit(1);
    }

    info!("application shutdown complete");
    Ok(())
}
