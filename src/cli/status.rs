use crate::error::PlayerError;
use crate::models::PlayerStatus;

/// Terminal rendering for player status and errors
pub struct StatusDisplay;

impl StatusDisplay {
    /// Print a full status block
    pub fn display_status(status: &PlayerStatus, device: Option<&str>) {
        println!("State:    {}", status.state);
        match &status.track {
            Some(name) => println!("Track:    {}", name),
            None => println!("Track:    (none)"),
        }
        println!(
            "Position: {} / {}",
            status.position_formatted(),
            status.duration_formatted()
        );
        println!("Gain:     {:.0}%", status.gain * 100.0);
        if let Some(device) = device {
            println!("Device:   {}", device);
        }
    }

    /// One-line status for the live watch view, overwritten in place
    pub fn watch_line(status: &PlayerStatus) -> String {
        let track = status.track.as_deref().unwrap_or("(none)");
        let marker = if status.near_end() { " *" } else { "" };
        format!(
            "[{}] {} {} {} / {}{}",
            status.state,
            track,
            Self::progress_bar(status.progress(), 20),
            status.position_formatted(),
            status.duration_formatted(),
            marker
        )
    }

    /// Print the playlist with the current entry marked
    pub fn display_track_list(names: &[String], current: Option<usize>) {
        if names.is_empty() {
            println!("Playlist is empty");
            return;
        }
        for (i, name) in names.iter().enumerate() {
            let marker = if Some(i) == current { "*" } else { " " };
            println!("{} {:3}  {}", marker, i + 1, name);
        }
    }

    /// Print an error with its user-facing message
    pub fn display_error(error: &PlayerError) {
        eprintln!("Error: {}", error.user_message());
    }

    fn progress_bar(progress: f32, width: usize) -> String {
        let filled = (progress.clamp(0.0, 1.0) * width as f32).round() as usize;
        let mut bar = String::with_capacity(width + 2);
        bar.push('[');
        for i in 0..width {
            bar.push(if i < filled { '=' } else { '-' });
        }
        bar.push(']');
        bar
    }
}
