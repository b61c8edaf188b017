use std::io::Write;

/// Initialize the logging system with timestamped output.
///
/// The level is taken from `TRACKDECK_LOG_LEVEL`, falling back to `RUST_LOG`,
/// then to `warn`.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let log_level = std::env::var("TRACKDECK_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());

    let mut builder = env_logger::Builder::new();

    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] [{}:{}] {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        )
    });

    builder.parse_filters(&log_level);
    builder.try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent_enough() {
        // The first call may or may not win the global logger slot depending on
        // test ordering; neither outcome should panic.
        let _ = init();
        let _ = init();
    }
}
