use std::time::Duration;

use super::{types::Config, ConfigError};

/// Upper bound on any configured retry count.
pub const MAX_RETRIES: u32 = 10;

/// Validate configuration
/// Currently validates:
/// - Frame sampling asks for at least one frame of non-zero width
/// - No timeout, concurrency limit or tag frame budget is zero
/// - No stage timeout exceeds the wall-clock ceiling
/// - Transcription timeout bounds are ordered
/// - Retry counts stay within `MAX_RETRIES`
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.frames.sample_count == 0 {
        return Err(invalid("frames.sample_count cannot be 0"));
    }
    if config.frames.width == 0 {
        return Err(invalid("frames.width cannot be 0"));
    }
    if config.pipeline.max_concurrent_items == 0 {
        return Err(invalid("pipeline.max_concurrent_items cannot be 0"));
    }
    if config.tagging.max_frames == 0 {
        return Err(invalid("tagging.max_frames cannot be 0"));
    }

    let timeouts = [
        ("pipeline.wall_clock_ceiling_secs", config.pipeline.wall_clock_ceiling_secs),
        ("probe.timeout_secs", config.probe.timeout_secs),
        ("frames.strategy_timeout_secs", config.frames.strategy_timeout_secs),
        ("transcription.default_timeout_secs", config.transcription.default_timeout_secs),
        ("transcription.min_timeout_secs", config.transcription.min_timeout_secs),
        ("transcription.max_timeout_secs", config.transcription.max_timeout_secs),
        ("transcription.audio_timeout_secs", config.transcription.audio_timeout_secs),
        ("tagging.timeout_secs", config.tagging.timeout_secs),
    ];
    for (name, secs) in timeouts {
        if secs == 0 {
            return Err(invalid(&format!("{} cannot be 0", name)));
        }
    }

    let retries = [
        ("frames.sample_retries", config.frames.sample_retries),
        ("transcription.retries", config.transcription.retries),
        ("tagging.retries", config.tagging.retries),
    ];
    for (name, count) in retries {
        if count > MAX_RETRIES {
            return Err(invalid(&format!(
                "{} ({}) exceeds the limit of {}",
                name, count, MAX_RETRIES
            )));
        }
    }

    let multiplier = config.transcription.duration_multiplier;
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(invalid("transcription.duration_multiplier must be a positive number"));
    }

    if config.transcription.max_timeout_secs < config.transcription.min_timeout_secs {
        return Err(invalid(
            "transcription.max_timeout_secs cannot be lower than transcription.min_timeout_secs",
        ));
    }

    let ceiling = config.pipeline.wall_clock_ceiling();
    let stage_timeouts = [
        ("probe.timeout_secs", config.probe.timeout()),
        ("frames.strategy_timeout_secs", config.frames.strategy_timeout()),
        (
            "transcription.default_timeout_secs",
            Duration::from_secs(config.transcription.default_timeout_secs),
        ),
        ("tagging.timeout_secs", config.tagging.timeout()),
    ];
    for (name, timeout) in stage_timeouts {
        if timeout > ceiling {
            return Err(invalid(&format!(
                "{} ({}s) exceeds pipeline.wall_clock_ceiling_secs ({}s)",
                name,
                timeout.as_secs(),
                ceiling.as_secs()
            )));
        }
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
