//! In-process decoder built on the FFmpeg libraries (`ffmpeg-next`).

use async_trait::async_trait;
use ffmpeg_next as ffmpeg;
use std::path::{Path, PathBuf};

use super::{FrameDecoder, FrameSize, RawFrame};
use crate::error::MediaError;

fn init_ffmpeg() -> Result<(), MediaError> {
    static INIT: std::sync::OnceLock<Result<(), String>> = std::sync::OnceLock::new();
    INIT.get_or_init(|| ffmpeg::init().map_err(|e| e.to_string()))
        .clone()
        .map_err(|e| MediaError::unavailable(format!("FFmpeg libraries failed to initialize: {e}")))
}

/// Decodes in a blocking worker thread; no external process involved.
///
/// A decode that outlives its budget cannot be interrupted, only abandoned.
#[derive(Debug, Default)]
pub struct LibavFrameDecoder;

impl LibavFrameDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FrameDecoder for LibavFrameDecoder {
    fn name(&self) -> &str {
        "libav"
    }

    async fn decode_at(
        &self,
        path: &Path,
        timestamp_ms: u64,
        size: FrameSize,
    ) -> Result<RawFrame, MediaError> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || decode_blocking(&path, timestamp_ms, size))
            .await
            .map_err(|e| MediaError::unavailable(format!("Decoder task failed: {e}")))?
    }
}

fn ffmpeg_err(context: &str) -> impl Fn(ffmpeg::Error) -> MediaError + '_ {
    move |e| MediaError::invalid_input(format!("{context}: {e}"))
}

fn decode_blocking(path: &Path, timestamp_ms: u64, size: FrameSize) -> Result<RawFrame, MediaError> {
    init_ffmpeg()?;

    let mut ictx = ffmpeg::format::input(&path).map_err(ffmpeg_err("Failed to open input file"))?;

    let (stream_index, time_base, params) = {
        let stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| MediaError::invalid_input("No video stream"))?;
        (stream.index(), stream.time_base(), stream.parameters())
    };

    let mut decoder = ffmpeg::codec::context::Context::from_parameters(params)
        .map_err(ffmpeg_err("Failed to create context"))?
        .decoder()
        .video()
        .map_err(ffmpeg_err("Failed to create decoder"))?;

    if timestamp_ms > 0 {
        // AV_TIME_BASE units (microseconds); lands on the keyframe at or before the target.
        let target_us = timestamp_ms as i64 * 1000;
        ictx.seek(target_us, ..target_us)
            .map_err(ffmpeg_err("Seek failed"))?;
    }

    let target_secs = timestamp_ms as f64 / 1000.0;
    let to_secs = |ts: i64| {
        ts as f64 * f64::from(time_base.numerator()) / f64::from(time_base.denominator())
    };

    let mut decoded = ffmpeg::util::frame::video::Video::empty();
    let mut chosen: Option<ffmpeg::util::frame::video::Video> = None;

    'packets: for (stream, packet) in ictx.packets() {
        if stream.index() != stream_index {
            continue;
        }
        if decoder.send_packet(&packet).is_err() {
            continue;
        }
        while decoder.receive_frame(&mut decoded).is_ok() {
            let reached = decoded
                .timestamp()
                .map(|ts| to_secs(ts) + 0.001 >= target_secs)
                .unwrap_or(true);
            chosen = Some(decoded.clone());
            if reached {
                break 'packets;
            }
        }
    }

    if chosen.is_none() {
        decoder.send_eof().ok();
        while decoder.receive_frame(&mut decoded).is_ok() {
            chosen = Some(decoded.clone());
        }
    }

    let frame = chosen.ok_or_else(|| {
        MediaError::invalid_input(format!("No frame decoded at {} ms", timestamp_ms))
    })?;

    let mut scaler = ffmpeg::software::scaling::Context::get(
        frame.format(),
        frame.width(),
        frame.height(),
        ffmpeg::format::Pixel::RGB24,
        size.width,
        size.height,
        ffmpeg::software::scaling::Flags::BILINEAR,
    )
    .map_err(ffmpeg_err("Failed to create scaler"))?;

    let mut rgb = ffmpeg::util::frame::video::Video::empty();
    scaler
        .run(&frame, &mut rgb)
        .map_err(ffmpeg_err("Failed to convert frame"))?;

    Ok(RawFrame {
        width: rgb.width(),
        height: rgb.height(),
        data: copy_rgb24(&rgb),
    })
}

/// Copies an RGB24 plane into a packed buffer, dropping row padding.
fn copy_rgb24(frame: &ffmpeg::util::frame::video::Video) -> Vec<u8> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let stride = frame.stride(0);
    let plane = frame.data(0);

    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        data.extend_from_slice(&plane[row_start..row_start + width * 3]);
    }
    data
}
