#![cfg(feature = "encode-ffmpeg")]

//! FFmpeg-backed video sink.
//!
//! Encodes redacted RGB frames to an H.264 MP4, preserving the source's
//! dimensions and frame rate. Frames are accepted in order and flushed on
//! [`finish`](super::FrameSink::finish); dropping the sink without finishing
//! discards buffered packets.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;

use crate::frame::Frame;

use super::FrameSink;

pub struct FfmpegSink {
    output: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::video::Encoder,
    scaler: ffmpeg::software::scaling::Context,
    time_base: ffmpeg::Rational,
    next_pts: i64,
    finished: bool,
}

impl FfmpegSink {
    /// Create a sink writing to `path` with the given geometry and frame
    /// rate. A frame rate of 0 (unknown source) encodes at 25 fps.
    pub fn create(path: &Path, width: u32, height: u32, frame_rate: f64) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let mut output = ffmpeg::format::output(&path)
            .with_context(|| format!("failed to create output container {}", path.display()))?;

        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::H264)
            .ok_or_else(|| anyhow!("H.264 encoder not available in this ffmpeg build"))?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::flag::Flags::GLOBAL_HEADER);

        let mut stream = output.add_stream(codec).context("add video stream")?;
        let context = ffmpeg::codec::context::Context::new_with_codec(codec);
        let mut encoder = context.encoder().video().context("open video encoder")?;

        let fps = if frame_rate > 0.0 { frame_rate } else { 25.0 };
        let time_base = ffmpeg::Rational::new(1000, (fps * 1000.0).round() as i32);

        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(ffmpeg::util::format::pixel::Pixel::YUV420P);
        encoder.set_time_base(time_base);
        if global_header {
            encoder.set_flags(ffmpeg::codec::flag::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder.open_as(codec).context("open H.264 encoder")?;
        stream.set_parameters(&encoder);
        stream.set_time_base(time_base);
        drop(stream);

        output.write_header().context("write container header")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            ffmpeg::util::format::pixel::Pixel::RGB24,
            width,
            height,
            ffmpeg::util::format::pixel::Pixel::YUV420P,
            width,
            height,
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create encoder scaler")?;

        Ok(Self {
            output,
            encoder,
            scaler,
            time_base,
            next_pts: 0,
            finished: false,
        })
    }

    fn drain_packets(&mut self) -> Result<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            let stream_time_base = self
                .output
                .stream(0)
                .ok_or_else(|| anyhow!("output stream missing"))?
                .time_base();
            packet.rescale_ts(self.time_base, stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .context("write encoded packet")?;
        }
        Ok(())
    }
}

impl FrameSink for FfmpegSink {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        let mut rgb = ffmpeg::frame::Video::new(
            ffmpeg::util::format::pixel::Pixel::RGB24,
            frame.width,
            frame.height,
        );
        let row_bytes = frame.width as usize * 3;
        let stride = rgb.stride(0);
        let data = rgb.data_mut(0);
        for (row, chunk) in frame.pixels.chunks_exact(row_bytes).enumerate() {
            data[row * stride..row * stride + row_bytes].copy_from_slice(chunk);
        }

        let mut yuv = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&rgb, &mut yuv)
            .context("convert frame to YUV")?;
        yuv.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder.send_frame(&yuv).context("encode frame")?;
        self.drain_packets()
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.encoder.send_eof().context("flush encoder")?;
        self.drain_packets()?;
        self.output.write_trailer().context("write container trailer")?;
        self.finished = true;
        Ok(())
    }
}
