//! FFmpeg-backed local file decoder.
//!
//! Frames are decoded in-memory and converted to tightly-packed RGB24. A
//! packet or frame that fails to decode is skipped and logged; only failure
//! to open the container is surfaced to the caller.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;

use crate::frame::Frame;
use crate::VideoMetadata;

pub(crate) struct FfmpegFileSource {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    metadata: VideoMetadata,
    frame_count: u64,
    eof_sent: bool,
}

impl FfmpegFileSource {
    pub(crate) fn open(path: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open file input '{path}' with ffmpeg"))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();

        let frame_rate = rational_to_f64(input_stream.avg_frame_rate());
        let total_frames = u64::try_from(input_stream.frames()).unwrap_or(0);

        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        let metadata = VideoMetadata {
            frame_rate,
            total_frames,
            width: decoder.width(),
            height: decoder.height(),
        };

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
            metadata,
            frame_count: 0,
            eof_sent: false,
        })
    }

    pub(crate) fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            // Drain frames already buffered in the decoder first.
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                match self.convert(&decoded) {
                    Ok(frame) => return Ok(Some(frame)),
                    Err(e) => {
                        log::debug!("skipping undecodable frame: {e:#}");
                        continue;
                    }
                }
            }
            if self.eof_sent {
                return Ok(None);
            }

            let mut sent_packet = false;
            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                if let Err(e) = self.decoder.send_packet(&packet) {
                    // Transient: skip the packet, keep the run alive.
                    log::debug!("skipping undecodable packet: {e}");
                }
                sent_packet = true;
                break;
            }
            if !sent_packet {
                if let Err(e) = self.decoder.send_eof() {
                    log::debug!("decoder flush failed: {e}");
                }
                self.eof_sent = true;
            }
        }
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<Frame> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        self.frame_count += 1;
        Frame::new(pixels, width, height, self.frame_count)
    }
}

fn rational_to_f64(rational: ffmpeg::Rational) -> f64 {
    if rational.denominator() == 0 {
        return 0.0;
    }
    f64::from(rational.numerator()) / f64::from(rational.denominator())
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        return Ok((data.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
