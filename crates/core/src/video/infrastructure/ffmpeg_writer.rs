use std::path::Path;

use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video as AvFrame;
use ffmpeg_next::Rational;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Used when the source reports no usable frame rate.
const FALLBACK_FPS: i32 = 30;

/// Encodes RGB frames to MPEG-4 video in whatever container the output
/// extension selects.
pub struct FfmpegWriter {
    session: Option<EncodeSession>,
}

struct EncodeSession {
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: scaling::Context,
    width: u32,
    height: u32,
    time_base: Rational,
    frame_count: i64,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self { session: None }
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Source fps as a reduced rational with millisecond precision, so NTSC
/// rates like 29.97 stay within MPEG-4's time base limits.
fn frame_rate(fps: f64) -> Rational {
    if fps.is_finite() && fps > 0.0 {
        Rational((fps * 1000.0).round() as i32, 1000).reduce()
    } else {
        Rational(FALLBACK_FPS, 1)
    }
}

impl EncodeSession {
    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let ost_time_base = self
            .octx
            .stream(0)
            .ok_or("Output video stream missing")?
            .time_base();
        let mut encoded = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(self.time_base, ost_time_base);
            encoded.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut octx = ffmpeg_next::format::output(path)
            .map_err(|e| format!("Could not create video {}: {e}", path.display()))?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;
        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        let rate = frame_rate(metadata.fps);
        let time_base = rate.invert();
        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_frame_rate(Some(rate));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        octx.write_header()?;

        let scaler = scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            scaling::Flags::BILINEAR,
        )?;

        log::info!(
            "Writing {} ({}x{} at {}/{} fps)",
            path.display(),
            metadata.width,
            metadata.height,
            rate.numerator(),
            rate.denominator()
        );
        self.session = Some(EncodeSession {
            octx,
            encoder,
            scaler,
            width: metadata.width,
            height: metadata.height,
            time_base,
            frame_count: 0,
        });
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let session = self.session.as_mut().ok_or("FfmpegWriter: not opened")?;
        if (frame.width(), frame.height()) != (session.width, session.height) {
            return Err(format!(
                "Frame {} is {}x{}, video is {}x{}",
                frame.index(),
                frame.width(),
                frame.height(),
                session.width,
                session.height
            )
            .into());
        }

        let mut rgb_frame = AvFrame::new(
            ffmpeg_next::format::Pixel::RGB24,
            session.width,
            session.height,
        );
        let stride = rgb_frame.stride(0);
        let row_bytes = session.width as usize * Frame::CHANNELS;
        let dst = rgb_frame.data_mut(0);
        for (row, src) in frame.data().chunks_exact(row_bytes).enumerate() {
            let dst_start = row * stride;
            dst[dst_start..dst_start + row_bytes].copy_from_slice(src);
        }

        let mut yuv_frame = AvFrame::empty();
        session.scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(session.frame_count));
        session.encoder.send_frame(&yuv_frame)?;
        session.drain_packets()?;

        session.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        session.encoder.send_eof()?;
        session.drain_packets()?;
        session.octx.write_trailer()?;
        log::debug!("Encoded {} frames", session.frame_count);
        Ok(())
    }
}
