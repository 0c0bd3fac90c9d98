//! An open decoder context plus its reusable packet buffer.

use tracing::debug;

use crate::error::DecoderInitError;
use crate::stream::engine::DecodeUnit;
use crate::video::backend::RendererBackend;
use crate::video::codec::{CodecContext, CodecLibrary, DecoderContextParams, Frame, VideoFormat};

/// Starting size of the packet buffer.
pub const INITIAL_DECODE_BUFFER: usize = 1024 * 1024;
/// Zeroed tail the bitstream reader may over-read into.
pub const INPUT_BUFFER_PADDING: usize = 64;

pub struct VideoDecoder {
    context: Box<dyn CodecContext>,
    format: VideoFormat,
    buffer: Vec<u8>,
}

impl VideoDecoder {
    /// Open a decoder context configured by `backend`.
    pub fn open(
        codec: &dyn CodecLibrary,
        backend: &dyn RendererBackend,
        format: VideoFormat,
    ) -> Result<Self, DecoderInitError> {
        let mut params = DecoderContextParams {
            hw_device: None,
            thread_count: 1,
            low_delay: true,
        };
        backend.prepare_decoder_context(&mut params)?;
        let context = codec.open_decoder(format, &params)?;
        debug!(
            backend = backend.name(),
            %format,
            threads = params.thread_count,
            "decoder context opened"
        );
        Ok(Self {
            context,
            format,
            buffer: vec![0; INITIAL_DECODE_BUFFER],
        })
    }

    pub fn format(&self) -> VideoFormat {
        self.format
    }

    /// Current packet buffer size. Grows to the largest unit seen; never
    /// shrinks.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Copy the unit into the packet buffer and decode it.
    pub fn decode(&mut self, unit: &DecodeUnit<'_>) -> Result<Option<Frame>, String> {
        let length: usize = unit.buffers.iter().map(|b| b.len()).sum();
        let needed = length.max(unit.full_length) + INPUT_BUFFER_PADDING;
        if self.buffer.len() < needed {
            debug!(from = self.buffer.len(), to = needed, "growing decode buffer");
            self.buffer.resize(needed, 0);
        }

        let mut offset = 0;
        for chunk in &unit.buffers {
            self.buffer[offset..offset + chunk.len()].copy_from_slice(chunk);
            offset += chunk.len();
        }
        self.buffer[offset..offset + INPUT_BUFFER_PADDING].fill(0);

        self.context.send_packet(&self.buffer[..offset])?;
        Ok(self.context.receive_frame().map(|mut frame| {
            frame.frame_number = unit.frame_number;
            frame
        }))
    }

    /// Decode a known-good bitstream; true if it produced a frame.
    pub fn probe(&mut self, data: &[u8]) -> bool {
        self.decode(&DecodeUnit::single(0, data))
            .map(|frame| frame.is_some())
            .unwrap_or(false)
    }
}
