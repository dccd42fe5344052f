use std::path::PathBuf;

use crate::{
    foundation::core::{Fps, FrameIndex},
    foundation::error::{GlideError, GlideResult},
    render::frame::FrameRGBA,
};

/// Parameters handed to [`FrameSink::open`] once per export job.
#[derive(Clone, Debug, PartialEq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    /// Number of frames the job will submit if it runs to completion.
    pub total_frames: u64,
}

/// What a finalized sink produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Deliverable {
    File(PathBuf),
    Memory { frames: usize },
}

/// Consumer of rendered export frames.
///
/// Within one job `submit` is called with strictly increasing frame indices, starting at 0.
/// After `finalize` or `abort` the sink may be opened again for a new job.
pub trait FrameSink {
    /// Whether this sink can currently accept a job at all (e.g. its encoder exists).
    fn is_available(&self) -> bool {
        true
    }

    fn open(&mut self, cfg: &SinkConfig) -> GlideResult<()>;

    fn submit(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> GlideResult<()>;

    fn finalize(&mut self) -> GlideResult<Deliverable>;

    /// Discard the job. Must be safe to call in any state.
    fn abort(&mut self);
}

/// Sink that keeps every frame in memory.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    finalized: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl FrameSink for InMemorySink {
    fn open(&mut self, cfg: &SinkConfig) -> GlideResult<()> {
        self.cfg = Some(cfg.clone());
        self.frames.clear();
        self.finalized = false;
        Ok(())
    }

    fn submit(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> GlideResult<()> {
        let Some(cfg) = self.cfg.as_ref() else {
            return Err(GlideError::export("sink is not open"));
        };
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(GlideError::export(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        let expected = FrameIndex(self.frames.len() as u64);
        if idx != expected {
            return Err(GlideError::export(format!(
                "out-of-order frame {} (expected {})",
                idx.0, expected.0
            )));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn finalize(&mut self) -> GlideResult<Deliverable> {
        if self.cfg.take().is_none() {
            return Err(GlideError::export("sink is not open"));
        }
        self.finalized = true;
        Ok(Deliverable::Memory {
            frames: self.frames.len(),
        })
    }

    fn abort(&mut self) {
        self.cfg = None;
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SinkConfig {
        SinkConfig {
            width: 2,
            height: 2,
            fps: Fps::whole(10).unwrap(),
            total_frames: 2,
        }
    }

    fn frame() -> FrameRGBA {
        FrameRGBA {
            width: 2,
            height: 2,
            data: vec![0; 16],
            premultiplied: true,
        }
    }

    #[test]
    fn in_memory_sink_enforces_order() {
        let mut sink = InMemorySink::new();
        assert!(sink.submit(FrameIndex(0), &frame()).is_err());
        sink.open(&cfg()).unwrap();
        sink.submit(FrameIndex(0), &frame()).unwrap();
        assert!(sink.submit(FrameIndex(2), &frame()).is_err());
        sink.submit(FrameIndex(1), &frame()).unwrap();
        assert_eq!(sink.finalize().unwrap(), Deliverable::Memory { frames: 2 });
        assert!(sink.is_finalized());
        assert!(sink.finalize().is_err());
    }

    #[test]
    fn abort_discards_frames() {
        let mut sink = InMemorySink::new();
        sink.open(&cfg()).unwrap();
        sink.submit(FrameIndex(0), &frame()).unwrap();
        sink.abort();
        assert!(sink.frames().is_empty());
        assert!(!sink.is_finalized());
    }
}
