//! Frame-indexed export: a cooperative state machine that renders one frame per step.
//!
//! ```text
//! Idle --start--> Running --step*--> Completed
//!                    |  \--cancel--> Cancelled
//!                    \--sink error--> Failed
//! ```
//!
//! A running job holds the editor's [`ExportLease`]; finishing the job or dropping the scheduler
//! releases it and aborts any unfinished output.
//!
//! Frame `n` is evaluated at `n * 1000 / fps` milliseconds with every item forced to play once,
//! so the output depends only on the scene, the frame rate and the duration.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::{
    encode::sink::{Deliverable, FrameSink, SinkConfig},
    foundation::clock::Clock,
    foundation::core::{CanvasSize, Fps, FrameIndex, Rgba8},
    foundation::error::{GlideError, GlideResult},
    render::canvas::{Canvas2D, OutputScale, draw_commands},
    render::cpu::CpuCanvas,
    scene::editor::{EditorState, ExportLease},
    scene::model::Scene,
    scene::query::{DrawCommand, LoopPolicy},
};

#[derive(Clone, Debug, PartialEq)]
pub struct ExportOpts {
    pub fps: Fps,
    pub duration_secs: f64,
    /// Output raster size; the editor canvas size when unset.
    pub output: Option<CanvasSize>,
    pub background: Rgba8,
}

impl ExportOpts {
    pub fn new(fps: Fps, duration_secs: f64) -> Self {
        Self {
            fps,
            duration_secs,
            output: None,
            background: Rgba8::WHITE,
        }
    }

    pub fn validate(&self) -> GlideResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return Err(GlideError::validation(format!(
                "export duration must be > 0 seconds, got {}",
                self.duration_secs
            )));
        }
        if let Some(out) = self.output {
            CanvasSize::new(out.width, out.height)?;
        }
        Ok(())
    }

    pub fn total_frames(&self) -> u64 {
        self.fps.frames_for_secs_ceil(self.duration_secs)
    }
}

/// Bookkeeping for the active (or last) job.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportJob {
    pub fps: Fps,
    pub duration_secs: f64,
    pub total_frames: u64,
    pub current_frame: u64,
    pub output: CanvasSize,
    pub scale: OutputScale,
    pub background: Rgba8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed(String),
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed(_))
    }
}

/// Outcome of one [`ExportScheduler::step`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportStep {
    /// No job is running.
    Idle,
    Rendered(FrameIndex),
    Completed(Deliverable),
    Cancelled,
}

/// Thread-safe cancellation flag for a running export.
///
/// Raising the flag does not change [`ExportScheduler::state`] by itself; the job stays
/// `Running` until the next [`ExportScheduler::step`] observes the flag and cancels.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Draw commands for export frame `frame`: time is derived from the index and nothing loops.
pub fn export_frame_commands(scene: &Scene, fps: Fps, frame: FrameIndex) -> Vec<DrawCommand> {
    scene.draw_commands(fps.frame_to_ms(frame), 0.0, LoopPolicy::Never)
}

pub struct ExportScheduler<S: FrameSink> {
    sink: S,
    state: ExportState,
    job: Option<ExportJob>,
    canvas: Option<CpuCanvas>,
    cancel: CancelHandle,
    lease: Option<Arc<ExportLease>>,
    last_commands: Vec<DrawCommand>,
}

impl<S: FrameSink> ExportScheduler<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            state: ExportState::Idle,
            job: None,
            canvas: None,
            cancel: CancelHandle::default(),
            lease: None,
            last_commands: Vec::new(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    pub fn job(&self) -> Option<&ExportJob> {
        self.job.as_ref()
    }

    /// `(frames rendered, total frames)` of the current or last job.
    pub fn progress(&self) -> Option<(u64, u64)> {
        self.job.as_ref().map(|j| (j.current_frame, j.total_frames))
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancel the running job now: the sink is aborted and the editor unlocked. No-op unless
    /// running. From another thread use [`CancelHandle`], which is honoured at the next step.
    pub fn cancel(&mut self) {
        if self.state == ExportState::Running {
            self.cancel_running();
        }
    }

    /// Draw commands used for the most recently rendered frame.
    pub fn last_commands(&self) -> &[DrawCommand] {
        &self.last_commands
    }

    /// Begin a job. Locks `editor` against mutation until the job ends.
    #[tracing::instrument(skip(self, editor), fields(fps = opts.fps.as_f64(), secs = opts.duration_secs))]
    pub fn start(&mut self, editor: &mut EditorState, opts: &ExportOpts) -> GlideResult<()> {
        if self.state == ExportState::Running || editor.is_locked() {
            return Err(reject("an export is already running"));
        }
        if editor.scene().is_empty() {
            return Err(reject("scene has no items to export"));
        }
        if !self.sink.is_available() {
            return Err(reject("frame sink is not available"));
        }
        opts.validate()?;

        let output = opts.output.unwrap_or(editor.canvas());
        let job = ExportJob {
            fps: opts.fps,
            duration_secs: opts.duration_secs,
            total_frames: opts.total_frames(),
            current_frame: 0,
            output,
            scale: OutputScale::between(editor.canvas(), output),
            background: opts.background,
        };
        let cfg = SinkConfig {
            width: output.width,
            height: output.height,
            fps: opts.fps,
            total_frames: job.total_frames,
        };

        self.job = Some(job);
        self.last_commands.clear();
        self.cancel.reset();

        let opened = CpuCanvas::new(output).and_then(|canvas| {
            self.sink.open(&cfg)?;
            Ok(canvas)
        });
        match opened {
            Ok(canvas) => self.canvas = Some(canvas),
            Err(e) => {
                self.sink.abort();
                tracing::error!(error = %e, "export could not start");
                self.state = ExportState::Failed(e.to_string());
                return Err(GlideError::export(e.to_string()));
            }
        }

        self.state = ExportState::Running;
        self.lease = Some(editor.acquire_export_lock());
        tracing::info!(
            frames = cfg.total_frames,
            width = cfg.width,
            height = cfg.height,
            "export started"
        );
        Ok(())
    }

    /// Advance the job by one unit of work.
    ///
    /// Cancellation is honoured before anything else. Each call renders and submits one frame;
    /// the call after the last frame finalizes the sink.
    pub fn step(&mut self, editor: &mut EditorState) -> GlideResult<ExportStep> {
        if self.state != ExportState::Running {
            return Ok(ExportStep::Idle);
        }
        if self.cancel.is_cancelled() {
            self.cancel_running();
            return Ok(ExportStep::Cancelled);
        }

        let Some(job) = self.job.as_ref() else {
            return Err(self.fail("running export has no job"));
        };

        if job.current_frame >= job.total_frames {
            return match self.sink.finalize() {
                Ok(deliverable) => {
                    self.finish(ExportState::Completed);
                    tracing::info!(?deliverable, "export completed");
                    Ok(ExportStep::Completed(deliverable))
                }
                Err(e) => {
                    self.sink.abort();
                    Err(self.fail(&e.to_string()))
                }
            };
        }

        let idx = FrameIndex(job.current_frame);
        let (fps, scale, background) = (job.fps, job.scale, job.background);
        let commands = export_frame_commands(editor.scene(), fps, idx);

        let rendered = match self.canvas.as_mut() {
            Some(canvas) => {
                canvas.clear(background);
                draw_commands(canvas, &commands, scale);
                canvas.snapshot()
            }
            None => Err(GlideError::invariant("running export has no canvas")),
        };
        let submitted = rendered.and_then(|frame| self.sink.submit(idx, &frame));
        if let Err(e) = submitted {
            self.sink.abort();
            return Err(self.fail(&e.to_string()));
        }

        self.last_commands = commands;
        if let Some(job) = self.job.as_mut() {
            job.current_frame += 1;
        }
        tracing::trace!(frame = idx.0, "export frame submitted");
        Ok(ExportStep::Rendered(idx))
    }

    /// Step until the job ends, without pacing.
    pub fn run_to_completion(&mut self, editor: &mut EditorState) -> GlideResult<ExportStep> {
        loop {
            match self.step(editor)? {
                ExportStep::Rendered(_) => continue,
                other => return Ok(other),
            }
        }
    }

    /// Step until the job ends, sleeping one frame interval between frames.
    pub fn run_paced(
        &mut self,
        editor: &mut EditorState,
        clock: &mut dyn Clock,
    ) -> GlideResult<ExportStep> {
        loop {
            match self.step(editor)? {
                ExportStep::Rendered(_) => {
                    let interval = self
                        .job
                        .as_ref()
                        .map(|j| j.fps.frame_interval_ms())
                        .unwrap_or(0.0);
                    clock.sleep_ms(interval);
                }
                other => return Ok(other),
            }
        }
    }

    fn cancel_running(&mut self) {
        self.sink.abort();
        self.finish(ExportState::Cancelled);
        tracing::info!(progress = ?self.progress(), "export cancelled");
    }

    fn finish(&mut self, state: ExportState) {
        self.state = state;
        self.canvas = None;
        self.lease = None;
    }

    fn fail(&mut self, msg: &str) -> GlideError {
        tracing::error!(error = msg, progress = ?self.progress(), "export failed");
        self.finish(ExportState::Failed(msg.to_string()));
        GlideError::export(msg)
    }
}

impl<S: FrameSink> Drop for ExportScheduler<S> {
    fn drop(&mut self) {
        if self.state == ExportState::Running {
            tracing::warn!(progress = ?self.progress(), "export dropped while running");
            self.sink.abort();
        }
    }
}

fn reject(msg: &str) -> GlideError {
    tracing::warn!("export rejected: {msg}");
    GlideError::unavailable(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        animation::timeline::Timing,
        encode::sink::InMemorySink,
        foundation::core::Point,
        render::frame::FrameRGBA,
        scene::editor::EditorOpts,
    };

    fn small_editor() -> EditorState {
        let mut ed = EditorState::new(EditorOpts {
            canvas: CanvasSize::new(40, 20).unwrap(),
            ..EditorOpts::default()
        });
        ed.add_moving_item().unwrap();
        ed
    }

    fn opts(fps: u32, secs: f64) -> ExportOpts {
        ExportOpts::new(Fps::whole(fps).unwrap(), secs)
    }

    struct RejectingSink;

    impl FrameSink for RejectingSink {
        fn open(&mut self, _cfg: &SinkConfig) -> GlideResult<()> {
            Err(GlideError::export("encoder refused"))
        }
        fn submit(&mut self, _idx: FrameIndex, _frame: &FrameRGBA) -> GlideResult<()> {
            Ok(())
        }
        fn finalize(&mut self) -> GlideResult<Deliverable> {
            Ok(Deliverable::Memory { frames: 0 })
        }
        fn abort(&mut self) {}
    }

    struct UnavailableSink;

    impl FrameSink for UnavailableSink {
        fn is_available(&self) -> bool {
            false
        }
        fn open(&mut self, _cfg: &SinkConfig) -> GlideResult<()> {
            Ok(())
        }
        fn submit(&mut self, _idx: FrameIndex, _frame: &FrameRGBA) -> GlideResult<()> {
            Ok(())
        }
        fn finalize(&mut self) -> GlideResult<Deliverable> {
            Ok(Deliverable::Memory { frames: 0 })
        }
        fn abort(&mut self) {}
    }

    #[test]
    fn total_frames_rounds_up() {
        assert_eq!(opts(10, 1.0).total_frames(), 10);
        assert_eq!(opts(24, 0.5).total_frames(), 12);
        assert_eq!(opts(30, 1.01).total_frames(), 31);
    }

    #[test]
    fn tiny_duration_still_renders_one_frame() {
        assert_eq!(opts(10, 1e-11).total_frames(), 1);

        let mut ed = small_editor();
        let mut ex = ExportScheduler::new(InMemorySink::new());
        ex.start(&mut ed, &opts(10, 1e-11)).unwrap();
        assert_eq!(ex.step(&mut ed).unwrap(), ExportStep::Rendered(FrameIndex(0)));
        assert_eq!(
            ex.step(&mut ed).unwrap(),
            ExportStep::Completed(Deliverable::Memory { frames: 1 })
        );
    }

    #[test]
    fn runs_every_frame_then_completes() {
        let mut ed = small_editor();
        let mut ex = ExportScheduler::new(InMemorySink::new());
        ex.start(&mut ed, &opts(10, 0.5)).unwrap();
        assert!(ed.is_locked());
        assert_eq!(ex.progress(), Some((0, 5)));

        for i in 0..5 {
            assert_eq!(ex.step(&mut ed).unwrap(), ExportStep::Rendered(FrameIndex(i)));
        }
        assert_eq!(
            ex.step(&mut ed).unwrap(),
            ExportStep::Completed(Deliverable::Memory { frames: 5 })
        );
        assert_eq!(ex.state(), &ExportState::Completed);
        assert!(!ed.is_locked());
        assert_eq!(ex.step(&mut ed).unwrap(), ExportStep::Idle);
        assert_eq!(ex.sink().frames().len(), 5);
    }

    #[test]
    fn empty_scene_is_rejected() {
        let mut ed = EditorState::new(EditorOpts::default());
        let mut ex = ExportScheduler::new(InMemorySink::new());
        let err = ex.start(&mut ed, &opts(10, 1.0)).unwrap_err();
        assert!(matches!(err, GlideError::ExportUnavailable(_)));
        assert_eq!(ex.state(), &ExportState::Idle);
        assert!(!ed.is_locked());
    }

    #[test]
    fn unavailable_sink_is_rejected() {
        let mut ed = small_editor();
        let mut ex = ExportScheduler::new(UnavailableSink);
        let err = ex.start(&mut ed, &opts(10, 1.0)).unwrap_err();
        assert!(matches!(err, GlideError::ExportUnavailable(_)));
        assert_eq!(ex.state(), &ExportState::Idle);
    }

    #[test]
    fn sink_open_failure_marks_failed() {
        let mut ed = small_editor();
        let mut ex = ExportScheduler::new(RejectingSink);
        let err = ex.start(&mut ed, &opts(10, 1.0)).unwrap_err();
        assert!(matches!(err, GlideError::ExportFailure(_)));
        assert!(matches!(ex.state(), ExportState::Failed(_)));
        assert!(!ed.is_locked());
        assert_eq!(ex.step(&mut ed).unwrap(), ExportStep::Idle);
    }

    #[test]
    fn second_start_while_running_is_rejected() {
        let mut ed = small_editor();
        let mut ex = ExportScheduler::new(InMemorySink::new());
        ex.start(&mut ed, &opts(10, 1.0)).unwrap();
        let err = ex.start(&mut ed, &opts(10, 1.0)).unwrap_err();
        assert!(matches!(err, GlideError::ExportUnavailable(_)));
        assert_eq!(ex.state(), &ExportState::Running);
    }

    #[test]
    fn cancel_stops_before_next_frame() {
        let mut ed = small_editor();
        let mut ex = ExportScheduler::new(InMemorySink::new());
        ex.start(&mut ed, &opts(10, 1.0)).unwrap();
        ex.step(&mut ed).unwrap();
        ex.step(&mut ed).unwrap();
        let handle = ex.cancel_handle();
        handle.cancel();
        assert_eq!(ex.state(), &ExportState::Running);
        assert!(ed.is_locked());
        assert_eq!(ex.step(&mut ed).unwrap(), ExportStep::Cancelled);
        assert_eq!(ex.state(), &ExportState::Cancelled);
        assert_eq!(ex.progress(), Some((2, 10)));
        assert!(ex.sink().frames().is_empty());
        assert!(!ed.is_locked());
        assert!(ed.add_moving_item().is_ok());
    }

    #[test]
    fn direct_cancel_is_immediate() {
        let mut ed = small_editor();
        let mut ex = ExportScheduler::new(InMemorySink::new());
        ex.start(&mut ed, &opts(10, 1.0)).unwrap();
        ex.step(&mut ed).unwrap();
        ex.cancel();
        assert_eq!(ex.state(), &ExportState::Cancelled);
        assert_eq!(ex.progress(), Some((1, 10)));
        assert!(!ed.is_locked());
        assert_eq!(ex.step(&mut ed).unwrap(), ExportStep::Idle);
    }

    #[test]
    fn dropping_a_running_export_unlocks_the_editor() {
        let mut ed = small_editor();
        {
            let mut ex = ExportScheduler::new(InMemorySink::new());
            ex.start(&mut ed, &opts(10, 1.0)).unwrap();
            ex.step(&mut ed).unwrap();
            assert!(ed.is_locked());
        }
        assert!(!ed.is_locked());
        assert!(ed.add_moving_item().is_ok());

        let mut ex = ExportScheduler::new(InMemorySink::new());
        ex.start(&mut ed, &opts(10, 0.2)).unwrap();
        assert!(matches!(
            ex.run_to_completion(&mut ed).unwrap(),
            ExportStep::Completed(_)
        ));
    }

    #[test]
    fn editor_is_locked_while_running() {
        let mut ed = small_editor();
        let id = ed.scene().moving_items()[0].id;
        let mut ex = ExportScheduler::new(InMemorySink::new());
        ex.start(&mut ed, &opts(10, 0.2)).unwrap();
        ex.step(&mut ed).unwrap();
        assert!(matches!(
            ed.move_point(id, 0, Point::ORIGIN),
            Err(GlideError::SceneLocked)
        ));
        ex.run_to_completion(&mut ed).unwrap();
        assert!(ed.move_point(id, 0, Point::ORIGIN).is_ok());
    }

    #[test]
    fn export_ignores_item_loop_flag() {
        let mut ed = small_editor();
        let id = ed.scene().moving_items()[0].id;
        let timing = Timing {
            duration_secs: 0.5,
            looping: true,
            ..Timing::default()
        };
        ed.set_timing(id, timing).unwrap();
        let fps = Fps::whole(10).unwrap();
        let end = export_frame_commands(ed.scene(), fps, FrameIndex(9));
        let last = ed.scene().moving(id).unwrap().curve.last_point();
        assert_eq!(end[0].position, last);
    }

    #[test]
    fn paced_run_sleeps_one_interval_per_frame() {
        let mut ed = small_editor();
        let mut ex = ExportScheduler::new(InMemorySink::new());
        let mut clock = crate::foundation::clock::ManualClock::default();
        ex.start(&mut ed, &opts(20, 0.25)).unwrap();
        let end = ex.run_paced(&mut ed, &mut clock).unwrap();
        assert!(matches!(end, ExportStep::Completed(_)));
        assert!((clock.now_ms() - 5.0 * 50.0).abs() < 1e-9);
    }
}
