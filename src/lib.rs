//! Glidepath moves shapes along tension-controlled splines and renders that motion either live
//! or frame-by-frame for export.
//!
//! - Author a [`Scene`] through an [`EditorState`]
//! - Watch it through a [`Preview`] driven by a [`Clock`]
//! - Export it with an [`ExportScheduler`] into any [`FrameSink`]
//!
//! Preview and export share one evaluation path, [`Scene::draw_commands`], so a frame exported at
//! index `n` shows exactly what the preview shows `n / fps` seconds after a restart.
#![forbid(unsafe_code)]

pub mod animation;
pub mod encode;
pub mod export;
pub mod foundation;
pub mod geometry;
pub mod preview;
pub mod render;
pub mod scene;

pub use crate::animation::ease::Ease;
pub use crate::animation::timeline::{REFERENCE_FPS, Timing, progress_at, raw_progress_at};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{Deliverable, FrameSink, InMemorySink, SinkConfig};
pub use crate::export::scheduler::{
    CancelHandle, ExportJob, ExportOpts, ExportScheduler, ExportState, ExportStep,
    export_frame_commands,
};
pub use crate::foundation::clock::{Clock, ManualClock, SystemClock};
pub use crate::foundation::core::{
    Affine, BezPath, CanvasSize, Fps, FrameIndex, Point, Rect, Rgba8, Size, Vec2,
};
pub use crate::foundation::error::{GlideError, GlideResult};
pub use crate::geometry::arc_length::{ArcLengthSampler, DEFAULT_SUBDIVISIONS, SamplerOpts};
pub use crate::geometry::curve::Curve;
pub use crate::preview::{Preview, PreviewOpts};
pub use crate::render::canvas::{Canvas2D, OutputScale, Paint, RecordingCanvas};
pub use crate::render::cpu::CpuCanvas;
pub use crate::render::frame::FrameRGBA;
pub use crate::scene::document::SceneDocument;
pub use crate::scene::editor::{EditorOpts, EditorState, ExportLease, Selection};
pub use crate::scene::model::{ItemId, MovingItem, Scene, ShapeKind, StaticItem, Style};
pub use crate::scene::query::{DrawCommand, LoopPolicy};
