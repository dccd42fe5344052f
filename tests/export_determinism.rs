use glidepath::{
    CanvasSize, Deliverable, EditorOpts, EditorState, Ease, ExportOpts, ExportScheduler,
    ExportState, ExportStep, Fps, FrameIndex, InMemorySink, LoopPolicy, ManualClock, Point,
    Preview, PreviewOpts, SceneDocument, Timing,
};

const SCENE: &str = r##"{
  "canvas": { "width": 96, "height": 64 },
  "movingItems": [
    {
      "curve": { "points": [ {"x": 8, "y": 32}, {"x": 40, "y": 8}, {"x": 88, "y": 40} ], "tension": 1.0 },
      "style": { "shape": "circle", "width": 10, "height": 10, "fill": "#ff0000", "stroke": "#000000", "strokeWeight": 1 },
      "timing": { "startFrame": 0, "durationSecs": 0.6, "ease": "easeInOut", "loop": true }
    },
    {
      "curve": { "points": [ {"x": 90, "y": 60}, {"x": 10, "y": 60} ] },
      "style": { "shape": "triangle", "width": 12, "height": 8, "fill": "#0080ff", "stroke": "#000000", "strokeWeight": 0 },
      "timing": { "startFrame": 18, "durationSecs": 0.4, "ease": "easeOut" }
    }
  ],
  "staticItems": [
    { "position": {"x": 48, "y": 32}, "style": { "shape": "square", "width": 20, "height": 20, "fill": "#cccccc", "stroke": "#333333", "strokeWeight": 2 } }
  ]
}"##;

fn editor() -> EditorState {
    SceneDocument::from_json(SCENE)
        .unwrap()
        .into_editor(EditorOpts::default())
        .unwrap()
}

fn export(fps: u32, secs: f64) -> (ExportScheduler<InMemorySink>, ExportStep) {
    let mut ed = editor();
    let mut ex = ExportScheduler::new(InMemorySink::new());
    ex.start(&mut ed, &ExportOpts::new(Fps::whole(fps).unwrap(), secs))
        .unwrap();
    let end = ex.run_to_completion(&mut ed).unwrap();
    assert!(!ed.is_locked());
    (ex, end)
}

#[test]
fn ten_fps_for_one_second_yields_ten_frames() {
    let (ex, end) = export(10, 1.0);
    assert_eq!(end, ExportStep::Completed(Deliverable::Memory { frames: 10 }));
    assert_eq!(ex.state(), &ExportState::Completed);
    assert_eq!(ex.progress(), Some((10, 10)));
    let indices: Vec<u64> = ex.sink().frames().iter().map(|(i, _)| i.0).collect();
    assert_eq!(indices, (0..10).collect::<Vec<_>>());
    let cfg = ex.sink().config();
    assert!(cfg.is_none(), "sink should be closed after finalize");
}

#[test]
fn repeated_exports_are_pixel_identical() {
    let (a, _) = export(12, 0.75);
    let (b, _) = export(12, 0.75);
    assert_eq!(a.sink().frames().len(), 9);
    assert_eq!(a.sink().frames(), b.sink().frames());
}

#[test]
fn export_positions_match_preview_without_looping() {
    let ed = editor();
    let fps = Fps::whole(10).unwrap();
    let clock = ManualClock::default();
    let preview = Preview::new(
        PreviewOpts {
            loop_policy: LoopPolicy::Never,
            ..PreviewOpts::default()
        },
        &clock,
    );
    for n in 0..10 {
        let idx = FrameIndex(n);
        let exported = glidepath::export_frame_commands(ed.scene(), fps, idx);
        let previewed = preview.commands_at(ed.scene(), fps.frame_to_ms(idx));
        assert_eq!(exported, previewed, "frame {n}");
    }
}

#[test]
fn items_plateau_and_appear_on_their_own_schedule() {
    let ed = editor();
    let fps = Fps::whole(10).unwrap();
    let moving: Vec<_> = ed.scene().moving_items().iter().map(|m| m.id).collect();

    // Second item starts after 18 frames at 60 fps = 300 ms.
    let early = glidepath::export_frame_commands(ed.scene(), fps, FrameIndex(2));
    assert!(early.iter().all(|c| c.item != moving[1]));
    let later = glidepath::export_frame_commands(ed.scene(), fps, FrameIndex(3));
    assert!(later.iter().any(|c| c.item == moving[1]));

    // First item loops in preview but holds its end point in export.
    let end = ed.scene().moving(moving[0]).unwrap().curve.last_point();
    for n in [6, 9, 20] {
        let cmds = glidepath::export_frame_commands(ed.scene(), fps, FrameIndex(n));
        let first = cmds.iter().find(|c| c.item == moving[0]).unwrap();
        assert!((first.position - end).hypot() < 1e-9, "frame {n}");
    }
}

#[test]
fn static_items_are_drawn_first() {
    let ed = editor();
    let cmds = glidepath::export_frame_commands(ed.scene(), Fps::whole(10).unwrap(), FrameIndex(5));
    assert_eq!(cmds.len(), 3);
    assert_eq!(cmds[0].item, ed.scene().static_items()[0].id);
    assert_eq!(cmds[0].position, Point::new(48.0, 32.0));
}

#[test]
fn scaled_output_uses_requested_size() {
    let mut ed = editor();
    let mut ex = ExportScheduler::new(InMemorySink::new());
    let opts = ExportOpts {
        output: Some(CanvasSize::new(192, 32).unwrap()),
        ..ExportOpts::new(Fps::whole(5).unwrap(), 0.4)
    };
    ex.start(&mut ed, &opts).unwrap();
    ex.run_to_completion(&mut ed).unwrap();
    let frames = ex.sink().frames();
    assert_eq!(frames.len(), 2);
    assert_eq!((frames[0].1.width, frames[0].1.height), (192, 32));
    // Static square centre maps from (48, 32) to (96, 16).
    assert_eq!(frames[0].1.pixel(96, 16), Some([204, 204, 204, 255]));
}

#[test]
fn frame_content_reflects_timing_changes() {
    let mut ed = editor();
    let id = ed.scene().moving_items()[0].id;
    let fps = Fps::whole(10).unwrap();
    let before = glidepath::export_frame_commands(ed.scene(), fps, FrameIndex(2));
    ed.set_timing(id, Timing::new(0, 5.0, Ease::Linear, false).unwrap())
        .unwrap();
    let after = glidepath::export_frame_commands(ed.scene(), fps, FrameIndex(2));
    assert_ne!(before, after);
}
