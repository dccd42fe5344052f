//! JSON scene document: the on-disk form consumed by the CLI and by tests.
//!
//! Item ids are not persisted; loading assigns fresh ids in document order.

use crate::{
    animation::timeline::Timing,
    foundation::core::{CanvasSize, Point},
    foundation::error::{GlideError, GlideResult},
    geometry::{arc_length::SamplerOpts, curve::Curve},
    scene::editor::{EditorOpts, EditorState},
    scene::model::{Scene, Style},
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    pub canvas: CanvasSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdivisions: Option<usize>,
    #[serde(default)]
    pub moving_items: Vec<MovingItemDef>,
    #[serde(default)]
    pub static_items: Vec<StaticItemDef>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovingItemDef {
    pub curve: Curve,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub timing: Timing,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticItemDef {
    pub position: Point,
    #[serde(default)]
    pub style: Style,
}

impl SceneDocument {
    pub fn from_json(s: &str) -> GlideResult<Self> {
        let doc: Self = serde_json::from_str(s)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn to_json_pretty(&self) -> GlideResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> GlideResult<()> {
        CanvasSize::new(self.canvas.width, self.canvas.height)?;
        if let Some(n) = self.subdivisions {
            SamplerOpts::new(n)?;
        }
        for (i, m) in self.moving_items.iter().enumerate() {
            m.style
                .validate()
                .and_then(|_| m.timing.validate())
                .map_err(|e| GlideError::validation(format!("moving item {i}: {e}")))?;
        }
        for (i, s) in self.static_items.iter().enumerate() {
            if !s.position.is_finite() {
                return Err(GlideError::validation(format!(
                    "static item {i}: position must be finite"
                )));
            }
            s.style
                .validate()
                .map_err(|e| GlideError::validation(format!("static item {i}: {e}")))?;
        }
        Ok(())
    }

    /// Build an editor holding this document's items. `opts.canvas` and `opts.sampler` are
    /// taken from the document.
    pub fn into_editor(self, mut opts: EditorOpts) -> GlideResult<EditorState> {
        self.validate()?;
        opts.canvas = self.canvas;
        if let Some(n) = self.subdivisions {
            opts.sampler = SamplerOpts::new(n)?;
        }
        let mut scene = Scene::new(opts.sampler);
        for m in self.moving_items {
            scene.push_moving(m.curve, m.style, m.timing);
        }
        for s in self.static_items {
            scene.push_static(s.position, s.style);
        }
        tracing::debug!(items = scene.len(), "loaded scene document");
        Ok(EditorState::with_scene(scene, opts))
    }

    pub fn from_editor(editor: &EditorState) -> Self {
        let scene = editor.scene();
        let subdivisions = scene.sampler_opts().subdivisions;
        Self {
            canvas: editor.canvas(),
            subdivisions: (subdivisions != SamplerOpts::default().subdivisions)
                .then_some(subdivisions),
            moving_items: scene
                .moving_items()
                .iter()
                .map(|m| MovingItemDef {
                    curve: m.curve.clone(),
                    style: m.style,
                    timing: m.timing,
                })
                .collect(),
            static_items: scene
                .static_items()
                .iter()
                .map(|s| StaticItemDef {
                    position: s.position,
                    style: s.style,
                })
                .collect(),
        }
    }
}
