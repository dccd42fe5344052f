//! Time-dependent evaluation of a [`Scene`]: positions and draw commands.

use crate::{
    animation::timeline::{Timing, progress_at},
    foundation::core::Point,
    geometry::{arc_length::ArcLengthSampler, curve::Curve},
    scene::model::{ItemId, ItemView, MovingItem, Scene, ShapeKind, Style},
};

/// How the per-item `loop` flag is resolved for one evaluation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoopPolicy {
    /// Use each item's own flag (live preview).
    #[default]
    PerItem,
    /// Play every item once and hold its final position (export).
    Never,
    /// Loop every item.
    Always,
}

impl LoopPolicy {
    pub fn resolve(self, timing: &Timing) -> bool {
        match self {
            Self::PerItem => timing.looping,
            Self::Never => false,
            Self::Always => true,
        }
    }
}

/// One shape to draw, in scene coordinates.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct DrawCommand {
    pub item: ItemId,
    pub shape: ShapeKind,
    pub position: Point,
    pub style: Style,
}

impl Scene {
    /// Sampled length of `curve` under this scene's sampling options.
    pub fn total_length(&self, curve: &Curve) -> f64 {
        ArcLengthSampler::new(curve, self.sampler_opts()).total_length()
    }

    /// Where a moving item sits at `now_ms`, or `None` before its start delay.
    pub fn moving_position(
        &self,
        item: &MovingItem,
        now_ms: f64,
        origin_ms: f64,
        looping: bool,
    ) -> Option<Point> {
        let progress = progress_at(&item.timing, now_ms, origin_ms, looping)?;
        let sampler = ArcLengthSampler::new(&item.curve, self.sampler_opts());
        Some(sampler.position_at_distance(progress * sampler.total_length()))
    }

    /// Position of any item. Static items ignore time entirely.
    pub fn position_of(
        &self,
        item: ItemView<'_>,
        now_ms: f64,
        origin_ms: f64,
        looping: bool,
    ) -> Option<Point> {
        match item {
            ItemView::Static(s) => Some(s.position),
            ItemView::Moving(m) => self.moving_position(m, now_ms, origin_ms, looping),
        }
    }

    /// Position of the item with `id`; `None` if it does not exist or has not started.
    pub fn position_of_id(
        &self,
        id: ItemId,
        now_ms: f64,
        origin_ms: f64,
        looping: bool,
    ) -> Option<Point> {
        self.position_of(self.item(id)?, now_ms, origin_ms, looping)
    }

    /// Draw commands for every visible item, in draw order.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn draw_commands(&self, now_ms: f64, origin_ms: f64, policy: LoopPolicy) -> Vec<DrawCommand> {
        self.items_in_draw_order()
            .filter_map(|view| {
                let looping = match view {
                    ItemView::Moving(m) => policy.resolve(&m.timing),
                    ItemView::Static(_) => false,
                };
                let position = self.position_of(view, now_ms, origin_ms, looping)?;
                let style = *view.style();
                Some(DrawCommand {
                    item: view.id(),
                    shape: style.shape,
                    position,
                    style,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::ease::Ease;

    fn scene_with_line(timing: Timing) -> (Scene, ItemId) {
        let mut s = Scene::default();
        let id = s.push_moving(
            Curve::line(Point::new(0.0, 0.0), Point::new(100.0, 0.0)).unwrap(),
            Style::default(),
            timing,
        );
        (s, id)
    }

    #[test]
    fn moves_along_the_line() {
        let (s, id) = scene_with_line(Timing::new(0, 2.0, Ease::Linear, false).unwrap());
        let p = s.position_of_id(id, 1000.0, 0.0, false).unwrap();
        assert!((p.x - 50.0).abs() < 1e-9);
        let end = s.position_of_id(id, 9000.0, 0.0, false).unwrap();
        assert_eq!(end, Point::new(100.0, 0.0));
    }

    #[test]
    fn pre_start_items_are_not_drawn() {
        let (mut s, _) = scene_with_line(Timing::new(60, 1.0, Ease::Linear, false).unwrap());
        let st = s.push_static(Point::new(5.0, 5.0), Style::default());
        let cmds = s.draw_commands(500.0, 0.0, LoopPolicy::PerItem);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].item, st);
        assert_eq!(s.draw_commands(1500.0, 0.0, LoopPolicy::PerItem).len(), 2);
    }

    #[test]
    fn policy_overrides_item_loop_flag() {
        let (s, id) = scene_with_line(Timing::new(0, 1.0, Ease::Linear, true).unwrap());
        let looped = s.draw_commands(1250.0, 0.0, LoopPolicy::PerItem);
        let once = s.draw_commands(1250.0, 0.0, LoopPolicy::Never);
        assert_eq!(looped[0].item, id);
        assert!((looped[0].position.x - 25.0).abs() < 1e-9);
        assert_eq!(once[0].position, Point::new(100.0, 0.0));
        let forced = s.draw_commands(1250.0, 0.0, LoopPolicy::Always);
        assert_eq!(forced[0].position, looped[0].position);
    }

    #[test]
    fn statics_resolve_at_any_time() {
        let mut s = Scene::default();
        let st = s.push_static(Point::new(7.0, 8.0), Style::default());
        assert_eq!(s.position_of_id(st, -1e6, 0.0, false), Some(Point::new(7.0, 8.0)));
        assert_eq!(s.position_of_id(ItemId(99), 0.0, 0.0, false), None);
    }

    #[test]
    fn total_length_uses_scene_sampling() {
        let (s, id) = scene_with_line(Timing::default());
        let len = s.total_length(&s.moving(id).unwrap().curve);
        assert!((len - 100.0).abs() < 1e-9);
    }
}
