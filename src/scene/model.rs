use crate::{
    animation::timeline::Timing,
    foundation::core::{Point, Rgba8, Vec2},
    foundation::error::{GlideError, GlideResult},
    geometry::{arc_length::SamplerOpts, curve::Curve},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Circle,
    #[default]
    Square,
    Triangle,
}

/// Appearance shared by moving and static items.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub shape: ShapeKind,
    pub width: f64,
    pub height: f64,
    pub fill: Rgba8,
    pub stroke: Rgba8,
    pub stroke_weight: f64,
}

impl Style {
    pub fn validate(&self) -> GlideResult<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.width) || !positive(self.height) {
            return Err(GlideError::validation(format!(
                "shape size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.stroke_weight.is_finite() && self.stroke_weight >= 0.0) {
            return Err(GlideError::validation("stroke weight must be >= 0"));
        }
        Ok(())
    }

    pub fn half_extent(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Style {
    fn default() -> Self {
        Self {
            shape: ShapeKind::Square,
            width: 30.0,
            height: 30.0,
            fill: Rgba8::WHITE,
            stroke: Rgba8::BLACK,
            stroke_weight: 1.0,
        }
    }
}

/// Scene-unique item identifier. Ids grow monotonically, so a larger id is a newer item.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ItemId(pub u64);

#[derive(Clone, Debug, PartialEq)]
pub struct MovingItem {
    pub id: ItemId,
    pub curve: Curve,
    pub style: Style,
    pub timing: Timing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StaticItem {
    pub id: ItemId,
    pub position: Point,
    pub style: Style,
}

/// Borrowed view of either item kind.
#[derive(Clone, Copy, Debug)]
pub enum ItemView<'a> {
    Moving(&'a MovingItem),
    Static(&'a StaticItem),
}

impl ItemView<'_> {
    pub fn id(&self) -> ItemId {
        match self {
            Self::Moving(m) => m.id,
            Self::Static(s) => s.id,
        }
    }

    pub fn style(&self) -> &Style {
        match self {
            Self::Moving(m) => &m.style,
            Self::Static(s) => &s.style,
        }
    }
}

/// Removed item, handed back to the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum RemovedItem {
    Moving(MovingItem),
    Static(StaticItem),
}

/// Moving items (stored order is z-order) plus static items.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    moving: Vec<MovingItem>,
    statics: Vec<StaticItem>,
    sampler: SamplerOpts,
    next_id: u64,
}

impl Scene {
    pub fn new(sampler: SamplerOpts) -> Self {
        Self {
            sampler,
            ..Self::default()
        }
    }

    /// Arc-length sampling used for every position query on this scene.
    pub fn sampler_opts(&self) -> SamplerOpts {
        self.sampler
    }

    pub fn set_sampler_opts(&mut self, sampler: SamplerOpts) {
        self.sampler = sampler;
    }

    pub fn moving_items(&self) -> &[MovingItem] {
        &self.moving
    }

    pub fn static_items(&self) -> &[StaticItem] {
        &self.statics
    }

    pub fn is_empty(&self) -> bool {
        self.moving.is_empty() && self.statics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.moving.len() + self.statics.len()
    }

    pub fn moving(&self, id: ItemId) -> Option<&MovingItem> {
        self.moving.iter().find(|m| m.id == id)
    }

    pub fn moving_mut(&mut self, id: ItemId) -> Option<&mut MovingItem> {
        self.moving.iter_mut().find(|m| m.id == id)
    }

    pub fn static_item(&self, id: ItemId) -> Option<&StaticItem> {
        self.statics.iter().find(|s| s.id == id)
    }

    pub fn static_mut(&mut self, id: ItemId) -> Option<&mut StaticItem> {
        self.statics.iter_mut().find(|s| s.id == id)
    }

    pub fn item(&self, id: ItemId) -> Option<ItemView<'_>> {
        self.moving(id)
            .map(ItemView::Moving)
            .or_else(|| self.static_item(id).map(ItemView::Static))
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.item(id).is_some()
    }

    pub fn push_moving(&mut self, curve: Curve, style: Style, timing: Timing) -> ItemId {
        let id = self.alloc_id();
        self.moving.push(MovingItem {
            id,
            curve,
            style,
            timing,
        });
        id
    }

    pub fn push_static(&mut self, position: Point, style: Style) -> ItemId {
        let id = self.alloc_id();
        self.statics.push(StaticItem {
            id,
            position,
            style,
        });
        id
    }

    pub fn remove(&mut self, id: ItemId) -> Option<RemovedItem> {
        if let Some(pos) = self.moving.iter().position(|m| m.id == id) {
            return Some(RemovedItem::Moving(self.moving.remove(pos)));
        }
        let pos = self.statics.iter().position(|s| s.id == id)?;
        Some(RemovedItem::Static(self.statics.remove(pos)))
    }

    pub fn clear(&mut self) {
        self.moving.clear();
        self.statics.clear();
    }

    /// Most recently created item still present.
    pub fn newest_id(&self) -> Option<ItemId> {
        self.moving
            .iter()
            .map(|m| m.id)
            .chain(self.statics.iter().map(|s| s.id))
            .max()
    }

    /// Static items first, then moving items; later entries draw on top.
    pub fn items_in_draw_order(&self) -> impl Iterator<Item = ItemView<'_>> {
        self.statics
            .iter()
            .map(ItemView::Static)
            .chain(self.moving.iter().map(ItemView::Moving))
    }

    /// Scale every control point and static position per axis.
    pub(crate) fn scale_points(&mut self, sx: f64, sy: f64) {
        for m in &mut self.moving {
            m.curve.scale_non_uniform(sx, sy);
        }
        for s in &mut self.statics {
            s.position = Point::new(s.position.x * sx, s.position.y * sy);
        }
    }

    fn alloc_id(&mut self) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        id
    }
}
