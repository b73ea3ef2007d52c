use clap::ValueEnum;

use crate::constants::*;
use crate::geometry::{Placement, Size, Vec2};
use crate::state::SlideState;

/// Anything a slide can show. Only the natural size matters to the slide;
/// drawing is left to the surface.
pub trait Extent {
    fn size(&self) -> Size;
}

/// How an image's natural size maps to its drawn size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Fit {
    /// One image pixel per stage pixel.
    #[default]
    Natural,
    /// Scale (up or down) so the whole image fits on the stage.
    Contain,
}

impl Fit {
    pub fn extent(self, image: Size, stage: Size) -> Size {
        match self {
            Fit::Natural => image,
            Fit::Contain => {
                if image.is_empty() || stage.is_empty() {
                    return image;
                }
                let scale = (stage.width / image.width).min(stage.height / image.height);
                Size::new(image.width * scale, image.height * scale)
            }
        }
    }
}

/// What happens when a drifting slide reaches the stage border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EdgePolicy {
    /// Keep drifting forever.
    #[default]
    Free,
    /// Stop at the border.
    Clamp,
    /// Leave on one side, come back on the other.
    Wrap,
}

impl EdgePolicy {
    fn apply(self, position: &mut Vec2, extent: Size, stage: Size) {
        match self {
            EdgePolicy::Free => {}
            EdgePolicy::Clamp => {
                position.x = clamp_axis(position.x, extent.width, stage.width);
                position.y = clamp_axis(position.y, extent.height, stage.height);
            }
            EdgePolicy::Wrap => {
                position.x = wrap_axis(position.x, extent.width, stage.width);
                position.y = wrap_axis(position.y, extent.height, stage.height);
            }
        }
    }
}

// An image smaller than the stage stays inside it; a larger one keeps the
// stage covered.
fn clamp_axis(value: f32, extent: f32, stage: f32) -> f32 {
    let slack = stage - extent;
    value.clamp(slack.min(0.0), slack.max(0.0))
}

fn wrap_axis(value: f32, extent: f32, stage: f32) -> f32 {
    let period = stage + extent;
    if period <= 0.0 {
        return value;
    }
    if value > stage {
        value - period
    } else if value < -extent {
        value + period
    } else {
        value
    }
}

/// Stage geometry shared by the layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub stage: Size,
    pub fit: Fit,
    pub edges: EdgePolicy,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            stage: Size::new(RENDER_WIDTH as f32, RENDER_HEIGHT as f32),
            fit: Fit::Natural,
            edges: EdgePolicy::Free,
        }
    }
}

/// One compositing layer: an image plus its drift.
///
/// `image` is a shared handle. Cloning it into another slide must not copy
/// the decoded pixels, so both layers can show the same picture at once.
pub struct Slide<I> {
    image: I,
    extent: Size,
    layout: Layout,

    position: Vec2,          // Drawn this frame
    internal_position: Vec2, // Sub-pixel position the next frame starts from
    velocity: Vec2,          // Pixels per tick
}

impl<I: Extent> Slide<I> {
    pub fn new(image: I, velocity: Vec2) -> Self {
        let layout = Layout::default();
        let extent = layout.fit.extent(image.size(), layout.stage);
        Self {
            image,
            extent,
            layout,
            position: Vec2::ZERO,
            internal_position: Vec2::ZERO,
            velocity,
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self.extent = layout.fit.extent(self.image.size(), layout.stage);
        self
    }

    /// Swap the displayed image. Position and velocity are kept.
    pub fn set_image(&mut self, image: I) {
        self.extent = self.layout.fit.extent(image.size(), self.layout.stage);
        self.image = image;
    }

    pub fn set_speed(&mut self, vx: f32, vy: f32) {
        self.velocity = Vec2::new(vx, vy);
    }

    /// Move the slide. The drawn position follows immediately, so the next
    /// frame shows the new location even before any `advance`.
    pub fn set_position(&mut self, x: f32, y: f32) {
        self.internal_position = Vec2::new(x, y);
        self.position = self.internal_position;
    }

    /// One simulation tick: draw where we are, then move for the next tick.
    pub fn advance(&mut self) {
        self.position = self.internal_position;
        self.internal_position += self.velocity;
        self.layout
            .edges
            .apply(&mut self.internal_position, self.extent, self.layout.stage);
    }

    pub fn state(&self) -> SlideState {
        if self.velocity.is_zero() {
            SlideState::AtRest
        } else {
            SlideState::Drifting
        }
    }

    pub fn placement(&self) -> Placement {
        Placement {
            origin: self.position.floor(),
            extent: self.extent,
        }
    }

    pub fn image(&self) -> &I {
        &self.image
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn internal_position(&self) -> Vec2 {
        self.internal_position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn extent(&self) -> Size {
        self.extent
    }
}
