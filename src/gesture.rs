use crate::error::{SpinrigError, SpinrigResult};

/// Scale factor applied per pixel of wheel travel, before clamping.
const WHEEL_ZOOM_RATE: f64 = 0.002;
/// Pixels per wheel step when the host reports line-based deltas.
const LINE_HEIGHT_PX: f64 = 40.0;
/// Pixels per wheel step when the host reports page-based deltas.
const PAGE_HEIGHT_PX: f64 = 800.0;
/// Pinches starting with the fingers closer than this are noise.
const MIN_PINCH_DIST: f64 = 10.0;

/// Input device class for a pointer gesture. Touch input gets a higher
/// drag sensitivity than mouse input; pens behave like mice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
    Unknown,
}

/// Unit of a wheel event's delta, as reported by the host platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WheelDeltaUnit {
    Pixel,
    Line,
    Page,
}

impl WheelDeltaUnit {
    fn to_pixels(self, delta: f64) -> f64 {
        match self {
            Self::Pixel => delta,
            Self::Line => delta * LINE_HEIGHT_PX,
            Self::Page => delta * PAGE_HEIGHT_PX,
        }
    }
}

/// Inclusive zoom bounds for wheel and pinch scaling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
}

impl ZoomRange {
    pub fn new(min: f64, max: f64) -> SpinrigResult<Self> {
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || min > max {
            return Err(SpinrigError::validation(
                "ZoomRange requires 0 < min <= max",
            ));
        }
        Ok(Self { min, max })
    }

    pub fn clamp(self, v: f64) -> f64 {
        v.clamp(self.min, self.max)
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self { min: 1.0, max: 4.0 }
    }
}

/// One live drag observation: where the drag anchored and how far the
/// pointer has travelled since. The caller turns this into a frame via
/// [`crate::core::wrap_frame`] with its per-kind sensitivity.
#[derive(Clone, Copy, Debug)]
pub struct DragSample {
    pub kind: PointerKind,
    pub anchor_frame: f64,
    pub delta_x: f64,
}

#[derive(Clone, Copy, Debug)]
struct DragState {
    kind: PointerKind,
    start_x: f64,
    anchor_frame: f64,
}

#[derive(Clone, Copy, Debug)]
struct PinchState {
    start_dist: f64,
    start_scale: f64,
}

/// Euclidean distance between two finger positions.
pub fn finger_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Tracks pointer gestures against the frame circle and the zoom scale.
///
/// Owns the zoom scale (always clamped into its [`ZoomRange`]) and the
/// permanent `ever_interacted` latch: the first drag, wheel step, or pinch
/// sets it, and nothing clears it for the tracker's lifetime.
#[derive(Debug)]
pub struct GestureTracker {
    zoom: ZoomRange,
    scale: f64,
    drag: Option<DragState>,
    pinch: Option<PinchState>,
    interacted: bool,
}

impl GestureTracker {
    pub fn new(zoom: ZoomRange) -> Self {
        Self {
            zoom,
            scale: zoom.clamp(1.0),
            drag: None,
            pinch: None,
            interacted: false,
        }
    }

    /// Current zoom scale, always within the configured range.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// True once any manual gesture has ever happened.
    pub fn ever_interacted(&self) -> bool {
        self.interacted
    }

    /// Starts a drag at pointer x, anchored to the frame shown right now.
    pub fn begin_drag(&mut self, kind: PointerKind, x: f64, anchor_frame: f64) {
        self.interacted = true;
        self.drag = Some(DragState {
            kind,
            start_x: x,
            anchor_frame,
        });
    }

    /// Reports the drag displacement at pointer x, or `None` when no drag
    /// is active.
    pub fn drag_to(&self, x: f64) -> Option<DragSample> {
        self.drag.map(|d| DragSample {
            kind: d.kind,
            anchor_frame: d.anchor_frame,
            delta_x: x - d.start_x,
        })
    }

    /// Ends the active drag. Safe to call on release events that arrive
    /// without a matching begin (pointer released outside the view).
    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Applies one wheel step and returns the new scale. Negative deltas
    /// (scrolling up / away) zoom in.
    pub fn wheel(&mut self, delta: f64, unit: WheelDeltaUnit) -> f64 {
        self.interacted = true;
        let px = unit.to_pixels(delta);
        self.scale = self.zoom.clamp(self.scale * (-px * WHEEL_ZOOM_RATE).exp());
        self.scale
    }

    /// Starts a pinch at the given finger distance. Distances under the
    /// noise floor are ignored and do not count as interaction.
    pub fn pinch_begin(&mut self, dist: f64) {
        if dist < MIN_PINCH_DIST {
            return;
        }
        self.interacted = true;
        self.pinch = Some(PinchState {
            start_dist: dist,
            start_scale: self.scale,
        });
    }

    /// Rescales by the ratio of the current finger distance to the starting
    /// one. Returns the new scale, or `None` when no pinch is active.
    pub fn pinch_move(&mut self, dist: f64) -> Option<f64> {
        let p = self.pinch?;
        self.scale = self.zoom.clamp(p.start_scale * (dist / p.start_dist));
        Some(self.scale)
    }

    pub fn pinch_end(&mut self) {
        self.pinch = None;
    }
}
