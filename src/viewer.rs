use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::asset::{AssetSlot, Commit, LoadTicket, SpriteAsset};
use crate::compositor::{self, CompositorSettings, Surface};
use crate::core::{ViewBox, snap_frame, wrap_frame};
use crate::error::{SpinrigError, SpinrigResult};
use crate::gesture::{GestureTracker, PointerKind, WheelDeltaUnit, ZoomRange};
use crate::idle::{AnimationMode, BounceDriver, SpinDriver};
use crate::request::RenderInput;

/// Drag sensitivity in frames per pixel, by input kind. Touch gets a
/// higher rate since thumbs travel less than mice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragSensitivity {
    pub mouse: f64,
    pub touch: f64,
}

impl DragSensitivity {
    pub fn for_kind(self, kind: PointerKind) -> f64 {
        match kind {
            PointerKind::Touch => self.touch,
            PointerKind::Mouse | PointerKind::Pen | PointerKind::Unknown => self.mouse,
        }
    }
}

impl Default for DragSensitivity {
    fn default() -> Self {
        Self {
            mouse: 0.1,
            touch: 0.2,
        }
    }
}

/// Viewer behavior knobs.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    /// Manual control. When false the pointer entry points are inert, the
    /// interaction latch can never set, and idle animation runs forever.
    pub interactive: bool,
    pub animation: AnimationMode,
    /// Time for one full idle rotation in spin mode. Read live each tick.
    pub spin_duration: Duration,
    pub sensitivity: DragSensitivity,
    pub zoom: ZoomRange,
    /// Peak idle-bounce nudge, in frames. The bounce only offsets what is
    /// drawn; the underlying frame never moves.
    pub bounce_amplitude: f64,
    /// Spin blend weights at or below this draw a single frame instead of
    /// a cross-fade pair.
    pub blend_threshold: f64,
    pub compositor: CompositorSettings,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            interactive: true,
            animation: AnimationMode::Bounce,
            spin_duration: Duration::from_secs(10),
            sensitivity: DragSensitivity::default(),
            zoom: ZoomRange::default(),
            bounce_amplitude: 3.0,
            blend_threshold: 0.01,
            compositor: CompositorSettings::default(),
        }
    }
}

impl ViewerConfig {
    pub fn validate(&self) -> SpinrigResult<()> {
        if self.spin_duration.is_zero() {
            return Err(SpinrigError::validation("spin_duration must be > 0"));
        }
        if !self.bounce_amplitude.is_finite() || self.bounce_amplitude < 0.0 {
            return Err(SpinrigError::validation("bounce_amplitude must be >= 0"));
        }
        if !self.blend_threshold.is_finite() || !(0.0..1.0).contains(&self.blend_threshold) {
            return Err(SpinrigError::validation(
                "blend_threshold must be in [0, 1)",
            ));
        }
        for (name, v) in [
            ("mouse", self.sensitivity.mouse),
            ("touch", self.sensitivity.touch),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(SpinrigError::validation(format!(
                    "{name} sensitivity must be > 0"
                )));
            }
        }
        ZoomRange::new(self.zoom.min, self.zoom.max)?;
        Ok(())
    }
}

/// Load lifecycle of the displayed render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewerPhase {
    /// Nothing requested yet.
    Unloaded,
    /// A render is in flight; nothing on screen.
    Loading,
    /// A sprite is live.
    Ready,
    /// The last render failed. Terminal for this input: the viewer never
    /// retries on its own, only a different input moves it on.
    Error(String),
}

/// Authorization to complete one render request. The embedder runs the
/// fetch and hands the outcome back through [`Viewer::commit_ready`] or
/// [`Viewer::commit_error`]; tickets from superseded requests are accepted
/// but change nothing.
#[derive(Debug)]
pub struct RenderTicket {
    load: LoadTicket,
    input: RenderInput,
}

impl RenderTicket {
    /// The normalized input to render for this ticket.
    pub fn input(&self) -> &RenderInput {
        &self.input
    }
}

/// Interactive turntable viewer: owns the display surface, the live sprite,
/// the gesture state, and the idle drivers. The embedder feeds it input
/// events and a `tick` per display frame, and blits [`Viewer::surface`]
/// out.
pub struct Viewer {
    config: ViewerConfig,
    phase: ViewerPhase,
    gestures: GestureTracker,
    bounce: BounceDriver,
    spin: SpinDriver,
    slot: AssetSlot,
    surface: Surface,
    frame: f64,
    last_input: Option<RenderInput>,
}

impl Viewer {
    pub fn new(view: ViewBox, config: ViewerConfig) -> SpinrigResult<Self> {
        config.validate()?;
        let surface = Surface::from_view_box(view)?;
        let gestures = GestureTracker::new(config.zoom);
        Ok(Self {
            config,
            phase: ViewerPhase::Unloaded,
            gestures,
            bounce: BounceDriver::new(),
            spin: SpinDriver::new(),
            slot: AssetSlot::new(),
            surface,
            frame: 0.0,
            last_input: None,
        })
    }

    pub fn phase(&self) -> &ViewerPhase {
        &self.phase
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// The composited backing store to blit to screen.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Authoritative fractional frame position.
    pub fn frame(&self) -> f64 {
        self.frame
    }

    /// Nearest whole frame of the authoritative rotation, when a sprite is
    /// live. The bounce nudge offsets only the drawn pixels, never this.
    pub fn current_frame(&self) -> Option<u32> {
        self.slot
            .current()
            .map(|asset| snap_frame(self.frame, asset.sheet.total_frames))
    }

    pub fn zoom(&self) -> f64 {
        self.gestures.scale()
    }

    pub fn is_dragging(&self) -> bool {
        self.gestures.is_dragging()
    }

    pub fn ever_interacted(&self) -> bool {
        self.gestures.ever_interacted()
    }

    /// True while the "drag to rotate" affordance should show: manual
    /// control available, a sprite on screen, and never yet touched. One
    /// interaction hides it for good.
    pub fn drag_hint_visible(&self) -> bool {
        self.config.interactive
            && self.phase == ViewerPhase::Ready
            && !self.gestures.ever_interacted()
    }

    /// Asks for `input` to be rendered. Equivalent inputs (same parts as
    /// sets, same options, same format) are a no-op returning `None`: what
    /// is shown or already loading satisfies them. Anything else unpublishes
    /// the current sprite, enters `Loading`, and returns the ticket to
    /// complete. The interaction latch survives; an error state is left
    /// only through here.
    pub fn request_render(&mut self, input: RenderInput) -> SpinrigResult<Option<RenderTicket>> {
        input.validate()?;
        if let Some(last) = &self.last_input
            && last.equivalent(&input)
        {
            return Ok(None);
        }
        tracing::debug!(format = ?input.format, "render input changed, reloading");

        self.last_input = Some(input.clone());
        // unpublishing here is the previous asset's single release, and it
        // happens before the superseding fetch can complete
        self.slot.take();
        self.surface.clear(self.config.compositor.clear_rgba);
        self.phase = ViewerPhase::Loading;

        let load = self.slot.begin();
        Ok(Some(RenderTicket { load, input }))
    }

    /// Publishes a finished render and shows its first frame. Returns false
    /// when the ticket was superseded, in which case nothing changes and
    /// the offered asset is dropped unseen.
    pub fn commit_ready(&mut self, ticket: RenderTicket, asset: SpriteAsset) -> bool {
        match self.slot.commit(ticket.load, Arc::new(asset)) {
            Commit::Published(_) => {
                self.frame = 0.0;
                self.phase = ViewerPhase::Ready;
                tracing::debug!("sprite published");
                // draw immediately rather than waiting for the next tick
                if let Err(err) = self.redraw() {
                    tracing::warn!(error = %err, "publish redraw failed");
                }
                true
            }
            Commit::Stale(_) => false,
        }
    }

    /// Records a failed render. Stale tickets are ignored, so an old
    /// failure can never clobber a newer request's state.
    pub fn commit_error(&mut self, ticket: RenderTicket, message: impl Into<String>) -> bool {
        if !self.slot.is_current(ticket.load) {
            return false;
        }
        let message = message.into();
        tracing::warn!(error = %message, "render failed");
        self.surface.clear(self.config.compositor.clear_rgba);
        self.phase = ViewerPhase::Error(message);
        true
    }

    /// Pointer press over the view: starts a drag anchored to the frame on
    /// screen. Inert unless interactive with a sprite live.
    pub fn pointer_down(&mut self, kind: PointerKind, x: f64) {
        if !self.config.interactive || self.phase != ViewerPhase::Ready {
            return;
        }
        self.gestures.begin_drag(kind, x, self.frame);
    }

    /// Pointer travel. During a drag this is the only writer of the frame:
    /// it maps the accumulated displacement through the wrap arithmetic and
    /// redraws at once.
    pub fn pointer_move(&mut self, x: f64) -> SpinrigResult<()> {
        if !self.config.interactive {
            return Ok(());
        }
        let Some(sample) = self.gestures.drag_to(x) else {
            return Ok(());
        };
        let Some(total) = self.total_frames() else {
            return Ok(());
        };
        let sensitivity = self.config.sensitivity.for_kind(sample.kind);
        self.frame = wrap_frame(sample.anchor_frame, sample.delta_x, sensitivity, total);
        self.redraw()
    }

    /// Pointer release, wherever it lands. Safe without a matching press;
    /// hosts should forward releases observed outside the view too.
    pub fn pointer_up(&mut self) {
        self.gestures.end_drag();
    }

    /// Wheel zoom step.
    pub fn wheel(&mut self, delta: f64, unit: WheelDeltaUnit) -> SpinrigResult<()> {
        if !self.config.interactive || self.phase != ViewerPhase::Ready {
            return Ok(());
        }
        self.gestures.wheel(delta, unit);
        self.redraw()
    }

    pub fn pinch_begin(&mut self, dist: f64) {
        if !self.config.interactive || self.phase != ViewerPhase::Ready {
            return;
        }
        self.gestures.pinch_begin(dist);
    }

    pub fn pinch_move(&mut self, dist: f64) -> SpinrigResult<()> {
        if !self.config.interactive {
            return Ok(());
        }
        if self.gestures.pinch_move(dist).is_some() {
            return self.redraw();
        }
        Ok(())
    }

    pub fn pinch_end(&mut self) {
        self.gestures.pinch_end();
    }

    /// Advances idle animation and redraws. Call once per display frame
    /// with a monotonic now. Precedence, strongest first: an active drag
    /// owns the view; any past interaction (interactive mode) holds it
    /// still; only an untouched viewer idles.
    pub fn tick(&mut self, now: Instant) -> SpinrigResult<()> {
        if self.phase != ViewerPhase::Ready {
            return Ok(());
        }
        if self.gestures.is_dragging() {
            // pointer_move already drew this frame
            return Ok(());
        }

        let idle = !self.config.interactive || !self.gestures.ever_interacted();
        match self.config.animation {
            AnimationMode::Bounce => {
                self.spin.set_enabled(false);
                self.bounce.set_enabled(idle);
                let sample = self.bounce.sample(now);
                let display = self.frame + sample.value * self.config.bounce_amplitude;
                self.draw_single(display)
            }
            AnimationMode::Spin => {
                self.bounce.set_enabled(false);
                self.spin.set_enabled(idle);
                if !idle {
                    return self.draw_single(self.frame);
                }
                let Some(total) = self.total_frames() else {
                    return Ok(());
                };
                let sample = self.spin.sample(now, self.config.spin_duration, total);
                // spin owns the frame, so a takeover drag anchors where the
                // rotation currently is
                self.frame = sample.exact;
                if sample.blend > self.config.blend_threshold {
                    self.draw_pair(sample.frame, sample.next_frame, sample.blend)
                } else {
                    self.draw_single(f64::from(sample.frame))
                }
            }
        }
    }

    fn total_frames(&self) -> Option<u32> {
        self.slot.current().map(|asset| asset.sheet.total_frames)
    }

    fn redraw(&mut self) -> SpinrigResult<()> {
        self.draw_single(self.frame)
    }

    fn draw_single(&mut self, frame_value: f64) -> SpinrigResult<()> {
        let Some(asset) = self.slot.current().map(Arc::clone) else {
            return Ok(());
        };
        let idx = snap_frame(frame_value, asset.sheet.total_frames);
        compositor::draw_frame(
            &mut self.surface,
            &asset.image,
            asset.sheet,
            idx,
            self.gestures.scale(),
            &self.config.compositor,
        )
    }

    fn draw_pair(&mut self, frame: u32, next_frame: u32, blend: f64) -> SpinrigResult<()> {
        let Some(asset) = self.slot.current().map(Arc::clone) else {
            return Ok(());
        };
        compositor::draw_crossfade(
            &mut self.surface,
            &asset.image,
            asset.sheet,
            frame,
            next_frame,
            blend,
            self.gestures.scale(),
            &self.config.compositor,
        )
    }
}
