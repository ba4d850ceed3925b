#![forbid(unsafe_code)]

pub mod asset;
pub mod client;
pub mod compositor;
pub mod core;
pub mod error;
pub mod gesture;
pub mod idle;
pub mod request;
pub mod viewer;

pub use asset::{
    AssetSlot, Commit, LoadTicket, SpriteAsset, SpriteImage, decode_sprite, load_render,
};
pub use client::{
    JobState, JobStatus, Pagination, PartDetail, PartPage, RenderApiConfig, RenderClient,
    RenderProtocol, SavedBuild, terminal_outcome,
};
pub use compositor::{
    CompositorSettings, PixelRect, Surface, dest_rect, draw_crossfade, draw_frame, source_rect,
};
pub use core::{SpriteSheet, ViewBox, snap_frame, wrap_frame};
pub use error::{SpinrigError, SpinrigResult};
pub use gesture::{GestureTracker, PointerKind, WheelDeltaUnit, ZoomRange};
pub use idle::{AnimationMode, BounceDriver, BounceSample, SpinDriver, SpinSample};
pub use request::{
    FrameQuality, GridSettings, PartCategory, PartsMap, RenderFormat, RenderInput, RenderOptions,
    RenderProfile, RenderSource,
};
pub use viewer::{DragSensitivity, RenderTicket, Viewer, ViewerConfig, ViewerPhase};
