use std::sync::Arc;
use std::time::{Duration, Instant};

use spinrig::{
    AnimationMode, PartCategory, PartsMap, PointerKind, RenderFormat, RenderInput, SpriteAsset,
    SpriteImage, SpriteSheet, ViewBox, Viewer, ViewerConfig, ViewerPhase, WheelDeltaUnit,
};

fn color_for(frame: u32, tint: u8) -> [u8; 4] {
    [((frame * 3) % 256) as u8, ((frame * 7) % 256) as u8, tint, 255]
}

/// Opaque sprite sheet where every frame is a solid, distinct color.
fn sheet_asset(cols: u32, rows: u32, total: u32, cell: u32, tint: u8) -> SpriteAsset {
    let width = cols * cell;
    let height = rows * cell;
    let mut data = vec![0u8; (width * height * 4) as usize];
    for frame in 0..total {
        let col = frame % cols;
        let row = frame / cols;
        let c = color_for(frame, tint);
        for y in (row * cell)..((row + 1) * cell) {
            for x in (col * cell)..((col + 1) * cell) {
                let i = ((y * width + x) * 4) as usize;
                data[i..i + 4].copy_from_slice(&c);
            }
        }
    }
    SpriteAsset {
        image: SpriteImage {
            width,
            height,
            rgba8_premul: Arc::new(data),
        },
        sheet: SpriteSheet::new(cols, rows, total).unwrap(),
    }
}

fn standard_asset(tint: u8) -> SpriteAsset {
    sheet_asset(12, 6, 72, 4, tint)
}

fn input_with(cpu_id: &str) -> RenderInput {
    let mut parts = PartsMap::new();
    parts.insert(PartCategory::Cpu, vec![cpu_id.to_string()]);
    RenderInput::from_parts(parts).with_format(RenderFormat::Sprite)
}

fn viewer(animation: AnimationMode) -> Viewer {
    let config = ViewerConfig {
        animation,
        ..ViewerConfig::default()
    };
    Viewer::new(ViewBox::new(64.0, 64.0, 1.0).unwrap(), config).unwrap()
}

fn ready_viewer(animation: AnimationMode) -> Viewer {
    let mut v = viewer(animation);
    let ticket = v.request_render(input_with("cpu-a")).unwrap().unwrap();
    assert!(v.commit_ready(ticket, standard_asset(7)));
    v
}

fn center_pixel(v: &Viewer) -> [u8; 4] {
    let s = v.surface();
    s.pixel(s.width / 2, s.height / 2).unwrap()
}

#[test]
fn first_request_fetches_then_equivalent_repeats_do_not() {
    let mut v = viewer(AnimationMode::Bounce);
    assert_eq!(*v.phase(), ViewerPhase::Unloaded);

    assert!(v.request_render(input_with("cpu-a")).unwrap().is_some());
    assert_eq!(*v.phase(), ViewerPhase::Loading);

    // identical selection while loading: nothing new to do
    assert!(v.request_render(input_with("cpu-a")).unwrap().is_none());

    // reordered and duplicated ids are the same set
    let mut parts = PartsMap::new();
    parts.insert(PartCategory::CaseFan, vec!["fan-b".into(), "fan-a".into()]);
    let a = RenderInput::from_parts(parts.clone()).with_format(RenderFormat::Sprite);
    let mut v2 = viewer(AnimationMode::Bounce);
    assert!(v2.request_render(a).unwrap().is_some());
    parts.insert(
        PartCategory::CaseFan,
        vec!["fan-a".into(), "fan-b".into(), "fan-b".into()],
    );
    let b = RenderInput::from_parts(parts).with_format(RenderFormat::Sprite);
    assert!(v2.request_render(b).unwrap().is_none());

    // one changed scalar forces a reload
    let mut changed = input_with("cpu-a");
    changed.options.camera_zoom = Some(1.5);
    assert!(v.request_render(changed).unwrap().is_some());
}

#[test]
fn commit_ready_shows_the_first_frame() {
    let v = ready_viewer(AnimationMode::Bounce);
    assert_eq!(*v.phase(), ViewerPhase::Ready);
    assert_eq!(v.current_frame(), Some(0));
    assert_eq!(center_pixel(&v), color_for(0, 7));
}

#[test]
fn stale_commits_never_overwrite_newer_state() {
    let mut v = viewer(AnimationMode::Bounce);
    let first = v.request_render(input_with("cpu-a")).unwrap().unwrap();
    let second = v.request_render(input_with("cpu-b")).unwrap().unwrap();

    // the superseded render finishes late and must vanish without a trace
    assert!(!v.commit_ready(first, standard_asset(7)));
    assert_eq!(*v.phase(), ViewerPhase::Loading);
    assert!(v.current_frame().is_none());

    assert!(v.commit_ready(second, standard_asset(9)));
    assert_eq!(*v.phase(), ViewerPhase::Ready);
    assert_eq!(center_pixel(&v)[2], 9);

    // a stale error is equally inert
    let third = v.request_render(input_with("cpu-c")).unwrap().unwrap();
    let fourth = v.request_render(input_with("cpu-d")).unwrap().unwrap();
    assert!(v.commit_ready(fourth, standard_asset(11)));
    assert!(!v.commit_error(third, "late failure"));
    assert_eq!(*v.phase(), ViewerPhase::Ready);
}

#[test]
fn error_is_terminal_until_the_input_changes() {
    let mut v = viewer(AnimationMode::Bounce);
    let ticket = v.request_render(input_with("cpu-a")).unwrap().unwrap();
    assert!(v.commit_error(ticket, "render exploded"));
    assert_eq!(*v.phase(), ViewerPhase::Error("render exploded".into()));

    // the same input is equivalent, so no retry happens
    assert!(v.request_render(input_with("cpu-a")).unwrap().is_none());
    assert!(matches!(v.phase(), ViewerPhase::Error(_)));

    // a different input leaves the error state
    assert!(v.request_render(input_with("cpu-b")).unwrap().is_some());
    assert_eq!(*v.phase(), ViewerPhase::Loading);
}

#[test]
fn drag_scrubs_frames_and_wraps_exactly() {
    let mut v = ready_viewer(AnimationMode::Bounce);

    v.pointer_down(PointerKind::Mouse, 100.0);
    assert!(v.is_dragging());

    // 360 px at 0.1 frames/px
    v.pointer_move(460.0).unwrap();
    assert_eq!(v.current_frame(), Some(36));
    assert_eq!(center_pixel(&v), color_for(36, 7));

    // ten full revolutions land back on the anchor
    v.pointer_move(100.0 + 7200.0).unwrap();
    assert_eq!(v.current_frame(), Some(0));

    // negative displacement wraps the other way
    v.pointer_move(100.0 - 10.0).unwrap();
    assert_eq!(v.current_frame(), Some(71));

    v.pointer_up();
    assert!(!v.is_dragging());
    assert!(v.ever_interacted());
}

#[test]
fn touch_drags_use_the_touch_sensitivity() {
    let mut v = ready_viewer(AnimationMode::Bounce);
    v.pointer_down(PointerKind::Touch, 0.0);
    // 180 px at 0.2 frames/px
    v.pointer_move(180.0).unwrap();
    assert_eq!(v.current_frame(), Some(36));
}

#[test]
fn bounce_nudges_the_picture_but_not_the_frame() {
    let mut v = ready_viewer(AnimationMode::Bounce);
    let t0 = Instant::now();
    v.tick(t0).unwrap();

    // 250 ms into the period the nudge is 0.5 of the 3-frame amplitude
    v.tick(t0 + Duration::from_millis(250)).unwrap();
    assert_eq!(center_pixel(&v), color_for(2, 7));
    assert_eq!(v.frame(), 0.0);
    assert_eq!(v.current_frame(), Some(0));

    // in the rest window the picture returns to the authoritative frame
    v.tick(t0 + Duration::from_millis(1500)).unwrap();
    assert_eq!(center_pixel(&v), color_for(0, 7));
}

#[test]
fn spin_advances_crossfades_and_holds_after_interaction() {
    let mut v = ready_viewer(AnimationMode::Spin);
    let t0 = Instant::now();
    v.tick(t0).unwrap();
    assert_eq!(v.current_frame(), Some(0));

    // half of the default 10 s rotation over 72 frames
    v.tick(t0 + Duration::from_millis(5000)).unwrap();
    assert_eq!(v.current_frame(), Some(36));
    assert_eq!(center_pixel(&v), color_for(36, 7));

    // mid-blend tick draws a mix of the neighboring frames
    v.tick(t0 + Duration::from_millis(5069)).unwrap();
    let [r, _, _, a] = center_pixel(&v);
    assert_eq!(a, 255);
    let (r36, r37) = (color_for(36, 7)[0], color_for(37, 7)[0]);
    assert!(r > r36 && r < r37, "expected a blend, got r={r}");

    // any interaction freezes the spin wherever it is
    v.pointer_down(PointerKind::Mouse, 10.0);
    v.pointer_up();
    v.tick(t0 + Duration::from_millis(7000)).unwrap();
    assert_eq!(v.current_frame(), Some(36));
    v.tick(t0 + Duration::from_secs(60)).unwrap();
    assert_eq!(v.current_frame(), Some(36));
}

#[test]
fn interaction_latch_outlives_reloads() {
    let mut v = ready_viewer(AnimationMode::Bounce);
    assert!(v.drag_hint_visible());

    v.pointer_down(PointerKind::Mouse, 0.0);
    v.pointer_up();
    assert!(v.ever_interacted());
    assert!(!v.drag_hint_visible());

    // a new render arrives; the latch must not reset
    let ticket = v.request_render(input_with("cpu-b")).unwrap().unwrap();
    assert!(v.commit_ready(ticket, standard_asset(9)));
    assert!(v.ever_interacted());
    assert!(!v.drag_hint_visible());

    // and idle animation stays off for good
    let t0 = Instant::now();
    v.tick(t0).unwrap();
    v.tick(t0 + Duration::from_millis(250)).unwrap();
    assert_eq!(center_pixel(&v), color_for(0, 9));
}

#[test]
fn non_interactive_viewers_ignore_input_and_idle_forever() {
    let config = ViewerConfig {
        interactive: false,
        animation: AnimationMode::Spin,
        ..ViewerConfig::default()
    };
    let mut v = Viewer::new(ViewBox::new(64.0, 64.0, 1.0).unwrap(), config).unwrap();
    let ticket = v.request_render(input_with("cpu-a")).unwrap().unwrap();
    assert!(v.commit_ready(ticket, standard_asset(7)));

    v.pointer_down(PointerKind::Mouse, 0.0);
    assert!(!v.is_dragging());
    v.wheel(-500.0, WheelDeltaUnit::Pixel).unwrap();
    assert_eq!(v.zoom(), 1.0);
    assert!(!v.ever_interacted());
    assert!(!v.drag_hint_visible());

    let t0 = Instant::now();
    v.tick(t0).unwrap();
    v.tick(t0 + Duration::from_millis(5000)).unwrap();
    assert_eq!(v.current_frame(), Some(36));
}

#[test]
fn wheel_zoom_grows_the_drawn_frame() {
    // wide view box so the square frame letterboxes horizontally
    let mut v = Viewer::new(
        ViewBox::new(128.0, 64.0, 1.0).unwrap(),
        ViewerConfig::default(),
    )
    .unwrap();
    let ticket = v.request_render(input_with("cpu-a")).unwrap().unwrap();
    assert!(v.commit_ready(ticket, standard_asset(7)));

    // margin pixel left of the contain-fit frame
    assert_eq!(v.surface().pixel(2, 32).unwrap(), [0, 0, 0, 0]);

    v.wheel(-2000.0, WheelDeltaUnit::Pixel).unwrap();
    assert_eq!(v.zoom(), 4.0); // clamped at the default max
    assert_eq!(v.surface().pixel(2, 32).unwrap(), color_for(0, 7));
}

#[test]
fn pixel_ratio_scales_the_backing_store() {
    let v = Viewer::new(ViewBox::new(64.0, 64.0, 2.0).unwrap(), ViewerConfig::default()).unwrap();
    assert_eq!((v.surface().width, v.surface().height), (128, 128));
}

#[test]
fn sheet_and_pixels_swap_as_one_unit() {
    let mut v = ready_viewer(AnimationMode::Bounce);
    v.pointer_down(PointerKind::Mouse, 0.0);
    v.pointer_move(500.0).unwrap();
    v.pointer_up();
    assert_eq!(v.current_frame(), Some(50));

    // new render with different geometry and tint
    let ticket = v.request_render(input_with("cpu-b")).unwrap().unwrap();
    assert!(v.commit_ready(ticket, sheet_asset(12, 12, 144, 2, 99)));

    // fresh asset starts at its first frame, cut with its own geometry
    assert_eq!(v.current_frame(), Some(0));
    assert_eq!(center_pixel(&v), color_for(0, 99));
}

#[test]
fn superseded_assets_are_released_exactly_once() {
    let mut v = viewer(AnimationMode::Bounce);
    let ticket = v.request_render(input_with("cpu-a")).unwrap().unwrap();

    let asset_a = standard_asset(7);
    let pixels = Arc::clone(&asset_a.image.rgba8_premul);
    assert!(v.commit_ready(ticket, asset_a));
    assert_eq!(Arc::strong_count(&pixels), 2);

    // requesting a different render unpublishes and releases the old asset
    let ticket = v.request_render(input_with("cpu-b")).unwrap().unwrap();
    assert_eq!(Arc::strong_count(&pixels), 1);
    assert!(v.commit_ready(ticket, standard_asset(9)));
    assert_eq!(Arc::strong_count(&pixels), 1);

    // a stale commit releases the unwanted asset instead of leaking it
    let late = v.request_render(input_with("cpu-c")).unwrap().unwrap();
    let newer = v.request_render(input_with("cpu-d")).unwrap().unwrap();
    let asset_late = standard_asset(11);
    let late_pixels = Arc::clone(&asset_late.image.rgba8_premul);
    assert!(v.commit_ready(newer, standard_asset(13)));
    assert!(!v.commit_ready(late, asset_late));
    assert_eq!(Arc::strong_count(&late_pixels), 1);
}

#[test]
fn input_is_inert_while_loading() {
    let mut v = viewer(AnimationMode::Bounce);
    v.request_render(input_with("cpu-a")).unwrap().unwrap();
    assert_eq!(*v.phase(), ViewerPhase::Loading);

    v.pointer_down(PointerKind::Mouse, 0.0);
    assert!(!v.is_dragging());
    v.wheel(-100.0, WheelDeltaUnit::Pixel).unwrap();
    assert_eq!(v.zoom(), 1.0);
    assert!(!v.ever_interacted());
}
