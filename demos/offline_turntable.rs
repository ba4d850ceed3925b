use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use spinrig::{
    AnimationMode, PartCategory, PartsMap, PointerKind, RenderFormat, RenderInput, SpriteAsset,
    SpriteImage, SpriteSheet, ViewBox, Viewer, ViewerConfig, WheelDeltaUnit,
};

/// Sprite sheet built in memory: each frame shows a light bar that sweeps
/// across the cell over the rotation, so scrubbing reads as motion.
fn synthetic_sheet(sheet: SpriteSheet, cell: u32) -> SpriteImage {
    let width = sheet.cols * cell;
    let height = sheet.rows * cell;
    let mut data = vec![0u8; (width * height * 4) as usize];
    for frame in 0..sheet.total_frames {
        let col = frame % sheet.cols;
        let row = frame / sheet.cols;
        let bar = ((f64::from(frame) / f64::from(sheet.total_frames)) * f64::from(cell)) as u32;
        for y in 0..cell {
            for x in 0..cell {
                let px = ((row * cell + y) * width + col * cell + x) as usize * 4;
                let c: [u8; 4] = if x.abs_diff(bar) <= 1 {
                    [235, 235, 235, 255]
                } else {
                    [24, 26, 34, 255]
                };
                data[px..px + 4].copy_from_slice(&c);
            }
        }
    }
    SpriteImage {
        width,
        height,
        rgba8_premul: Arc::new(data),
    }
}

fn save(viewer: &Viewer, path: &str) -> anyhow::Result<()> {
    let surface = viewer.surface();
    image::save_buffer_with_format(
        path,
        &surface.to_straight_rgba8(),
        surface.width,
        surface.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )?;
    println!("wrote {path}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let sheet = SpriteSheet::new(12, 6, 72)?;
    let asset = SpriteAsset {
        image: synthetic_sheet(sheet, 32),
        sheet,
    };

    let config = ViewerConfig {
        animation: AnimationMode::Spin,
        spin_duration: Duration::from_secs(6),
        ..ViewerConfig::default()
    };
    let mut viewer = Viewer::new(ViewBox::new(480.0, 480.0, 1.0)?, config)?;

    let mut parts = PartsMap::new();
    parts.insert(PartCategory::Cpu, vec!["demo-cpu".into()]);
    let input = RenderInput::from_parts(parts).with_format(RenderFormat::Sprite);
    let ticket = viewer
        .request_render(input)?
        .context("first request always issues a ticket")?;
    viewer.commit_ready(ticket, asset);

    std::fs::create_dir_all("out")?;
    save(&viewer, "out/turntable_start.png")?;

    // idle spin advances the rotation on its own
    let t0 = Instant::now();
    viewer.tick(t0)?;
    viewer.tick(t0 + Duration::from_millis(1500))?;
    save(&viewer, "out/turntable_spin.png")?;

    // the first drag takes over for good: 360 px at mouse sensitivity is 36 frames
    viewer.pointer_down(PointerKind::Mouse, 0.0);
    viewer.pointer_move(360.0)?;
    viewer.pointer_up();
    save(&viewer, "out/turntable_drag.png")?;

    // wheel up zooms in, clamped to the configured bounds
    viewer.wheel(-600.0, WheelDeltaUnit::Pixel)?;
    save(&viewer, "out/turntable_zoom.png")?;

    println!(
        "frame {:?}, zoom {:.2}, interacted {}",
        viewer.current_frame(),
        viewer.zoom(),
        viewer.ever_interacted()
    );
    Ok(())
}
