use std::sync::Arc;

use crate::client::RenderClient;
use crate::core::SpriteSheet;
use crate::error::{SpinrigError, SpinrigResult};
use crate::request::{RenderFormat, RenderInput};

/// Decoded sprite-sheet pixels, premultiplied RGBA8, row-major.
#[derive(Clone, Debug)]
pub struct SpriteImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// A decoded sprite and the geometry to cut it by, published as one value so
/// consumers can never observe fresh pixels against stale geometry.
#[derive(Clone, Debug)]
pub struct SpriteAsset {
    pub image: SpriteImage,
    pub sheet: SpriteSheet,
}

/// Decodes sprite-sheet bytes into premultiplied RGBA8.
pub fn decode_sprite(bytes: &[u8]) -> SpinrigResult<SpriteImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| SpinrigError::decode(format!("sprite sheet: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(SpriteImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Sheet geometry for a request. The service reports none of its own today,
/// so it follows from the requested frame quality.
pub fn sheet_for(input: &RenderInput) -> SpriteSheet {
    input.frame_quality().sheet()
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Identity of one load attempt, handed out by [`AssetSlot::begin`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Outcome of offering an asset to the slot.
#[derive(Debug)]
pub enum Commit {
    /// The asset is live. The previously published one, if any, is handed
    /// back; dropping it is the caller's single release of that asset.
    Published(Option<Arc<SpriteAsset>>),
    /// The ticket was superseded by a newer `begin`. The slot is unchanged
    /// and the offered asset comes back untouched, never shown.
    Stale(Arc<SpriteAsset>),
}

/// Single-slot holder for the live sprite with last-request-wins publishing.
///
/// Every `begin` advances the generation; only a commit carrying the current
/// generation lands. Completions of superseded loads fall through without
/// touching the slot, however late they arrive.
#[derive(Debug, Default)]
pub struct AssetSlot {
    generation: u64,
    current: Option<Arc<SpriteAsset>>,
}

impl AssetSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new load, invalidating every ticket issued before.
    pub fn begin(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket(self.generation)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.generation
    }

    pub fn commit(&mut self, ticket: LoadTicket, asset: Arc<SpriteAsset>) -> Commit {
        if !self.is_current(ticket) {
            tracing::debug!(
                ticket = ticket.0,
                current = self.generation,
                "dropping stale sprite load"
            );
            return Commit::Stale(asset);
        }
        Commit::Published(self.current.replace(asset))
    }

    pub fn current(&self) -> Option<&Arc<SpriteAsset>> {
        self.current.as_ref()
    }

    /// Unpublishes the live asset, handing its release to the caller.
    pub fn take(&mut self) -> Option<Arc<SpriteAsset>> {
        self.current.take()
    }
}

/// Fetches and decodes the sprite for `input` in one call: render through
/// the configured protocol, pull the artifact bytes, decode, attach the
/// sheet geometry.
#[tracing::instrument(skip(client, input))]
pub async fn load_render(
    client: &RenderClient,
    input: &RenderInput,
) -> SpinrigResult<SpriteAsset> {
    if input.format != RenderFormat::Sprite {
        return Err(SpinrigError::request(
            "sprite loading requires the sprite render format",
        ));
    }
    let bytes = client.render_bytes(input).await?;
    let image = decode_sprite(&bytes)?;
    let asset = SpriteAsset {
        image,
        sheet: sheet_for(input),
    };
    tracing::debug!(
        width = asset.image.width,
        height = asset.image.height,
        frames = asset.sheet.total_frames,
        "sprite ready"
    );
    Ok(asset)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::request::FrameQuality;

    fn tiny_asset() -> Arc<SpriteAsset> {
        Arc::new(SpriteAsset {
            image: SpriteImage {
                width: 1,
                height: 1,
                rgba8_premul: Arc::new(vec![0, 0, 0, 0]),
            },
            sheet: FrameQuality::Standard.sheet(),
        })
    }

    #[test]
    fn decode_sprite_premultiplies() {
        let src_rgba = vec![100u8, 50, 200, 128, 10, 20, 30, 255];
        let img = image::RgbaImage::from_raw(2, 1, src_rgba).unwrap();

        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let sprite = decode_sprite(&buf).unwrap();
        assert_eq!((sprite.width, sprite.height), (2, 1));
        assert_eq!(
            sprite.rgba8_premul.as_slice(),
            &[
                ((100u16 * 128 + 127) / 255) as u8,
                ((50u16 * 128 + 127) / 255) as u8,
                ((200u16 * 128 + 127) / 255) as u8,
                128,
                10,
                20,
                30,
                255
            ]
        );
    }

    #[test]
    fn decode_sprite_rejects_garbage() {
        let err = decode_sprite(b"not an image").unwrap_err();
        assert!(err.to_string().contains("decode error"));
    }

    #[test]
    fn slot_is_last_request_wins() {
        let mut slot = AssetSlot::new();
        let first = slot.begin();
        let second = slot.begin();

        // the older load finishes late and must not land
        assert!(matches!(slot.commit(first, tiny_asset()), Commit::Stale(_)));
        assert!(slot.current().is_none());

        match slot.commit(second, tiny_asset()) {
            Commit::Published(superseded) => assert!(superseded.is_none()),
            Commit::Stale(_) => panic!("current ticket must publish"),
        }
        assert!(slot.current().is_some());
    }

    #[test]
    fn publish_hands_back_the_superseded_asset() {
        let mut slot = AssetSlot::new();
        let t1 = slot.begin();
        let a1 = tiny_asset();
        slot.commit(t1, Arc::clone(&a1));

        let t2 = slot.begin();
        match slot.commit(t2, tiny_asset()) {
            Commit::Published(Some(old)) => assert!(Arc::ptr_eq(&old, &a1)),
            other => panic!("expected the superseded asset back, got {other:?}"),
        }

        assert!(slot.take().is_some());
        assert!(slot.current().is_none());
    }

    #[test]
    fn sheet_defaults_follow_frame_quality() {
        let mut input = RenderInput::from_share_code("abc").with_format(RenderFormat::Sprite);
        assert_eq!(sheet_for(&input).total_frames, 72);
        input.options.frame_quality = Some(FrameQuality::High);
        assert_eq!(sheet_for(&input).total_frames, 144);
    }
}
