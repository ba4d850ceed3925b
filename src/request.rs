use std::collections::{BTreeMap, BTreeSet};

use crate::core::SpriteSheet;
use crate::error::{SpinrigError, SpinrigResult};

/// Hardware slot in a build. Wire names follow the rendering service's
/// category strings exactly.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum PartCategory {
    #[serde(rename = "CPU")]
    Cpu,
    #[serde(rename = "GPU")]
    Gpu,
    #[serde(rename = "RAM")]
    Ram,
    Motherboard,
    #[serde(rename = "PSU")]
    Psu,
    Storage,
    #[serde(rename = "PCCase")]
    Case,
    #[serde(rename = "CPUCooler")]
    CpuCooler,
    CaseFan,
}

impl PartCategory {
    pub const ALL: [PartCategory; 9] = [
        Self::Cpu,
        Self::Gpu,
        Self::Ram,
        Self::Motherboard,
        Self::Psu,
        Self::Storage,
        Self::Case,
        Self::CpuCooler,
        Self::CaseFan,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Gpu => "GPU",
            Self::Ram => "RAM",
            Self::Motherboard => "Motherboard",
            Self::Psu => "PSU",
            Self::Storage => "Storage",
            Self::Case => "PCCase",
            Self::CpuCooler => "CPUCooler",
            Self::CaseFan => "CaseFan",
        }
    }

    pub fn from_wire(s: &str) -> SpinrigResult<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| SpinrigError::validation(format!("unknown part category '{s}'")))
    }
}

/// Selected part IDs per category. The service currently accepts at most one
/// ID per category, but the client forwards whatever it is given.
pub type PartsMap = BTreeMap<PartCategory, Vec<String>>;

/// Kind of artifact the service should produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// Orbiting turntable video.
    #[default]
    Video,
    /// Sprite sheet of discrete turntable frames.
    Sprite,
}

/// Scene look preset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderProfile {
    Cinematic,
    Flat,
    Fast,
}

/// Frame density of a sprite render. Decides the sheet geometry the client
/// assumes when the service does not report one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameQuality {
    #[default]
    Standard,
    High,
}

impl FrameQuality {
    pub fn total_frames(self) -> u32 {
        self.sheet().total_frames
    }

    pub fn sheet(self) -> SpriteSheet {
        match self {
            Self::Standard => SpriteSheet {
                cols: 12,
                rows: 6,
                total_frames: 72,
            },
            Self::High => SpriteSheet {
                cols: 12,
                rows: 12,
                total_frames: 144,
            },
        }
    }
}

/// Floor-grid styling overrides. Compared field by field when deciding
/// whether a request needs a re-render.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_thickness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_thickness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fade_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_order: Option<i32>,
}

/// Optional composition and quality knobs. Unset fields are omitted from
/// request bodies, never sent as null.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    /// Output width in pixels. The service UI offers 256..=2000; the client
    /// does not enforce that range, only that width and height come together.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<RenderProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_grid: Option<bool>,
    /// Horizontal camera shift. The service UI offers -0.3..=0.3; not
    /// enforced here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_offset_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_zoom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_settings: Option<GridSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_quality: Option<FrameQuality>,
}

/// What to render: an explicit parts selection, or a saved build referenced
/// by its share code.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderSource {
    Parts(PartsMap),
    ShareCode(String),
}

/// Canonical normalized render request. Everything the crate sends to the
/// rendering service flows through this one shape.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderInput {
    pub source: RenderSource,
    pub format: RenderFormat,
    pub options: RenderOptions,
}

impl RenderInput {
    pub fn from_parts(parts: PartsMap) -> Self {
        Self {
            source: RenderSource::Parts(parts),
            format: RenderFormat::default(),
            options: RenderOptions::default(),
        }
    }

    pub fn from_share_code(code: impl Into<String>) -> Self {
        Self {
            source: RenderSource::ShareCode(code.into()),
            format: RenderFormat::default(),
            options: RenderOptions::default(),
        }
    }

    /// Resolves the parts-or-share-code choice at the boundary: a non-empty
    /// share code wins over parts, and offering neither is an error.
    pub fn normalize(
        parts: Option<PartsMap>,
        share_code: Option<String>,
    ) -> SpinrigResult<Self> {
        let share_code = share_code.filter(|c| !c.trim().is_empty());
        let input = match (parts, share_code) {
            (_, Some(code)) => Self::from_share_code(code),
            (Some(parts), None) => Self::from_parts(parts),
            (None, None) => {
                return Err(SpinrigError::request(
                    "either parts or a share code is required",
                ));
            }
        };
        input.validate()?;
        Ok(input)
    }

    pub fn with_format(mut self, format: RenderFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validate(&self) -> SpinrigResult<()> {
        if let RenderSource::ShareCode(code) = &self.source
            && code.trim().is_empty()
        {
            return Err(SpinrigError::request("share code must not be empty"));
        }
        if self.options.width.is_some() != self.options.height.is_some() {
            return Err(SpinrigError::request(
                "width and height must be set together",
            ));
        }
        Ok(())
    }

    /// Frame quality this request resolves to, defaulting when unset.
    pub fn frame_quality(&self) -> FrameQuality {
        self.options.frame_quality.unwrap_or_default()
    }

    /// Value-based change detection: two inputs are equivalent when a
    /// re-render of one would produce the other. Part IDs compare as
    /// per-category sets (order and duplicates ignored, an absent category
    /// equals an empty one); everything else compares by value. Inputs of
    /// different source kinds are never equivalent.
    pub fn equivalent(&self, other: &Self) -> bool {
        if self.format != other.format || self.options != other.options {
            return false;
        }
        match (&self.source, &other.source) {
            (RenderSource::ShareCode(a), RenderSource::ShareCode(b)) => a == b,
            (RenderSource::Parts(a), RenderSource::Parts(b)) => parts_equivalent(a, b),
            _ => false,
        }
    }

    /// Body for the service's render endpoints.
    pub fn body(&self) -> RenderBody<'_> {
        let (parts, share_code) = match &self.source {
            RenderSource::Parts(p) => (Some(p), None),
            RenderSource::ShareCode(c) => (None, Some(c.as_str())),
        };
        RenderBody {
            parts,
            share_code,
            format: self.format,
            options: &self.options,
        }
    }
}

fn parts_equivalent(a: &PartsMap, b: &PartsMap) -> bool {
    fn ids<'m>(m: &'m PartsMap, cat: &PartCategory) -> BTreeSet<&'m str> {
        m.get(cat)
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    a.keys().chain(b.keys()).all(|cat| ids(a, cat) == ids(b, cat))
}

/// Wire shape of a render request body, camelCase per the service contract.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts: Option<&'a PartsMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_code: Option<&'a str>,
    pub format: RenderFormat,
    #[serde(flatten)]
    pub options: &'a RenderOptions,
}
