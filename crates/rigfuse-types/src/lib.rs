use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One polar detection from a single rotating-LIDAR channel at one firing.
///
/// Angles are in degrees; `distance` is in the capture source's native units
/// (the rig's scene units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaserReturn {
    pub distance: f64,
    /// Horizontal angle in `[0, 360)`.
    pub azimuth: f64,
    /// Elevation angle of the channel.
    pub vertical: f64,
}

impl LaserReturn {
    pub fn new(distance: f64, azimuth: f64, vertical: f64) -> Self {
        Self {
            distance,
            azimuth,
            vertical,
        }
    }
}

/// A Cartesian point in some named frame (LIDAR-local, radar-local, fused).
///
/// A sensor non-return is encoded as [`Point3D::NON_RETURN`]: all three
/// components are NaN so renderers and geometric predicates skip it while the
/// buffer keeps its length.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    /// The non-return sentinel.
    pub const NON_RETURN: Self = Self {
        x: f32::NAN,
        y: f32::NAN,
        z: f32::NAN,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// True when every component is finite, i.e. the point is not the
    /// non-return sentinel.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Ordered points of one frame, one entry per firing/detection in arrival
/// order.
pub type FrameBuffer = Vec<Point3D>;

// ────────────────────────────────────────────────────────────────────────────
// Rig geometry
// ────────────────────────────────────────────────────────────────────────────

/// A LIDAR-frame axis with a direction, written `"+x"`, `"-y"`, ... in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignedAxis {
    #[serde(rename = "+x")]
    PosX,
    #[serde(rename = "-x")]
    NegX,
    #[serde(rename = "+y")]
    PosY,
    #[serde(rename = "-y")]
    NegY,
    #[serde(rename = "+z")]
    PosZ,
    #[serde(rename = "-z")]
    NegZ,
}

impl SignedAxis {
    /// Unit vector of this axis scaled by `magnitude`.
    pub fn scaled(self, magnitude: f32) -> Point3D {
        match self {
            SignedAxis::PosX => Point3D::new(magnitude, 0.0, 0.0),
            SignedAxis::NegX => Point3D::new(-magnitude, 0.0, 0.0),
            SignedAxis::PosY => Point3D::new(0.0, magnitude, 0.0),
            SignedAxis::NegY => Point3D::new(0.0, -magnitude, 0.0),
            SignedAxis::PosZ => Point3D::new(0.0, 0.0, magnitude),
            SignedAxis::NegZ => Point3D::new(0.0, 0.0, -magnitude),
        }
    }
}

/// How the rig's `up` / `right` / `back` directions map onto LIDAR axes.
///
/// The mapping is rig-specific; the default assumes +z up, +x right and +y
/// forward (azimuth 0), so "back" is -y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountAxes {
    pub up: SignedAxis,
    pub right: SignedAxis,
    pub back: SignedAxis,
}

impl Default for MountAxes {
    fn default() -> Self {
        Self {
            up: SignedAxis::PosZ,
            right: SignedAxis::PosX,
            back: SignedAxis::NegY,
        }
    }
}

/// Fixed physical displacement of the radar from the LIDAR origin, in scene
/// units. Constant for a rig; never mutated during a run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MountOffset {
    #[serde(default)]
    pub up: f32,
    #[serde(default)]
    pub right: f32,
    #[serde(default)]
    pub back: f32,
}

impl MountOffset {
    pub fn new(up: f32, right: f32, back: f32) -> Self {
        Self { up, right, back }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scene
// ────────────────────────────────────────────────────────────────────────────

/// An 8-bit RGB display colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const RASPBERRY: Self = Self::new(227, 11, 92);
    pub const BLUE: Self = Self::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Display category of a cloud within a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudTag {
    /// Raw LIDAR frame.
    Lidar,
    /// Radar snapshot re-expressed in the LIDAR frame.
    RadarAligned,
    /// LIDAR points inside the radar's detection envelope.
    RadarGated,
}

impl CloudTag {
    /// Colour the viewer draws this category with.
    pub fn color(self) -> Rgb {
        match self {
            CloudTag::Lidar => Rgb::WHITE,
            CloudTag::RadarAligned => Rgb::RASPBERRY,
            CloudTag::RadarGated => Rgb::BLUE,
        }
    }
}

/// One colour-tagged point buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedCloud {
    pub tag: CloudTag,
    pub color: Rgb,
    pub points: FrameBuffer,
}

/// The complete set of tagged clouds handed to the display for one redraw.
///
/// Built fresh every frame; a new scene replaces the previous one outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub frame_id: u64,
    pub captured_at: DateTime<Utc>,
    pub clouds: Vec<TaggedCloud>,
}

impl Scene {
    /// Start an empty scene stamped with the current time.
    pub fn new(frame_id: u64) -> Self {
        Self {
            frame_id,
            captured_at: Utc::now(),
            clouds: Vec::with_capacity(3),
        }
    }

    /// Append a cloud, coloured by its tag.
    pub fn push(&mut self, tag: CloudTag, points: FrameBuffer) {
        self.clouds.push(TaggedCloud {
            tag,
            color: tag.color(),
            points,
        });
    }

    /// First cloud carrying `tag`, if any.
    pub fn cloud(&self, tag: CloudTag) -> Option<&TaggedCloud> {
        self.clouds.iter().find(|c| c.tag == tag)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Error type shared by every rigfuse crate.
#[derive(Error, Debug)]
pub enum RigError {
    #[error("Capture Unavailable ({source_id}): {details}")]
    CaptureUnavailable { source_id: String, details: String },

    #[error("Radar Fault: {details}")]
    RadarFault { details: String },

    #[error("Display Error: {details}")]
    Display { details: String },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Decode Error: {0}")]
    Decode(String),

    #[error("Invalid State: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
}
