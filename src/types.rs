//! Shared types and enums used across garmentprep.
//! Includes the garment `Role`, the `ProcessedResult` description handed to
//! storage, and `SegmentationSource` which records the tier that produced a cutout.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which view of the garment an image shows. Only used for naming and
/// deduplication, never for pixel computation.
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Front,
    Back,
    Side,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Front => "front",
            Role::Back => "back",
            Role::Side => "side",
        }
    }

    /// Deterministic output filename for this role.
    pub fn output_filename(&self) -> String {
        format!("{}.png", self.as_str())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationSource {
    /// Cutout returned by the remote background-removal service.
    Remote,
    /// Cutout produced by the local GrabCut segmentation.
    Local,
    /// Local segmentation failed; every pixel was kept as foreground.
    Passthrough,
}

impl std::fmt::Display for SegmentationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentationSource::Remote => write!(f, "Remote"),
            SegmentationSource::Local => write!(f, "Local"),
            SegmentationSource::Passthrough => write!(f, "Passthrough"),
        }
    }
}

/// Description of one normalized image as handed to the storage collaborator.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ProcessedResult {
    pub role: Role,
    pub filename: String,
    pub width: u32,
    pub height: u32,
}
