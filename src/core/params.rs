use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Side length of every standardized output image.
pub const MAX_SIZE: u32 = 1024;

/// Transparent border added around the square canvas, as a fraction of its side.
pub const BORDER_RATIO: f64 = 0.02;

/// GrabCut refinement passes; kept low for latency.
pub const GRABCUT_ITERATIONS: usize = 2;

pub const REMOVE_BG_ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";

/// Remote background-removal settings. The credential is an explicit value:
/// nothing in the library reads it from the process environment.
#[derive(Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// API key for the remote service. Never serialized.
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    pub endpoint: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl SegmenterConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// True when a non-empty credential is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: REMOVE_BG_ENDPOINT.to_string(),
            timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for SegmenterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmenterConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Pipeline parameters suitable for config files and CLI overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    /// Output side length in pixels
    pub max_size: u32,
    /// Transparent border as a fraction of the square canvas side
    pub border_ratio: f64,
    pub grabcut_iterations: usize,
    /// Long side cap for the local segmentation working copy; None means full resolution
    pub segmentation_max_side: Option<u32>,
    /// Concurrent image-processing tasks in a batch
    pub workers: usize,
    pub remote: SegmenterConfig,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            max_size: MAX_SIZE,
            border_ratio: BORDER_RATIO,
            grabcut_iterations: GRABCUT_ITERATIONS,
            segmentation_max_side: Some(512),
            workers: 4,
            remote: SegmenterConfig::default(),
        }
    }
}

impl PipelineParams {
    /// Load parameters from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let params: PipelineParams = serde_json::from_str(&text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(Error::ZeroSize {
                size: self.max_size,
            });
        }
        if !(0.0..0.5).contains(&self.border_ratio) || !self.border_ratio.is_finite() {
            return Err(Error::InvalidArgument {
                arg: "border_ratio",
                value: self.border_ratio.to_string(),
            });
        }
        if self.grabcut_iterations == 0 {
            return Err(Error::InvalidArgument {
                arg: "grabcut_iterations",
                value: self.grabcut_iterations.to_string(),
            });
        }
        if let Some(side) = self.segmentation_max_side {
            if side < 3 {
                return Err(Error::InvalidArgument {
                    arg: "segmentation_max_side",
                    value: side.to_string(),
                });
            }
        }
        if !(1..=64).contains(&self.workers) {
            return Err(Error::InvalidArgument {
                arg: "workers",
                value: self.workers.to_string(),
            });
        }
        if self.remote.timeout_secs == 0 {
            return Err(Error::InvalidArgument {
                arg: "timeout_secs",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = PipelineParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.max_size, 1024);
        assert_eq!(params.grabcut_iterations, 2);
        assert_eq!(params.remote.timeout_secs, 60);
    }

    #[test]
    fn test_api_key_is_never_serialized() {
        let params = PipelineParams {
            remote: SegmenterConfig::with_api_key("secret"),
            ..PipelineParams::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains("secret"));
        assert!(!format!("{:?}", params).contains("secret"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"workers": 8, "max_size": 512}"#).unwrap();

        let params = PipelineParams::from_json_file(&path).unwrap();
        assert_eq!(params.workers, 8);
        assert_eq!(params.max_size, 512);
        assert_eq!(params.grabcut_iterations, 2);
        assert!(params.remote.api_key.is_none());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let params = PipelineParams {
            workers: 0,
            ..PipelineParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidArgument { arg: "workers", .. })
        ));
    }

    #[test]
    fn test_blank_key_is_not_a_credential() {
        assert!(!SegmenterConfig::with_api_key("   ").has_credential());
        assert!(SegmenterConfig::with_api_key("k").has_credential());
        assert!(!SegmenterConfig::default().has_credential());
    }
}
