use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[derive(Default)]
pub struct Config {
    pub detector: DetectorConfig,
    pub matcher: MatcherConfig,
    pub ransac: RansacConfig,
    pub diff: DiffConfig,
}

/// Pyramid FAST/oriented-descriptor detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub max_features: usize,
    pub fast_threshold: u8,
    pub pyramid_levels: u8,
    pub scale_factor: f32,
    /// Keypoints closer than this to a level border are discarded so the
    /// descriptor pattern stays inside the image.
    pub edge_threshold: u32,
    pub nms_radius: f32,
    /// Sigma of the smoothing pass applied before descriptor sampling.
    pub descriptor_sigma: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Upper bound on the number of lowest-distance matches fed to the
    /// homography estimator.
    pub max_good_matches: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RansacConfig {
    pub max_iterations: usize,
    /// Reprojection error (pixels) below which a correspondence counts as an
    /// inlier.
    pub inlier_threshold: f64,
    pub min_inliers: usize,
    pub early_exit_ratio: f64,
    /// Seed for the sampling RNG; a fixed seed makes estimation repeatable.
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Side length of the Gaussian smoothing kernel, must be odd.
    pub blur_kernel: u32,
    /// Luminance difference (of 255) above which a pixel counts as changed.
    pub threshold: u8,
    /// Side length of the dilation structuring element, must be odd.
    pub dilate_kernel: u32,
    pub dilate_iterations: u32,
    /// Contours with polygon area at or below this are treated as noise.
    pub min_region_area: f64,
    /// RGB color of the boxes drawn around changed regions.
    pub highlight: [u8; 3],
    pub stroke_width: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_features: 2000,
            fast_threshold: 20,
            pyramid_levels: 8,
            scale_factor: 1.2,
            edge_threshold: 31,
            nms_radius: 5.0,
            descriptor_sigma: 2.0,
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_good_matches: 50,
        }
    }
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            inlier_threshold: 5.0,
            min_inliers: 4,
            early_exit_ratio: 0.95,
            seed: 42,
        }
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 5,
            threshold: 30,
            dilate_kernel: 5,
            dilate_iterations: 2,
            min_region_area: 100.0,
            highlight: [255, 0, 0],
            stroke_width: 2,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;

        if content.trim_start().starts_with('{') {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(
        &self,
        path: P,
        format: ConfigFormat,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.detector.max_features == 0 {
            errors.push("detector max_features must be positive".to_string());
        }

        if self.detector.scale_factor <= 1.0 {
            errors.push("detector scale_factor must be greater than 1.0".to_string());
        }

        if self.detector.pyramid_levels == 0 {
            errors.push("detector pyramid_levels must be at least 1".to_string());
        }

        if self.matcher.max_good_matches < 4 {
            errors.push("matcher max_good_matches must be at least 4".to_string());
        }

        if self.ransac.max_iterations == 0 {
            errors.push("ransac max_iterations must be positive".to_string());
        }

        if self.ransac.inlier_threshold <= 0.0 {
            errors.push("ransac inlier_threshold must be positive".to_string());
        }

        if self.ransac.min_inliers < 4 {
            errors.push("ransac min_inliers must be at least 4".to_string());
        }

        if self.diff.blur_kernel % 2 == 0 {
            errors.push("diff blur_kernel must be odd".to_string());
        }

        if self.diff.dilate_kernel % 2 == 0 || self.diff.dilate_kernel < 3 {
            errors.push("diff dilate_kernel must be odd and at least 3".to_string());
        }

        if self.diff.min_region_area < 0.0 {
            errors.push("diff min_region_area must be non-negative".to_string());
        }

        if self.diff.stroke_width == 0 {
            errors.push("diff stroke_width must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConfigFormat {
    Json,
    Toml,
}

pub fn load_config_or_default(config_path: Option<&Path>) -> Config {
    match config_path {
        Some(path) => match Config::load_from_file(path) {
            Ok(config) => {
                if let Err(errors) = config.validate() {
                    eprintln!("Configuration validation errors:");
                    for error in errors {
                        eprintln!("  - {}", error);
                    }
                    eprintln!("Using default configuration instead.");
                    Config::default()
                } else {
                    config
                }
            }
            Err(e) => {
                eprintln!("Failed to load config from '{}': {}", path.display(), e);
                eprintln!("Using default configuration.");
                Config::default()
            }
        },
        None => Config::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_pipeline_constants() {
        let config = Config::default();
        assert_eq!(config.detector.max_features, 2000);
        assert_eq!(config.matcher.max_good_matches, 50);
        assert_eq!(config.ransac.inlier_threshold, 5.0);
        assert_eq!(config.diff.threshold, 30);
        assert_eq!(config.diff.blur_kernel, 5);
        assert_eq!(config.diff.dilate_iterations, 2);
        assert_eq!(config.diff.min_region_area, 100.0);
    }

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validation_collects_every_error() {
        let mut config = Config::default();
        config.detector.max_features = 0;
        config.diff.blur_kernel = 4;
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.diff.threshold = 45;
        config.save_to_file(&path, ConfigFormat::Toml).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.diff.threshold, 45);
        assert_eq!(loaded.detector.max_features, 2000);
    }

    #[test]
    fn json_content_is_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        Config::default()
            .save_to_file(&path, ConfigFormat::Json)
            .unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.matcher.max_good_matches, 50);
    }
}
