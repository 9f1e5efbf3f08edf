// ============================================================================
// SETTINGS — editor defaults persisted as a key=value file
// ============================================================================

use std::path::{Path, PathBuf};

use crate::io::{DEFAULT_EXPORT_NAME, DEFAULT_JPEG_QUALITY};
use crate::ops::text::parse_css_color;
use crate::ops::transform::{Interpolation, ResizeBounds};

const SETTINGS_FILE: &str = "pixelfe_settings.cfg";

/// Editor settings that persist across sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    /// JPEG export quality, 1..=100.
    pub jpeg_quality: u8,
    /// Bounds applied to every resize request.
    pub resize_bounds: ResizeBounds,
    pub interpolation: Interpolation,
    /// Default text overlay font family (CSS generic names allowed).
    pub font_family: String,
    /// Default text size in CSS pixels.
    pub font_size: f32,
    pub text_color: [u8; 4],
    pub histogram_width: u32,
    pub histogram_height: u32,
    /// File name of the exported artifact.
    pub export_name: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            resize_bounds: ResizeBounds::default(),
            interpolation: Interpolation::Bilinear,
            font_family: "sans-serif".to_string(),
            font_size: 24.0,
            text_color: [0, 0, 0, 255],
            histogram_width: 256,
            histogram_height: 100,
            export_name: DEFAULT_EXPORT_NAME.to_string(),
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/pixelfe/pixelfe_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PixelFE\pixelfe_settings.cfg
    /// On macOS:   ~/Library/Application Support/PixelFE/pixelfe_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("PixelFE").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("PixelFE")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("pixelfe").join(SETTINGS_FILE))
        }
    }

    /// Load settings from the default location (defaults if missing or unreadable).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load settings from `path` (defaults if missing or unreadable).
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parse `key=value` lines. Unknown keys, comments and malformed values
    /// are skipped, leaving the default in place.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        let mut bounds = s.resize_bounds;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "jpeg_quality" => {
                    if let Ok(q) = val.parse::<u8>()
                        && (1..=100).contains(&q)
                    {
                        s.jpeg_quality = q;
                    }
                }
                "resize_min_width"  => if let Ok(v) = val.parse() { bounds.min_width = v },
                "resize_max_width"  => if let Ok(v) = val.parse() { bounds.max_width = v },
                "resize_min_height" => if let Ok(v) = val.parse() { bounds.min_height = v },
                "resize_max_height" => if let Ok(v) = val.parse() { bounds.max_height = v },
                "interpolation" => {
                    if let Some(i) = Interpolation::from_key(val) {
                        s.interpolation = i;
                    }
                }
                "font_family" => {
                    if !val.is_empty() {
                        s.font_family = val.to_string();
                    }
                }
                "font_size" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v > 0.0
                    {
                        s.font_size = v;
                    }
                }
                "text_color" => {
                    if let Some(c) = parse_css_color(val) {
                        s.text_color = c;
                    }
                }
                "histogram_width"  => if let Ok(v @ 1..) = val.parse::<u32>() { s.histogram_width = v },
                "histogram_height" => if let Ok(v @ 1..) = val.parse::<u32>() { s.histogram_height = v },
                "export_name" => {
                    if !val.is_empty() {
                        s.export_name = val.to_string();
                    }
                }
                _ => {}
            }
        }
        // An inconsistent set of bounds falls back to the defaults as a whole.
        if let Ok(b) = ResizeBounds::new(bounds.min_width, bounds.max_width, bounds.min_height, bounds.max_height) {
            s.resize_bounds = b;
        }
        s
    }

    /// Serialize to the `key=value` format read by [`EditorSettings::parse`].
    pub fn to_config_string(&self) -> String {
        let [r, g, b, a] = self.text_color;
        format!(
            "jpeg_quality={}\n\
             resize_min_width={}\n\
             resize_max_width={}\n\
             resize_min_height={}\n\
             resize_max_height={}\n\
             interpolation={}\n\
             font_family={}\n\
             font_size={}\n\
             text_color=#{r:02x}{g:02x}{b:02x}{a:02x}\n\
             histogram_width={}\n\
             histogram_height={}\n\
             export_name={}\n",
            self.jpeg_quality,
            self.resize_bounds.min_width,
            self.resize_bounds.max_width,
            self.resize_bounds.min_height,
            self.resize_bounds.max_height,
            self.interpolation.key(),
            self.font_family,
            self.font_size,
            self.histogram_width,
            self.histogram_height,
            self.export_name,
        )
    }

    /// Save settings to `path`, creating its directory if needed.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Save settings to the default location.
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::settings_path()
            .ok_or_else(|| std::io::Error::other("no settings directory available"))?;
        self.save_to(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_export_constants() {
        let s = EditorSettings::default();
        assert_eq!(s.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert_eq!(s.export_name, DEFAULT_EXPORT_NAME);
    }

    #[test]
    fn parse_overrides_known_keys() {
        let s = EditorSettings::parse(
            "# editor defaults\n\
             jpeg_quality = 75\n\
             resize_max_width=4000\n\
             interpolation=nearest\n\
             font_family=DejaVu Serif\n\
             text_color=#ff0000\n\
             histogram_height=64\n\
             mystery=1\n",
        );
        assert_eq!(s.jpeg_quality, 75);
        assert_eq!(s.resize_bounds.max_width, 4000);
        assert_eq!(s.interpolation, Interpolation::Nearest);
        assert_eq!(s.font_family, "DejaVu Serif");
        assert_eq!(s.text_color, [255, 0, 0, 255]);
        assert_eq!(s.histogram_height, 64);
        assert_eq!(s.export_name, DEFAULT_EXPORT_NAME);
    }

    #[test]
    fn malformed_values_keep_defaults() {
        let s = EditorSettings::parse(
            "jpeg_quality=0\n\
             font_size=-3\n\
             histogram_width=0\n\
             resize_min_width=500\n\
             resize_max_width=100\n\
             no equals sign here\n",
        );
        assert_eq!(s, EditorSettings::default());
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let mut s = EditorSettings::default();
        s.jpeg_quality = 60;
        s.font_size = 18.5;
        s.text_color = [1, 2, 3, 200];
        s.resize_bounds = ResizeBounds::new(8, 640, 8, 480).unwrap();
        s.save_to(&path).unwrap();
        assert_eq!(EditorSettings::load_from(&path), s);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            EditorSettings::load_from(&dir.path().join("absent.cfg")),
            EditorSettings::default()
        );
    }
}
