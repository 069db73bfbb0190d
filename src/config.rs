use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, ensure};
use config::{Config, File, FileFormat};
use glam::{Quat, UVec2, Vec3};
use log::error;
use serde::{Deserialize, Serialize};

use crate::config_io::{CONFIG_ROOT_PATH, get_conf_d_path};

const DEFAULT_CONFIG: &str = include_str!("res/config.yaml");

fn def_name() -> Arc<str> {
    "panel".into()
}

const fn def_panel_width() -> u32 {
    1280
}

const fn def_panel_height() -> u32 {
    720
}

const fn def_one() -> f32 {
    1.0
}

const fn def_pixels_per_unit() -> f32 {
    1280.0
}

const fn def_true() -> bool {
    true
}

const fn def_false() -> bool {
    false
}

const fn def_position() -> Vec3 {
    Vec3::new(0.0, 0.0, -2.0)
}

const fn def_rotation() -> Quat {
    Quat::IDENTITY
}

const fn def_viewport() -> UVec2 {
    UVec2::new(1920, 1080)
}

const fn def_camera_fov() -> f32 {
    60.0
}

const fn def_controller_pointer_id() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PanelConfig {
    #[serde(default = "def_name")]
    pub name: Arc<str>,

    /// Panel width in pixels; the render target gets the same width.
    #[serde(default = "def_panel_width")]
    pub panel_width: u32,

    #[serde(default = "def_panel_height")]
    pub panel_height: u32,

    /// Zoom of the panel contents.
    #[serde(default = "def_one")]
    pub panel_scale: f32,

    /// Panel pixels per world unit; sets the size of the quad in the world.
    #[serde(default = "def_pixels_per_unit")]
    pub pixels_per_unit: f32,

    #[serde(default = "def_false")]
    pub use_drag_event_fix: bool,

    #[serde(default = "def_true")]
    pub use_mouse: bool,

    #[serde(default = "def_position")]
    pub position: Vec3,

    #[serde(default = "def_rotation")]
    pub rotation: Quat,

    #[serde(default = "def_viewport")]
    pub viewport: UVec2,

    /// Vertical field of view of the event camera, degrees.
    #[serde(default = "def_camera_fov")]
    pub camera_fov: f32,

    #[serde(default = "def_controller_pointer_id")]
    pub controller_pointer_id: i32,

    #[serde(default = "def_true")]
    pub synthesize_movement: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            name: def_name(),
            panel_width: def_panel_width(),
            panel_height: def_panel_height(),
            panel_scale: def_one(),
            pixels_per_unit: def_pixels_per_unit(),
            use_drag_event_fix: def_false(),
            use_mouse: def_true(),
            position: def_position(),
            rotation: def_rotation(),
            viewport: def_viewport(),
            camera_fov: def_camera_fov(),
            controller_pointer_id: def_controller_pointer_id(),
            synthesize_movement: def_true(),
        }
    }
}

impl PanelConfig {
    fn sanitize_range(name: &str, val: f32, from: f32, to: f32) -> anyhow::Result<()> {
        ensure!(
            val.is_normal() && val >= from && val <= to,
            "PanelConfig: {name} needs to be between {from} and {to}, got {val}"
        );
        Ok(())
    }

    pub fn load_from_disk() -> anyhow::Result<Self> {
        let config = load_general()?;
        config.post_load()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.post_load()?;
        Ok(config)
    }

    fn post_load(&self) -> anyhow::Result<()> {
        ensure!(
            self.panel_width > 0 && self.panel_height > 0,
            "PanelConfig: panel size must not be zero, got {}x{}",
            self.panel_width,
            self.panel_height
        );
        ensure!(
            self.viewport.x > 0 && self.viewport.y > 0,
            "PanelConfig: viewport must not be zero"
        );
        Self::sanitize_range("panel_scale", self.panel_scale, 0.05, 20.0)?;
        Self::sanitize_range("pixels_per_unit", self.pixels_per_unit, 1.0, 100_000.0)?;
        Self::sanitize_range("camera_fov", self.camera_fov, 1.0, 179.0)?;
        Ok(())
    }

    pub const fn panel_size(&self) -> UVec2 {
        UVec2::new(self.panel_width, self.panel_height)
    }
}

fn add_file_source(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    path: &Path,
) -> config::ConfigBuilder<config::builder::DefaultState> {
    log::info!("Loading config file: {}", path.to_string_lossy());
    builder.add_source(File::from(path).format(FileFormat::Yaml))
}

pub fn load_general() -> anyhow::Result<PanelConfig> {
    let mut settings_builder =
        Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Yaml));

    let path_conf_d = get_conf_d_path();

    let base_conf = CONFIG_ROOT_PATH.join("config.yaml");
    if base_conf.exists() {
        settings_builder = add_file_source(settings_builder, &base_conf);
    }

    if let Ok(paths_unsorted) = std::fs::read_dir(&path_conf_d) {
        let mut paths: Vec<_> = paths_unsorted
            .filter_map(|r| match r {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    error!("Failed to read conf.d directory: {e}");
                    None
                }
            })
            .filter(|p| p.extension().is_some_and(|ext| ext == "yaml" || ext == "yml"))
            .collect();
        // Sort paths alphabetically
        paths.sort();
        for path in paths {
            settings_builder = add_file_source(settings_builder, &path);
        }
    }

    let settings = settings_builder
        .build()
        .context("Failed to build settings")?;

    settings
        .try_deserialize::<PanelConfig>()
        .context("Failed to deserialize settings")
}
