use std::{
    fs,
    path::{Path, PathBuf},
};

use depth_store::DepthBufferScope;
use engine_client::depth::ClipPlanes;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_FILE: &str = "scene.toml";
pub const ENV_PREFIX: &str = "SCENE__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config file '{path}': {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub engine_url: String,
    pub output_root: PathBuf,
    pub render_quality: u8,
    pub room_width: u32,
    pub room_length: u32,
    pub depth_buffer_scope: DepthBufferScope,
    pub seed: Option<u64>,
    pub librarian_path: Option<PathBuf>,
    pub save_images: bool,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine_url: "ws://127.0.0.1:1071".into(),
            output_root: default_output_root(),
            render_quality: 0,
            room_width: 12,
            room_length: 12,
            depth_buffer_scope: DepthBufferScope::PerTrial,
            seed: None,
            librarian_path: None,
            save_images: true,
            near_plane: 0.1,
            far_plane: 100.0,
        }
    }
}

impl Settings {
    pub fn clip_planes(&self) -> ClipPlanes {
        ClipPlanes {
            near: self.near_plane,
            far: self.far_plane,
        }
    }

    pub fn scene_dir(&self, scene: &str) -> PathBuf {
        self.output_root.join(scene)
    }
}

/// `~/tdw_example_controller_output`, or a relative directory when there is no
/// home directory.
pub fn default_output_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tdw_example_controller_output")
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    engine_url: Option<String>,
    output_root: Option<PathBuf>,
    render_quality: Option<u8>,
    room_width: Option<u32>,
    room_length: Option<u32>,
    depth_buffer_scope: Option<DepthBufferScope>,
    seed: Option<u64>,
    librarian_path: Option<PathBuf>,
    save_images: Option<bool>,
    near_plane: Option<f32>,
    far_plane: Option<f32>,
}

/// Defaults, then `config_path` (or `scene.toml` in the working directory when
/// present), then `SCENE__*` environment variables.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    match config_path {
        Some(path) => apply_file(&mut settings, path)?,
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            if fallback.exists() {
                apply_file(&mut settings, fallback)?;
            }
        }
    }

    apply_env(&mut settings, std::env::vars());
    validate(&settings)?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, path: &Path) -> Result<(), ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: FileSettings = toml::from_str(&raw).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config file");

    if let Some(v) = file.engine_url {
        settings.engine_url = v;
    }
    if let Some(v) = file.output_root {
        settings.output_root = v;
    }
    if let Some(v) = file.render_quality {
        settings.render_quality = v;
    }
    if let Some(v) = file.room_width {
        settings.room_width = v;
    }
    if let Some(v) = file.room_length {
        settings.room_length = v;
    }
    if let Some(v) = file.depth_buffer_scope {
        settings.depth_buffer_scope = v;
    }
    if file.seed.is_some() {
        settings.seed = file.seed;
    }
    if file.librarian_path.is_some() {
        settings.librarian_path = file.librarian_path;
    }
    if let Some(v) = file.save_images {
        settings.save_images = v;
    }
    if let Some(v) = file.near_plane {
        settings.near_plane = v;
    }
    if let Some(v) = file.far_plane {
        settings.far_plane = v;
    }
    Ok(())
}

/// Applies `SCENE__<KEY>` overrides. Values that fail to parse are skipped with
/// a warning.
pub fn apply_env<I>(settings: &mut Settings, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (name, value) in vars {
        let Some(key) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let applied = match key.to_ascii_lowercase().as_str() {
            "engine_url" => {
                settings.engine_url = value.clone();
                true
            }
            "output_root" => {
                settings.output_root = PathBuf::from(&value);
                true
            }
            "librarian_path" => {
                settings.librarian_path = Some(PathBuf::from(&value));
                true
            }
            "render_quality" => set_parsed(&mut settings.render_quality, &value),
            "room_width" => set_parsed(&mut settings.room_width, &value),
            "room_length" => set_parsed(&mut settings.room_length, &value),
            "depth_buffer_scope" => set_parsed(&mut settings.depth_buffer_scope, &value),
            "save_images" => set_parsed(&mut settings.save_images, &value),
            "near_plane" => set_parsed(&mut settings.near_plane, &value),
            "far_plane" => set_parsed(&mut settings.far_plane, &value),
            "seed" => match value.parse() {
                Ok(seed) => {
                    settings.seed = Some(seed);
                    true
                }
                Err(_) => false,
            },
            _ => {
                debug!(variable = %name, "ignoring unknown setting");
                continue;
            }
        };
        if !applied {
            warn!(variable = %name, value = %value, "ignoring unparseable setting");
        }
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, raw: &str) -> bool {
    match raw.trim().parse() {
        Ok(parsed) => {
            *slot = parsed;
            true
        }
        Err(_) => false,
    }
}

pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.render_quality > 5 {
        return Err(ConfigError::Invalid {
            key: "render_quality",
            message: format!("{} is outside 0..=5", settings.render_quality),
        });
    }
    if settings.room_width < 2 || settings.room_length < 2 {
        return Err(ConfigError::Invalid {
            key: "room_width/room_length",
            message: format!(
                "{}x{} room is too small",
                settings.room_width, settings.room_length
            ),
        });
    }
    if !(settings.near_plane >= 0.0 && settings.far_plane > settings.near_plane) {
        return Err(ConfigError::Invalid {
            key: "near_plane/far_plane",
            message: format!("{}..{}", settings.near_plane, settings.far_plane),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults_point_at_local_engine() {
        let settings = Settings::default();
        assert_eq!(settings.engine_url, "ws://127.0.0.1:1071");
        assert!(settings.output_root.ends_with("tdw_example_controller_output"));
        assert_eq!(settings.depth_buffer_scope, DepthBufferScope::PerTrial);
        assert_eq!(settings.clip_planes(), ClipPlanes::default());
        validate(&settings).expect("defaults are valid");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("scene.toml");
        fs::write(
            &path,
            "engine_url = \"ws://10.0.0.2:1071\"\n\
             depth_buffer_scope = \"per-run\"\n\
             seed = 42\n\
             save_images = false\n",
        )
        .expect("write config");

        let mut settings = Settings::default();
        apply_file(&mut settings, &path).expect("apply");
        assert_eq!(settings.engine_url, "ws://10.0.0.2:1071");
        assert_eq!(settings.depth_buffer_scope, DepthBufferScope::PerRun);
        assert_eq!(settings.seed, Some(42));
        assert!(!settings.save_images);
        assert_eq!(settings.room_width, 12);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("scene.toml");
        fs::write(&path, "render_quality = \"high\"").expect("write config");

        let err = load_settings(Some(&path)).expect_err("bad type");
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_settings(Some(Path::new("/nonexistent/scene.toml"))).expect_err("missing");
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn env_overrides_and_skips_garbage() {
        let mut settings = Settings::default();
        apply_env(
            &mut settings,
            vars(&[
                ("SCENE__ENGINE_URL", "ws://engine:9000"),
                ("SCENE__SEED", "7"),
                ("SCENE__DEPTH_BUFFER_SCOPE", "per_run"),
                ("SCENE__ROOM_WIDTH", "wide"),
                ("OTHER__SEED", "9"),
            ]),
        );
        assert_eq!(settings.engine_url, "ws://engine:9000");
        assert_eq!(settings.seed, Some(7));
        assert_eq!(settings.depth_buffer_scope, DepthBufferScope::PerRun);
        assert_eq!(settings.room_width, 12);
    }

    #[test]
    fn rejects_inverted_clip_planes() {
        let settings = Settings {
            near_plane: 5.0,
            far_plane: 1.0,
            ..Settings::default()
        };
        assert!(matches!(
            validate(&settings),
            Err(ConfigError::Invalid { key: "near_plane/far_plane", .. })
        ));
    }
}
