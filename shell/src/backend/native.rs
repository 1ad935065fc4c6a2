//! Backend for a real Linux session.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use shared_types::{AppDefinition, FileEntry, SystemStats, UserConfig};
use tokio::process::Command;

use super::{split_command, BackendError, SystemBackend};

/// Hints so toolkits open their windows on the Wayland compositor.
const WAYLAND_ENV: [(&str, &str); 4] = [
    ("GDK_BACKEND", "wayland"),
    ("QT_QPA_PLATFORM", "wayland"),
    ("SDL_VIDEODRIVER", "wayland"),
    ("CLUTTER_BACKEND", "wayland"),
];

const CONFIG_FILE: &str = "settings.json";

const APPLICATION_DIRS: [&str; 2] = ["/usr/share/applications", "/usr/local/share/applications"];

#[derive(Debug, Clone)]
pub struct NativeBackend {
    config_dir: PathBuf,
    home_dir: PathBuf,
}

impl NativeBackend {
    pub fn new(config_dir: impl Into<PathBuf>, home_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            home_dir: home_dir.into(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if path == "HOME" || path.is_empty() {
            self.home_dir.clone()
        } else if let Some(rest) = path.strip_prefix("~/") {
            self.home_dir.join(rest)
        } else {
            PathBuf::from(path)
        }
    }
}

#[async_trait]
impl SystemBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn launch_process(&self, command: &str) -> Result<(), BackendError> {
        let (program, args) = split_command(command)?;
        let child = Command::new(program)
            .args(args)
            .envs(WAYLAND_ENV)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BackendError::Launch {
                command: command.to_string(),
                reason: e.to_string(),
            })?;
        tracing::info!(command = %command, pid = ?child.id(), "Launched external process");
        Ok(())
    }

    async fn system_stats(&self) -> Result<SystemStats, BackendError> {
        let defaults = SystemStats::default();

        let cpu_usage = match tokio::fs::read_to_string("/proc/loadavg").await {
            Ok(loadavg) => parse_cpu_load(&loadavg, available_cores()).unwrap_or(defaults.cpu_usage),
            Err(_) => defaults.cpu_usage,
        };
        let ram_usage = match tokio::fs::read_to_string("/proc/meminfo").await {
            Ok(meminfo) => parse_ram_usage(&meminfo).unwrap_or(defaults.ram_usage),
            Err(_) => defaults.ram_usage,
        };
        let (battery, is_charging) = read_battery()
            .await
            .unwrap_or((defaults.battery, defaults.is_charging));
        let brightness = read_brightness().await.unwrap_or(defaults.brightness);
        let volume = command_output("amixer", &["get", "Master"])
            .await
            .and_then(|out| parse_amixer_volume(&out))
            .unwrap_or(defaults.volume);
        let wifi_ssid = command_output("nmcli", &["-t", "-f", "active,ssid", "dev", "wifi"])
            .await
            .map(|out| parse_active_ssid(&out).unwrap_or_else(|| defaults.wifi_ssid.clone()))
            .unwrap_or(defaults.wifi_ssid);

        Ok(SystemStats {
            battery,
            is_charging,
            volume,
            brightness,
            cpu_usage,
            ram_usage,
            wifi_ssid,
        })
    }

    async fn load_config(&self) -> Result<UserConfig, BackendError> {
        let path = self.config_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(UserConfig::default()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(UserConfig::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_config(&self, config: &UserConfig) -> Result<(), BackendError> {
        tokio::fs::create_dir_all(&self.config_dir).await?;
        let json = serde_json::to_string_pretty(config)?;
        tokio::fs::write(self.config_path(), json).await?;
        tracing::debug!(path = %self.config_path().display(), "Saved user config");
        Ok(())
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>, BackendError> {
        let target = self.resolve(path);
        let mut read_dir = tokio::fs::read_dir(&target).await?;
        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                path: entry.path().to_string_lossy().to_string(),
                is_dir: metadata.is_dir(),
                size: if metadata.is_dir() { 0 } else { metadata.len() },
            });
        }
        entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }

    async fn installed_apps(&self) -> Result<Vec<AppDefinition>, BackendError> {
        let mut dirs: Vec<PathBuf> = APPLICATION_DIRS.iter().map(PathBuf::from).collect();
        dirs.push(self.home_dir.join(".local/share/applications"));

        let mut apps: Vec<AppDefinition> = Vec::new();
        for dir in dirs {
            let Ok(mut read_dir) = tokio::fs::read_dir(&dir).await else {
                continue;
            };
            while let Some(entry) = read_dir.next_entry().await? {
                let path = entry.path();
                if path.extension().map_or(true, |ext| ext != "desktop") {
                    continue;
                }
                let Ok(content) = tokio::fs::read_to_string(&path).await else {
                    continue;
                };
                if let Some(app) = parse_desktop_entry(&path, &content) {
                    if !apps.iter().any(|a| a.id == app.id) {
                        apps.push(app);
                    }
                }
            }
        }
        apps.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(apps)
    }
}

// ============================================================================
// Parsing helpers
// ============================================================================

fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

async fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).to_string())
}

async fn read_battery() -> Option<(f32, bool)> {
    let base = Path::new("/sys/class/power_supply/BAT0");
    let capacity = tokio::fs::read_to_string(base.join("capacity")).await.ok()?;
    let status = tokio::fs::read_to_string(base.join("status"))
        .await
        .unwrap_or_default();
    let capacity: f32 = capacity.trim().parse().ok()?;
    Some((capacity, status.trim() == "Charging"))
}

async fn read_brightness() -> Option<u8> {
    let mut dirs = tokio::fs::read_dir("/sys/class/backlight").await.ok()?;
    let device = dirs.next_entry().await.ok()??.path();
    let current = tokio::fs::read_to_string(device.join("brightness")).await.ok()?;
    let max = tokio::fs::read_to_string(device.join("max_brightness")).await.ok()?;
    percent(current.trim().parse().ok()?, max.trim().parse().ok()?)
}

fn percent(value: u64, max: u64) -> Option<u8> {
    if max == 0 {
        return None;
    }
    Some(((value.min(max) * 100) / max) as u8)
}

/// One-minute load average as a percentage of available cores.
fn parse_cpu_load(loadavg: &str, cores: usize) -> Option<f32> {
    let load: f32 = loadavg.split_whitespace().next()?.parse().ok()?;
    Some((load / cores.max(1) as f32 * 100.0).clamp(0.0, 100.0))
}

fn parse_ram_usage(meminfo: &str) -> Option<f32> {
    let field = |name: &str| -> Option<f32> {
        meminfo
            .lines()
            .find(|line| line.starts_with(name))?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    };
    let total = field("MemTotal:")?;
    let available = field("MemAvailable:")?;
    if total <= 0.0 {
        return None;
    }
    Some(((total - available) / total * 100.0).clamp(0.0, 100.0))
}

fn parse_amixer_volume(output: &str) -> Option<u8> {
    static VOLUME_RE: OnceLock<Regex> = OnceLock::new();
    let re = VOLUME_RE.get_or_init(|| Regex::new(r"\[(\d{1,3})%\]").expect("valid volume regex"));
    let level: u8 = re.captures(output)?.get(1)?.as_str().parse().ok()?;
    Some(level.min(100))
}

fn parse_active_ssid(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("yes:"))
        .map(str::to_string)
        .filter(|ssid| !ssid.is_empty())
}

/// Parses the `[Desktop Entry]` group of a `.desktop` file.
fn parse_desktop_entry(path: &Path, content: &str) -> Option<AppDefinition> {
    static FIELD_CODE_RE: OnceLock<Regex> = OnceLock::new();
    let field_codes =
        FIELD_CODE_RE.get_or_init(|| Regex::new(r"\s*%[a-zA-Z]").expect("valid field code regex"));

    let mut in_entry = false;
    let mut name = None;
    let mut exec = None;
    let mut icon = String::new();
    for line in content.lines().map(str::trim) {
        if line.starts_with('[') {
            in_entry = line == "[Desktop Entry]";
            continue;
        }
        if !in_entry {
            continue;
        }
        match line.split_once('=') {
            Some(("Name", value)) if name.is_none() => name = Some(value.to_string()),
            Some(("Exec", value)) => exec = Some(field_codes.replace_all(value, "").trim().to_string()),
            Some(("Icon", value)) => icon = value.to_string(),
            Some(("NoDisplay", "true")) | Some(("Hidden", "true")) => return None,
            _ => {}
        }
    }

    let name = name.filter(|n| !n.is_empty())?;
    let exec = exec.filter(|e| !e.is_empty())?;
    let id = path.file_stem()?.to_string_lossy().to_string();
    Some(AppDefinition {
        id,
        name,
        icon,
        default_width: shared_types::DEFAULT_WINDOW_WIDTH,
        default_height: shared_types::DEFAULT_WINDOW_HEIGHT,
        external: true,
        exec: Some(exec),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_and_ram() {
        assert_eq!(parse_cpu_load("2.00 1.50 1.00 2/300 1234", 4), Some(50.0));
        assert_eq!(parse_cpu_load("9.00 1 1", 2), Some(100.0));

        let meminfo = "MemTotal:       16000000 kB\nMemFree:  1000 kB\nMemAvailable:   4000000 kB\n";
        assert_eq!(parse_ram_usage(meminfo), Some(75.0));
        assert_eq!(parse_ram_usage("garbage"), None);
    }

    #[test]
    fn test_parse_amixer_and_nmcli() {
        let amixer = "Simple mixer control 'Master',0\n  Front Left: Playback 42000 [64%] [on]\n";
        assert_eq!(parse_amixer_volume(amixer), Some(64));
        assert_eq!(parse_amixer_volume("no level"), None);

        assert_eq!(
            parse_active_ssid("no:Neighbour\nyes:HomeNet\n"),
            Some("HomeNet".to_string())
        );
        assert_eq!(parse_active_ssid("no:Neighbour\n"), None);
    }

    #[test]
    fn test_parse_desktop_entry() {
        let content = "[Desktop Entry]\nName=GIMP\nExec=gimp-2.10 %U\nIcon=gimp\n\n[Desktop Action new]\nName=New Window\nExec=gimp --new\n";
        let app = parse_desktop_entry(Path::new("/usr/share/applications/gimp.desktop"), content)
            .unwrap();
        assert_eq!(app.id, "gimp");
        assert_eq!(app.name, "GIMP");
        assert_eq!(app.exec.as_deref(), Some("gimp-2.10"));
        assert!(app.external);

        let hidden = "[Desktop Entry]\nName=Hidden\nExec=hidden\nNoDisplay=true\n";
        assert!(parse_desktop_entry(Path::new("hidden.desktop"), hidden).is_none());
    }

    #[tokio::test]
    async fn test_config_round_trip_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let backend = NativeBackend::new(dir.path().join("blue-environment"), dir.path());

        // Missing file falls back to defaults
        assert_eq!(backend.load_config().await.unwrap(), UserConfig::default());

        let mut config = UserConfig::default();
        config.theme_name = "midnight".to_string();
        config.disabled_apps.push("calculator".to_string());
        backend.save_config(&config).await.unwrap();
        assert!(backend.config_path().exists());
        assert_eq!(backend.load_config().await.unwrap(), config);

        tokio::fs::write(backend.config_path(), "{ not json").await.unwrap();
        assert!(matches!(
            backend.load_config().await,
            Err(BackendError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_list_dir_resolves_home_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("zeta")).unwrap();
        std::fs::write(dir.path().join("alpha.txt"), b"hello").unwrap();

        let backend = NativeBackend::new(dir.path().join("cfg"), dir.path());
        let entries = backend.list_dir("HOME").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha.txt"]);
        assert_eq!(entries[1].size, 5);

        assert!(backend.list_dir("/definitely/not/here").await.is_err());
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let backend = NativeBackend::new(dir.path(), dir.path());
        let err = backend
            .launch_process("definitely-not-a-real-binary-xyz")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Launch { .. }));
        assert_eq!(
            backend.launch_process("").await,
            Err(BackendError::EmptyCommand)
        );
    }
}
