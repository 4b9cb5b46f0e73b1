//! Hot reload of the tools configuration.
//!
//! [`watch`] registers the parent directory of every tools file and the tools
//! folder with `notify`. Relevant change events are debounced, then
//! [`reload`] re-runs the whole decode and initialize pipeline. A failed
//! reload leaves the previous resource set live.

use crate::config::ServerConfig;
use crate::error::ServerError;
use gantry_core::{Registries, ResourceManager};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const DEBOUNCE: Duration = Duration::from_millis(250);

/// Rebuilds resources from `config` and swaps them into `resources`.
///
/// In-flight invocations keep the snapshot they started with; the old
/// sources close once the last of them finishes.
pub async fn reload(
    config: &ServerConfig,
    registries: &Registries,
    resources: &ResourceManager,
) -> Result<(), ServerError> {
    let set = config.load_resources(registries).await?;
    let tools = set.tools.len();
    let sources = set.sources.len();
    resources.replace(set);
    info!(tools, sources, "reloaded configuration");
    Ok(())
}

/// Keeps the file watcher and its reload task alive. Dropping it stops
/// watching.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Which changed paths trigger a reload.
#[derive(Debug, Default)]
struct Targets {
    file_names: HashSet<OsString>,
    directories: Vec<PathBuf>,
    folder: Option<PathBuf>,
}

impl Targets {
    fn new(config: &ServerConfig) -> Self {
        let mut targets = Self::default();
        for file in config.effective_tools_files() {
            if let Some(name) = file.file_name() {
                targets.file_names.insert(name.to_os_string());
            }
            let parent = match file.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let parent = absolute(&parent);
            if !targets.directories.contains(&parent) {
                targets.directories.push(parent);
            }
        }
        targets.folder = config.tools_folder.as_deref().map(absolute);
        targets
    }

    fn matches(&self, path: &Path) -> bool {
        let Some(parent) = path.parent() else {
            return false;
        };
        let tools_file = path
            .file_name()
            .is_some_and(|name| self.file_names.contains(name))
            && self.directories.iter().any(|dir| dir == parent);
        let in_folder = self.folder.as_deref() == Some(parent) && is_yaml(path);
        tools_file || in_folder
    }

    fn watch_paths(&self) -> impl Iterator<Item = &Path> {
        self.directories.iter().chain(self.folder.iter()).map(PathBuf::as_path)
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Starts watching the configured tools files and folder.
pub fn watch(
    config: ServerConfig,
    registries: Arc<Registries>,
    resources: Arc<ResourceManager>,
) -> Result<ConfigWatcher, ServerError> {
    let targets = Targets::new(&config);
    let (tx, rx) = mpsc::unbounded_channel::<PathBuf>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
            }
            Err(e) => error!("config watcher error: {}", e),
        },
        Config::default(),
    )?;

    for path in targets.watch_paths() {
        watcher.watch(path, RecursiveMode::NonRecursive)?;
        info!(path = %path.display(), "watching for configuration changes");
    }

    let task = tokio::spawn(process_events(rx, targets, config, registries, resources));
    Ok(ConfigWatcher {
        _watcher: watcher,
        task,
    })
}

async fn process_events(
    mut rx: mpsc::UnboundedReceiver<PathBuf>,
    targets: Targets,
    config: ServerConfig,
    registries: Arc<Registries>,
    resources: Arc<ResourceManager>,
) {
    while let Some(path) = rx.recv().await {
        if !targets.matches(&path) {
            continue;
        }
        debug!(path = %path.display(), "configuration changed");

        // Editors write in several steps; wait for the burst to settle.
        tokio::time::sleep(DEBOUNCE).await;
        while rx.try_recv().is_ok() {}

        if let Err(e) = reload(&config, &registries, &resources).await {
            warn!(error = %e, "reload failed, keeping previous configuration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn registries() -> Registries {
        let mut registries = Registries::new();
        gantry_adapter_sql::register(&mut registries).unwrap();
        registries
    }

    fn tools_yaml(tool: &str) -> String {
        format!(
            r#"
sources:
  my-sqlite:
    kind: sqlite
    database: ":memory:"
tools:
  {tool}:
    kind: sqlite-sql
    source: my-sqlite
    description: Returns one.
    statement: SELECT 1 AS one
"#
        )
    }

    #[tokio::test]
    async fn test_reload_swaps_resources() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tools.yaml");
        fs::write(&file, tools_yaml("first-tool")).unwrap();
        let config = ServerConfig {
            tools_files: vec![file.clone()],
            ..Default::default()
        };
        let registries = registries();
        let resources = ResourceManager::new(config.load_resources(&registries).await.unwrap());
        assert!(resources.get_tool("first-tool").is_some());

        fs::write(&file, tools_yaml("second-tool")).unwrap();
        reload(&config, &registries, &resources).await.unwrap();
        assert!(resources.get_tool("first-tool").is_none());
        assert!(resources.get_tool("second-tool").is_some());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_resources() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tools.yaml");
        fs::write(&file, tools_yaml("first-tool")).unwrap();
        let config = ServerConfig {
            tools_files: vec![file.clone()],
            ..Default::default()
        };
        let registries = registries();
        let resources = ResourceManager::new(config.load_resources(&registries).await.unwrap());

        fs::write(
            &file,
            "tools:\n  broken:\n    kind: sqlite-sql\n    source: missing\n    \
             description: x\n    statement: SELECT 1\n",
        )
        .unwrap();
        let err = reload(&config, &registries, &resources).await.unwrap_err();
        assert!(err.to_string().contains("missing"), "{err}");
        assert!(resources.get_tool("first-tool").is_some());
        assert!(resources.get_tool("broken").is_none());
    }

    #[test]
    fn test_targets_match_tools_files_and_folder_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("conf.d");
        fs::create_dir(&folder).unwrap();
        let config = ServerConfig {
            tools_files: vec![dir.path().join("tools.yaml")],
            tools_folder: Some(folder.clone()),
            ..Default::default()
        };
        let targets = Targets::new(&config);
        let root = absolute(dir.path());
        let folder = absolute(&folder);

        assert!(targets.matches(&root.join("tools.yaml")));
        assert!(!targets.matches(&root.join("other.yaml")));
        assert!(targets.matches(&folder.join("extra.yml")));
        assert!(!targets.matches(&folder.join("notes.txt")));
    }

    #[tokio::test]
    async fn test_watcher_reloads_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tools.yaml");
        fs::write(&file, tools_yaml("first-tool")).unwrap();
        let config = ServerConfig {
            tools_files: vec![file.clone()],
            ..Default::default()
        };
        let registries = Arc::new(registries());
        let resources = Arc::new(ResourceManager::new(
            config.load_resources(&registries).await.unwrap(),
        ));
        let _watcher = watch(config, Arc::clone(&registries), Arc::clone(&resources)).unwrap();

        fs::write(&file, tools_yaml("second-tool")).unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while resources.get_tool("second-tool").is_none() {
            assert!(tokio::time::Instant::now() < deadline, "reload did not happen");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
