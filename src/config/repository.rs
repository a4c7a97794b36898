//! Configuration repository
//!
//! Groups are loaded on demand through a flow of loaders and cached.
//! Values are addressed with dot paths whose first segment names the group
//! (`app.db.port` is `port` inside `db` inside group `app`).
//!
//! Every load fires `LoadingStarted`, then exactly one of `Loaded`, `Missed`
//! or `Errored`, then `LoadingFinished`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::loader::{DirectoryLoader, GroupBlocker, GROUP_KEY, MISSED_KEY, SOURCE_KEY};
use crate::events::Dispatcher;
use crate::flow::{End, Flow, Processor};
use crate::input::Input;

/// Lifecycle events of a group load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEvent {
    /// A group is about to be loaded
    LoadingStarted {
        /// Group name
        group: String,
    },
    /// A loader produced the group
    Loaded {
        /// Group name
        group: String,
        /// Where the loader found it, if it said
        source: Option<String>,
    },
    /// No loader knew the group
    Missed {
        /// Group name
        group: String,
    },
    /// Loading faulted
    Errored {
        /// Group name
        group: String,
        /// Rendered error chain
        error: String,
    },
    /// The load is over, whatever its outcome
    LoadingFinished {
        /// Group name
        group: String,
    },
}

/// Lazily loaded, cached configuration groups
pub struct Repository {
    loaders: Flow<Input, Value>,
    events: Dispatcher<ConfigEvent>,
    groups: BTreeMap<String, Value>,
}

impl Repository {
    /// Create a repository with no loaders
    #[must_use]
    pub fn new() -> Self {
        Self {
            loaders: Flow::new(GroupBlocker),
            events: Dispatcher::new(),
            groups: BTreeMap::new(),
        }
    }

    /// Create a repository loading groups from `dir`
    pub fn with_directory<P: AsRef<Path>>(dir: P) -> Self {
        let mut repository = Self::new();
        repository.add_loader(DirectoryLoader::new(dir), End::Back);
        repository
    }

    /// Add a loader, returning the number of loaders
    ///
    /// Loaders at the front are consulted first.
    pub fn add_loader<P>(&mut self, loader: P, at: End) -> usize
    where
        P: Processor<Input, Value> + 'static,
    {
        self.loaders.append(loader, at)
    }

    /// Register a listener for load events
    pub fn listen<F>(&mut self, listener: F)
    where
        F: Fn(&ConfigEvent) + Send + Sync + 'static,
    {
        self.events.listen(listener);
    }

    /// Names of the groups loaded so far
    pub fn loaded_groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Load a group, returning `None` when no loader knows it
    ///
    /// Cached groups are returned without consulting the loaders again.
    pub fn load(&mut self, group: &str) -> Result<Option<Value>> {
        if let Some(value) = self.groups.get(group) {
            return Ok(Some(value.clone()));
        }
        validate_group_name(group)?;

        self.events.dispatch(&ConfigEvent::LoadingStarted {
            group: group.to_string(),
        });

        let mut input = Input::from([(GROUP_KEY, group)]);
        let outcome = self.loaders.start(&mut input);

        let loaded = match outcome {
            Ok(_) if input.has(MISSED_KEY) => {
                debug!(group, "config group missed");
                self.events.dispatch(&ConfigEvent::Missed {
                    group: group.to_string(),
                });
                Ok(None)
            }
            Ok(value) => {
                let source = input.get_str(SOURCE_KEY).map(ToString::to_string);
                debug!(group, source = source.as_deref(), "config group loaded");
                self.events.dispatch(&ConfigEvent::Loaded {
                    group: group.to_string(),
                    source,
                });
                self.groups.insert(group.to_string(), value.clone());
                Ok(Some(value))
            }
            Err(fault) => {
                warn!(group, error = %fault, "config group failed to load");
                self.events.dispatch(&ConfigEvent::Errored {
                    group: group.to_string(),
                    error: format!("{fault:#}"),
                });
                Err(fault.context(format!("Failed to load config group '{group}'")))
            }
        };

        self.events.dispatch(&ConfigEvent::LoadingFinished {
            group: group.to_string(),
        });
        loaded
    }

    /// Look up a dot path, loading its group if needed
    pub fn get(&mut self, path: &str) -> Result<Option<Value>> {
        let (group, rest) = split_path(path)?;
        let Some(root) = self.load(group)? else {
            return Ok(None);
        };
        Ok(lookup(&root, &rest).cloned())
    }

    /// Returns true if the dot path resolves to a value
    pub fn has(&mut self, path: &str) -> Result<bool> {
        Ok(self.get(path)?.is_some())
    }

    /// Set a value at a dot path, creating intermediate objects
    ///
    /// The group is loaded first so that a set does not hide values that
    /// exist on disk.
    pub fn set(&mut self, path: &str, value: Value) -> Result<()> {
        let (group, rest) = split_path(path)?;
        self.load(group)?;

        let root = self
            .groups
            .entry(group.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        assign(root, &rest, value).with_context(|| format!("Failed to set '{path}'"))
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_group_name(group: &str) -> Result<()> {
    if group.is_empty() {
        bail!("Config group name cannot be empty");
    }
    if group.starts_with('.') || group.contains(['/', '\\']) {
        bail!("Invalid config group name: '{group}'");
    }
    Ok(())
}

fn split_path(path: &str) -> Result<(&str, Vec<&str>)> {
    let mut segments = path.split('.');
    let group = segments.next().unwrap_or_default();
    let rest: Vec<&str> = segments.collect();
    if group.is_empty() || rest.iter().any(|s| s.is_empty()) {
        bail!("Invalid config path: '{path}'");
    }
    Ok((group, rest))
}

fn lookup<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(*segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn assign(root: &mut Value, segments: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut current = root;
    for segment in parents {
        let Value::Object(map) = current else {
            bail!("'{segment}' is not inside an object");
        };
        current = map
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    match current {
        Value::Object(map) => {
            map.insert((*last).to_string(), value);
            Ok(())
        }
        _ => bail!("'{last}' is not inside an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn repository_with(files: &[(&str, &str)]) -> (TempDir, Repository) {
        let temp_dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(temp_dir.path().join(name), content).unwrap();
        }
        let repository = Repository::with_directory(temp_dir.path());
        (temp_dir, repository)
    }

    fn record_events(repository: &mut Repository) -> Arc<Mutex<Vec<ConfigEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        repository.listen(move |event| sink.lock().unwrap().push(event.clone()));
        events
    }

    #[test]
    fn test_get_dot_path() {
        let (_dir, mut repository) =
            repository_with(&[("app.toml", "name = \"demo\"\n[db]\nport = 5432\n")]);

        assert_eq!(repository.get("app.name").unwrap(), Some(json!("demo")));
        assert_eq!(repository.get("app.db.port").unwrap(), Some(json!(5432)));
        assert_eq!(repository.get("app.db.host").unwrap(), None);
        assert!(repository.has("app.db").unwrap());
    }

    #[test]
    fn test_get_whole_group() {
        let (_dir, mut repository) = repository_with(&[("cache.json", r#"{"ttl": 60}"#)]);
        assert_eq!(repository.get("cache").unwrap(), Some(json!({"ttl": 60})));
    }

    #[test]
    fn test_get_array_index() {
        let (_dir, mut repository) =
            repository_with(&[("app.json", r#"{"hosts": ["a", "b"]}"#)]);
        assert_eq!(repository.get("app.hosts.1").unwrap(), Some(json!("b")));
        assert_eq!(repository.get("app.hosts.9").unwrap(), None);
    }

    #[test]
    fn test_loaded_event_sequence() {
        let (_dir, mut repository) = repository_with(&[("app.json", "{}")]);
        let events = record_events(&mut repository);

        repository.load("app").unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            ConfigEvent::LoadingStarted {
                group: "app".to_string()
            }
        );
        assert!(matches!(
            &events[1],
            ConfigEvent::Loaded { group, source: Some(source) }
                if group == "app" && source.ends_with("app.json")
        ));
        assert_eq!(
            events[2],
            ConfigEvent::LoadingFinished {
                group: "app".to_string()
            }
        );
    }

    #[test]
    fn test_missed_group() {
        let (_dir, mut repository) = repository_with(&[]);
        let events = record_events(&mut repository);

        assert_eq!(repository.load("nothing").unwrap(), None);
        assert_eq!(repository.get("nothing.key").unwrap(), None);

        let events = events.lock().unwrap();
        assert_eq!(
            events[1],
            ConfigEvent::Missed {
                group: "nothing".to_string()
            }
        );
        assert_eq!(repository.loaded_groups().count(), 0);
    }

    #[test]
    fn test_errored_group() {
        let (_dir, mut repository) = repository_with(&[("app.json", "{not json")]);
        let events = record_events(&mut repository);

        let err = repository.load("app").unwrap_err();
        assert!(
            err.to_string().contains("Failed to load config group 'app'"),
            "{err}"
        );

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[1], ConfigEvent::Errored { group, .. } if group == "app"));
        assert_eq!(
            events[2],
            ConfigEvent::LoadingFinished {
                group: "app".to_string()
            }
        );
    }

    #[test]
    fn test_cached_group_skips_loaders() {
        let (dir, mut repository) = repository_with(&[("app.json", r#"{"v": 1}"#)]);
        let events = record_events(&mut repository);

        assert_eq!(repository.get("app.v").unwrap(), Some(json!(1)));
        fs::write(dir.path().join("app.json"), r#"{"v": 2}"#).unwrap();
        assert_eq!(repository.get("app.v").unwrap(), Some(json!(1)));

        assert_eq!(events.lock().unwrap().len(), 3);
        assert_eq!(repository.loaded_groups().collect::<Vec<_>>(), vec!["app"]);
    }

    #[test]
    fn test_front_loader_wins() {
        let base = TempDir::new().unwrap();
        let overrides = TempDir::new().unwrap();
        fs::write(base.path().join("app.json"), r#"{"env": "base"}"#).unwrap();
        fs::write(overrides.path().join("app.json"), r#"{"env": "override"}"#).unwrap();

        let mut repository = Repository::with_directory(base.path());
        assert_eq!(
            repository.add_loader(DirectoryLoader::new(overrides.path()), End::Front),
            2
        );
        assert_eq!(repository.get("app.env").unwrap(), Some(json!("override")));
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let (_dir, mut repository) = repository_with(&[("app.json", r#"{"name": "demo"}"#)]);

        repository.set("app.db.port", json!(5432)).unwrap();
        assert_eq!(repository.get("app.db.port").unwrap(), Some(json!(5432)));
        assert_eq!(repository.get("app.name").unwrap(), Some(json!("demo")));

        repository.set("runtime.debug", json!(true)).unwrap();
        assert_eq!(repository.get("runtime.debug").unwrap(), Some(json!(true)));
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let (_dir, mut repository) = repository_with(&[("app.json", r#"{"name": "demo"}"#)]);
        let err = repository.set("app.name.first", json!("x")).unwrap_err();
        assert!(err.to_string().contains("Failed to set 'app.name.first'"), "{err}");
    }

    #[test]
    fn test_invalid_paths_rejected() {
        let mut repository = Repository::new();
        assert!(repository.get("").is_err());
        assert!(repository.get("app..name").is_err());
        assert!(repository.get("../etc").is_err());
    }

    #[test]
    fn test_repository_without_loaders_misses() {
        let mut repository = Repository::default();
        assert_eq!(repository.load("app").unwrap(), None);
    }
}
