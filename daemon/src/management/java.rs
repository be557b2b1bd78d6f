use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use log::{debug, trace};

pub const JAVA_NAME: &str = "java";

/// Finds the runtime executable used to launch server jars.
pub trait RuntimeLocator: Send + Sync {
    fn locate(&self) -> Option<PathBuf>;
}

fn executable_name() -> String {
    if cfg!(windows) {
        format!("{}.exe", JAVA_NAME)
    } else {
        JAVA_NAME.to_owned()
    }
}

/// Looks for java in, in order: an explicit path, `$JAVA_HOME/bin`, every `PATH` entry.
#[derive(Debug, Clone, Default)]
pub struct JavaLocator {
    explicit: Option<PathBuf>,
}

impl JavaLocator {
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }

    fn from_java_home() -> Option<PathBuf> {
        in_java_home(&env::var_os("JAVA_HOME")?)
    }

    fn from_path() -> Option<PathBuf> {
        in_search_path(&env::var_os("PATH")?)
    }
}

fn in_java_home(home: &OsStr) -> Option<PathBuf> {
    let candidate = Path::new(home).join("bin").join(executable_name());
    candidate.is_file().then_some(candidate)
}

/// First directory of a `PATH`-style list that holds the java executable.
fn in_search_path(paths: &OsStr) -> Option<PathBuf> {
    let name = executable_name();
    env::split_paths(paths)
        .inspect(|dir| trace!("scan path: {}", dir.display()))
        .map(|dir| dir.join(&name))
        .find(|candidate| candidate.is_file())
}

impl RuntimeLocator for JavaLocator {
    fn locate(&self) -> Option<PathBuf> {
        let found = match &self.explicit {
            Some(path) if path.is_file() => Some(path.clone()),
            Some(path) => {
                debug!("configured java {} does not exist", path.display());
                Self::from_java_home().or_else(Self::from_path)
            }
            None => Self::from_java_home().or_else(Self::from_path),
        };
        if let Some(ref path) = found {
            debug!("Found java: {}", path.display());
        }
        found
    }
}
