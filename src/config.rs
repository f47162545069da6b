use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::Params;

pub const DEFAULT_XE_BINARY: &str = "/usr/bin/xe";
pub const DEFAULT_IMPORT_FILE: &str = "vms.export.xml";

/* long flags that may also be spelled with a single dash, e.g. -infile=x.xml */
const SINGLE_DASH_FLAGS: [&str; 5] = ["xebinary", "infile", "strict", "quiet", "details"];
const VALUE_FLAGS: [&str; 2] = ["xebinary", "infile"];

/// Settings for one run, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub xe_binary: PathBuf,
    pub import_file: PathBuf,
    pub strict: bool,
    pub quiet: bool,
    pub details: bool,
}

impl Config {
    /// Applies defaults and looks for the xe binary. A missing binary is
    /// reported but never fatal; nothing invokes it yet.
    pub fn resolve(params: &Params) -> Config {
        let quiet = params.quiet;

        let xe_binary = match non_empty(params.xebinary.as_deref()) {
            Some(p) => PathBuf::from(p),
            None => {
                info!("No path to xe binary given on command line using default: {DEFAULT_XE_BINARY}");
                PathBuf::from(DEFAULT_XE_BINARY)
            }
        };

        match lookup_executable(xe_binary.as_os_str(), std::env::var_os("PATH")) {
            Some(found) => {
                if !quiet {
                    println!("xe binary found in {}", found.display());
                }
            }
            None => warn!(xe_binary = %xe_binary.display(), "Could not find xe binary"),
        }

        let import_file = match non_empty(params.infile.as_deref()) {
            Some(p) => PathBuf::from(p),
            None => {
                if !quiet {
                    println!("No export file given, using default: {DEFAULT_IMPORT_FILE}");
                }
                PathBuf::from(DEFAULT_IMPORT_FILE)
            }
        };

        Config {
            xe_binary,
            import_file,
            strict: params.strict,
            quiet,
            details: params.details,
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Rewrites `-xebinary` style flags to `--xebinary` so clap can parse them.
/// The value following `-infile`/`-xebinary` is never rewritten, and
/// everything after a bare `--` is left alone.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut out = Vec::new();
    let mut passthrough = false;
    let mut value_next = false;

    for (i, arg) in args.into_iter().enumerate() {
        if i == 0 || passthrough || value_next {
            value_next = false;
            out.push(arg);
            continue;
        }
        if arg == "--" {
            passthrough = true;
            out.push(arg);
            continue;
        }

        value_next = arg.to_str().is_some_and(|s| {
            let name = s.trim_start_matches('-');
            s.starts_with('-') && VALUE_FLAGS.contains(&name)
        });

        let rewritten = arg.to_str().and_then(|s| {
            let body = s.strip_prefix('-').filter(|b| !b.starts_with('-'))?;
            let name = body.split('=').next().unwrap_or(body);
            SINGLE_DASH_FLAGS
                .contains(&name)
                .then(|| OsString::from(format!("--{body}")))
        });
        out.push(rewritten.unwrap_or(arg));
    }

    out
}

/// Finds an executable the way a shell would. Names containing a path
/// separator are checked as given, bare names are searched in `path_var`.
pub fn lookup_executable(name: &OsStr, path_var: Option<OsString>) -> Option<PathBuf> {
    let name = Path::new(name);
    if name.as_os_str().is_empty() {
        return None;
    }

    if name.components().count() > 1 || name.is_absolute() {
        return is_executable(name).then(|| name.to_path_buf());
    }

    let path_var = path_var?;
    std::env::split_paths(&path_var)
        .map(|dir| {
            // empty PATH entries mean the current directory
            if dir.as_os_str().is_empty() {
                PathBuf::from(".").join(name)
            } else {
                dir.join(name)
            }
        })
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
