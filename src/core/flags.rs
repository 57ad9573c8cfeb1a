//! Compiler, assembler, and linker flag sets.
//!
//! Flags are kept as written (`"-proc gekko"`, `'-pragma "cats off"'`) and
//! layered by name: a later flag with the same name replaces the earlier one
//! in place. Include paths are additive and never replace each other.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Compiler warning policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarnPolicy {
    All,
    Off,
    Error,
}

impl WarnPolicy {
    /// The compiler flag selecting this policy.
    pub fn as_flag(self) -> &'static str {
        match self {
            WarnPolicy::All => "-W all",
            WarnPolicy::Off => "-W off",
            WarnPolicy::Error => "-W error",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WarnPolicy::All => "all",
            WarnPolicy::Off => "off",
            WarnPolicy::Error => "error",
        }
    }
}

impl fmt::Display for WarnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an invalid warning policy.
#[derive(Debug, Clone)]
pub struct WarnPolicyParseError(pub String);

impl fmt::Display for WarnPolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid warning policy '{}', valid values: all, off, error",
            self.0
        )
    }
}

impl std::error::Error for WarnPolicyParseError {}

impl FromStr for WarnPolicy {
    type Err = WarnPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(WarnPolicy::All),
            "off" => Ok(WarnPolicy::Off),
            "error" => Ok(WarnPolicy::Error),
            _ => Err(WarnPolicyParseError(s.to_string())),
        }
    }
}

/// Name under which a flag overrides earlier flags, or `None` if additive.
pub fn flag_key(flag: &str) -> Option<String> {
    let flag = flag.trim();
    let (head, rest) = match flag.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, Some(rest.trim())),
        None => (flag, None),
    };

    match (head, rest) {
        ("-i" | "-I" | "-ir", _) => None,
        (h, None) if h.starts_with("-I") => None,
        ("-pragma", Some(rest)) => {
            let name = rest
                .trim_matches('"')
                .split_whitespace()
                .next()
                .unwrap_or_default();
            Some(format!("-pragma {}", name))
        }
        ("--defsym", Some(rest)) => {
            let name = rest.split('=').next().unwrap_or(rest);
            Some(format!("--defsym {}", name.trim()))
        }
        (h, None) if h.starts_with("-D") || h.starts_with("-U") => {
            let name = h.get(2..).unwrap_or_default();
            let name = name.split('=').next().unwrap_or(name);
            Some(format!("-D{}", name))
        }
        (h, None) if h.starts_with("-O") => Some("-O".to_string()),
        (h, _) => Some(h.to_string()),
    }
}

/// Every explicit `-W <policy>` flag in raw, un-layered input.
pub fn warn_policies<'a>(flags: impl IntoIterator<Item = &'a str>) -> Vec<WarnPolicy> {
    flags
        .into_iter()
        .filter_map(|flag| match flag.trim().split_once(char::is_whitespace) {
            Some(("-W", policy)) => policy.trim().parse().ok(),
            _ => None,
        })
        .collect()
}

/// An ordered set of flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSet {
    flags: Vec<String>,
}

impl FlagSet {
    /// Create a flag set from flags in order, layering duplicates by name.
    pub fn new<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = FlagSet::default();
        for flag in flags {
            set.push(flag);
        }
        set
    }

    /// Add a flag, replacing an earlier flag with the same name.
    pub fn push(&mut self, flag: impl Into<String>) {
        let flag = flag.into();
        let flag = flag.trim().to_string();
        if flag.is_empty() {
            return;
        }

        match flag_key(&flag) {
            Some(key) => {
                if let Some(slot) = self
                    .flags
                    .iter_mut()
                    .find(|f| flag_key(f).as_deref() == Some(key.as_str()))
                {
                    *slot = flag;
                } else {
                    self.flags.push(flag);
                }
            }
            None => {
                if !self.flags.contains(&flag) {
                    self.flags.push(flag);
                }
            }
        }
    }

    /// Return a new set with `over` layered on top of `self`.
    pub fn layer(&self, over: &FlagSet) -> FlagSet {
        let mut out = self.clone();
        for flag in &over.flags {
            out.push(flag.clone());
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Look up the flag currently bound to `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.flags
            .iter()
            .find(|f| flag_key(f).as_deref() == Some(key))
            .map(String::as_str)
    }

    /// Include directories named by `-i`/`-I`/`-ir` flags, in order.
    pub fn include_dirs(&self) -> Vec<PathBuf> {
        self.flags
            .iter()
            .filter_map(|flag| {
                let flag = flag.trim();
                match flag.split_once(char::is_whitespace) {
                    Some(("-i" | "-I" | "-ir", path)) => Some(PathBuf::from(path.trim())),
                    None if flag.starts_with("-I") && flag.len() > 2 => {
                        flag.get(2..).map(PathBuf::from)
                    }
                    _ => None,
                }
            })
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for FlagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        FlagSet::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_keys() {
        assert_eq!(flag_key("-proc gekko").as_deref(), Some("-proc"));
        assert_eq!(flag_key("-O4,p").as_deref(), Some("-O"));
        assert_eq!(flag_key("-DBUILD_VERSION=0").as_deref(), Some("-DBUILD_VERSION"));
        assert_eq!(
            flag_key("-pragma \"cats off\"").as_deref(),
            Some("-pragma cats")
        );
        assert_eq!(
            flag_key("--defsym BUILD_VERSION=0").as_deref(),
            Some("--defsym BUILD_VERSION")
        );
        assert_eq!(flag_key("-i include"), None);
        assert_eq!(flag_key("-Iinclude"), None);
    }

    #[test]
    fn test_layer_overrides_by_name_in_place() {
        let base = FlagSet::new(["-nodefaults", "-str reuse", "-O4,p", "-i include"]);
        let lib = FlagSet::new(["-str reuse,pool,readonly", "-O0", "-i src"]);

        let layered = base.layer(&lib);
        assert_eq!(
            layered.as_slice(),
            &[
                "-nodefaults",
                "-str reuse,pool,readonly",
                "-O0",
                "-i include",
                "-i src"
            ]
        );
    }

    #[test]
    fn test_pragmas_are_independent() {
        let set = FlagSet::new([
            "-pragma \"cats off\"",
            "-pragma \"warn_notinlined off\"",
            "-pragma \"cats on\"",
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("-pragma cats"), Some("-pragma \"cats on\""));
    }

    #[test]
    fn test_include_dirs() {
        let set = FlagSet::new(["-i include", "-I build/GKYE/include", "-Isrc", "-O4,p"]);
        assert_eq!(
            set.include_dirs(),
            vec![
                PathBuf::from("include"),
                PathBuf::from("build/GKYE/include"),
                PathBuf::from("src")
            ]
        );
    }

    #[test]
    fn test_duplicate_additive_flags_collapse() {
        let set = FlagSet::new(["-i include", "-i include"]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_warn_policy_parse() {
        assert_eq!("off".parse::<WarnPolicy>().unwrap(), WarnPolicy::Off);
        assert!("loud".parse::<WarnPolicy>().is_err());
        assert_eq!(WarnPolicy::Error.as_flag(), "-W error");
        assert_eq!(
            warn_policies(["-W all", "-O4,p", "-W off"]),
            vec![WarnPolicy::All, WarnPolicy::Off]
        );
    }
}
