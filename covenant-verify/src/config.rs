#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

pub const MANIFEST_FILE: &str = "covenant.toml";

#[derive(Debug, Error, Diagnostic)]
#[error("verifier config error: {message}")]
#[diagnostic(code(covenant::verify::config))]
pub struct ConfigError {
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtProfile {
    /// Very low timeouts; quantifiers rejected.
    Fast,
    /// CI-friendly medium timeouts; quantifiers rejected.
    Ci,
    /// Higher timeouts; quantifiers allowed.
    Thorough,
}

impl SmtProfile {
    pub fn default_timeout_ms(self) -> u32 {
        match self {
            SmtProfile::Fast => 50,
            SmtProfile::Ci => 250,
            SmtProfile::Thorough => 2_000,
        }
    }

    pub fn allows_quantifiers(self) -> bool {
        matches!(self, SmtProfile::Thorough)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fast" => Some(SmtProfile::Fast),
            "ci" => Some(SmtProfile::Ci),
            "thorough" => Some(SmtProfile::Thorough),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SmtProfile::Fast => "fast",
            SmtProfile::Ci => "ci",
            SmtProfile::Thorough => "thorough",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifyOptions {
    pub profile: SmtProfile,
    /// Caller-chosen bound for the single solver check; falls back to the profile default.
    pub timeout_ms: Option<u32>,
    pub random_seed: u32,
    pub max_quantifier_binders: usize,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            profile: SmtProfile::Thorough,
            timeout_ms: None,
            random_seed: 0,
            max_quantifier_binders: 4,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    verify: Option<VerifySection>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct VerifySection {
    #[serde(default)]
    profile: Option<SmtProfile>,
    #[serde(default)]
    timeout_ms: Option<u32>,
    #[serde(default)]
    random_seed: Option<u32>,
    #[serde(default)]
    max_quantifier_binders: Option<usize>,
}

impl VerifyOptions {
    pub fn with_profile(profile: SmtProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn effective_timeout_ms(&self) -> u32 {
        self.timeout_ms.unwrap_or_else(|| self.profile.default_timeout_ms())
    }

    /// Parse the `[verify]` table of a manifest. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let parsed: Manifest = toml::from_str(raw).map_err(|e| ConfigError {
            message: format!("failed to parse manifest: {e}"),
        })?;

        let mut out = Self::default();
        if let Some(section) = parsed.verify {
            if let Some(profile) = section.profile {
                out.profile = profile;
            }
            out.timeout_ms = section.timeout_ms.or(out.timeout_ms);
            if let Some(seed) = section.random_seed {
                out.random_seed = seed;
            }
            if let Some(max) = section.max_quantifier_binders {
                out.max_quantifier_binders = max;
            }
        }
        Ok(out)
    }

    pub fn load_from_manifest(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&raw).map_err(|e| ConfigError {
            message: format!("{}: {}", path.display(), e.message),
        })
    }

    /// `COVENANT_SMT_PROFILE` / `COVENANT_SMT_TIMEOUT_MS` take precedence over the manifest.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup("COVENANT_SMT_PROFILE") {
            self.profile = SmtProfile::parse(&raw).ok_or_else(|| ConfigError {
                message: format!("COVENANT_SMT_PROFILE: unknown profile `{raw}` (expected fast, ci or thorough)"),
            })?;
        }
        if let Some(raw) = lookup("COVENANT_SMT_TIMEOUT_MS") {
            let ms = raw.trim().parse::<u32>().map_err(|e| ConfigError {
                message: format!("COVENANT_SMT_TIMEOUT_MS: `{raw}` is not a millisecond count: {e}"),
            })?;
            self.timeout_ms = Some(ms);
        }
        Ok(self)
    }
}

/// Walk up from `start` looking for `covenant.toml`.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        let candidate = cur.join(MANIFEST_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        match cur.parent().map(|p| p.to_path_buf()) {
            Some(p) => cur = p,
            None => return None,
        }
    }
}
