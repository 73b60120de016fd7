//! Configuration validation.
//!
//! Validates TOML configuration against the known schema, detects
//! unknown/misspelled fields, and checks the values dispatch depends on
//! (a usable command prefix, a denial template, guild bindings).

use std::{collections::HashMap, path::Path};

use crate::schema::{GuildbotConfig, DEFAULT_DENIAL_MESSAGE};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "dispatch", "guild"
    pub category: &'static str,
    /// Dotted path, e.g. "bot.prefx"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Expected shape of the configuration schema.
enum KnownKeys {
    /// A struct with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// A map with dynamic keys (guild IDs) whose values have a known shape.
    Map(Box<KnownKeys>),
    /// Scalar or list of scalars, stop recursion.
    Leaf,
}

/// Build the schema map mirroring every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Map, Struct};

    Struct(HashMap::from([
        (
            "bot",
            Struct(HashMap::from([
                ("prefix", Leaf),
                ("owner_id", Leaf),
                ("direct_messages", Leaf),
                ("denial_message", Leaf),
            ])),
        ),
        (
            "guilds",
            Map(Box::new(Struct(HashMap::from([
                ("owner_id", Leaf),
                ("mod_role", Leaf),
                ("disabled_modules", Leaf),
            ])))),
        ),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "syntax",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    let is_toml = actual_path
        .extension()
        .and_then(|e| e.to_str())
        .is_none_or(|ext| ext == "toml");

    if !is_toml {
        // Structural checks need the TOML tree; other formats get the
        // semantic pass only.
        let mut diagnostics = Vec::new();
        match crate::loader::load_config(actual_path) {
            Ok(config) => check_config(&config, &mut diagnostics),
            Err(e) => diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "type-error",
                path: String::new(),
                message: e.to_string(),
            }),
        }
        return ValidationResult {
            diagnostics,
            config_path,
        };
    }

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let content = crate::env_subst::substitute_env(&content);
            let mut result = validate_toml_str(&content);
            result.config_path = Some(actual_path.clone());
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate TOML text: syntax, unknown fields, types, then dispatch semantics.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("TOML syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    let schema = build_schema_map();
    check_unknown_fields(&toml_value, &schema, "", &mut diagnostics);

    match toml::from_str::<GuildbotConfig>(toml_str) {
        Ok(config) => check_config(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Semantic checks on a parsed config (after env overrides).
#[must_use]
pub fn validate_config(config: &GuildbotConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_config(config, &mut diagnostics);
    diagnostics
}

/// Walk the TOML value tree against the schema tree and flag unknown keys.
fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };

    match (value, schema) {
        (toml::Value::Table(table), KnownKeys::Struct(fields)) => {
            let known_keys: Vec<&str> = fields.keys().copied().collect();
            for (key, child_value) in table {
                let path = join(key);
                if let Some(child_schema) = fields.get(key.as_str()) {
                    check_unknown_fields(child_value, child_schema, &path, diagnostics);
                    continue;
                }
                let message = match suggest(key, &known_keys, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "unknown-field",
                    path,
                    message,
                });
            }
        },
        (toml::Value::Table(table), KnownKeys::Map(value_schema)) => {
            for (key, child_value) in table {
                check_unknown_fields(child_value, value_schema, &join(key), diagnostics);
            }
        },
        // Leaf or type mismatch, type errors are caught by deserialization.
        _ => {},
    }
}

fn check_config(config: &GuildbotConfig, diagnostics: &mut Vec<Diagnostic>) {
    let bot = &config.bot;

    if bot.prefix.is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "dispatch",
            path: "bot.prefix".into(),
            message: "command prefix must not be empty".into(),
        });
    } else if bot.prefix.chars().any(char::is_whitespace) {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "dispatch",
            path: "bot.prefix".into(),
            message: "command prefix must not contain whitespace".into(),
        });
    }

    if bot.owner_id.as_deref().is_some_and(|o| o.trim().is_empty()) {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "dispatch",
            path: "bot.owner_id".into(),
            message: "owner_id is set but empty".into(),
        });
    } else if bot.owner_id.is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "dispatch",
            path: "bot.owner_id".into(),
            message: "no bot owner configured; privileged commands are limited to guild moderators"
                .into(),
        });
    }

    if !bot.denial_message.contains("{role}") {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "dispatch",
            path: "bot.denial_message".into(),
            message: format!(
                "denial message does not mention the required role; default is \"{DEFAULT_DENIAL_MESSAGE}\""
            ),
        });
    }

    for (guild_id, guild) in &config.guilds {
        let base = format!("guilds.{guild_id}");
        if guild_id.trim().is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "guild",
                path: base.clone(),
                message: "guild ID must not be empty".into(),
            });
        }
        if guild.mod_role.as_deref().is_some_and(|r| r.trim().is_empty()) {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "guild",
                path: format!("{base}.mod_role"),
                message: "mod_role is set but empty".into(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for module in &guild.disabled_modules {
            if !seen.insert(module.as_str()) {
                diagnostics.push(Diagnostic {
                    severity: Severity::Warning,
                    category: "guild",
                    path: format!("{base}.disabled_modules"),
                    message: format!("module \"{module}\" is listed more than once"),
                });
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
