use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::{debug, warn};

/// Why a candidate password was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must contain: {}", .0.join(", "))]
    Rejected(Vec<String>),

    /// The custom policy was configured with a pattern that does not compile
    #[error("invalid password pattern: {0}")]
    InvalidPattern(String),
}

/// Names accepted in the `password.mode` configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum PolicyMode {
    NoValidation,
    Easy,
    Medium,
    Restrict,
    Custom,
}

/// Tunables for the `custom` policy. Zero lengths mean unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CustomPolicyConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub require_upper: bool,
    pub require_lower: bool,
    pub require_digit: bool,
    pub require_special: bool,
    pub regex: String,
}

/// A custom policy with its pattern compiled once at construction
#[derive(Debug, Clone)]
pub struct CustomPolicy {
    config: CustomPolicyConfig,
    pattern: Option<Result<Regex, String>>,
}

impl CustomPolicy {
    pub fn new(config: CustomPolicyConfig) -> Self {
        let pattern = if config.regex.is_empty() {
            None
        } else {
            // Anchored so the whole password has to match
            let compiled = Regex::new(&format!("^(?:{})$", config.regex)).map_err(|e| {
                warn!(pattern = %config.regex, error = %e, "Custom password pattern does not compile");
                e.to_string()
            });
            Some(compiled)
        };

        Self { config, pattern }
    }

    fn validate(&self, password: &str) -> Result<(), PasswordError> {
        let config = &self.config;
        let classes = CharClasses::scan(password);
        let length = password.chars().count();
        let mut reasons = Vec::new();

        if config.min_length > 0 && length < config.min_length {
            reasons.push(format!("at least {} characters", config.min_length));
        }
        if config.max_length > 0 && length > config.max_length {
            reasons.push(format!("at most {} characters", config.max_length));
        }
        if config.require_upper && !classes.upper {
            reasons.push(UPPER.to_string());
        }
        if config.require_lower && !classes.lower {
            reasons.push(LOWER.to_string());
        }
        if config.require_digit && !classes.digit {
            reasons.push(DIGIT.to_string());
        }
        if config.require_special && !classes.special {
            reasons.push(SPECIAL.to_string());
        }

        match &self.pattern {
            Some(Ok(regex)) if !regex.is_match(password) => {
                reasons.push(format!("a match for pattern {}", config.regex));
            }
            Some(Err(e)) => return Err(PasswordError::InvalidPattern(e.clone())),
            _ => {}
        }

        reject_if_any(reasons)
    }
}

/// Password acceptance rules selected by configuration
#[derive(Debug, Clone, Default)]
pub enum PasswordPolicy {
    #[default]
    NoValidation,
    Easy,
    Medium,
    Restrict,
    Custom(CustomPolicy),
}

const UPPER: &str = "at least one uppercase letter";
const LOWER: &str = "at least one lowercase letter";
const DIGIT: &str = "at least one digit";
const SPECIAL: &str = "at least one special character";

impl PasswordPolicy {
    /// Resolves a policy by name. Unknown names fall back to `no-validation`,
    /// as does `custom` without a custom block.
    pub fn from_name(name: &str, custom: Option<&CustomPolicyConfig>) -> Self {
        let Ok(mode) = name.parse::<PolicyMode>() else {
            debug!(name = %name, "Unknown password policy, using no-validation");
            return PasswordPolicy::NoValidation;
        };

        match mode {
            PolicyMode::NoValidation => PasswordPolicy::NoValidation,
            PolicyMode::Easy => PasswordPolicy::Easy,
            PolicyMode::Medium => PasswordPolicy::Medium,
            PolicyMode::Restrict => PasswordPolicy::Restrict,
            PolicyMode::Custom => match custom {
                Some(config) => PasswordPolicy::Custom(CustomPolicy::new(config.clone())),
                None => {
                    warn!("Custom password policy selected without settings, using no-validation");
                    PasswordPolicy::NoValidation
                }
            },
        }
    }

    pub fn mode(&self) -> PolicyMode {
        match self {
            PasswordPolicy::NoValidation => PolicyMode::NoValidation,
            PasswordPolicy::Easy => PolicyMode::Easy,
            PasswordPolicy::Medium => PolicyMode::Medium,
            PasswordPolicy::Restrict => PolicyMode::Restrict,
            PasswordPolicy::Custom(_) => PolicyMode::Custom,
        }
    }

    pub fn validate(&self, password: &str) -> Result<(), PasswordError> {
        match self {
            PasswordPolicy::NoValidation => Ok(()),
            PasswordPolicy::Easy => {
                if password.chars().count() < 3 {
                    return reject("at least 3 characters");
                }
                Ok(())
            }
            PasswordPolicy::Medium => {
                if password.chars().count() < 6 {
                    return reject("at least 6 characters");
                }
                let classes = CharClasses::scan(password);
                if !classes.letter {
                    return reject("at least one letter");
                }
                if !classes.digit {
                    return reject(DIGIT);
                }
                Ok(())
            }
            PasswordPolicy::Restrict => {
                let classes = CharClasses::scan(password);
                let mut reasons = Vec::new();

                if password.chars().count() < 8 {
                    reasons.push("at least 8 characters".to_string());
                }
                if !classes.upper {
                    reasons.push(UPPER.to_string());
                }
                if !classes.lower {
                    reasons.push(LOWER.to_string());
                }
                if !classes.digit {
                    reasons.push(DIGIT.to_string());
                }
                if !classes.special {
                    reasons.push(SPECIAL.to_string());
                }

                reject_if_any(reasons)
            }
            PasswordPolicy::Custom(custom) => custom.validate(password),
        }
    }
}

fn reject(reason: &str) -> Result<(), PasswordError> {
    Err(PasswordError::Rejected(vec![reason.to_string()]))
}

fn reject_if_any(reasons: Vec<String>) -> Result<(), PasswordError> {
    if reasons.is_empty() {
        Ok(())
    } else {
        Err(PasswordError::Rejected(reasons))
    }
}

// Unicode general categories: letters (L*) and decimal digits (Nd) only
static LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\p{L}$").unwrap());
static DECIMAL_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\p{Nd}$").unwrap());

fn in_class(class: &Regex, c: char) -> bool {
    let mut buf = [0u8; 4];
    class.is_match(c.encode_utf8(&mut buf))
}

#[derive(Debug, Default)]
struct CharClasses {
    letter: bool,
    upper: bool,
    lower: bool,
    digit: bool,
    special: bool,
}

impl CharClasses {
    fn scan(password: &str) -> Self {
        let mut classes = CharClasses::default();
        for c in password.chars() {
            let letter = in_class(&LETTER, c);
            let digit = in_class(&DECIMAL_DIGIT, c);
            classes.letter |= letter;
            classes.upper |= c.is_uppercase();
            classes.lower |= c.is_lowercase();
            classes.digit |= digit;
            // Anything that is not a letter, digit or whitespace
            classes.special |= !letter && !digit && !c.is_whitespace();
        }
        classes
    }
}
