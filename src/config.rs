//! Runtime configuration.
//!
//! Both settings are fixed when a [`Runtime`](crate::Runtime) is initialized. The
//! serialized spellings (`"ALL"`, `"SINGLETON"`, `"CLASS_INSTANCES"`, ...) match the
//! names used by configuration files, and both `"false"` and a bare `false` select the
//! disabled state.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};

/// Which descriptors and instances the registry keeps track of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceMode {
    /// Track every descriptor and every instance.
    #[default]
    All,
    /// Track singleton lineages only.
    Singleton,
    /// Track nothing. Singletons cannot be defined in this mode.
    Disabled,
}

impl TraceMode {
    /// Whether a lineage with the given singleton flag is traced under this mode.
    pub fn tracks(self, is_singleton: bool) -> bool {
        match self {
            TraceMode::All => true,
            TraceMode::Singleton => is_singleton,
            TraceMode::Disabled => false,
        }
    }

    /// Whether singleton descriptors may be defined under this mode.
    pub fn allows_singletons(self) -> bool {
        !matches!(self, TraceMode::Disabled)
    }
}

/// What `unregister` is allowed to remove from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnregisterPolicy {
    /// Remove the whole record of classes and singletons.
    All,
    /// Remove the whole record of classes; singletons are kept.
    ClassesOnly,
    /// Clear the instances of classes and singletons.
    AllInstances,
    /// Clear the instances of classes; singletons are kept.
    #[default]
    ClassInstances,
    /// Never remove anything.
    Disabled,
}

/// What an unregister call does to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Removal {
    Record,
    Instances,
    Nothing,
}

impl UnregisterPolicy {
    pub(crate) fn removal(self, is_singleton: bool) -> Removal {
        match (self, is_singleton) {
            (UnregisterPolicy::All, _) | (UnregisterPolicy::ClassesOnly, false) => {
                Removal::Record
            }
            (UnregisterPolicy::AllInstances, _) | (UnregisterPolicy::ClassInstances, false) => {
                Removal::Instances
            }
            _ => Removal::Nothing,
        }
    }
}

/// Error returned when a mode name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseModeError {
    kind: &'static str,
    value: String,
}

impl FromStr for TraceMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(TraceMode::All),
            "SINGLETON" => Ok(TraceMode::Singleton),
            "FALSE" | "DISABLED" | "OFF" => Ok(TraceMode::Disabled),
            _ => Err(ParseModeError {
                kind: "trace mode",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for UnregisterPolicy {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(UnregisterPolicy::All),
            "CLASSES_ONLY" => Ok(UnregisterPolicy::ClassesOnly),
            "ALL_INSTANCES" => Ok(UnregisterPolicy::AllInstances),
            "CLASS_INSTANCES" => Ok(UnregisterPolicy::ClassInstances),
            "FALSE" | "DISABLED" | "OFF" => Ok(UnregisterPolicy::Disabled),
            _ => Err(ParseModeError {
                kind: "unregister policy",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TraceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceMode::All => write!(f, "ALL"),
            TraceMode::Singleton => write!(f, "SINGLETON"),
            TraceMode::Disabled => write!(f, "DISABLED"),
        }
    }
}

impl fmt::Display for UnregisterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnregisterPolicy::All => write!(f, "ALL"),
            UnregisterPolicy::ClassesOnly => write!(f, "CLASSES_ONLY"),
            UnregisterPolicy::AllInstances => write!(f, "ALL_INSTANCES"),
            UnregisterPolicy::ClassInstances => write!(f, "CLASS_INSTANCES"),
            UnregisterPolicy::Disabled => write!(f, "DISABLED"),
        }
    }
}

/// A setting that can be switched off with a bare `false`.
trait Mode: FromStr<Err = ParseModeError> {
    const DISABLED: Self;
}

impl Mode for TraceMode {
    const DISABLED: Self = TraceMode::Disabled;
}

impl Mode for UnregisterPolicy {
    const DISABLED: Self = UnregisterPolicy::Disabled;
}

/// Accepts a mode name or the boolean `false`.
struct ModeVisitor<T>(PhantomData<T>);

impl<'de, T: Mode> Visitor<'de> for ModeVisitor<T> {
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a mode name or false")
    }

    fn visit_str<E>(self, value: &str) -> Result<T, E>
    where
        E: de::Error,
    {
        value.parse().map_err(E::custom)
    }

    fn visit_bool<E>(self, value: bool) -> Result<T, E>
    where
        E: de::Error,
    {
        if value {
            Err(E::invalid_value(Unexpected::Bool(true), &self))
        } else {
            Ok(T::DISABLED)
        }
    }
}

impl<'de> Deserialize<'de> for TraceMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ModeVisitor(PhantomData))
    }
}

impl<'de> Deserialize<'de> for UnregisterPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ModeVisitor(PhantomData))
    }
}

/// Settings a runtime is initialized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub trace: TraceMode,
    pub unregister: UnregisterPolicy,
}

impl RuntimeConfig {
    pub fn new(trace: TraceMode, unregister: UnregisterPolicy) -> Self {
        Self { trace, unregister }
    }

    pub fn with_trace(mut self, trace: TraceMode) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_unregister(mut self, unregister: UnregisterPolicy) -> Self {
        self.unregister = unregister;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.trace, TraceMode::All);
        assert_eq!(config.unregister, UnregisterPolicy::ClassInstances);
    }

    #[test]
    fn test_trace_mode_gating() {
        assert!(TraceMode::All.tracks(false));
        assert!(TraceMode::All.tracks(true));
        assert!(!TraceMode::Singleton.tracks(false));
        assert!(TraceMode::Singleton.tracks(true));
        assert!(!TraceMode::Disabled.tracks(true));
        assert!(!TraceMode::Disabled.allows_singletons());
    }

    #[test]
    fn test_removal_table() {
        use Removal::*;
        use UnregisterPolicy::*;

        let table = [
            (All, Record, Record),
            (ClassesOnly, Record, Nothing),
            (AllInstances, Instances, Instances),
            (ClassInstances, Instances, Nothing),
            (Disabled, Nothing, Nothing),
        ];
        for (policy, class, singleton) in table {
            assert_eq!(policy.removal(false), class, "{policy} on a class");
            assert_eq!(policy.removal(true), singleton, "{policy} on a singleton");
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("ALL".parse::<TraceMode>(), Ok(TraceMode::All));
        assert_eq!("singleton".parse::<TraceMode>(), Ok(TraceMode::Singleton));
        assert_eq!("false".parse::<TraceMode>(), Ok(TraceMode::Disabled));
        assert_eq!(
            "CLASSES_ONLY".parse::<UnregisterPolicy>(),
            Ok(UnregisterPolicy::ClassesOnly)
        );
        assert_eq!(
            "false".parse::<UnregisterPolicy>(),
            Ok(UnregisterPolicy::Disabled)
        );

        let err = "SOME".parse::<TraceMode>().unwrap_err();
        assert_eq!(err.to_string(), "unknown trace mode: SOME");
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for policy in [
            UnregisterPolicy::All,
            UnregisterPolicy::ClassesOnly,
            UnregisterPolicy::AllInstances,
            UnregisterPolicy::ClassInstances,
            UnregisterPolicy::Disabled,
        ] {
            assert_eq!(policy.to_string().parse::<UnregisterPolicy>(), Ok(policy));
        }
    }

    #[test]
    fn test_deserialize_config() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{ "trace": "SINGLETON", "unregister": "ALL_INSTANCES" }"#)
                .unwrap();
        assert_eq!(
            config,
            RuntimeConfig::new(TraceMode::Singleton, UnregisterPolicy::AllInstances)
        );

        let config: RuntimeConfig = serde_json::from_str(r#"{ "trace": "false" }"#).unwrap();
        assert_eq!(config.trace, TraceMode::Disabled);
        assert_eq!(config.unregister, UnregisterPolicy::ClassInstances);
    }

    #[test]
    fn test_deserialize_boolean_false() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{ "trace": false, "unregister": false }"#).unwrap();
        assert_eq!(
            config,
            RuntimeConfig::new(TraceMode::Disabled, UnregisterPolicy::Disabled)
        );

        let err = serde_json::from_str::<RuntimeConfig>(r#"{ "trace": true }"#).unwrap_err();
        assert!(err.to_string().contains("a mode name or false"));

        let err = serde_json::from_str::<TraceMode>(r#""SOMETIMES""#).unwrap_err();
        assert!(err.to_string().contains("unknown trace mode: SOMETIMES"));
    }

    #[test]
    fn test_serialize_names() {
        assert_eq!(
            serde_json::to_string(&UnregisterPolicy::ClassInstances).unwrap(),
            r#""CLASS_INSTANCES""#
        );
        assert_eq!(serde_json::to_string(&TraceMode::Disabled).unwrap(), r#""DISABLED""#);
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::default()
            .with_trace(TraceMode::Singleton)
            .with_unregister(UnregisterPolicy::All);
        assert_eq!(config.trace, TraceMode::Singleton);
        assert_eq!(config.unregister, UnregisterPolicy::All);
    }
}
