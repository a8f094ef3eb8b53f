//! Symbolic event names
//!
//! The set of kinds is closed for the names the platform emits today and open
//! through [`TriggerKind::Other`]: any dotted name that is not listed parses
//! into it, so new event sources need no engine change.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! trigger_kinds {
    ($( $(#[$doc:meta])* $variant:ident => $name:literal, )+) => {
        /// Event kind that activates rule matching
        ///
        /// Serialized as its plain dotted name (e.g. `"post.published"`).
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum TriggerKind {
            $( $(#[$doc])* $variant, )+
            /// Any event name not listed above
            Other(String),
        }

        impl TriggerKind {
            /// All named kinds, in declaration order
            pub const KNOWN: &'static [&'static str] = &[$($name),+];

            /// The dotted event name
            pub fn as_str(&self) -> &str {
                match self {
                    $( TriggerKind::$variant => $name, )+
                    TriggerKind::Other(name) => name.as_str(),
                }
            }

            fn from_name(name: &str) -> Self {
                match name {
                    $( $name => TriggerKind::$variant, )+
                    other => TriggerKind::Other(other.to_string()),
                }
            }
        }
    };
}

trigger_kinds! {
    /// A generic resource was created
    ResourceCreated => "resource.created",
    /// A generic resource was updated
    ResourceUpdated => "resource.updated",
    /// A generic resource was published
    ResourcePublished => "resource.published",
    /// A generic resource was deleted
    ResourceDeleted => "resource.deleted",

    /// A blog post was created
    PostCreated => "post.created",
    /// A blog post was edited
    PostUpdated => "post.updated",
    /// A blog post went live
    PostPublished => "post.published",
    /// A blog post was deleted
    PostDeleted => "post.deleted",
    /// A blog post was taken offline
    PostUnpublished => "post.unpublished",

    /// A media asset was uploaded
    MediaUploaded => "media.uploaded",
    /// A media asset was changed
    MediaUpdated => "media.updated",
    /// A media asset was deleted
    MediaDeleted => "media.deleted",
    /// A media asset finished analysis
    MediaAnalyzed => "media.analyzed",

    /// AI analysis started
    AiAnalysisStarted => "ai.analysis.started",
    /// AI analysis finished
    AiAnalysisCompleted => "ai.analysis.completed",
    /// AI analysis failed
    AiAnalysisFailed => "ai.analysis.failed",
    /// Audio generation started
    AudioGenerationStarted => "audio.generation.started",
    /// Audio generation finished
    AudioGenerationCompleted => "audio.generation.completed",
    /// Audio generation failed
    AudioGenerationFailed => "audio.generation.failed",

    /// A user account was created
    UserRegistered => "user.registered",
    /// A user signed in
    UserLogin => "user.login",
    /// A user signed out
    UserLogout => "user.logout",

    /// A scheduled task fired
    SystemScheduled => "system.scheduled",
    /// An external API call was received
    ApiCall => "api.call",
    /// An application error was reported
    ErrorOccurred => "error.occurred",

    /// Application-defined event carrying its own payload
    CustomEvent => "custom.event",
}

impl TriggerKind {
    /// Whether this kind is one of the named variants
    pub fn is_known(&self) -> bool {
        !matches!(self, TriggerKind::Other(_))
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TriggerKind::from_name(s))
    }
}

impl From<&str> for TriggerKind {
    fn from(name: &str) -> Self {
        TriggerKind::from_name(name)
    }
}

impl From<String> for TriggerKind {
    fn from(name: String) -> Self {
        TriggerKind::from_name(&name)
    }
}

impl Serialize for TriggerKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TriggerKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(TriggerKind::from_name(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names_round_trip_through_parse() {
        for name in TriggerKind::KNOWN {
            let kind: TriggerKind = name.parse().unwrap();
            assert!(kind.is_known(), "{} should be a named kind", name);
            assert_eq!(kind.as_str(), *name);
        }
    }

    #[test]
    fn test_unknown_name_is_other() {
        let kind = TriggerKind::from("invoice.paid");
        assert_eq!(kind, TriggerKind::Other("invoice.paid".to_string()));
        assert!(!kind.is_known());
        assert_eq!(kind.to_string(), "invoice.paid");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&TriggerKind::PostPublished).unwrap();
        assert_eq!(json, "\"post.published\"");

        let parsed: TriggerKind = serde_json::from_str("\"system.scheduled\"").unwrap();
        assert_eq!(parsed, TriggerKind::SystemScheduled);
    }

    #[test]
    fn test_other_equals_only_same_name() {
        assert_ne!(
            TriggerKind::from("a.b"),
            TriggerKind::from("a.c"),
        );
        assert_eq!(TriggerKind::from("custom.event"), TriggerKind::CustomEvent);
    }

    #[test]
    fn test_from_owned_string() {
        assert_eq!(TriggerKind::from("media.uploaded".to_string()), TriggerKind::MediaUploaded);
        assert_eq!(
            TriggerKind::from(String::from("invoice.paid")),
            TriggerKind::Other("invoice.paid".to_string())
        );
    }
}
