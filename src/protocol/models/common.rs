use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Arbitrary JSON payloads allowed by the API (e.g. metadata values).
pub type Metadata = HashMap<String, Value>;

/// JSON Schema / tool parameter definitions are intentionally untyped.
pub type JsonSchema = Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    InProgress,
    Completed,
    Incomplete,
}

/// Closed string vocabularies accepted by the service.
///
/// Session fields stay plain strings on the wire so that validation can reject
/// values the service would refuse; these enums name the accepted set.
macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }

            #[must_use]
            pub fn parse(value: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|candidate| candidate.as_str() == value)
            }

            /// Wire names of every member, in declaration order.
            #[must_use]
            pub fn names() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_owned()
            }
        }
    };
}

vocabulary! {
    Voice {
        Alloy => "alloy",
        Echo => "echo",
        Fable => "fable",
        Onyx => "onyx",
        Nova => "nova",
        Shimmer => "shimmer",
        Verse => "verse",
    }
}

vocabulary! {
    AudioFormat {
        Pcm16 => "pcm16",
        G711Ulaw => "g711_ulaw",
        G711Alaw => "g711_alaw",
    }
}

vocabulary! {
    TurnDetectionType {
        ServerVad => "server_vad",
        SemanticVad => "semantic_vad",
    }
}

vocabulary! {
    Eagerness {
        Low => "low",
        Medium => "medium",
        High => "high",
        Auto => "auto",
    }
}

vocabulary! {
    Modality {
        Text => "text",
        Audio => "audio",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_round_trips_wire_names() {
        assert_eq!(Voice::parse("shimmer"), Some(Voice::Shimmer));
        assert_eq!(Voice::parse("Shimmer"), None);
        assert_eq!(AudioFormat::G711Ulaw.to_string(), "g711_ulaw");
        assert_eq!(Eagerness::names(), vec!["low", "medium", "high", "auto"]);
        assert_eq!(
            serde_json::to_string(&TurnDetectionType::SemanticVad).unwrap(),
            "\"semantic_vad\""
        );
    }
}
