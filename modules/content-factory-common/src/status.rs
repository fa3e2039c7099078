//! Lifecycle enums and their transition rules.
//!
//! Every enum here is stored as lowercase text in the database and
//! serialized the same way over the API.

use crate::error::{ContentFactoryError, Result};

/// Declares a text-backed enum with `as_str`, `Display` and `FromStr`.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash,
            ::serde::Serialize, ::serde::Deserialize, ::schemars::JsonSchema,
        )]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::ContentFactoryError;

            fn from_str(s: &str) -> $crate::error::Result<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::error::ContentFactoryError::Validation(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

pub(crate) use text_enum;

text_enum!(
    /// Where a content item sits in the approve-and-generate flow.
    ContentStatus {
        Pending => "pending",
        Scored => "scored",
        Approved => "approved",
        Completed => "completed",
        Archived => "archived",
    }
);

impl ContentStatus {
    pub fn can_transition_to(self, next: ContentStatus) -> bool {
        use ContentStatus::*;
        match (self, next) {
            (Archived, _) => false,
            (_, Archived) => true,
            (Pending, Scored) => true,
            (Pending | Scored | Approved, Approved) => true,
            (Approved, Completed) => true,
            _ => false,
        }
    }

    pub fn transition(self, next: ContentStatus) -> Result<ContentStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ContentFactoryError::InvalidTransition {
                entity: "content",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

text_enum!(
    /// The stage a pipeline run executes.
    RunKind {
        Discovery => "discovery",
        Harvest => "harvest",
        Scoring => "scoring",
        Generation => "generation",
    }
);

text_enum!(
    RunStatus {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
);

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn can_transition_to(self, next: RunStatus) -> bool {
        use RunStatus::*;
        matches!(
            (self, next),
            (Queued, Running) | (Queued, Failed) | (Running, Completed) | (Running, Failed)
        )
    }

    pub fn transition(self, next: RunStatus) -> Result<RunStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ContentFactoryError::InvalidTransition {
                entity: "run",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

text_enum!(
    PlanStatus {
        Draft => "draft",
        Ready => "ready",
        Published => "published",
    }
);

text_enum!(
    CarouselStatus {
        Ready => "ready",
        Published => "published",
    }
);

text_enum!(
    /// Slide color scheme.
    Theme {
        Dark => "dark",
        Light => "light",
    }
);

impl Theme {
    /// Unknown theme names fall back to dark.
    pub fn from_name(name: &str) -> Theme {
        name.parse().unwrap_or(Theme::Dark)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Dark
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_happy_path() {
        let s = ContentStatus::Pending;
        let s = s.transition(ContentStatus::Scored).unwrap();
        let s = s.transition(ContentStatus::Approved).unwrap();
        let s = s.transition(ContentStatus::Completed).unwrap();
        assert_eq!(s, ContentStatus::Completed);
    }

    #[test]
    fn content_can_be_approved_without_score() {
        assert!(ContentStatus::Pending.can_transition_to(ContentStatus::Approved));
        assert!(ContentStatus::Approved.can_transition_to(ContentStatus::Approved));
    }

    #[test]
    fn archived_content_is_frozen() {
        for next in ContentStatus::ALL {
            assert!(!ContentStatus::Archived.can_transition_to(*next));
        }
    }

    #[test]
    fn completed_content_cannot_be_rescored_or_reapproved() {
        let err = ContentStatus::Completed
            .transition(ContentStatus::Approved)
            .unwrap_err();
        assert!(matches!(err, ContentFactoryError::InvalidTransition { .. }));
        assert!(!ContentStatus::Scored.can_transition_to(ContentStatus::Scored));
        assert!(ContentStatus::Completed.can_transition_to(ContentStatus::Archived));
    }

    #[test]
    fn terminal_runs_do_not_move() {
        for next in RunStatus::ALL {
            assert!(!RunStatus::Completed.can_transition_to(*next));
            assert!(!RunStatus::Failed.can_transition_to(*next));
        }
        assert!(RunStatus::Queued.can_transition_to(RunStatus::Failed));
        assert!(!RunStatus::Queued.can_transition_to(RunStatus::Completed));
    }

    #[test]
    fn parse_is_case_insensitive_and_rejects_unknown() {
        assert_eq!("Harvest".parse::<RunKind>().unwrap(), RunKind::Harvest);
        assert!("publish".parse::<RunKind>().is_err());
        assert_eq!(Theme::from_name("neon"), Theme::Dark);
        assert_eq!(Theme::from_name("light"), Theme::Light);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(
            serde_json::to_value(RunStatus::Running).unwrap(),
            serde_json::json!("running")
        );
        let kind: RunKind = serde_json::from_value(serde_json::json!("scoring")).unwrap();
        assert_eq!(kind, RunKind::Scoring);
    }
}
