//! Lifecycle events.

use std::fmt;

/// A lifecycle event a hook can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// A record is about to be created by `add`/`put`.
    Creating,
    /// A record was read and is about to be handed to the caller.
    Reading,
    /// A record is about to be changed by `update`/`modify`.
    Updating,
    /// A record is about to be persisted.
    Writing,
    /// A record is about to be deleted.
    Deleting,
}

impl HookEvent {
    /// All events, in pipeline order.
    pub const ALL: [HookEvent; 5] = [
        HookEvent::Creating,
        HookEvent::Reading,
        HookEvent::Updating,
        HookEvent::Writing,
        HookEvent::Deleting,
    ];

    /// Returns the event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HookEvent::Creating => "creating",
            HookEvent::Reading => "reading",
            HookEvent::Updating => "updating",
            HookEvent::Writing => "writing",
            HookEvent::Deleting => "deleting",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
