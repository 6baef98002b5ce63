//! Lifecycle hooks.
//!
//! Each table owns one [`TableHooks`] holding an ordered subscriber list
//! per [`HookEvent`]. Dispatch works on a snapshot of the list taken when it
//! starts, so subscribing or unsubscribing from inside a running hook never
//! disturbs the dispatch in progress.
//!
//! | event      | signature                                             |
//! |------------|-------------------------------------------------------|
//! | `creating` | `(Option<&Key>, &mut Record) -> ()`                   |
//! | `reading`  | `(Record) -> Record`                                  |
//! | `updating` | `(&Modifications, &Key, &Record) -> Option<Modifications>` |
//! | `writing`  | `(Record) -> Record`                                  |
//! | `deleting` | `(&Key, &Record) -> ()`                               |
//!
//! Every callback returns a [`HookResult`](crate::HookResult); an error
//! fails the operation with [`CoreError::HookExecution`](crate::CoreError)
//! and aborts the enclosing transaction.
//!
//! Hooks are synchronous: they run inline in the operation that triggered
//! them and cannot suspend. Per-record work that needs to await belongs in
//! [`Collection::modify_async`](crate::Collection::modify_async).

mod event;
mod registry;

pub use event::HookEvent;
pub use registry::{
    CreatingHook, DeletingHook, Hook, HookRegistry, ReadingHook, Subscription, TableHooks,
    UpdatingHook, WritingHook,
};
