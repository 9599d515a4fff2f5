//! Change Propagator: keeps consumers of a built graph informed of edits

pub mod debounce;
pub mod event;
pub mod filter;
pub mod propagator;

pub use event::{ChangeEvent, ChangeKind, ChangeNotice};
pub use filter::{RunTokenFilter, is_ignored};
pub use propagator::{ChangePropagator, DEFAULT_DEBOUNCE, SUBSCRIBER_QUEUE, Subscription, WatchError};
