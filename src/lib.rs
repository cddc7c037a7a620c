//! Price and quantity extraction for checkout widgets embedded in merchant
//! pages the widget does not control.
//!
//! The engine reads a price and a quantity out of arbitrary markup, turns them
//! into a total, and tells its caller whenever either input may have changed.
//! It runs against the [`host`] capability traits; [`Page`] is a deterministic
//! in-memory implementation of those traits.

use std::error::Error as StdError;
use std::fmt;

pub mod config;
pub mod coordinator;
mod dom;
pub mod extract;
mod form_controls;
pub mod host;
mod html;
pub mod logging;
pub mod numeric;
pub mod observer;
mod page;
mod selector;
pub mod total;

pub use config::WatchConfig;
pub use coordinator::{Observers, setup_observers};
pub use dom::NodeId;
pub use extract::{extract_price, extract_quantity};
pub use host::{
    Callback, Document, ElementKind, EventBridge, MutationWatch, NativeEvent, ObservationHost,
    Registration, Role, SelectorBinding, Subscription,
};
pub use numeric::{parse_price, parse_quantity};
pub use observer::{ChangeObserver, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
pub use page::{Page, PageEventBridge, PendingTimer};
pub use total::{TotalTracker, calculate_total, calculate_total_for};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    Dom(String),
    UnsupportedSelector(String),
    SelectorNotFound(String),
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    InvalidConfig(String),
    Timer(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::Dom(msg) => write!(f, "dom error: {msg}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::TypeMismatch {
                selector,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for {selector}: expected {expected}, actual {actual}"
            ),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Timer(msg) => write!(f, "timer error: {msg}"),
        }
    }
}

impl StdError for Error {}
