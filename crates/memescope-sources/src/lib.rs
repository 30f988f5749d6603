//! External collaborators of the collection stage: a web-search API client
//! and a page navigator that returns a page's title and visible text.

pub mod error;
pub mod html;
pub mod navigate;
pub mod search;

pub use error::SourceError;
pub use navigate::{target_url, HttpNavigator, PageNavigator, PageSnapshot, KNOWN_TARGETS};
pub use search::{SearchResult, TavilyClient, WebSearch};
