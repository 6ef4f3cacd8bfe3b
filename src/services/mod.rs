mod content_fetcher;
mod notifier;
mod share_link;
mod tracker;

pub use content_fetcher::{failure_placeholder, ContentFetcher, FetchedPage, Fetcher};
pub use notifier::{LogNotifier, Notifier, PokeNotifier};
pub use share_link::ShareLinkValidator;
pub use tracker::{submitter_name, SubmissionTracker};
