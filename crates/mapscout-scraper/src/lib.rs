pub mod browser;
pub mod cancel;
pub mod dedup;
pub mod detail;
pub mod enrich;
pub mod error;
pub mod events;
mod pacing;
pub mod scheduler;
pub mod scroll;
pub mod session;

pub use browser::{Browser, ChromiumBrowser, LaunchOptions, Locator, PageHandle};
pub use cancel::CancellationToken;
pub use dedup::{DedupDecision, DedupIndex, PlaceIdentity};
pub use detail::{DetailExtractor, FieldStrategy};
pub use enrich::{ContactEnricher, Enrichment};
pub use error::{BrowserError, ScoutError};
pub use events::{ChannelObserver, SessionEvent, SessionObserver};
pub use scheduler::{ExtractionScheduler, SchedulerSummary};
pub use scroll::{ScrollCollector, ScrollState};
pub use session::{SearchQuery, SearchSession, SessionReport, StopHandle};
