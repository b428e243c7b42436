pub mod browser;
pub mod contact;
pub mod discovery;
pub mod extractor;
pub mod selectors;
pub mod traits;

pub use browser::ChromeSession;
pub use contact::{reveal_contact, RevealStatus, RevealTiming};
pub use discovery::{discover, DiscoveryConfig, DiscoveryOutcome};
pub use extractor::{AdExtractor, ExtractorConfig};
pub use traits::{RenderSession, RenderedPage};
