pub mod geoip;
pub mod redirect;
pub mod shortener;

pub use redirect::RedirectService;
pub use shortener::{ShortenOutcome, ShortenRequest, ShortenerService};
