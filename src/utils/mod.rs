//! Helpers that live next to the store
//!
//! - `scrape`: fetch a URL (GET, or form-encoded POST with parameters)
//! - `pdftoxml`: convert PDF bytes to XML with the external `pdftohtml` tool
//! - `status`: retained no-op from the hosted platform era

mod pdf;
mod scrape;
mod status;

pub use pdf::{find_executable, pdftoxml, PDFTOHTML};
pub use scrape::scrape;
pub use status::status;
