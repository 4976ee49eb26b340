pub mod har;

pub use har::HarParser;

use crate::error::Result;
use crate::models::CapturedExchange;

/// Trait for loading captured traffic (HAR exports, etc.)
pub trait CaptureParser {
    /// Parse a capture file or directory into request/response pairs
    fn parse(&self, path: &str) -> Result<Vec<CapturedExchange>>;
}
