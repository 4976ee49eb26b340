pub mod error;
pub mod models;
pub mod normalize;
pub mod comparator;
pub mod classifier;
pub mod session;
pub mod aggregator;
pub mod replay;
pub mod analyzer;
pub mod parsers;
pub mod reporting;

// Re-export commonly used items
pub use error::*;
pub use models::*;
pub use normalize::*;
pub use comparator::*;
pub use classifier::*;
pub use session::*;
pub use aggregator::*;
pub use replay::*;
pub use analyzer::*;
pub use parsers::*;
pub use reporting::*;
