pub mod bridge;
pub mod dark;
pub mod inject;
pub mod query;

pub use bridge::PageBridge;
pub use query::PageQuery;
