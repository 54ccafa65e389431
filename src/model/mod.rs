pub mod cancel;
pub mod config;
pub mod diagnostics;
pub mod expression;
pub mod matrices;
pub mod rss;
pub mod thresholds;
