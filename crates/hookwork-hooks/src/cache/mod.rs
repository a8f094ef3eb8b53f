//! In-memory rule cache
//!
//! The cache is consulted on every trigger so matching never touches the
//! persistent store. It is a projection of store state: only the
//! `RuleManager` (definitions) and the stats recorder (statistics) write to
//! it, and only after the store accepted the change.
//!
//! # Examples
//!
//! ```ignore
//! use hookwork_hooks::cache::RuleCache;
//! use hookwork_hooks::TriggerKind;
//!
//! let cache = RuleCache::new();
//! cache.replace_all(store.load_enabled_rules().await?)?;
//!
//! for rule in cache.candidates(&TriggerKind::PostPublished)? {
//!     println!("{} listens for post.published", rule.name);
//! }
//! ```

pub mod rule_cache;

pub use rule_cache::RuleCache;
