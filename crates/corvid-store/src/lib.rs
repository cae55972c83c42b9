//! Durable key→value configuration stores for the corvid bot core
//!
//! One [`KeyedStore`] per backing JSON file, handed out as shared references
//! through a [`StoreRegistry`], with [`GuildScopedTable`] layering per-guild
//! partitioning on top.

pub mod registry;
pub mod scoped;
pub mod store;

pub use registry::StoreRegistry;
pub use scoped::GuildScopedTable;
pub use store::KeyedStore;
