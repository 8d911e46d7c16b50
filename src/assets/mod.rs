//! Durable asset persistence and media-assembly result resolution.

pub mod assembly;
pub mod persister;

pub use assembly::{resolve_assembly_output, AssemblyResolution};
pub use persister::{AssetKind, AssetPersister, DurableAsset};
