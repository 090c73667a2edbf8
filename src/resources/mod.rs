//! The three resources a backup target is built from
//!
//! - `RemoteShare`: the network share (or pre-mounted device) holding the
//!   store file
//! - `EncryptedVolume`: the LUKS container inside it
//! - `LocalVolume`: the btrfs filesystem inside the container
//!
//! Each implements `guard::Resource`, so `guard::Guards` handles recovery,
//! retry and unwind uniformly.

mod mount_table;
mod remote;
mod store;
mod volume;

pub use mount_table::MountTable;
pub use remote::RemoteShare;
pub use store::EncryptedVolume;
pub use volume::LocalVolume;
