//! CLI command handlers
//!
//! One `handle_*` function per subcommand. Argument parsing stays in
//! `main.rs`; the work happens in `backup` and `config`.

pub mod key;
pub mod run;
pub mod show;
pub mod verify;

pub use key::handle_init_key;
pub use run::{handle_backup, handle_init_store, handle_mount};
pub use show::handle_config;
pub use verify::handle_verify;
