//! scour application crate — socket console sessions, the HTTP invoker, and
//! the record server behind `--create-socket`.

pub mod console;
pub mod invoke;
pub mod server;

pub use console::{Console, SessionOutcome, Transcript};
pub use invoke::{invoke, NormalizedHeaders};
pub use server::RecordServer;
