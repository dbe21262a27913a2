//! I/O layer: decoding uploads into RGBA, PNG writers, and the session
//! storage collaborator that persists results and builds their URLs.
pub mod decode;
pub use decode::decode_rgba;

pub mod storage;
pub use storage::{Session, SessionStore, StoredResult};

pub mod writers;
