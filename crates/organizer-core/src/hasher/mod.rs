pub mod digest;

pub use digest::{content_digest, partial_hash};
