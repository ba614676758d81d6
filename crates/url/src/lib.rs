pub mod filter;
pub mod fingerprint;

pub use filter::{accept, parse, FilterReject};
pub use fingerprint::page_id;
