//! Low-level helpers used by the runtime
//!
//! - **hash**: checksum specs and file digests
//! - **http**: one-shot downloads
//! - **git**: dependency cloning
//! - **url**: repository name extraction

pub mod git;
pub mod hash;
pub mod http;
pub mod url;
