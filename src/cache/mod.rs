//! Named cache buckets for offline assets
//!
//! A bucket maps GET requests to stored responses. The bucket for the
//! current deployment is chosen by a naming policy; older buckets are
//! purged when a new worker activates.
//!
//! # Naming policies
//!
//! | Policy | Name | Changes |
//! |--------|------|---------|
//! | date | `{month}-{day}` | every calendar day |
//! | build | `<prefix>-<YYYYMMDD.HHMMSS>` | once per publish |
//!
//! # Backends
//!
//! - `MemoryStorage`: in-process, lost on exit
//! - `DiskStorage`: one directory per bucket under a root directory

pub mod disk;
pub mod memory;
pub mod naming;
pub mod storage;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;
pub use naming::{BuildStamp, CacheNamingPolicy, Clock, PolicyKind, SystemClock};
pub use storage::{CacheMatch, CacheStorage};
