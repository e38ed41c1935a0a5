//! Key-based join and aggregation of statistics dumps.
//!
//! Two record collections are outer-joined on `id`: records that share an id
//! are folded together with [`Record::combine`], the result is ordered by
//! cost and persisted as a flat binary dump.
//!
//! ```
//! use statjoin::{Record, join, sort_by_cost};
//!
//! let a = [Record::new(7, 1, 2.5, true, 1)];
//! let b = [Record::new(7, 2, 0.5, false, 3), Record::new(8, 1, 1.0, true, 0)];
//!
//! let mut out = join(&a, &b).unwrap();
//! sort_by_cost(&mut out);
//! assert_eq!(out[0].id, 8);
//! assert_eq!(out[1], Record::new(7, 3, 3.0, false, 3));
//! ```
#![forbid(unsafe_code)]

pub mod dump;
pub mod error;
pub mod index;
pub mod join;
pub mod order;
pub mod record;
pub mod selftest;

pub use dump::{RECORD_SIZE, load_dump, store_dump};
pub use error::{Error, Result};
pub use index::{IndexConfig, KeyIndex};
pub use join::{join, join_with_config};
pub use order::sort_by_cost;
pub use record::Record;
