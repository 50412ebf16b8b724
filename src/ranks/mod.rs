pub mod table;

pub use table::{RankEntry, RankTable, RankTableError, RankThreshold};
