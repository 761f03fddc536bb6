pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, info, miss, section, summary_row, warn};
pub use table::{ChildRow, TableBuilder, children_table, stats_table};
pub use theme::{theme, Theme};
