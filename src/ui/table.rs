use crate::storage::CacheStats;
use crate::value::AttrType;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Type")]
    pub metric: String,
    #[tabled(rename = "Rows")]
    pub value: String,
}

#[derive(Tabled)]
pub struct ChildRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub ty: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Row counts per type, every type listed
pub fn stats_table(stats: &CacheStats) -> String {
    let mut builder = TableBuilder::new();
    for ty in AttrType::all() {
        builder.add_row(ty.as_str(), &stats.count(*ty).to_string());
    }
    if stats.unknown > 0 {
        builder.add_row("unknown", &stats.unknown.to_string());
    }
    builder.add_row("total", &stats.total().to_string());
    builder.build()
}

pub fn children_table(rows: Vec<ChildRow>) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}
