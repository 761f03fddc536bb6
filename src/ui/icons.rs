pub struct Icons;

impl Icons {
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const DATABASE: &str = "🗄️";
    pub const KEY: &str = "🔑";
    pub const TREE: &str = "🌳";
    pub const MAG: &str = "🔎";
}
