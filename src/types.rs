#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Storage categories mirrored under each item's key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Downloads,
    Ocr,
    Thumbnails,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Downloads, Category::Ocr, Category::Thumbnails];

    /// Path segment used in the object key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Downloads => "downloads",
            Category::Ocr => "ocr",
            Category::Thumbnails => "thumbnails",
        }
    }

    /// Object key prefix for this category of `item_id`.
    pub fn prefix_for(&self, item_id: &str) -> String {
        format!("{}/{}", item_id, self.as_str())
    }
}
