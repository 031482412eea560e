//! Database schema definitions
//!
//! Each table is declared once as DDL text. Column lists, defaults and the
//! primary key are derived from that text, so the store never carries a
//! second hand-written description of a table.

use std::collections::HashMap;
use std::sync::OnceLock;

/// SQL to create the user table
pub const CREATE_USER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    hashed_password BLOB NOT NULL,
    email TEXT NOT NULL UNIQUE
)
"#;

/// SQL to create the topic table
pub const CREATE_TOPIC_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS topic (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES user (id) ON DELETE CASCADE
)
"#;

/// SQL to create the review table
/// `review_ratings` holds a JSON array of integers
pub const CREATE_REVIEW_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS review (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    topic_id TEXT NOT NULL,
    review_text TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('draft', 'published')),
    review_ratings TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES user (id) ON DELETE CASCADE,
    FOREIGN KEY (topic_id) REFERENCES topic (id) ON DELETE CASCADE
)
"#;

/// SQL to create the session table
pub const CREATE_SESSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS session (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    last_activity_at TEXT NOT NULL,
    is_active INTEGER NOT NULL CHECK (is_active IN (0, 1)),
    FOREIGN KEY (user_id) REFERENCES user (id) ON DELETE CASCADE
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_topic_user ON topic(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_review_user ON review(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_review_topic ON review(topic_id)",
    "CREATE INDEX IF NOT EXISTS idx_session_user ON session(user_id)",
];

/// A registered table: its name and the DDL that declares it.
#[derive(Debug)]
pub struct TableDef {
    pub name: &'static str,
    pub ddl: &'static str,
}

/// A column as declared in a table's DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub has_default: bool,
    pub primary_key: bool,
}

/// Every table, parents before children.
pub const TABLES: &[TableDef] = &[
    TableDef { name: "user", ddl: CREATE_USER_TABLE },
    TableDef { name: "topic", ddl: CREATE_TOPIC_TABLE },
    TableDef { name: "review", ddl: CREATE_REVIEW_TABLE },
    TableDef { name: "session", ddl: CREATE_SESSION_TABLE },
];

const CONSTRAINT_KEYWORDS: &[&str] = &["FOREIGN", "PRIMARY", "CHECK", "UNIQUE", "CONSTRAINT"];

static COLUMNS: OnceLock<HashMap<&'static str, Vec<ColumnDef>>> = OnceLock::new();

impl TableDef {
    /// Columns in declaration order
    pub fn columns(&self) -> &'static [ColumnDef] {
        let parsed = COLUMNS.get_or_init(|| {
            TABLES
                .iter()
                .map(|table| (table.name, parse_columns(table.ddl)))
                .collect()
        });
        parsed.get(self.name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Columns a saved row must supply (those without a DEFAULT)
    pub fn required_columns(&self) -> impl Iterator<Item = &'static ColumnDef> {
        self.columns().iter().filter(|c| !c.has_default)
    }

    /// Name of the primary key column
    pub fn primary_key(&self) -> Option<&'static str> {
        self.columns()
            .iter()
            .find(|c| c.primary_key)
            .map(|c| c.name.as_str())
    }
}

/// Look up a registered table by name
pub fn table(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.name == name)
}

/// Extract column definitions from `CREATE TABLE` text.
///
/// Only commas at nesting depth one separate entries, so constraint clauses
/// such as `FOREIGN KEY (a) REFERENCES t (id)` or `CHECK (x IN (0, 1))` stay
/// whole and are then skipped as table constraints.
pub fn parse_columns(ddl: &str) -> Vec<ColumnDef> {
    let Some(open) = ddl.find('(') else {
        return Vec::new();
    };
    let Some(close) = ddl.rfind(')') else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }

    split_top_level(&ddl[open + 1..close])
        .into_iter()
        .filter_map(|entry| {
            let mut tokens = entry.split_whitespace();
            let name = tokens.next()?;
            let upper = name.to_ascii_uppercase();
            if CONSTRAINT_KEYWORDS.contains(&upper.as_str()) {
                return None;
            }
            let rest: Vec<String> = tokens.map(|t| t.to_ascii_uppercase()).collect();
            let has_default = rest.iter().any(|t| t == "DEFAULT");
            let primary_key = rest.windows(2).any(|w| w[0] == "PRIMARY" && w[1] == "KEY");
            Some(ColumnDef {
                name: name.trim_matches(|c| c == '"' || c == '`').to_string(),
                has_default,
                primary_key,
            })
        })
        .collect()
}

fn split_top_level(body: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in body.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                entries.push(body[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(body[start..].trim());
    entries.retain(|e| !e.is_empty());
    entries
}

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts: Vec<&'static str> = TABLES.iter().map(|t| t.ddl).collect();
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
