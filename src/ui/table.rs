use tabled::{Table, Tabled, settings::Style};

use crate::model::{Review, Session};
use crate::storage::DbStats;

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Table")]
    table: &'static str,
    #[tabled(rename = "Rows")]
    rows: usize,
}

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "Session")]
    id: String,
    #[tabled(rename = "Active")]
    active: &'static str,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Expires")]
    expires: String,
    #[tabled(rename = "Last activity")]
    last_activity: String,
}

#[derive(Tabled)]
struct ReviewRow {
    #[tabled(rename = "Review")]
    id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Ratings")]
    ratings: String,
    #[tabled(rename = "Text")]
    text: String,
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn stats_table(stats: &DbStats) -> String {
    render(&[
        StatRow { table: "user", rows: stats.users },
        StatRow { table: "topic", rows: stats.topics },
        StatRow { table: "review", rows: stats.reviews },
        StatRow { table: "session", rows: stats.sessions },
    ])
}

pub fn sessions_table(sessions: &[Session]) -> String {
    let rows: Vec<SessionRow> = sessions
        .iter()
        .map(|s| SessionRow {
            id: s.id.clone(),
            active: if s.is_active { "yes" } else { "no" },
            created: s.created_at.format(TIME_FORMAT).to_string(),
            expires: s.expires_at.format(TIME_FORMAT).to_string(),
            last_activity: s.last_activity_at.format(TIME_FORMAT).to_string(),
        })
        .collect();
    render(&rows)
}

pub fn reviews_table(reviews: &[Review]) -> String {
    let rows: Vec<ReviewRow> = reviews
        .iter()
        .map(|r| ReviewRow {
            id: r.id.clone(),
            status: r.status.to_string(),
            ratings: format!("{:?}", r.ratings),
            text: r.review_text.clone(),
        })
        .collect();
    render(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(sessions_table(&[]).is_empty());
        assert!(reviews_table(&[]).is_empty());
    }

    #[test]
    fn test_stats_table_lists_every_table() {
        let out = stats_table(&DbStats { users: 2, topics: 1, reviews: 0, sessions: 3 });
        for name in ["user", "topic", "review", "session"] {
            assert!(out.contains(name));
        }
    }

    #[test]
    fn test_sessions_table_shows_state() {
        let s = Session::new("u1", true);
        let out = sessions_table(&[s.clone()]);
        assert!(out.contains(&s.id));
        assert!(out.contains("yes"));
    }
}
