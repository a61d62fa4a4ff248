use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open ledger at {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Single-row credential store
        CREATE TABLE IF NOT EXISTS identity (
            id        INTEGER PRIMARY KEY CHECK (id = 1),
            token     TEXT NOT NULL,
            login     TEXT NOT NULL,
            scope     TEXT,
            saved_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS published (
            id           INTEGER PRIMARY KEY,
            path         TEXT NOT NULL,
            owner        TEXT NOT NULL,
            repo         TEXT NOT NULL,
            sha          TEXT NOT NULL,
            question_id  TEXT NOT NULL,
            title        TEXT NOT NULL,
            action       TEXT NOT NULL CHECK(action IN ('created','updated')),
            synced_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_published_question ON published(question_id);
        ",
    )?;
    Ok(())
}

// ── Identity ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub token: String,
    pub login: String,
    pub scope: Option<String>,
}

pub fn save_credential(conn: &Connection, cred: &StoredCredential) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO identity (id, token, login, scope, saved_at)
         VALUES (1, ?1, ?2, ?3, datetime('now'))",
        params![cred.token, cred.login, cred.scope],
    )?;
    Ok(())
}

pub fn load_credential(conn: &Connection) -> Result<Option<StoredCredential>> {
    let cred = conn
        .query_row(
            "SELECT token, login, scope FROM identity WHERE id = 1",
            [],
            |row| {
                Ok(StoredCredential {
                    token: row.get(0)?,
                    login: row.get(1)?,
                    scope: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(cred)
}

pub fn clear_credential(conn: &Connection) -> Result<bool> {
    let removed = conn.execute("DELETE FROM identity", [])?;
    Ok(removed > 0)
}

// ── Ledger ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishAction {
    Created,
    Updated,
}

impl PublishAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishAction::Created => "created",
            PublishAction::Updated => "updated",
        }
    }
}

pub struct PublishedRow {
    pub path: String,
    pub owner: String,
    pub repo: String,
    pub sha: String,
    pub question_id: String,
    pub title: String,
    pub action: PublishAction,
}

pub fn record_publish(conn: &Connection, row: &PublishedRow) -> Result<()> {
    conn.execute(
        "INSERT INTO published (path, owner, repo, sha, question_id, title, action)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            row.path,
            row.owner,
            row.repo,
            row.sha,
            row.question_id,
            row.title,
            row.action.as_str(),
        ],
    )?;
    Ok(())
}

pub struct HistoryEntry {
    pub question_id: String,
    pub title: String,
    pub repo: String,
    pub path: String,
    pub action: String,
    pub synced_at: String,
}

/// Most recent first.
pub fn fetch_history(conn: &Connection, limit: usize) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT question_id, title, owner || '/' || repo, path, action, synced_at
         FROM published
         ORDER BY id DESC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(HistoryEntry {
                question_id: row.get(0)?,
                title: row.get(1)?,
                repo: row.get(2)?,
                path: row.get(3)?,
                action: row.get(4)?,
                synced_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub syncs: usize,
    pub problems: usize,
    pub created: usize,
    pub updated: usize,
    pub last_sync: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let syncs: usize = conn.query_row("SELECT COUNT(*) FROM published", [], |r| r.get(0))?;
    let problems: usize = conn.query_row(
        "SELECT COUNT(DISTINCT owner || '/' || repo || ':' || question_id) FROM published",
        [],
        |r| r.get(0),
    )?;
    let created: usize = conn.query_row(
        "SELECT COUNT(*) FROM published WHERE action = 'created'",
        [],
        |r| r.get(0),
    )?;
    let last_sync: Option<String> =
        conn.query_row("SELECT MAX(synced_at) FROM published", [], |r| r.get(0))?;
    Ok(Stats {
        syncs,
        problems,
        created,
        updated: syncs - created,
        last_sync,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn row(question_id: &str, action: PublishAction) -> PublishedRow {
        PublishedRow {
            path: format!("solutions/{:0>4}-x/README.md", question_id),
            owner: "octo".into(),
            repo: "sols".into(),
            sha: "abc".into(),
            question_id: question_id.into(),
            title: format!("Problem {}", question_id),
            action,
        }
    }

    #[test]
    fn connect_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.sqlite");
        let conn = connect(&path).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn credential_round_trip_and_clear() {
        let conn = memory();
        assert!(load_credential(&conn).unwrap().is_none());

        let cred = StoredCredential {
            token: "t1".into(),
            login: "octo".into(),
            scope: Some("repo".into()),
        };
        save_credential(&conn, &cred).unwrap();
        save_credential(
            &conn,
            &StoredCredential {
                token: "t2".into(),
                ..cred.clone()
            },
        )
        .unwrap();
        assert_eq!(load_credential(&conn).unwrap().unwrap().token, "t2");

        assert!(clear_credential(&conn).unwrap());
        assert!(!clear_credential(&conn).unwrap());
        assert!(load_credential(&conn).unwrap().is_none());
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let conn = memory();
        record_publish(&conn, &row("1", PublishAction::Created)).unwrap();
        record_publish(&conn, &row("2", PublishAction::Created)).unwrap();
        record_publish(&conn, &row("1", PublishAction::Updated)).unwrap();

        let history = fetch_history(&conn, 2).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question_id, "1");
        assert_eq!(history[0].action, "updated");
        assert_eq!(history[1].question_id, "2");
        assert_eq!(history[0].repo, "octo/sols");
    }

    #[test]
    fn stats_count_distinct_problems() {
        let conn = memory();
        let empty = get_stats(&conn).unwrap();
        assert_eq!(empty.syncs, 0);
        assert!(empty.last_sync.is_none());

        record_publish(&conn, &row("1", PublishAction::Created)).unwrap();
        record_publish(&conn, &row("1", PublishAction::Updated)).unwrap();
        record_publish(&conn, &row("7", PublishAction::Created)).unwrap();

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.syncs, 3);
        assert_eq!(stats.problems, 2);
        assert_eq!(stats.created, 2);
        assert_eq!(stats.updated, 1);
        assert!(stats.last_sync.is_some());
    }
}
