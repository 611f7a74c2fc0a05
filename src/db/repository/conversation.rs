use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::Conversation;

/// Insert or replace a whole conversation record.
pub fn put_conversation(conn: &Connection, conv: &Conversation) -> Result<(), DatabaseError> {
    let messages = serde_json::to_string(&conv.messages).map_err(|e| {
        DatabaseError::CorruptRecord {
            entity_type: "conversation".into(),
            id: conv.id.clone(),
            reason: e.to_string(),
        }
    })?;
    conn.execute(
        "INSERT INTO conversations (id, title, messages) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET title = excluded.title, messages = excluded.messages",
        params![conv.id, conv.title, messages],
    )?;
    Ok(())
}

pub fn get_conversation(
    conn: &Connection,
    id: &str,
) -> Result<Option<Conversation>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, title, messages FROM conversations WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    );

    match result {
        Ok((id, title, messages)) => Ok(Some(decode_record(id, title, &messages)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All conversations, newest first (ids are timestamp-derived strings and
/// compare numerically).
pub fn list_conversations(conn: &Connection) -> Result<Vec<Conversation>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, messages FROM conversations ORDER BY CAST(id AS INTEGER) DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut conversations = Vec::new();
    for row in rows {
        let (id, title, messages) = row?;
        conversations.push(decode_record(id, title, &messages)?);
    }
    Ok(conversations)
}

/// Delete a conversation and everything it contains. Returns whether a
/// record was actually removed.
pub fn delete_conversation(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let rows_affected = conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
    Ok(rows_affected > 0)
}

/// The singleton pointer at the conversation shown on startup.
pub fn set_current_conversation_id(
    conn: &Connection,
    id: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO current_conversation (key, value) VALUES ('currentId', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![id],
    )?;
    Ok(())
}

pub fn get_current_conversation_id(conn: &Connection) -> Result<Option<String>, DatabaseError> {
    let result = conn.query_row(
        "SELECT value FROM current_conversation WHERE key = 'currentId'",
        [],
        |row| row.get::<_, Option<String>>(0),
    );
    match result {
        Ok(value) => Ok(value),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn decode_record(
    id: String,
    title: String,
    messages: &str,
) -> Result<Conversation, DatabaseError> {
    let mut messages: Vec<crate::models::Message> =
        serde_json::from_str(messages).map_err(|e| DatabaseError::CorruptRecord {
            entity_type: "conversation".into(),
            id: id.clone(),
            reason: e.to_string(),
        })?;
    // Records written before tags were configurable carry no end tag.
    for msg in &mut messages {
        msg.backfill_end_tag();
    }
    Ok(Conversation { id, title, messages })
}
