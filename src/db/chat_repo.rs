use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use super::models::{ChatMessage, Conversation};
use crate::domain::canonical_pair;

/// One line of the inbox: the thread, who is on the other end, and where it stands.
#[derive(Debug, Clone, FromRow)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub other_user_id: Uuid,
    pub other_full_name: Option<String>,
    pub other_avatar_url: Option<String>,
    pub last_message_id: Option<Uuid>,
    pub last_message_sender_id: Option<Uuid>,
    pub last_message_content: Option<String>,
    pub last_message_is_read: Option<bool>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn find(db: &PgPool, id: Uuid) -> Result<Option<Conversation>> {
    sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("fetching conversation")
}

/// The pair's single conversation, created on first use.
pub async fn get_or_create<'e>(db: impl PgExecutor<'e>, a: Uuid, b: Uuid) -> Result<Conversation> {
    let (user_a, user_b) = canonical_pair(a, b);
    // no-op update so RETURNING also yields the existing row
    sqlx::query_as::<_, Conversation>(
        r#"INSERT INTO conversations (user_a_id, user_b_id)
           VALUES ($1, $2)
           ON CONFLICT (user_a_id, user_b_id)
           DO UPDATE SET user_a_id = EXCLUDED.user_a_id
           RETURNING *"#,
    )
    .bind(user_a)
    .bind(user_b)
    .fetch_one(db)
    .await
    .context("opening conversation")
}

/// Inbox for `user_id`, most recent activity first. `only` narrows it to one thread.
pub async fn summaries(
    db: &PgPool,
    user_id: Uuid,
    only: Option<Uuid>,
) -> Result<Vec<ConversationSummary>> {
    sqlx::query_as::<_, ConversationSummary>(
        r#"SELECT c.id,
                  other.id          AS other_user_id,
                  other.full_name   AS other_full_name,
                  other.avatar_url  AS other_avatar_url,
                  last.id           AS last_message_id,
                  last.sender_id    AS last_message_sender_id,
                  last.content      AS last_message_content,
                  last.is_read      AS last_message_is_read,
                  last.created_at   AS last_message_at,
                  (SELECT COUNT(*)
                     FROM messages m
                    WHERE m.conversation_id = c.id
                      AND m.sender_id <> $1
                      AND NOT m.is_read)      AS unread_count,
                  c.created_at,
                  c.updated_at
             FROM conversations c
             JOIN users other
               ON other.id = CASE WHEN c.user_a_id = $1 THEN c.user_b_id ELSE c.user_a_id END
             LEFT JOIN LATERAL (
                   SELECT id, sender_id, content, is_read, created_at
                     FROM messages
                    WHERE conversation_id = c.id
                    ORDER BY created_at DESC
                    LIMIT 1) last ON TRUE
            WHERE (c.user_a_id = $1 OR c.user_b_id = $1)
              AND ($2::uuid IS NULL OR c.id = $2)
            ORDER BY c.updated_at DESC"#,
    )
    .bind(user_id)
    .bind(only)
    .fetch_all(db)
    .await
    .context("listing conversations")
}

/// Marks everything the other side sent as read by `reader`.
pub async fn mark_read(db: &PgPool, conversation_id: Uuid, reader: Uuid) -> Result<u64> {
    Ok(sqlx::query(
        "UPDATE messages SET is_read = TRUE
          WHERE conversation_id = $1 AND sender_id <> $2 AND NOT is_read",
    )
    .bind(conversation_id)
    .bind(reader)
    .execute(db)
    .await
    .context("marking messages read")?
    .rows_affected())
}

/// Oldest first, `skip`/`limit` applied in that order.
pub async fn messages(
    db: &PgPool,
    conversation_id: Uuid,
    skip: i64,
    limit: i64,
) -> Result<Vec<ChatMessage>> {
    sqlx::query_as::<_, ChatMessage>(
        "SELECT * FROM messages
          WHERE conversation_id = $1
          ORDER BY created_at, id
         OFFSET $2 LIMIT $3",
    )
    .bind(conversation_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(db)
    .await
    .context("fetching messages")
}

pub async fn insert_message(
    db: &PgPool,
    conversation_id: Uuid,
    sender_id: Uuid,
    content: &str,
) -> Result<ChatMessage> {
    let mut tx = db.begin().await?;
    let message = sqlx::query_as::<_, ChatMessage>(
        "INSERT INTO messages (conversation_id, sender_id, content)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(conversation_id)
    .bind(sender_id)
    .bind(content)
    .fetch_one(&mut *tx)
    .await
    .context("inserting message")?;

    sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
        .bind(conversation_id)
        .execute(&mut *tx)
        .await
        .context("bumping conversation")?;
    tx.commit().await?;
    Ok(message)
}

/// Unread messages addressed to `user_id` across all threads.
pub async fn unread_total(db: &PgPool, user_id: Uuid) -> Result<i64> {
    sqlx::query_scalar(
        "SELECT COUNT(*)
           FROM messages m
           JOIN conversations c ON c.id = m.conversation_id
          WHERE (c.user_a_id = $1 OR c.user_b_id = $1)
            AND m.sender_id <> $1
            AND NOT m.is_read",
    )
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("counting unread messages")
}
