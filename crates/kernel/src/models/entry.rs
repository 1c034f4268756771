//! Entry model and CRUD operations.
//!
//! Entries are the stored journal posts. Listing goes through the query
//! builder in `crate::query`; everything here is keyed retrieval and
//! mutation scoped to a single entry.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use uuid::Uuid;

use crate::middleware::AuthUser;

/// Columns selected for every full entry fetch. Kept in one place so the
/// query builder and the keyed lookups stay in sync with `FromRow`.
pub const ENTRY_COLUMNS: &str = "id, owner_id, created_at, updated_at, title, body, tags, mood, visibility, viewers, attachments";

/// Access tier of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Only the owner may read.
    Private,
    /// The owner plus everyone on the viewer list.
    Shared,
    /// Anyone may read.
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Shared => "shared",
            Visibility::Public => "public",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Visibility {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Visibility::Private),
            "shared" => Ok(Visibility::Shared),
            "public" => Ok(Visibility::Public),
            other => Err(UnknownVariant {
                field: "visibility",
                value: other.to_string(),
            }),
        }
    }
}

/// Mood label attached to an entry. Closed set; stored lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Excited,
    Calm,
    Anxious,
    Grateful,
    Angry,
    Tired,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Excited => "excited",
            Mood::Calm => "calm",
            Mood::Anxious => "anxious",
            Mood::Grateful => "grateful",
            Mood::Angry => "angry",
            Mood::Tired => "tired",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mood {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "happy" => Ok(Mood::Happy),
            "sad" => Ok(Mood::Sad),
            "excited" => Ok(Mood::Excited),
            "calm" => Ok(Mood::Calm),
            "anxious" => Ok(Mood::Anxious),
            "grateful" => Ok(Mood::Grateful),
            "angry" => Ok(Mood::Angry),
            "tired" => Ok(Mood::Tired),
            other => Err(UnknownVariant {
                field: "mood",
                value: other.to_string(),
            }),
        }
    }
}

/// Parse error for the closed string enumerations above.
#[derive(Debug, thiserror::Error)]
#[error("unknown {field}: {value}")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

// Both enums live in TEXT columns; delegate the sqlx plumbing to &str
// rather than introducing Postgres enum types the migrations would then own.
macro_rules! text_enum_sqlx {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> PgTypeInfo {
                <&str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(text.parse::<$ty>()?)
            }
        }
    };
}

text_enum_sqlx!(Visibility);
text_enum_sqlx!(Mood);

/// Journal entry record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Entry {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Verified subject id of the creator. Sole mutator and deleter.
    pub owner_id: String,

    /// Creation time; immutable, and the sort key for all listing.
    pub created_at: DateTime<Utc>,

    /// Last mutation time.
    pub updated_at: DateTime<Utc>,

    pub title: String,

    pub body: String,

    /// Free-form string tags.
    pub tags: Vec<String>,

    pub mood: Option<Mood>,

    pub visibility: Visibility,

    /// Verified emails allowed to read when visibility is `shared`.
    pub viewers: Vec<String>,

    /// Opaque attachment keys resolved by the attachment store.
    pub attachments: Vec<String>,
}

/// Input for creating a new entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEntry {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub mood: Option<Mood>,
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub viewers: Vec<String>,
}

/// Input for updating an entry. `None` fields are left unchanged.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEntry {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
    pub mood: Option<Mood>,
    pub visibility: Option<Visibility>,
    pub viewers: Option<Vec<String>>,
}

impl Entry {
    /// Whether `caller` created this entry. Ownership compares subject ids,
    /// never emails.
    pub fn is_owner(&self, caller: &AuthUser) -> bool {
        self.owner_id == caller.sub
    }

    /// Whether `caller` may read this entry. Sharing compares verified
    /// emails (the viewer list is invite-by-address), case-insensitively.
    pub fn can_view(&self, caller: &AuthUser) -> bool {
        if self.is_owner(caller) {
            return true;
        }
        match self.visibility {
            Visibility::Public => true,
            Visibility::Private => false,
            Visibility::Shared => self
                .viewers
                .iter()
                .any(|viewer| viewer.eq_ignore_ascii_case(&caller.email)),
        }
    }

    /// Find an entry by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let entry = sqlx::query_as::<_, Entry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entry WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch entry by id")?;

        Ok(entry)
    }

    /// Create a new entry owned by `owner_id`.
    pub async fn create(pool: &PgPool, owner_id: &str, input: CreateEntry) -> Result<Self> {
        let now = Utc::now();
        let id = Uuid::now_v7();

        let entry = sqlx::query_as::<_, Entry>(&format!(
            r#"
            INSERT INTO entry (id, owner_id, created_at, updated_at, title, body, tags, mood, visibility, viewers, attachments)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, '{{}}')
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(now)
        .bind(now)
        .bind(&input.title)
        .bind(&input.body)
        .bind(&input.tags)
        .bind(input.mood)
        .bind(input.visibility.unwrap_or(Visibility::Private))
        .bind(&input.viewers)
        .fetch_one(pool)
        .await
        .context("failed to insert entry")?;

        Ok(entry)
    }

    /// Update an entry, merging unset fields from the current values.
    /// `created_at` and `owner_id` are never touched.
    pub async fn update(pool: &PgPool, id: Uuid, input: UpdateEntry) -> Result<Option<Self>> {
        let Some(current) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let title = input.title.unwrap_or(current.title);
        let body = input.body.unwrap_or(current.body);
        let tags = input.tags.unwrap_or(current.tags);
        let mood = input.mood.or(current.mood);
        let visibility = input.visibility.unwrap_or(current.visibility);
        let viewers = input.viewers.unwrap_or(current.viewers);

        let entry = sqlx::query_as::<_, Entry>(&format!(
            r#"
            UPDATE entry SET
                updated_at = $1,
                title = $2,
                body = $3,
                tags = $4,
                mood = $5,
                visibility = $6,
                viewers = $7
            WHERE id = $8
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(Utc::now())
        .bind(&title)
        .bind(&body)
        .bind(&tags)
        .bind(mood)
        .bind(visibility)
        .bind(&viewers)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to update entry")?;

        Ok(entry)
    }

    /// Delete an entry. Attachment cleanup is the service's job.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM entry WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete entry")?;

        Ok(result.rows_affected() > 0)
    }

    /// Append an attachment key to the entry.
    pub async fn add_attachment(pool: &PgPool, id: Uuid, key: &str) -> Result<Option<Self>> {
        let entry = sqlx::query_as::<_, Entry>(&format!(
            r#"
            UPDATE entry SET attachments = array_append(attachments, $1), updated_at = $2
            WHERE id = $3
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(key)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to add attachment")?;

        Ok(entry)
    }

    /// Remove an attachment key from the entry.
    pub async fn remove_attachment(pool: &PgPool, id: Uuid, key: &str) -> Result<Option<Self>> {
        let entry = sqlx::query_as::<_, Entry>(&format!(
            r#"
            UPDATE entry SET attachments = array_remove(attachments, $1), updated_at = $2
            WHERE id = $3
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(key)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to remove attachment")?;

        Ok(entry)
    }

    /// Count entries owned by `owner_id`.
    pub async fn count_by_owner(pool: &PgPool, owner_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entry WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(pool)
            .await
            .context("failed to count entries")?;

        Ok(count)
    }
}
