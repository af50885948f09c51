mod schema;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::*;

const FEATURE_COLUMNS: &str = "id, title, description, status, created_by, likes_count, liked_by, comments_count, comments, is_deleted, created_at, updated_at";

/// Sort key accepted by the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    LikesCount,
    CommentsCount,
    Title,
}

impl SortKey {
    /// Maps a `sortBy` query value. Unknown keys fall back to the default
    /// insertion order (newest first).
    pub fn from_param(s: &str) -> Option<Self> {
        match s {
            "createdAt" => Some(Self::CreatedAt),
            "likes.count" | "likesCount" => Some(Self::LikesCount),
            "comments.count" | "commentsCount" => Some(Self::CommentsCount),
            "title" => Some(Self::Title),
            _ => None,
        }
    }

    fn order_column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::LikesCount => "likes_count",
            Self::CommentsCount => "comments_count",
            // Title sorts case-insensitively
            Self::Title => "title COLLATE NOCASE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn from_param(s: &str) -> Self {
        if s.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "feature-board")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("feature-board.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // User reference operations
    // ============================================================

    pub fn create_user(&self, input: CreateUserInput) -> Result<User, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (id, name, email, photo_url, role, is_deleted, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.email,
                &input.photo_url,
                input.role.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(User {
            id,
            name: input.name,
            email: input.email,
            photo_url: input.photo_url,
            role: input.role,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, email, photo_url, role, is_deleted, created_at, updated_at
             FROM users WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(User {
                id: parse_uuid(row.get::<_, String>(0)?),
                name: row.get(1)?,
                email: row.get(2)?,
                photo_url: row.get(3)?,
                role: Role::from_str(&row.get::<_, String>(4)?).unwrap_or(Role::User),
                is_deleted: row.get::<_, i64>(5)? != 0,
                created_at: parse_datetime(row.get::<_, String>(6)?),
                updated_at: parse_datetime(row.get::<_, String>(7)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn soft_delete_user(&self, id: Uuid) -> Result<bool, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE users SET is_deleted = 1, updated_at = ? WHERE id = ?",
            (Utc::now().to_rfc3339(), id.to_string()),
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Feature lifecycle operations
    // ============================================================

    pub fn create_feature(
        &self,
        owner: Uuid,
        input: CreateFeatureInput,
    ) -> Result<FeatureView, ApiError> {
        let title = input.title.trim().to_string();
        let description = input.description.trim().to_string();
        if title.is_empty() || description.is_empty() {
            return Err(ApiError::Validation(
                "Title and description are required".to_string(),
            ));
        }

        let conn = self.conn.lock().expect("database lock poisoned");

        // Exact case-insensitive equality against non-deleted titles only;
        // a soft-deleted feature frees its title for reuse.
        let duplicates: i64 = conn.query_row(
            "SELECT COUNT(*) FROM features WHERE is_deleted = 0 AND LOWER(title) = LOWER(?)",
            [&title],
            |row| row.get(0),
        )?;
        if duplicates > 0 {
            return Err(ApiError::DuplicateTitle);
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO features (id, title, description, status, created_by, likes_count, liked_by, comments_count, comments, is_deleted, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 0, '[]', 0, '[]', 0, ?, ?)",
            (
                id.to_string(),
                &title,
                &description,
                FeatureStatus::Pending.as_str(),
                owner.to_string(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        let feature = Feature {
            id,
            title,
            description,
            status: FeatureStatus::Pending,
            created_by: owner,
            likes: Likes::default(),
            comments: Comments::default(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        format_feature(&conn, &feature)?.ok_or_else(owner_unresolved)
    }

    /// Fetches the raw aggregate by id, soft-deleted or not. Listing and
    /// search exclude deleted features; direct-by-id access does not.
    pub fn get_feature(&self, id: Uuid) -> Result<Option<Feature>, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        get_feature_row(&conn, id)
    }

    pub fn update_feature(
        &self,
        id: Uuid,
        caller: Uuid,
        input: UpdateFeatureInput,
    ) -> Result<FeatureView, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let existing = get_feature_row(&conn, id)?.ok_or_else(|| ApiError::not_found("Feature"))?;

        if existing.created_by != caller {
            return Err(ApiError::forbidden());
        }

        let now = Utc::now();
        let title = input.title.unwrap_or(existing.title);
        let description = input.description.unwrap_or(existing.description);

        conn.execute(
            "UPDATE features SET title = ?, description = ?, updated_at = ? WHERE id = ?",
            (&title, &description, now.to_rfc3339(), id.to_string()),
        )?;

        let feature = Feature {
            id,
            title,
            description,
            status: existing.status,
            created_by: existing.created_by,
            likes: existing.likes,
            comments: existing.comments,
            is_deleted: existing.is_deleted,
            created_at: existing.created_at,
            updated_at: now,
        };

        format_feature(&conn, &feature)?.ok_or_else(owner_unresolved)
    }

    /// Sets the status unconditionally; the flat status set carries no
    /// transition restrictions. Role gating happens at the HTTP layer.
    pub fn update_status(&self, id: Uuid, status: FeatureStatus) -> Result<FeatureView, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let existing = get_feature_row(&conn, id)?.ok_or_else(|| ApiError::not_found("Feature"))?;

        let now = Utc::now();
        conn.execute(
            "UPDATE features SET status = ?, updated_at = ? WHERE id = ?",
            (status.as_str(), now.to_rfc3339(), id.to_string()),
        )?;

        let feature = Feature {
            status,
            updated_at: now,
            ..existing
        };

        format_feature(&conn, &feature)?.ok_or_else(owner_unresolved)
    }

    /// Hides the feature from listings and search; the record is retained.
    pub fn soft_delete_feature(&self, id: Uuid) -> Result<FeatureView, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let existing = get_feature_row(&conn, id)?.ok_or_else(|| ApiError::not_found("Feature"))?;

        let now = Utc::now();
        conn.execute(
            "UPDATE features SET is_deleted = 1, updated_at = ? WHERE id = ?",
            (now.to_rfc3339(), id.to_string()),
        )?;

        let feature = Feature {
            is_deleted: true,
            updated_at: now,
            ..existing
        };

        format_feature(&conn, &feature)?.ok_or_else(owner_unresolved)
    }

    /// Physically removes the row, soft-deleted or not. Owner only.
    pub fn hard_delete_feature(&self, id: Uuid, caller: Uuid) -> Result<(), ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let existing = get_feature_row(&conn, id)?.ok_or_else(|| ApiError::not_found("Feature"))?;

        if existing.created_by != caller {
            return Err(ApiError::forbidden());
        }

        conn.execute("DELETE FROM features WHERE id = ?", [id.to_string()])?;
        Ok(())
    }

    // ============================================================
    // Engagement operations
    // ============================================================

    /// Adds the caller to the like set. No-op when already liked.
    pub fn like_feature(&self, id: Uuid, user: Uuid) -> Result<FeatureView, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut feature = get_feature_row(&conn, id)?.ok_or_else(|| ApiError::not_found("Feature"))?;

        if !feature.likes.users.contains(&user) {
            feature.likes.users.push(user);
            feature.likes.count = feature.likes.users.len() as i64;
            feature.updated_at = Utc::now();
            persist_likes(&conn, &feature)?;
        }

        format_feature(&conn, &feature)?.ok_or_else(owner_unresolved)
    }

    /// Removes the caller from the like set. No-op when not liked.
    pub fn unlike_feature(&self, id: Uuid, user: Uuid) -> Result<FeatureView, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut feature = get_feature_row(&conn, id)?.ok_or_else(|| ApiError::not_found("Feature"))?;

        if feature.likes.users.contains(&user) {
            feature.likes.users.retain(|u| *u != user);
            feature.likes.count = feature.likes.users.len() as i64;
            feature.updated_at = Utc::now();
            persist_likes(&conn, &feature)?;
        }

        format_feature(&conn, &feature)?.ok_or_else(owner_unresolved)
    }

    pub fn add_comment(
        &self,
        id: Uuid,
        author: Uuid,
        text: String,
    ) -> Result<FeatureView, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut feature = get_feature_row(&conn, id)?.ok_or_else(|| ApiError::not_found("Feature"))?;

        feature.comments.data.push(Comment {
            id: Uuid::new_v4(),
            comments_by: author,
            comment: text,
            created_at: Utc::now(),
        });
        feature.comments.count = feature.comments.data.len() as i64;
        feature.updated_at = Utc::now();
        persist_comments(&conn, &feature)?;

        format_feature(&conn, &feature)?.ok_or_else(owner_unresolved)
    }

    /// Replaces a comment's text. The entry keeps its id and original
    /// author but moves to the end of the sequence with a fresh timestamp.
    /// Any signed-in caller may edit any comment.
    pub fn edit_comment(
        &self,
        feature_id: Uuid,
        comment_id: Uuid,
        text: String,
    ) -> Result<FeatureView, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut feature =
            get_feature_row(&conn, feature_id)?.ok_or_else(|| ApiError::not_found("Feature"))?;

        let pos = feature
            .comments
            .data
            .iter()
            .position(|c| c.id == comment_id)
            .ok_or_else(|| ApiError::not_found("Comment"))?;

        let old = feature.comments.data.remove(pos);
        feature.comments.data.push(Comment {
            id: old.id,
            comments_by: old.comments_by,
            comment: text,
            created_at: Utc::now(),
        });
        feature.comments.count = feature.comments.data.len() as i64;
        feature.updated_at = Utc::now();
        persist_comments(&conn, &feature)?;

        format_feature(&conn, &feature)?.ok_or_else(owner_unresolved)
    }

    /// Removes a comment. Only the comment's author may delete it.
    pub fn delete_comment(
        &self,
        feature_id: Uuid,
        comment_id: Uuid,
        caller: Uuid,
    ) -> Result<FeatureView, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut feature =
            get_feature_row(&conn, feature_id)?.ok_or_else(|| ApiError::not_found("Feature"))?;

        let pos = feature
            .comments
            .data
            .iter()
            .position(|c| c.id == comment_id)
            .ok_or_else(|| ApiError::not_found("Comment"))?;

        if feature.comments.data[pos].comments_by != caller {
            return Err(ApiError::forbidden());
        }

        feature.comments.data.remove(pos);
        feature.comments.count = feature.comments.data.len() as i64;
        feature.updated_at = Utc::now();
        persist_comments(&conn, &feature)?;

        format_feature(&conn, &feature)?.ok_or_else(owner_unresolved)
    }

    // ============================================================
    // Query/listing operations
    // ============================================================

    pub fn get_feature_view(&self, id: Uuid) -> Result<FeatureView, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let feature = get_feature_row(&conn, id)?.ok_or_else(|| ApiError::not_found("Feature"))?;
        format_feature(&conn, &feature)?.ok_or_else(owner_unresolved)
    }

    pub fn list_features(
        &self,
        page: u64,
        limit: u64,
        status: Option<FeatureStatus>,
        sort: Option<SortKey>,
        order: SortOrder,
    ) -> Result<FeaturePage, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");

        let mut predicate = String::from("is_deleted = 0");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(status) = status {
            predicate.push_str(" AND status = ?");
            params.push(Box::new(status.as_str().to_string()));
        }

        let total = {
            let params_ref: Vec<&dyn rusqlite::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();
            conn.query_row(
                &format!("SELECT COUNT(*) FROM features WHERE {predicate}"),
                params_ref.as_slice(),
                |row| row.get::<_, i64>(0),
            )? as u64
        };

        // Status breakdown over the same predicate, as a separate grouped
        // aggregation.
        let mut status_counts = BTreeMap::new();
        {
            let params_ref: Vec<&dyn rusqlite::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();
            let mut stmt = conn.prepare(&format!(
                "SELECT status, COUNT(*) FROM features WHERE {predicate} GROUP BY status"
            ))?;
            let mut rows = stmt.query(params_ref.as_slice())?;
            while let Some(row) = rows.next()? {
                status_counts.insert(row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64);
            }
        }

        let order_clause = match sort {
            Some(key) => format!("{} {}", key.order_column(), order.keyword()),
            None => "rowid DESC".to_string(),
        };

        let offset = page.saturating_sub(1) * limit;
        params.push(Box::new(limit as i64));
        params.push(Box::new(offset as i64));
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&format!(
            "SELECT {FEATURE_COLUMNS} FROM features WHERE {predicate} ORDER BY {order_clause} LIMIT ? OFFSET ?"
        ))?;
        let features = stmt
            .query_map(params_ref.as_slice(), feature_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        // Owner references resolve after the database-level page is cut; a
        // page whose owners were soft-deleted returns fewer than `limit`
        // items, with no second query round to compensate.
        let mut items = Vec::new();
        for feature in &features {
            if let Some(item) = list_item(&conn, feature)? {
                items.push(item);
            }
        }

        Ok(FeaturePage {
            items,
            page_info: PageInfo::new(page, limit, total),
            status_counts,
        })
    }

    pub fn search_features(
        &self,
        term: &str,
        page: u64,
        limit: u64,
    ) -> Result<SearchPage, ApiError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let pattern = format!("%{}%", escape_like(term));

        let total = conn.query_row(
            "SELECT COUNT(*) FROM features
             WHERE is_deleted = 0 AND (title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')",
            [&pattern, &pattern],
            |row| row.get::<_, i64>(0),
        )? as u64;

        let offset = page.saturating_sub(1) * limit;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FEATURE_COLUMNS} FROM features
             WHERE is_deleted = 0 AND (title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')
             ORDER BY rowid DESC LIMIT ? OFFSET ?"
        ))?;
        let features = stmt
            .query_map(
                rusqlite::params![&pattern, &pattern, limit as i64, offset as i64],
                feature_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut items = Vec::new();
        for feature in &features {
            if let Some(view) = format_feature(&conn, feature)? {
                items.push(view);
            }
        }

        Ok(SearchPage {
            items,
            page_info: PageInfo::new(page, limit, total),
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn get_feature_row(conn: &Connection, id: Uuid) -> Result<Option<Feature>, ApiError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {FEATURE_COLUMNS} FROM features WHERE id = ?"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(feature_from_row(row)?)),
        None => Ok(None),
    }
}

fn feature_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Feature> {
    let liked_by: String = row.get(6)?;
    let comments: String = row.get(8)?;
    Ok(Feature {
        id: parse_uuid(row.get::<_, String>(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        status: FeatureStatus::from_str(&row.get::<_, String>(3)?)
            .unwrap_or(FeatureStatus::Pending),
        created_by: parse_uuid(row.get::<_, String>(4)?),
        likes: Likes {
            count: row.get(5)?,
            users: serde_json::from_str(&liked_by).unwrap_or_default(),
        },
        comments: Comments {
            count: row.get(7)?,
            data: serde_json::from_str(&comments).unwrap_or_default(),
        },
        is_deleted: row.get::<_, i64>(9)? != 0,
        created_at: parse_datetime(row.get::<_, String>(10)?),
        updated_at: parse_datetime(row.get::<_, String>(11)?),
    })
}

// Counter and collection are written in the same statement so the embedded
// count can never drift from the stored set.
fn persist_likes(conn: &Connection, feature: &Feature) -> Result<(), ApiError> {
    let liked_by = serde_json::to_string(&feature.likes.users)?;
    conn.execute(
        "UPDATE features SET likes_count = ?, liked_by = ?, updated_at = ? WHERE id = ?",
        (
            feature.likes.count,
            &liked_by,
            feature.updated_at.to_rfc3339(),
            feature.id.to_string(),
        ),
    )?;
    Ok(())
}

fn persist_comments(conn: &Connection, feature: &Feature) -> Result<(), ApiError> {
    let comments = serde_json::to_string(&feature.comments.data)?;
    conn.execute(
        "UPDATE features SET comments_count = ?, comments = ?, updated_at = ? WHERE id = ?",
        (
            feature.comments.count,
            &comments,
            feature.updated_at.to_rfc3339(),
            feature.id.to_string(),
        ),
    )?;
    Ok(())
}

fn user_ref(conn: &Connection, id: Uuid) -> Result<Option<UserRef>, ApiError> {
    let mut stmt = conn
        .prepare("SELECT id, name, email, photo_url FROM users WHERE id = ? AND is_deleted = 0")?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(UserRef {
            id: parse_uuid(row.get::<_, String>(0)?),
            name: row.get(1)?,
            email: row.get(2)?,
            photo_url: row.get(3)?,
        })),
        None => Ok(None),
    }
}

fn expand_likes(conn: &Connection, likes: &Likes) -> Result<LikesView, ApiError> {
    let mut users = Vec::new();
    for id in &likes.users {
        if let Some(user) = user_ref(conn, *id)? {
            users.push(user);
        }
    }
    Ok(LikesView {
        count: likes.count,
        users,
    })
}

fn expand_comments(conn: &Connection, comments: &Comments) -> Result<CommentsView, ApiError> {
    let mut data = Vec::new();
    for comment in &comments.data {
        data.push(CommentView {
            id: comment.id,
            comments_by: user_ref(conn, comment.comments_by)?,
            comment: comment.comment.clone(),
            created_at: comment.created_at,
        });
    }
    Ok(CommentsView {
        count: comments.count,
        data,
    })
}

/// Full projection. `None` when the owner reference no longer resolves.
fn format_feature(conn: &Connection, feature: &Feature) -> Result<Option<FeatureView>, ApiError> {
    let Some(owner) = user_ref(conn, feature.created_by)? else {
        return Ok(None);
    };

    Ok(Some(FeatureView {
        id: feature.id,
        title: feature.title.clone(),
        description: feature.description.clone(),
        status: feature.status,
        created_by: owner,
        likes: expand_likes(conn, &feature.likes)?,
        comments: expand_comments(conn, &feature.comments)?,
        created_at: feature.created_at,
    }))
}

/// Listing projection. `None` when the owner reference no longer resolves.
fn list_item(conn: &Connection, feature: &Feature) -> Result<Option<FeatureListItem>, ApiError> {
    let Some(owner) = user_ref(conn, feature.created_by)? else {
        return Ok(None);
    };

    Ok(Some(FeatureListItem {
        id: feature.id,
        title: feature.title.clone(),
        description: feature.description.clone(),
        status: feature.status,
        created_by: owner,
        created_at: feature.created_at,
        likes: expand_likes(conn, &feature.likes)?,
        total_comments: feature.comments.count,
    }))
}

fn owner_unresolved() -> ApiError {
    ApiError::Internal(anyhow::anyhow!("Feature owner reference failed to resolve"))
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
