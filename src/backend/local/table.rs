/// SQLite-backed photo table for the local backend
use crate::{
    auth::Session,
    backend::{PhotoQuery, PhotoTable},
    error::{GalleryError, GalleryResult},
    gallery::{listing::SortOrder, Category, NewPhoto, Photo},
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

const PHOTO_COLUMNS: &str =
    "SELECT id, image_url, category, file_name, file_path, alt_text, created_at FROM gallery_photos";

pub struct SqlitePhotoTable {
    db: SqlitePool,
}

impl SqlitePhotoTable {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &PhotoQuery) {
        builder.push(" WHERE 1 = 1");
        if let Some(id) = &query.id {
            builder.push(" AND id = ").push_bind(id.clone());
        }
        if let Some(category) = query.category {
            builder.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(since) = query.created_since {
            builder.push(" AND created_at >= ").push_bind(format_timestamp(since));
        }
    }

    fn row_to_photo(row: &SqliteRow) -> GalleryResult<Photo> {
        let created_at: String = row.try_get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| GalleryError::Internal(format!("Bad created_at {}: {}", created_at, e)))?
            .with_timezone(&Utc);
        let category: String = row.try_get("category")?;

        Ok(Photo {
            id: row.try_get("id")?,
            image_url: row.try_get("image_url")?,
            category: Category::from(category),
            file_name: row.try_get("file_name")?,
            file_path: row.try_get("file_path")?,
            alt_text: row.try_get("alt_text")?,
            created_at,
        })
    }
}

#[async_trait]
impl PhotoTable for SqlitePhotoTable {
    async fn select(
        &self,
        _session: Option<&Session>,
        query: &PhotoQuery,
    ) -> GalleryResult<Vec<Photo>> {
        let mut builder = QueryBuilder::<Sqlite>::new(PHOTO_COLUMNS);
        Self::push_filters(&mut builder, query);
        builder.push(match query.order {
            SortOrder::NewestFirst => " ORDER BY created_at DESC, rowid DESC",
            SortOrder::OldestFirst => " ORDER BY created_at ASC, rowid ASC",
        });
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(&self.db).await?;
        rows.iter().map(Self::row_to_photo).collect()
    }

    async fn count(
        &self,
        _session: Option<&Session>,
        created_since: Option<DateTime<Utc>>,
    ) -> GalleryResult<u64> {
        let query = PhotoQuery {
            created_since,
            ..PhotoQuery::default()
        };
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM gallery_photos");
        Self::push_filters(&mut builder, &query);

        let count = builder.build_query_scalar::<i64>().fetch_one(&self.db).await?;
        Ok(count as u64)
    }

    async fn insert(&self, _session: &Session, photo: &NewPhoto) -> GalleryResult<Photo> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO gallery_photos (id, image_url, category, file_name, file_path, alt_text, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&id)
        .bind(&photo.image_url)
        .bind(photo.category.as_str())
        .bind(&photo.file_name)
        .bind(&photo.file_path)
        .bind(&photo.alt_text)
        .bind(format_timestamp(created_at))
        .execute(&self.db)
        .await?;

        Ok(Photo {
            id,
            image_url: photo.image_url.clone(),
            category: photo.category,
            file_name: photo.file_name.clone(),
            file_path: photo.file_path.clone(),
            alt_text: photo.alt_text.clone(),
            // Round-trip through the stored precision
            created_at: DateTime::parse_from_rfc3339(&format_timestamp(created_at))
                .map(|ts| ts.with_timezone(&Utc))
                .unwrap_or(created_at),
        })
    }

    async fn delete(&self, _session: &Session, id: &str) -> GalleryResult<()> {
        let result = sqlx::query("DELETE FROM gallery_photos WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("Delete matched no row for photo {}", id);
        }
        Ok(())
    }
}

/// Fixed-width UTC timestamp, so text order equals time order
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
