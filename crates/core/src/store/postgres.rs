use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{DocumentStore, StoreError};
use crate::document::{Collection, Document, DocumentId};
use crate::mutation::Patch;
use crate::query::{Filter, FindOptions};

const SELECT_COLUMNS: &str = "SELECT id, content, created_at, updated_at FROM documents";

/// Documents in a single `documents` table, one JSONB `content` column per
/// row, partitioned by a `collection` label.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    content: Json<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let id = DocumentId::from(row.id);
        match row.content.0 {
            Value::Object(content) => Ok(Document {
                id,
                content,
                created_at: row.created_at,
                updated_at: row.updated_at,
            }),
            _ => Err(StoreError::Corrupt(id)),
        }
    }
}

/// `%needle%` with LIKE wildcards in the needle escaped.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// JSONB path of a dotted field name, e.g. `premium.login`.
fn field_path(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::All => {
            qb.push("TRUE");
        }
        Filter::Eq(field, value) => {
            qb.push("content #> ");
            qb.push_bind(field_path(field));
            qb.push(" = ");
            qb.push_bind(Json(value.clone()));
        }
        Filter::Contains(field, needle) => {
            let pattern = like_pattern(needle);
            qb.push("((jsonb_typeof(content #> ");
            qb.push_bind(field_path(field));
            qb.push(") = 'string' AND content #>> ");
            qb.push_bind(field_path(field));
            qb.push(" ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\') OR EXISTS (SELECT 1 FROM jsonb_array_elements_text(CASE WHEN jsonb_typeof(content #> ");
            qb.push_bind(field_path(field));
            qb.push(") = 'array' THEN content #> ");
            qb.push_bind(field_path(field));
            qb.push(" ELSE '[]'::jsonb END) AS e(v) WHERE e.v ILIKE ");
            qb.push_bind(pattern);
            qb.push(" ESCAPE '\\'))");
        }
        Filter::IdIn(ids) => {
            let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
            qb.push("id = ANY(");
            qb.push_bind(ids);
            qb.push(")");
        }
        Filter::And(filters) | Filter::Or(filters) => {
            let (joiner, empty) = match filter {
                Filter::And(_) => (" AND ", "TRUE"),
                _ => (" OR ", "FALSE"),
            };
            if filters.is_empty() {
                qb.push(empty);
                return;
            }
            qb.push("(");
            for (i, inner) in filters.iter().enumerate() {
                if i > 0 {
                    qb.push(joiner);
                }
                push_filter(qb, inner);
            }
            qb.push(")");
        }
    }
}

fn find_query<'a>(
    collection: Collection,
    filter: &Filter,
    options: FindOptions,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(SELECT_COLUMNS);
    qb.push(" WHERE collection = ");
    qb.push_bind(collection.as_str());
    qb.push(" AND ");
    push_filter(&mut qb, filter);
    if options.newest_first {
        qb.push(" ORDER BY created_at DESC, id DESC");
    } else {
        qb.push(" ORDER BY created_at, id");
    }
    if let Some(limit) = options.limit {
        qb.push(" LIMIT ");
        qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    qb
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert(
        &self,
        collection: Collection,
        content: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        let doc = Document::new(content);
        sqlx::query(
            "INSERT INTO documents (id, collection, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(*doc.id.as_uuid())
        .bind(collection.as_str())
        .bind(Json(&doc.content))
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(doc)
    }

    async fn get(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        let row: Option<DocumentRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE collection = $1 AND id = $2"))
                .bind(collection.as_str())
                .bind(*id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Document::try_from).transpose()
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let mut qb = find_query(collection, filter, options);
        let rows: Vec<DocumentRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(Document::try_from).collect()
    }

    async fn modify(
        &self,
        collection: Collection,
        id: DocumentId,
        edit: &mut (dyn for<'a> FnMut(&'a Document) -> Option<Patch> + Send),
    ) -> Result<Option<Document>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let row: Option<DocumentRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE collection = $1 AND id = $2 FOR UPDATE"
        ))
        .bind(collection.as_str())
        .bind(*id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut doc = Document::try_from(row)?;
        let Some(patch) = edit(&doc) else {
            tx.commit().await?;
            return Ok(Some(doc));
        };
        patch.apply(&mut doc.content);
        let updated_at: DateTime<Utc> = sqlx::query_scalar(
            "UPDATE documents SET content = $1, updated_at = now() WHERE id = $2 RETURNING updated_at",
        )
        .bind(Json(&doc.content))
        .bind(*id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        doc.updated_at = updated_at;
        Ok(Some(doc))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
        assert_eq!(like_pattern("Львів"), "%Львів%");
    }

    #[test]
    fn find_query_renders_conjunction_with_placeholders() {
        let filter = Filter::all_of(vec![
            Filter::eq("birthYear", 1900),
            Filter::IdIn(vec![DocumentId::new()]),
        ]);
        let qb = find_query(Collection::People, &filter, FindOptions::default().limit(10));
        assert_eq!(
            qb.sql(),
            "SELECT id, content, created_at, updated_at FROM documents WHERE collection = $1 \
             AND (content #> $2 = $3 AND id = ANY($4)) ORDER BY created_at, id LIMIT $5"
        );
    }

    #[test]
    fn empty_disjunction_matches_nothing() {
        let qb = find_query(Collection::Areas, &Filter::Or(vec![]), FindOptions::newest_first());
        assert!(qb.sql().ends_with("AND FALSE ORDER BY created_at DESC, id DESC"));
    }

    #[test]
    fn contains_binds_field_and_pattern() {
        let qb = find_query(Collection::Areas, &Filter::contains("cemetries", "a"), FindOptions::default());
        let sql = qb.sql();
        assert!(sql.contains("content #>> $3 ILIKE $4 ESCAPE '\\'"));
        assert!(sql.contains("jsonb_array_elements_text"));
    }
}
