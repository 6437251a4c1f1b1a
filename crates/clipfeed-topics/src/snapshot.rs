use std::collections::HashMap;

use clipfeed_dialect::DialectHandle;
use clipfeed_models::Id;
use sqlx::Row;

use crate::Error;

/// A node of the topic taxonomy (§4.6).
#[derive(Clone, Debug, PartialEq)]
pub struct TopicNode {
    pub id: Id,
    pub name: String,
    pub slug: String,
    pub path: String,
    pub parent_id: Option<Id>,
    pub depth: i32,
    pub clip_count: i64,
}

/// A weighted lateral link used by the affinity boost's BFS (§4.6).
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub target_id: Id,
    pub relation: String,
    pub weight: f64,
}

/// A point-in-time, read-only view of the topics/topic_edges tables.
/// Every index here is built once at load time; lookups afterward never
/// touch the database.
#[derive(Debug, Default)]
pub struct TopicSnapshot {
    nodes: HashMap<Id, TopicNode>,
    children: HashMap<Option<Id>, Vec<Id>>,
    edges: HashMap<Id, Vec<Edge>>,
    by_slug: HashMap<String, Id>,
    by_name_lower: HashMap<String, Id>,
}

impl TopicSnapshot {
    /// Assembles a snapshot directly from its indices. Used by [`load`]
    /// and by affinity unit tests that build small graphs without a
    /// database round trip.
    pub(crate) fn from_parts(
        nodes: HashMap<Id, TopicNode>,
        children: HashMap<Option<Id>, Vec<Id>>,
        edges: HashMap<Id, Vec<Edge>>,
        by_slug: HashMap<String, Id>,
        by_name_lower: HashMap<String, Id>,
    ) -> Self {
        Self {
            nodes,
            children,
            edges,
            by_slug,
            by_name_lower,
        }
    }

    pub fn node(&self, id: Id) -> Option<&TopicNode> {
        self.nodes.get(&id)
    }

    pub fn by_slug(&self, slug: &str) -> Option<&TopicNode> {
        self.by_slug.get(slug).and_then(|id| self.nodes.get(id))
    }

    pub fn by_name(&self, name: &str) -> Option<&TopicNode> {
        self.by_name_lower
            .get(&name.to_ascii_lowercase())
            .and_then(|id| self.nodes.get(id))
    }

    pub fn children_of(&self, parent_id: Option<Id>) -> &[Id] {
        self.children.get(&parent_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edges_from(&self, id: Id) -> &[Edge] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node in the snapshot, in arbitrary order. Used by the flat
    /// `/api/topics` listing; tree-shaped reads should prefer
    /// [`children_of`](Self::children_of) instead.
    pub fn all(&self) -> impl Iterator<Item = &TopicNode> {
        self.nodes.values()
    }
}

/// Loads a fresh snapshot by scanning `topics` and `topic_edges` in full;
/// the tables are small enough (a content taxonomy, not per-user data)
/// that a periodic full scan is simpler and cheaper than incremental
/// sync (§4.6).
pub async fn load(handle: &DialectHandle) -> Result<TopicSnapshot, Error> {
    let topic_rows = sqlx::query("SELECT id, name, slug, path, parent_id, depth, clip_count FROM topics")
        .fetch_all(handle.pool())
        .await?;

    let mut nodes = HashMap::with_capacity(topic_rows.len());
    let mut children: HashMap<Option<Id>, Vec<Id>> = HashMap::new();
    let mut by_slug = HashMap::with_capacity(topic_rows.len());
    let mut by_name_lower = HashMap::with_capacity(topic_rows.len());

    for row in &topic_rows {
        let id = parse_id(&row.try_get::<String, _>("id")?)?;
        let name: String = row.try_get("name")?;
        let slug: String = row.try_get("slug")?;
        let path: String = row.try_get("path")?;
        let parent_id: Option<String> = row.try_get("parent_id")?;
        let parent_id = parent_id.as_deref().map(parse_id).transpose()?;
        let depth: i32 = row.try_get("depth")?;
        let clip_count: i64 = row.try_get("clip_count")?;

        by_slug.insert(slug.clone(), id);
        by_name_lower.insert(name.to_ascii_lowercase(), id);
        children.entry(parent_id).or_default().push(id);
        nodes.insert(
            id,
            TopicNode {
                id,
                name,
                slug,
                path,
                parent_id,
                depth,
                clip_count,
            },
        );
    }

    let edge_rows = sqlx::query("SELECT source_id, target_id, relation, weight FROM topic_edges")
        .fetch_all(handle.pool())
        .await?;

    let mut edges: HashMap<Id, Vec<Edge>> = HashMap::new();
    for row in &edge_rows {
        let source_id = parse_id(&row.try_get::<String, _>("source_id")?)?;
        let target_id = parse_id(&row.try_get::<String, _>("target_id")?)?;
        let relation: String = row.try_get("relation")?;
        let weight: f64 = row.try_get("weight")?;
        edges.entry(source_id).or_default().push(Edge {
            target_id,
            relation,
            weight,
        });
    }

    Ok(TopicSnapshot {
        nodes,
        children,
        edges,
        by_slug,
        by_name_lower,
    })
}

fn parse_id(s: &str) -> Result<Id, Error> {
    s.parse::<Id>()
        .map_err(|err| Error::MalformedRow(format!("invalid id {s:?}: {err}")))
}

#[cfg(test)]
mod test {
    use super::*;
    use clipfeed_dialect::Dialect;

    async fn seeded_handle() -> (DialectHandle, Id, Id) {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let handle = DialectHandle::from_pool(pool, Dialect::Embedded);
        clipfeed_migrations::run(&handle).await.unwrap();

        let cooking_id = Id::new();
        let pasta_id = Id::new();

        sqlx::query(
            "INSERT INTO topics (id, name, slug, path, parent_id, depth, clip_count) \
             VALUES (?, 'Cooking', 'cooking', '/cooking', NULL, 0, 10), \
                    (?, 'Pasta', 'pasta', '/cooking/pasta', ?, 1, 5)",
        )
        .bind(cooking_id.to_string())
        .bind(pasta_id.to_string())
        .bind(cooking_id.to_string())
        .execute(handle.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO topic_edges (source_id, target_id, relation, weight) \
             VALUES (?, ?, 'related', 0.5)",
        )
        .bind(pasta_id.to_string())
        .bind(cooking_id.to_string())
        .execute(handle.pool())
        .await
        .unwrap();

        (handle, cooking_id, pasta_id)
    }

    #[tokio::test]
    async fn loads_nodes_children_and_edges() {
        let (handle, cooking_id, pasta_id) = seeded_handle().await;
        let snapshot = load(&handle).await.unwrap();

        assert_eq!(snapshot.len(), 2);

        assert_eq!(snapshot.children_of(None), &[cooking_id]);
        assert_eq!(snapshot.children_of(Some(cooking_id)), &[pasta_id]);
        assert_eq!(snapshot.by_slug("pasta").unwrap().id, pasta_id);
        assert_eq!(snapshot.by_name("cooking").unwrap().id, cooking_id);
        assert_eq!(snapshot.edges_from(pasta_id).len(), 1);
    }
}
