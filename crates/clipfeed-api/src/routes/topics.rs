//! The topic taxonomy, read straight from the in-memory snapshot (§4.6,
//! §6) — never the database directly, since `TopicGraph::load` is the
//! only path that's allowed to touch `topics`/`topic_edges` at request
//! time.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use clipfeed_models::Id;
use serde::Serialize;

use crate::state::App;

#[derive(Debug, Serialize)]
pub struct TopicResponse {
    pub id: Id,
    pub name: String,
    pub slug: String,
    pub path: String,
    pub parent_id: Option<Id>,
    pub depth: i32,
    pub clip_count: i64,
}

#[derive(Debug, Serialize)]
pub struct TopicTreeNode {
    pub topic: TopicResponse,
    pub children: Vec<TopicTreeNode>,
}

pub async fn list_topics(State(app): State<Arc<App>>) -> Json<Vec<TopicResponse>> {
    let snapshot = app.topics.load().await;
    Json(snapshot.all().map(to_response).collect())
}

pub async fn topic_tree(State(app): State<Arc<App>>) -> Json<Vec<TopicTreeNode>> {
    let snapshot = app.topics.load().await;
    Json(build_children(&snapshot, None))
}

fn build_children(snapshot: &clipfeed_topics::TopicSnapshot, parent_id: Option<Id>) -> Vec<TopicTreeNode> {
    snapshot
        .children_of(parent_id)
        .iter()
        .filter_map(|id| snapshot.node(*id))
        .map(|node| TopicTreeNode {
            topic: to_response(node),
            children: build_children(snapshot, Some(node.id)),
        })
        .collect()
}

fn to_response(node: &clipfeed_topics::TopicNode) -> TopicResponse {
    TopicResponse {
        id: node.id,
        name: node.name.clone(),
        slug: node.slug.clone(),
        path: node.path.clone(),
        parent_id: node.parent_id,
        depth: node.depth,
        clip_count: node.clip_count,
    }
}
