//! Shared domain types for ClipFeed (§3 of the spec). This crate has no
//! database or HTTP dependency of its own — it's the vocabulary every other
//! crate in the workspace speaks.

mod clip;
mod cookie;
mod filter;
mod id;
mod job;
mod opaque_json;
mod scout;
mod source;
mod topic;
mod user;

pub use clip::{Clip, ClipEmbedding, ClipStatus, Interaction, InteractionAction};
pub use cookie::{CookiePlatform, PlatformCookie};
pub use filter::{DurationFilter, SavedFilter, SavedFilterBody, TopicFilter, TopicFilterMode};
pub use id::{Id, IdGenerator, RandomIdGenerator};
pub use job::{Job, JobStatus, JobUpdate, ReclaimCounts};
pub use opaque_json::OpaqueJson;
pub use scout::{ScoutCandidate, ScoutCandidateStatus, ScoutSource};
pub use source::{Platform, Source, SourceStatus};
pub use topic::{slugify, ClipTopic, Topic, TopicEdge, UserTopicAffinity};
pub use user::{User, UserPreferences};
