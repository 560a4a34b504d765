use async_trait::async_trait;
use domain::{DomainError, NewPost, Post, PostId, PostPatch, SortSpec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

// --- Application Errors ---
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("post with id {0} is not found.")]
    NotFound(PostId),
    #[error("Domain validation error: {0}")]
    DomainError(#[from] DomainError), // Propagate domain errors cleanly
    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
}

// --- Infrastructure Interfaces (Traits) ---

/// Interface for the ordered post store.
///
/// Implementations own the canonical order of posts. Every mutating call must
/// be atomic with respect to other calls on the same store.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Returns all posts in their current order.
    async fn list(&self) -> Result<Vec<Post>, ApplicationError>;
    /// Reorders the stored posts in place and returns the new order.
    async fn sort(&self, spec: SortSpec) -> Result<Vec<Post>, ApplicationError>;
    /// Retrieves a post by its id.
    async fn get(&self, id: PostId) -> Result<Option<Post>, ApplicationError>;
    /// Assigns the next id, appends the post and returns the whole collection.
    async fn create(&self, new_post: NewPost) -> Result<Vec<Post>, ApplicationError>;
    /// Deletes a post by its id. Returns true if deleted.
    async fn delete(&self, id: PostId) -> Result<bool, ApplicationError>;
    /// Merges the patch into the stored post. Returns the updated post if it exists.
    async fn update(&self, id: PostId, patch: PostPatch)
    -> Result<Option<Post>, ApplicationError>;
    /// Returns the posts whose title equals `title` exactly, in stored order.
    async fn find_by_title(&self, title: &str) -> Result<Vec<Post>, ApplicationError>;
    /// Returns the number of stored posts.
    async fn count(&self) -> Result<usize, ApplicationError>;
    /// Id the next created post would receive.
    #[instrument(skip(self))]
    async fn next_id(&self) -> Result<Option<PostId>, ApplicationError> {
        debug!("Computing next post id via default listing");
        let posts = self.list().await?;
        Ok(next_post_id(&posts))
    }
}

/// `max(existing ids) + 1`, or [`PostId::FIRST`] for an empty collection.
/// `None` once the id space is exhausted.
pub fn next_post_id(posts: &[Post]) -> Option<PostId> {
    match posts.iter().map(Post::id).max() {
        Some(max_id) => max_id.next(),
        None => Some(PostId::FIRST),
    }
}

// --- Request/Response Models (Data Transfer Objects - DTOs) ---

/// Query string of `GET /posts`.
#[derive(Deserialize, Debug, Default)]
pub struct ListPostsQuery {
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl ListPostsQuery {
    pub fn sort_spec(&self) -> Result<Option<SortSpec>, DomainError> {
        SortSpec::parse(self.sort.as_deref(), self.direction.as_deref())
    }
}

/// Query string of `GET /posts/search`.
#[derive(Deserialize, Debug, Default)]
pub struct SearchPostsQuery {
    pub title: Option<String>,
}

impl SearchPostsQuery {
    /// The title filter; an empty value counts as no filter.
    pub fn title_filter(&self) -> Option<&str> {
        self.title.as_deref().filter(|title| !title.is_empty())
    }
}

/// Body of `POST /posts`. Presence is checked when converting into [`NewPost`].
#[derive(Deserialize, Debug, Default)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl TryFrom<CreatePostRequest> for NewPost {
    type Error = DomainError;

    fn try_from(request: CreatePostRequest) -> Result<Self, Self::Error> {
        NewPost::new(request.title, request.content)
    }
}

#[derive(Serialize, Debug, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn deleted(id: PostId) -> Self {
        Self {
            message: format!("post with id {} has been deleted successfully.", id),
        }
    }

    pub fn updated(id: PostId) -> Self {
        // The trailing space is part of the response contract.
        Self {
            message: format!("post with id {} has been updated successfully. ", id),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct StoreStats {
    pub total_posts: usize,
    pub next_id: Option<PostId>,
}

/// Response for the /stats endpoint.
#[derive(Serialize, Debug)]
pub struct StatsResponse {
    pub store: StoreStats,
}

// --- Application Services (Use Cases) ---

/// Service for the post use cases: list/sort, create, delete, update, search.
pub struct PostService {
    repo: Arc<dyn PostRepository>,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    /// Lists posts. A valid sort request reorders the stored posts before returning them.
    #[instrument(skip(self, query), fields(sort = ?query.sort, direction = ?query.direction))]
    pub async fn list_posts(&self, query: &ListPostsQuery) -> Result<Vec<Post>, ApplicationError> {
        let spec = query.sort_spec().inspect_err(|e| {
            warn!("Rejected sort request: {}", e);
        })?;
        match spec {
            Some(spec) => {
                info!(field = ?spec.field, direction = ?spec.direction, "Sorting posts in place");
                self.repo.sort(spec).await
            }
            None => {
                debug!("Listing posts in stored order");
                self.repo.list().await
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_post(&self, id: PostId) -> Result<Post, ApplicationError> {
        self.repo.get(id).await?.ok_or_else(|| {
            warn!(post_id = %id, "Post not found");
            ApplicationError::NotFound(id)
        })
    }

    /// Creates a post and returns the whole collection, new post last.
    #[instrument(skip(self, request))]
    pub async fn create_post(
        &self,
        request: CreatePostRequest,
    ) -> Result<Vec<Post>, ApplicationError> {
        let new_post = NewPost::try_from(request).inspect_err(|e| {
            warn!("Rejected post creation: {}", e);
        })?;
        debug!(title = %new_post.title(), "New post passed validation");

        let posts = self.repo.create(new_post).await.inspect_err(|e| {
            error!("Failed to store new post: {}", e);
        })?;
        if let Some(created) = posts.last() {
            info!(post_id = %created.id(), total = posts.len(), "Post created");
        }
        Ok(posts)
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, id: PostId) -> Result<MessageResponse, ApplicationError> {
        if self.repo.delete(id).await? {
            info!(post_id = %id, "Post deleted");
            Ok(MessageResponse::deleted(id))
        } else {
            warn!(post_id = %id, "Deletion failed: post not found");
            Err(ApplicationError::NotFound(id))
        }
    }

    /// Merges the patch into an existing post. No presence checks are applied.
    #[instrument(skip(self, patch))]
    pub async fn update_post(
        &self,
        id: PostId,
        patch: PostPatch,
    ) -> Result<MessageResponse, ApplicationError> {
        if patch.is_empty() {
            debug!(post_id = %id, "Update payload carries no known fields");
        }
        match self.repo.update(id, patch).await? {
            Some(post) => {
                info!(post_id = %post.id(), "Post updated");
                Ok(MessageResponse::updated(id))
            }
            None => {
                warn!(post_id = %id, "Update failed: post not found");
                Err(ApplicationError::NotFound(id))
            }
        }
    }

    /// Exact title match when a non-empty title is given, otherwise every post.
    #[instrument(skip(self, query), fields(title = ?query.title))]
    pub async fn search_posts(
        &self,
        query: &SearchPostsQuery,
    ) -> Result<Vec<Post>, ApplicationError> {
        let posts = match query.title_filter() {
            Some(title) => self.repo.find_by_title(title).await?,
            None => self.repo.list().await?,
        };
        info!(hits = posts.len(), "Search finished");
        Ok(posts)
    }
}

pub struct StatsService {
    repo: Arc<dyn PostRepository>,
}

impl StatsService {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<StatsResponse, ApplicationError> {
        info!("Gathering store statistics");
        let (count_result, next_id_result) = tokio::join!(self.repo.count(), self.repo.next_id());
        let store = StoreStats {
            total_posts: count_result.map_err(|e| {
                error!("Failed to count posts for stats: {}", e);
                ApplicationError::InfrastructureError("Failed to retrieve post count".to_string())
            })?,
            next_id: next_id_result?,
        };
        debug!("Store stats gathered: {:?}", store);
        Ok(StatsResponse { store })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(id: u64, title: &str) -> Post {
        Post::new(
            PostId::new(id),
            NewPost::new(Some(title.to_string()), Some("body".to_string())).unwrap(),
        )
    }

    #[test]
    fn next_id_is_max_plus_one() {
        let posts = vec![post(2, "a"), post(7, "b"), post(3, "c")];
        assert_eq!(next_post_id(&posts), Some(PostId::new(8)));
    }

    #[test]
    fn next_id_on_empty_collection_is_first() {
        assert_eq!(next_post_id(&[]), Some(PostId::FIRST));
    }

    #[test]
    fn next_id_exhausted() {
        assert_eq!(next_post_id(&[post(u64::MAX, "last")]), None);
    }

    #[test]
    fn create_request_missing_field_is_rejected() {
        let request: CreatePostRequest = serde_json::from_value(json!({"title": "T"})).unwrap();
        assert_eq!(
            NewPost::try_from(request),
            Err(DomainError::MissingField("content"))
        );
    }

    #[test]
    fn create_request_null_field_counts_as_missing() {
        let request: CreatePostRequest =
            serde_json::from_value(json!({"title": null, "content": "c"})).unwrap();
        assert_eq!(
            NewPost::try_from(request),
            Err(DomainError::MissingField("title"))
        );
    }

    #[test]
    fn list_query_without_params_does_not_sort() {
        assert_eq!(ListPostsQuery::default().sort_spec(), Ok(None));
    }

    #[test]
    fn list_query_with_partial_params_is_rejected() {
        let query = ListPostsQuery {
            sort: Some("title".to_string()),
            direction: None,
        };
        assert!(matches!(
            query.sort_spec(),
            Err(DomainError::InvalidSortDirection(_))
        ));
    }

    #[test]
    fn empty_search_title_means_no_filter() {
        let query = SearchPostsQuery {
            title: Some(String::new()),
        };
        assert_eq!(query.title_filter(), None);
        let query = SearchPostsQuery {
            title: Some("Post 3".to_string()),
        };
        assert_eq!(query.title_filter(), Some("Post 3"));
    }

    #[test]
    fn message_bodies_match_wire_format() {
        assert_eq!(
            serde_json::to_value(MessageResponse::deleted(PostId::new(4))).unwrap(),
            json!({"message": "post with id 4 has been deleted successfully."})
        );
        assert_eq!(
            MessageResponse::updated(PostId::new(4)).message,
            "post with id 4 has been updated successfully. "
        );
        assert_eq!(
            ApplicationError::NotFound(PostId::new(4)).to_string(),
            "post with id 4 is not found."
        );
    }
}
