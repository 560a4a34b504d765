// ./infrastructure/src/persistence/in_memory_repository.rs
use application::{ApplicationError, PostRepository, next_post_id};
use async_trait::async_trait;
use domain::{NewPost, Post, PostId, PostPatch, SortSpec};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

use super::seed::seed_posts;

/// Ordered in-memory post store.
///
/// A single lock guards the whole sequence: mutations take the write lock for
/// their entire read-modify-write, reads take the read lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPostRepository {
    posts: Arc<RwLock<Vec<Post>>>,
}

impl InMemoryPostRepository {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the given posts, in the given order. Ids must be unique.
    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: Arc::new(RwLock::new(posts)),
        }
    }

    /// A store holding the seed posts.
    pub fn seeded() -> Self {
        Self::with_posts(seed_posts())
    }
}

fn position_of(posts: &[Post], id: PostId) -> Option<usize> {
    posts.iter().position(|post| post.id() == id)
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Post>, ApplicationError> {
        debug!("Listing posts from in-memory store");
        Ok(self.posts.read().await.clone())
    }

    #[instrument(skip(self))]
    async fn sort(&self, spec: SortSpec) -> Result<Vec<Post>, ApplicationError> {
        let mut posts = self.posts.write().await;
        // Stable sort: equal keys keep their previous relative order.
        posts.sort_by(|a, b| spec.compare(a, b));
        debug!(count = posts.len(), "Stored order replaced by sorted order");
        Ok(posts.clone())
    }

    #[instrument(skip(self))]
    async fn get(&self, id: PostId) -> Result<Option<Post>, ApplicationError> {
        debug!(post_id = %id, "Getting post from in-memory store");
        let posts = self.posts.read().await;
        Ok(position_of(&posts, id).map(|index| posts[index].clone()))
    }

    #[instrument(skip(self, new_post))]
    async fn create(&self, new_post: NewPost) -> Result<Vec<Post>, ApplicationError> {
        let mut posts = self.posts.write().await;
        let id = next_post_id(&posts).ok_or_else(|| {
            error!("No post id left to assign");
            ApplicationError::InfrastructureError("post id space exhausted".to_string())
        })?;
        debug!(post_id = %id, "Appending post to in-memory store");
        posts.push(Post::new(id, new_post));
        Ok(posts.clone())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: PostId) -> Result<bool, ApplicationError> {
        debug!(post_id = %id, "Deleting post from in-memory store");
        let mut posts = self.posts.write().await;
        match position_of(&posts, id) {
            Some(index) => {
                posts.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[instrument(skip(self, patch))]
    async fn update(
        &self,
        id: PostId,
        patch: PostPatch,
    ) -> Result<Option<Post>, ApplicationError> {
        debug!(post_id = %id, "Updating post in in-memory store");
        let mut posts = self.posts.write().await;
        Ok(posts.iter_mut().find(|post| post.id() == id).map(|post| {
            post.apply(patch);
            post.clone()
        }))
    }

    #[instrument(skip(self))]
    async fn find_by_title(&self, title: &str) -> Result<Vec<Post>, ApplicationError> {
        debug!("Filtering posts by exact title");
        let posts = self.posts.read().await;
        Ok(posts
            .iter()
            .filter(|post| post.title() == title)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<usize, ApplicationError> {
        Ok(self.posts.read().await.len())
    }

    async fn next_id(&self) -> Result<Option<PostId>, ApplicationError> {
        Ok(next_post_id(&self.posts.read().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{SortDirection, SortField};

    fn new_post(title: &str, content: &str) -> NewPost {
        NewPost::new(Some(title.to_string()), Some(content.to_string())).unwrap()
    }

    fn ids(posts: &[Post]) -> Vec<u64> {
        posts.iter().map(|post| post.id().value()).collect()
    }

    fn spec(field: SortField, direction: SortDirection) -> SortSpec {
        SortSpec { field, direction }
    }

    #[tokio::test]
    async fn seeded_store_holds_three_posts_in_order() {
        let repo = InMemoryPostRepository::seeded();
        let posts = repo.list().await.unwrap();
        assert_eq!(ids(&posts), vec![1, 2, 3]);
        assert_eq!(posts[0].title(), "First post");
    }

    #[tokio::test]
    async fn create_appends_with_max_plus_one() {
        let repo = InMemoryPostRepository::seeded();
        let posts = repo.create(new_post("T", "C")).await.unwrap();
        assert_eq!(ids(&posts), vec![1, 2, 3, 4]);
        assert_eq!(posts[3].title(), "T");
        assert_eq!(posts[3].content(), "C");
    }

    #[tokio::test]
    async fn create_on_empty_store_starts_at_one() {
        let repo = InMemoryPostRepository::new();
        let posts = repo.create(new_post("T", "C")).await.unwrap();
        assert_eq!(ids(&posts), vec![1]);
    }

    #[tokio::test]
    async fn create_after_sort_uses_max_not_last() {
        let repo = InMemoryPostRepository::seeded();
        repo.sort(spec(SortField::Title, SortDirection::Desc))
            .await
            .unwrap();
        let posts = repo.create(new_post("T", "C")).await.unwrap();
        assert_eq!(posts.last().unwrap().id(), PostId::new(4));
    }

    #[tokio::test]
    async fn delete_removes_exactly_one() {
        let repo = InMemoryPostRepository::seeded();
        assert!(repo.delete(PostId::new(2)).await.unwrap());
        assert_eq!(ids(&repo.list().await.unwrap()), vec![1, 3]);
        assert_eq!(repo.get(PostId::new(2)).await.unwrap(), None);
        assert!(!repo.delete(PostId::new(2)).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn update_merges_provided_fields_only() {
        let repo = InMemoryPostRepository::seeded();
        let updated = repo
            .update(
                PostId::new(1),
                PostPatch {
                    title: Some("X".to_string()),
                    content: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id(), PostId::new(1));
        assert_eq!(updated.title(), "X");
        assert_eq!(updated.content(), "This is the first post.");
        assert_eq!(repo.get(PostId::new(1)).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn update_missing_post_changes_nothing() {
        let repo = InMemoryPostRepository::seeded();
        let before = repo.list().await.unwrap();
        let result = repo
            .update(
                PostId::new(42),
                PostPatch {
                    title: Some("X".to_string()),
                    content: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(repo.list().await.unwrap(), before);
    }

    #[tokio::test]
    async fn sort_replaces_stored_order() {
        let repo = InMemoryPostRepository::seeded();
        let sorted = repo
            .sort(spec(SortField::Content, SortDirection::Desc))
            .await
            .unwrap();
        // "This is the third..." > "This is the second..." > "This is the first..."
        assert_eq!(ids(&sorted), vec![3, 2, 1]);
        assert_eq!(repo.list().await.unwrap(), sorted);
    }

    #[tokio::test]
    async fn title_asc_and_desc_are_reverses() {
        let repo = InMemoryPostRepository::seeded();
        let asc = repo
            .sort(spec(SortField::Title, SortDirection::Asc))
            .await
            .unwrap();
        let mut desc = repo
            .sort(spec(SortField::Title, SortDirection::Desc))
            .await
            .unwrap();
        // "First post" < "Post 3" < "Second post"
        assert_eq!(ids(&asc), vec![1, 3, 2]);
        desc.reverse();
        assert_eq!(desc, asc);
    }

    #[tokio::test]
    async fn sort_is_stable_for_equal_keys() {
        let repo = InMemoryPostRepository::new();
        for (title, content) in [("b", "same"), ("a", "same"), ("c", "same")] {
            repo.create(new_post(title, content)).await.unwrap();
        }
        let asc = repo
            .sort(spec(SortField::Content, SortDirection::Asc))
            .await
            .unwrap();
        assert_eq!(ids(&asc), vec![1, 2, 3]);
        let desc = repo
            .sort(spec(SortField::Content, SortDirection::Desc))
            .await
            .unwrap();
        assert_eq!(ids(&desc), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn find_by_title_is_exact_and_case_sensitive() {
        let repo = InMemoryPostRepository::seeded();
        let hits = repo.find_by_title("Post 3").await.unwrap();
        assert_eq!(ids(&hits), vec![3]);
        assert!(repo.find_by_title("post 3").await.unwrap().is_empty());
        assert!(repo.find_by_title("Post").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn next_id_tracks_store_contents() {
        let repo = InMemoryPostRepository::new();
        assert_eq!(repo.next_id().await.unwrap(), Some(PostId::FIRST));
        let repo = InMemoryPostRepository::seeded();
        assert_eq!(repo.next_id().await.unwrap(), Some(PostId::new(4)));
    }

    #[tokio::test]
    async fn concurrent_creates_get_unique_ids() {
        let repo = InMemoryPostRepository::seeded();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.create(new_post(&format!("t{i}"), "c")).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        let mut all = ids(&repo.list().await.unwrap());
        all.sort_unstable();
        assert_eq!(all, (1..=19).collect::<Vec<_>>());
    }
}
