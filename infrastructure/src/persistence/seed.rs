use domain::{NewPost, Post, PostId};

const SEED: [(u64, &str, &str); 3] = [
    (1, "First post", "This is the first post."),
    (2, "Second post", "This is the second post."),
    (3, "Post 3", "This is the third post."),
];

/// Posts the store starts with when seeding is enabled.
pub fn seed_posts() -> Vec<Post> {
    SEED.iter()
        .map(|&(id, title, content)| {
            Post::new(PostId::new(id), NewPost::from_fields(title, content))
        })
        .collect()
}
