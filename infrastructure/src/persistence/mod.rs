pub mod in_memory_repository;
pub mod seed;

pub use in_memory_repository::InMemoryPostRepository;
pub use seed::seed_posts;
