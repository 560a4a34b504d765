use serde::{Deserialize, Serialize}; // For the Post entity & update payloads
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error; // For domain-specific errors

// --- Domain Errors ---
#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),
    #[error("Invalid sort field: '{0}'")]
    InvalidSortField(String),
    #[error("Invalid sort direction: '{0}'")]
    InvalidSortDirection(String),
}

// --- Post ID ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)] // Serialized as a bare integer
pub struct PostId(u64);

impl PostId {
    /// Id handed out when the store holds no posts.
    pub const FIRST: PostId = PostId(1);

    pub fn new(id: u64) -> Self {
        Self(id)
    }
    pub fn value(&self) -> u64 {
        self.0
    }
    /// The id following this one, or `None` once the id space is exhausted.
    pub fn next(&self) -> Option<PostId> {
        self.0.checked_add(1).map(PostId)
    }
}
impl From<u64> for PostId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}
impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// --- Post ---

/// A blog post. The id is fixed at creation; title and content can be patched.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Post {
    id: PostId,
    title: String,
    content: String,
}

impl Post {
    pub fn new(id: PostId, new_post: NewPost) -> Self {
        Self {
            id,
            title: new_post.title,
            content: new_post.content,
        }
    }

    pub fn id(&self) -> PostId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the value of the given sortable field.
    pub fn field(&self, field: SortField) -> &str {
        match field {
            SortField::Title => &self.title,
            SortField::Content => &self.content,
        }
    }

    /// Merges the provided fields into the post. Absent fields are left untouched.
    pub fn apply(&mut self, patch: PostPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
    }
}

/// A post that passed the create-time presence checks but has no id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    title: String,
    content: String,
}

impl NewPost {
    /// Both fields are required; their content is not inspected further.
    pub fn new(title: Option<String>, content: Option<String>) -> Result<Self, DomainError> {
        let title = title.ok_or(DomainError::MissingField("title"))?;
        let content = content.ok_or(DomainError::MissingField("content"))?;
        Ok(Self { title, content })
    }

    /// Builds a post from values that are known to be present.
    pub fn from_fields(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Partial update payload. Keys other than `title` and `content` (including `id`) are ignored.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

// --- Sorting ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Content,
}

impl FromStr for SortField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortField::Title),
            "content" => Ok(SortField::Content),
            other => Err(DomainError::InvalidSortField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(DomainError::InvalidSortDirection(other.to_string())),
        }
    }
}

/// A single-field sort order over posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Parses the optional `sort` / `direction` pair.
    ///
    /// Neither present means "no sort". If either is present, both must name
    /// a valid value; the field is checked before the direction.
    pub fn parse(sort: Option<&str>, direction: Option<&str>) -> Result<Option<Self>, DomainError> {
        if sort.is_none() && direction.is_none() {
            return Ok(None);
        }
        let field = sort
            .ok_or_else(|| DomainError::InvalidSortField(String::new()))?
            .parse()?;
        let direction = direction
            .ok_or_else(|| DomainError::InvalidSortDirection(String::new()))?
            .parse()?;
        Ok(Some(Self { field, direction }))
    }

    /// Lexicographic comparison of the sort field, reversed for `desc`.
    pub fn compare(&self, a: &Post, b: &Post) -> Ordering {
        let ordering = a.field(self.field).cmp(b.field(self.field));
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}
