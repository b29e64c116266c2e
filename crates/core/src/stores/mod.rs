pub mod keyword;
pub mod vector;

pub use keyword::KeywordOverlapIndex;
pub use vector::EmbeddingIndex;
