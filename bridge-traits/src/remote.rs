//! Remote preference service contract.
//!
//! Only the contract lives here. Hosts supply the transport (REST, gRPC, a
//! stub for offline builds) and map failures to [`BridgeError`](crate::error::BridgeError).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Authoritative like/dislike state for one song and one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongLikeStatus {
    pub is_liked: bool,
    pub is_disliked: bool,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub dislikes_count: u64,
}

/// Server-side like/dislike operations.
///
/// `like` and `dislike` are toggles on the server as well; callers follow up
/// with [`status`](PreferenceApi::status) to learn the settled state.
#[async_trait]
pub trait PreferenceApi: Send + Sync {
    async fn like(&self, user_id: &str, song_id: &str) -> Result<()>;

    async fn dislike(&self, user_id: &str, song_id: &str) -> Result<()>;

    async fn status(&self, song_id: &str, user_id: &str) -> Result<SongLikeStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_decodes_camel_case() {
        let json = r#"{"isLiked":true,"isDisliked":false,"likesCount":12,"dislikesCount":3}"#;
        let status: SongLikeStatus = serde_json::from_str(json).unwrap();

        assert!(status.is_liked);
        assert!(!status.is_disliked);
        assert_eq!(status.likes_count, 12);
        assert_eq!(status.dislikes_count, 3);
    }

    #[test]
    fn status_counts_are_optional() {
        let status: SongLikeStatus =
            serde_json::from_str(r#"{"isLiked":false,"isDisliked":true}"#).unwrap();
        assert!(status.is_disliked);
        assert_eq!(status.likes_count, 0);
    }
}
