use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub post_type: String, // 'general', 'financial', 'invoice', 'question', 'announcement'
    pub invoice_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRecord {
    pub follower_id: String,
    pub followee_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequestRecord {
    pub id: String,
    pub post_id: String,
    pub sender_id: String,
    pub message: Option<String>,
    pub status: String, // 'pending', 'accepted', 'rejected'
    pub sent_at: String,
}
