//! Records shared by unit tests.

use crate::model;
use chrono::{DateTime, Utc};

#[model]
#[record(table = "test_models", alias = "test_model")]
pub struct TestModel {
    #[primary_key]
    pub id: String,
    pub name: String,

    #[relation(has_one, join = "id=test_model_id", persist)]
    pub related: Option<TestRelated>,

    #[relation(has_many, join = "id=test_model_id")]
    pub notes: Vec<TestNote>,
}

#[model]
#[record(table = "test_relateds", alias = "test_related")]
pub struct TestRelated {
    #[primary_key]
    pub id: String,
    pub test_model_id: String,
}

#[model]
pub struct TestNote {
    #[primary_key]
    pub id: i64,
    pub test_model_id: String,
    pub body: String,
}

#[model]
#[record(table = "memberships")]
pub struct Membership {
    #[primary_key]
    pub group_id: i64,
    #[primary_key]
    pub user_id: i64,
}

#[model]
#[record(table = "timestamped")]
pub struct TimestampedModel {
    #[primary_key]
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[model]
#[record(table = "folders")]
pub struct Folder {
    #[primary_key]
    pub id: i64,

    #[relation(has_many, join = "id=folder_ref", join_field = "folder_id")]
    pub documents: Vec<Document>,
}

#[model]
pub struct Document {
    #[primary_key]
    pub id: i64,
    #[sqlx(rename = "folder_ref")]
    pub folder_id: i64,
}
