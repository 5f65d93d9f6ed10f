use super::*;
use crate::errors::StoreError;
use crate::record::{
    delete_statement, exists_statement, insert_statement, single_primary_key, update_statement,
    validate_record, Record,
};
use crate::relation::{Cascade, RelationKind};
use crate::test_models::{Document, Folder, Membership, TestModel, TestNote, TestRelated};

const SELECT_TEST_MODEL: &str = "SELECT \"test_model\".\"id\", \"test_model\".\"name\" \
     FROM \"test_models\" AS \"test_model\"";

fn test_model() -> TestModel {
    TestModel {
        id: "a".to_string(),
        name: "x".to_string(),
        related: None,
        notes: Vec::new(),
    }
}

#[test]
fn derive_collects_table_metadata() {
    assert_eq!(TestModel::table_name(), "test_models");
    assert_eq!(TestModel::alias(), "test_model");
    assert_eq!(TestModel::columns(), &["id", "name"]);
    assert_eq!(TestModel::primary_key(), &["id"]);

    assert_eq!(TestNote::table_name(), "test_notes");
    assert_eq!(TestNote::alias(), "test_note");
    assert_eq!(Membership::primary_key(), &["group_id", "user_id"]);
}

#[test]
fn derive_declares_relations_in_field_order() {
    let relations = TestModel::relations();
    assert_eq!(relations.len(), 2);

    assert_eq!(relations[0].name(), "related");
    assert_eq!(relations[0].kind(), RelationKind::HasOne);
    assert_eq!(relations[0].cascade(), Cascade::Persist);
    assert_eq!(relations[0].base_column(), "id");
    assert_eq!(relations[0].join_column(), "test_model_id");
    assert_eq!(relations[0].related_table(), TestRelated::table_name());

    assert_eq!(relations[1].name(), "notes");
    assert_eq!(relations[1].kind(), RelationKind::HasMany);
    assert_eq!(relations[1].cascade(), Cascade::None);
    assert_eq!(relations[1].related_table(), "test_notes");
}

#[test]
fn renamed_join_column_is_read_through_its_field() {
    assert_eq!(Document::columns(), &["id", "folder_ref"]);

    let relations = Folder::relations();
    assert_eq!(relations[0].base_column(), "id");
    assert_eq!(relations[0].join_column(), "folder_ref");
    assert!(validate_record::<Folder>().is_ok());
}

#[test]
fn declared_records_validate() {
    assert!(validate_record::<TestModel>().is_ok());
    assert!(validate_record::<TestRelated>().is_ok());
    assert!(validate_record::<Membership>().is_ok());
}

#[test]
fn composite_keys_cannot_be_looked_up_by_id() {
    assert_eq!(single_primary_key::<TestModel>().ok(), Some("id"));
    assert!(matches!(
        single_primary_key::<Membership>(),
        Err(StoreError::PrimaryKeyCount {
            table: "memberships",
            found: 2
        })
    ));
}

#[test]
fn select_without_criteria() {
    assert_eq!(SelectQuery::<TestModel>::new().to_sql(), SELECT_TEST_MODEL);
}

#[test]
fn select_with_filters_and_ordering() {
    let mut query = SelectQuery::<TestModel>::new();
    query
        .eq("name", "x")
        .filter("id", QueryOperator::Gt, "a")
        .is_not_null("name")
        .order_by("name", SortOrder::Desc)
        .order_by("id", SortOrder::Asc)
        .limit(10)
        .offset(20);

    assert_eq!(
        query.to_sql(),
        format!(
            "{} WHERE \"test_model\".\"name\" = $1 AND \"test_model\".\"id\" > $2 \
             AND \"test_model\".\"name\" IS NOT NULL \
             ORDER BY \"test_model\".\"name\" DESC, \"test_model\".\"id\" ASC LIMIT 10 OFFSET 20",
            SELECT_TEST_MODEL
        )
    );
}

#[test]
fn select_in_lists() {
    let mut query = SelectQuery::<TestModel>::new();
    query
        .is_in("id", vec!["a", "b", "c"])
        .not_in("name", vec!["y"]);

    assert_eq!(
        query.to_sql(),
        format!(
            "{} WHERE \"test_model\".\"id\" IN ($1, $2, $3) AND \"test_model\".\"name\" NOT IN ($4)",
            SELECT_TEST_MODEL
        )
    );
}

#[test]
fn empty_in_lists_render_constants() {
    let mut query = SelectQuery::<TestModel>::new();
    query
        .is_in::<&str>("id", Vec::new())
        .not_in::<&str>("name", Vec::new());

    assert_eq!(
        query.to_sql(),
        format!("{} WHERE FALSE AND TRUE", SELECT_TEST_MODEL)
    );
}

#[test]
fn raw_conditions_are_parenthesised_and_expressions_pass_through() {
    let mut query = SelectQuery::<TestModel>::new();
    query
        .where_raw("name = 'x' OR name = 'y'")
        .filter("lower(name)", QueryOperator::Like, "x%");

    assert_eq!(
        query.to_sql(),
        format!(
            "{} WHERE (name = 'x' OR name = 'y') AND lower(name) LIKE $1",
            SELECT_TEST_MODEL
        )
    );
}

#[test]
fn row_locks() {
    let mut query = SelectQuery::<TestModel>::new();
    query.eq("id", "a").for_update(false);
    assert_eq!(
        query.to_sql(),
        format!(
            "{} WHERE \"test_model\".\"id\" = $1 FOR UPDATE OF \"test_model\"",
            SELECT_TEST_MODEL
        )
    );

    let mut query = SelectQuery::<TestModel>::new();
    query.eq("id", "a").for_update(true);
    assert_eq!(
        query.to_sql(),
        format!(
            "{} WHERE \"test_model\".\"id\" = $1 FOR UPDATE OF \"test_model\" SKIP LOCKED",
            SELECT_TEST_MODEL
        )
    );
}

#[test]
fn relation_names_are_deduplicated_and_not_rendered() {
    let mut query = SelectQuery::<TestModel>::new();
    query.relation("related").relation("notes").relation("related");

    assert_eq!(
        query.take_relations(),
        vec!["related".to_string(), "notes".to_string()]
    );
    assert_eq!(query.to_sql(), SELECT_TEST_MODEL);
}

#[test]
fn delete_criteria() {
    assert_eq!(
        DeleteQuery::<TestModel>::new().to_sql(),
        "DELETE FROM \"test_models\" AS \"test_model\""
    );

    let mut query = DeleteQuery::<TestModel>::new();
    query.eq("name", "x").is_null("id");
    assert_eq!(
        query.to_sql(),
        "DELETE FROM \"test_models\" AS \"test_model\" \
         WHERE \"test_model\".\"name\" = $1 AND \"test_model\".\"id\" IS NULL"
    );
}

#[test]
fn write_statements() {
    let model = test_model();

    let insert = insert_statement(&model).expect("insert");
    assert_eq!(
        insert.sql(),
        "INSERT INTO \"test_models\" (\"id\", \"name\") VALUES ($1, $2)"
    );

    let update = update_statement(&model).expect("update").expect("assignable");
    assert_eq!(
        update.sql(),
        "UPDATE \"test_models\" AS \"test_model\" SET \"name\" = $1 \
         WHERE \"test_model\".\"id\" = $2"
    );

    let exists = exists_statement(&model).expect("exists");
    assert_eq!(
        exists.sql(),
        "SELECT EXISTS (SELECT 1 FROM \"test_models\" AS \"test_model\" \
         WHERE \"test_model\".\"id\" = $1)"
    );

    let delete = delete_statement(&model).expect("delete");
    assert_eq!(
        delete.sql(),
        "DELETE FROM \"test_models\" AS \"test_model\" WHERE \"test_model\".\"id\" = $1"
    );
}

#[test]
fn composite_keys_filter_on_every_column() {
    let membership = Membership {
        group_id: 1,
        user_id: 2,
    };

    assert!(update_statement(&membership).expect("update").is_none());

    let delete = delete_statement(&membership).expect("delete");
    assert_eq!(
        delete.sql(),
        "DELETE FROM \"memberships\" AS \"membership\" \
         WHERE \"membership\".\"group_id\" = $1 AND \"membership\".\"user_id\" = $2"
    );
}
