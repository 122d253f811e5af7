use agora_database::{SqlxObject, SqlxSchema};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum Level {
    #[default]
    Low,
    High,
}

#[derive(Debug, Clone, Default, SqlxObject)]
#[table_name = "members"]
pub struct Member {
    pub id: Uuid,
    #[unique]
    pub handle: String,
    pub level: Level,
    pub backup_level: Option<Level>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, SqlxObject)]
#[table_name = "tags"]
pub struct Tag {
    pub id: String,
    #[indexed]
    pub label: String,
}

#[derive(Debug, Clone, Default, SqlxObject)]
#[table_name = "member_tags"]
#[unique_index("member_id", "tag_id")]
pub struct MemberTag {
    pub id: Uuid,
    #[foreign_key(referenced_table = "members", related_rust_type = "Member")]
    pub member_id: Uuid,
    #[foreign_key(referenced_table = "tags", related_rust_type = "Tag")]
    pub tag_id: String,
}

#[test]
fn primary_key_type_follows_id_field() {
    fn id_of<T: SqlxSchema>(v: &T) -> T::Id { v.get_id_value() }

    let tag = Tag { id: "rust".into(), label: "Rust".into() };
    let id: String = id_of(&tag);
    assert_eq!(id, "rust");

    assert!(Tag::create_table_sql().contains("\"id\" TEXT PRIMARY KEY"));
    assert!(!Tag::create_table_sql().contains("gen_random_uuid"));
    assert!(Member::create_table_sql().contains("\"id\" UUID PRIMARY KEY DEFAULT gen_random_uuid()"));
}

#[test]
fn enums_are_text_columns_and_timestamps_are_db_managed() {
    let create = Member::create_table_sql();
    assert!(create.contains("\"handle\" TEXT NOT NULL UNIQUE"));
    assert!(create.contains("\"level\" TEXT NOT NULL"));
    assert!(create.contains("\"backup_level\" TEXT,"));
    assert!(create.contains("\"created_at\" BIGINT NOT NULL DEFAULT floor(extract(epoch from now()))"));

    assert_eq!(
        Member::insert_sql(),
        "INSERT INTO \"members\" (\"id\", \"handle\", \"level\", \"backup_level\") VALUES ($1, $2, $3, $4) \
         RETURNING \"id\", \"handle\", \"level\", \"backup_level\", \"created_at\", \"updated_at\""
    );
    assert!(Member::trigger_sql().contains("CREATE TRIGGER set_updated_at_members BEFORE UPDATE ON \"members\""));
    assert!(Tag::trigger_sql().is_empty());
}

#[test]
fn from_row_parses_text_columns() {
    let id = Uuid::new_v4();
    let row = MemberRow {
        id,
        handle: "ada".into(),
        level: "High".into(),
        backup_level: None,
        created_at: 10,
        updated_at: 11,
    };
    let member = Member::from_row(row).unwrap();
    assert_eq!(member.id, id);
    assert_eq!(member.level, Level::High);
    assert_eq!(member.backup_level, None);

    let broken = MemberRow {
        id,
        handle: "ada".into(),
        level: "Medium".into(),
        backup_level: Some("Low".into()),
        created_at: 10,
        updated_at: 11,
    };
    let err = Member::from_row(broken).unwrap_err();
    assert!(err.to_string().contains("column `level`"));
}

#[test]
fn composite_unique_index_and_foreign_key_indexes() {
    let create = MemberTag::create_table_sql();
    assert!(create.contains("CONSTRAINT \"uq_member_tags_member_id_tag_id\" UNIQUE (\"member_id\", \"tag_id\")"));
    assert!(create.contains("FOREIGN KEY (\"tag_id\") REFERENCES \"tags\"(\"id\") ON DELETE CASCADE"));
    assert!(MemberTag::insert_if_absent_sql().contains("ON CONFLICT DO NOTHING RETURNING"));

    assert_eq!(
        MemberTag::INDEXES_SQL,
        &[
            "CREATE INDEX IF NOT EXISTS \"idx_member_tags_member_id\" ON \"member_tags\"(\"member_id\")",
            "CREATE INDEX IF NOT EXISTS \"idx_member_tags_tag_id\" ON \"member_tags\"(\"tag_id\")",
        ]
    );
    assert_eq!(Tag::INDEXES_SQL.len(), 1);
}
