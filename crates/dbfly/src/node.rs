//! Change descriptor node model and decoding.
//!
//! A structured change descriptor is an XML document whose root element
//! carries an ordered list of change elements. Each element decodes into one
//! [`Node`] variant; document order is preserved because later operations
//! may reference objects created by earlier ones. Decoding is strict: an
//! unknown element or a missing required attribute fails the whole
//! migration run.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Dialect marker meaning "applies under every dialect".
pub const ALL_DIALECTS: &str = "$all";

/// Logical column data types, mapped to physical types per dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "VARCHAR")]
    Varchar,
    #[serde(rename = "CHAR")]
    Char,
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "CLOB")]
    Clob,
    #[serde(rename = "BOOLEAN")]
    Boolean,
    #[serde(rename = "TINYINT")]
    Tinyint,
    #[serde(rename = "SMALLINT")]
    Smallint,
    #[serde(rename = "INT")]
    Int,
    #[serde(rename = "BIGINT")]
    Bigint,
    #[serde(rename = "DECIMAL")]
    Decimal,
    #[serde(rename = "DATE")]
    Date,
    #[serde(rename = "TIME")]
    Time,
    #[serde(rename = "TIMESTAMP")]
    Timestamp,
    #[serde(rename = "BLOB")]
    Blob,
}

impl DataType {
    /// The logical type name as written in descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Varchar => "VARCHAR",
            DataType::Char => "CHAR",
            DataType::Text => "TEXT",
            DataType::Clob => "CLOB",
            DataType::Boolean => "BOOLEAN",
            DataType::Tinyint => "TINYINT",
            DataType::Smallint => "SMALLINT",
            DataType::Int => "INT",
            DataType::Bigint => "BIGINT",
            DataType::Decimal => "DECIMAL",
            DataType::Date => "DATE",
            DataType::Time => "TIME",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Blob => "BLOB",
        }
    }
}

/// One typed unit of schema change, in descriptor document order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Node {
    CreateTable(CreateTableNode),
    CreateIndex(CreateIndexNode),
    CreatePrimaryKey(CreatePrimaryKeyNode),
    DropTable(DropTableNode),
    DropIndex(DropIndexNode),
    AddColumn(AddColumnNode),
    RenameColumn(RenameColumnNode),
    AlterColumn(AlterColumnNode),
    DropColumn(DropColumnNode),
    DropPrimaryKey(DropPrimaryKeyNode),
    RenameTable(RenameTableNode),
    AlterTableRemarks(AlterTableRemarksNode),
    Script(ScriptNode),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTableNode {
    #[serde(rename = "@tableName")]
    pub table_name: String,
    #[serde(rename = "@remarks", default)]
    pub remarks: String,
    #[serde(rename = "column", default)]
    pub columns: Vec<ColumnNode>,
    #[serde(rename = "attribute", default)]
    pub attributes: Vec<AttributeNode>,
}

/// Dialect-specific table attribute, e.g. a MySQL `ENGINE = InnoDB`.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeNode {
    #[serde(rename = "@dialect")]
    pub dialect: String,
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@value")]
    pub value: String,
}

/// A column definition.
///
/// `default_origin_value` is a raw SQL expression emitted verbatim and wins
/// over `default_value`, which is a literal that gets single-quoted with
/// embedded quotes doubled. A missing `nullable` attribute means NOT NULL.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnNode {
    #[serde(rename = "@columnName")]
    pub column_name: String,
    #[serde(rename = "@dataType")]
    pub data_type: DataType,
    #[serde(rename = "@maxLength", default)]
    pub max_length: u32,
    #[serde(rename = "@numericScale", default)]
    pub numeric_scale: u32,
    #[serde(rename = "@nullable", default)]
    pub nullable: bool,
    #[serde(rename = "@unique", default)]
    pub unique: bool,
    #[serde(rename = "@primaryKey", default)]
    pub primary_key: bool,
    #[serde(rename = "@keyName", default)]
    pub key_name: String,
    #[serde(rename = "@defaultValue", default)]
    pub default_value: String,
    #[serde(rename = "@defaultOriginValue", default)]
    pub default_origin_value: String,
    #[serde(rename = "@remarks", default)]
    pub remarks: String,
    #[serde(rename = "columnDialect", default)]
    pub dialects: Vec<ColumnDialectNode>,
}

/// A per-dialect column override that fully replaces the logical type and
/// default when the active dialect matches.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnDialectNode {
    #[serde(rename = "@dialect")]
    pub dialect: String,
    #[serde(rename = "@dataType")]
    pub data_type: String,
    #[serde(rename = "@defaultValue", default)]
    pub default_value: String,
    #[serde(rename = "@defaultOriginValue", default)]
    pub default_origin_value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIndexNode {
    #[serde(rename = "@tableName")]
    pub table_name: String,
    #[serde(rename = "@indexName")]
    pub index_name: String,
    #[serde(rename = "@unique", default)]
    pub unique: bool,
    #[serde(rename = "indexColumn", default)]
    pub columns: Vec<IndexColumnNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexColumnNode {
    #[serde(rename = "@columnName")]
    pub column_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrimaryKeyNode {
    #[serde(rename = "@tableName")]
    pub table_name: String,
    #[serde(rename = "@keyName")]
    pub key_name: String,
    #[serde(rename = "indexColumn")]
    pub column: IndexColumnNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DropTableNode {
    #[serde(rename = "@tableName")]
    pub table_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DropIndexNode {
    #[serde(rename = "@tableName")]
    pub table_name: String,
    #[serde(rename = "@indexName")]
    pub index_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddColumnNode {
    #[serde(rename = "@tableName")]
    pub table_name: String,
    #[serde(rename = "column", default)]
    pub columns: Vec<ColumnNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameColumnNode {
    #[serde(rename = "@tableName")]
    pub table_name: String,
    #[serde(rename = "@columnName")]
    pub column_name: String,
    #[serde(rename = "@newColumnName")]
    pub new_column_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlterColumnNode {
    #[serde(rename = "@tableName")]
    pub table_name: String,
    #[serde(rename = "@columnName")]
    pub column_name: String,
    #[serde(rename = "column")]
    pub column: ColumnNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DropColumnNode {
    #[serde(rename = "@tableName")]
    pub table_name: String,
    #[serde(rename = "@columnName")]
    pub column_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DropPrimaryKeyNode {
    #[serde(rename = "@tableName")]
    pub table_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameTableNode {
    #[serde(rename = "@tableName")]
    pub table_name: String,
    #[serde(rename = "@newTableName")]
    pub new_table_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlterTableRemarksNode {
    #[serde(rename = "@tableName")]
    pub table_name: String,
    #[serde(rename = "@remarks", default)]
    pub remarks: String,
}

/// A raw SQL script, applied only under the tagged dialect (or [`ALL_DIALECTS`]).
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptNode {
    #[serde(rename = "@dialect")]
    pub dialect: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct ChangeSet {
    #[serde(rename = "$value", default)]
    nodes: Vec<Node>,
}

/// Decode a structured descriptor document into its ordered nodes.
pub fn decode_changes(content: &[u8]) -> Result<Vec<Node>> {
    let changes: ChangeSet = quick_xml::de::from_reader(content)?;
    Ok(changes.nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG_TABLE: &str = r#"<?xml version="1.0"?>
<dbfly xmlns="https://example.com/xml/dbfly">
    <createTable tableName="t_config" remarks="configuration">
        <column columnName="config_key" dataType="VARCHAR" maxLength="100" primaryKey="true"
                remarks="key"/>
        <column columnName="config_value" dataType="TEXT" remarks="value"/>
        <column columnName="created_at" dataType="TIMESTAMP" nullable="false"/>
        <column columnName="updated_at" dataType="TIMESTAMP" nullable="false"/>
    </createTable>
</dbfly>"#;

    #[test]
    fn test_decode_create_table() {
        let nodes = decode_changes(CONFIG_TABLE.as_bytes()).unwrap();
        assert_eq!(nodes.len(), 1);
        let Node::CreateTable(table) = &nodes[0] else {
            panic!("expected createTable node");
        };
        assert_eq!(table.table_name, "t_config");
        assert_eq!(table.remarks, "configuration");
        assert_eq!(table.columns.len(), 4);

        let key = &table.columns[0];
        assert_eq!(key.column_name, "config_key");
        assert_eq!(key.data_type, DataType::Varchar);
        assert_eq!(key.max_length, 100);
        assert!(key.primary_key);
        assert!(!key.nullable);

        let value = &table.columns[1];
        assert_eq!(value.data_type, DataType::Text);
        assert!(!value.primary_key);
    }

    #[test]
    fn test_decode_preserves_document_order() {
        let xml = r#"<changes>
            <dropIndex tableName="t" indexName="idx_a"/>
            <createIndex tableName="t" indexName="idx_b" unique="true">
                <indexColumn columnName="a"/>
                <indexColumn columnName="b"/>
            </createIndex>
            <renameTable tableName="t" newTableName="t2"/>
        </changes>"#;
        let nodes = decode_changes(xml.as_bytes()).unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[0], Node::DropIndex(_)));
        let Node::CreateIndex(index) = &nodes[1] else {
            panic!("expected createIndex node");
        };
        assert!(index.unique);
        assert_eq!(index.columns.len(), 2);
        assert!(matches!(nodes[2], Node::RenameTable(_)));
    }

    #[test]
    fn test_decode_column_dialect_override() {
        let xml = r#"<changes>
            <addColumn tableName="t">
                <column columnName="payload" dataType="TEXT" nullable="true">
                    <columnDialect dialect="mysql" dataType="JSON"/>
                </column>
            </addColumn>
        </changes>"#;
        let nodes = decode_changes(xml.as_bytes()).unwrap();
        let Node::AddColumn(add) = &nodes[0] else {
            panic!("expected addColumn node");
        };
        assert_eq!(add.columns[0].dialects.len(), 1);
        assert_eq!(add.columns[0].dialects[0].dialect, "mysql");
        assert_eq!(add.columns[0].dialects[0].data_type, "JSON");
    }

    #[test]
    fn test_decode_script_text() {
        let xml = r#"<changes>
            <script dialect="mysql">UPDATE t SET a = 1;
DELETE FROM t WHERE a = 2;</script>
        </changes>"#;
        let nodes = decode_changes(xml.as_bytes()).unwrap();
        let Node::Script(script) = &nodes[0] else {
            panic!("expected script node");
        };
        assert_eq!(script.dialect, "mysql");
        assert!(script.value.contains("UPDATE t SET a = 1;"));
    }

    #[test]
    fn test_decode_create_primary_key() {
        let xml = r#"<changes>
            <createPrimaryKey tableName="t" keyName="pk_t">
                <indexColumn columnName="id"/>
            </createPrimaryKey>
        </changes>"#;
        let nodes = decode_changes(xml.as_bytes()).unwrap();
        let Node::CreatePrimaryKey(pk) = &nodes[0] else {
            panic!("expected createPrimaryKey node");
        };
        assert_eq!(pk.key_name, "pk_t");
        assert_eq!(pk.column.column_name, "id");
    }

    #[test]
    fn test_decode_unknown_element_fails() {
        let xml = r#"<changes><truncateTable tableName="t"/></changes>"#;
        assert!(decode_changes(xml.as_bytes()).is_err());
    }

    #[test]
    fn test_decode_missing_required_attribute_fails() {
        let xml = r#"<changes><dropTable/></changes>"#;
        assert!(decode_changes(xml.as_bytes()).is_err());
    }

    #[test]
    fn test_decode_malformed_markup_fails() {
        let xml = r#"<changes><dropTable tableName="t">"#;
        assert!(decode_changes(xml.as_bytes()).is_err());
    }

    #[test]
    fn test_decode_unknown_data_type_fails() {
        let xml = r#"<changes>
            <addColumn tableName="t">
                <column columnName="c" dataType="GEOMETRY"/>
            </addColumn>
        </changes>"#;
        assert!(decode_changes(xml.as_bytes()).is_err());
    }
}
