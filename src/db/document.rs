use super::{Database, StoreError, StoreResult};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, OptionalExtension, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// A stored document: its collection, the store-assigned id and the JSON body.
#[derive(Debug, Clone)]
pub struct Document {
    pub collection: String,
    pub id: String,
    pub data: Map<String, Value>,
}

impl Document {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Deserialize the body into `T`, with the document id injected as `id`.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut data = self.data.clone();
        data.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(data)).map_err(|source| StoreError::Malformed {
            collection: self.collection.clone(),
            id: self.id.clone(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn keyword(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Collection query: equality filters, an optional ordering field and limit.
///
/// Without an ordering the documents come back in insertion order. With one,
/// documents missing the ordering field are excluded and ties keep insertion
/// order.
#[derive(Debug, Clone)]
pub struct Query {
    collection: String,
    filters: Vec<(String, Value)>,
    order_by: Option<(String, Direction)>,
    limit: Option<usize>,
}

impl Query {
    pub fn collection(name: &str) -> Self {
        Self {
            collection: name.to_string(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn to_sql(&self) -> StoreResult<(String, Vec<SqlValue>)> {
        let mut sql = String::from("SELECT id, data FROM documents WHERE collection = ?");
        let mut params = vec![SqlValue::Text(self.collection.clone())];

        for (field, value) in &self.filters {
            let path = field_path(field)?;
            match to_sql_value(value) {
                Some(v) => {
                    sql.push_str(&format!(" AND json_extract(data, '{}') = ?", path));
                    params.push(v);
                }
                None => sql.push_str(&format!(" AND json_extract(data, '{}') IS NULL", path)),
            }
        }

        match &self.order_by {
            Some((field, direction)) => {
                let path = field_path(field)?;
                sql.push_str(&format!(
                    " AND json_extract(data, '{path}') IS NOT NULL ORDER BY json_extract(data, '{path}') {}, seq ASC",
                    direction.keyword()
                ));
            }
            None => sql.push_str(" ORDER BY seq ASC"),
        }

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(SqlValue::Integer(limit as i64));
        }

        Ok((sql, params))
    }
}

/// Field names are inlined into JSON paths, so only plain identifiers
/// (optionally dotted for nested objects) are accepted.
fn field_path(field: &str) -> StoreResult<String> {
    let valid = !field.is_empty()
        && field.split('.').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !valid {
        return Err(StoreError::InvalidField(field.to_string()));
    }
    Ok(format!("$.{}", field))
}

fn to_sql_value(value: &Value) -> Option<SqlValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(SqlValue::Integer(i)),
            None => Some(SqlValue::Real(n.as_f64().unwrap_or_default())),
        },
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        other => Some(SqlValue::Text(other.to_string())),
    }
}

fn to_object<T: Serialize>(value: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        _ => Err(StoreError::NotAnObject),
    }
}

fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Debug)]
enum WriteOp {
    Add {
        collection: String,
        id: String,
        data: Map<String, Value>,
    },
    Update {
        collection: String,
        id: String,
        fields: Map<String, Value>,
    },
}

/// A group of writes applied atomically by [`Database::commit`]: either every
/// operation lands or none does.
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a new document and return the id it will be stored under.
    pub fn add<T: Serialize>(&mut self, collection: &str, value: &T) -> StoreResult<String> {
        let data = to_object(value)?;
        let id = new_document_id();
        self.ops.push(WriteOp::Add {
            collection: collection.to_string(),
            id: id.clone(),
            data,
        });
        Ok(id)
    }

    /// Queue a merge of `fields` into an existing document. Committing fails
    /// with [`StoreError::NotFound`] if the document does not exist.
    pub fn update(&mut self, collection: &str, id: &str, fields: Map<String, Value>) {
        self.ops.push(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

fn apply(tx: &Transaction<'_>, op: &WriteOp) -> StoreResult<()> {
    match op {
        WriteOp::Add {
            collection,
            id,
            data,
        } => {
            tx.execute(
                "INSERT INTO documents (collection, id, data) VALUES (?, ?, ?)",
                (collection, id, serde_json::to_string(data)?),
            )?;
        }
        WriteOp::Update {
            collection,
            id,
            fields,
        } => {
            let affected = tx.execute(
                "UPDATE documents SET data = json_patch(data, ?) WHERE collection = ? AND id = ?",
                (serde_json::to_string(fields)?, collection, id),
            )?;
            if affected == 0 {
                return Err(StoreError::NotFound {
                    collection: collection.clone(),
                    id: id.clone(),
                });
            }
        }
    }
    Ok(())
}

fn row_to_document(collection: &str, id: String, raw: String) -> StoreResult<Document> {
    let data = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(StoreError::NotAnObject),
        Err(source) => {
            return Err(StoreError::Malformed {
                collection: collection.to_string(),
                id,
                source,
            })
        }
    };
    Ok(Document {
        collection: collection.to_string(),
        id,
        data,
    })
}

impl Database {
    pub fn add<T: Serialize>(&self, collection: &str, value: &T) -> StoreResult<String> {
        let mut batch = WriteBatch::new();
        let id = batch.add(collection, value)?;
        self.commit(batch)?;
        Ok(id)
    }

    pub fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.update(collection, id, fields);
        self.commit(batch)
    }

    pub fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut conn = self.get()?;
        let tx = conn.transaction()?;
        for op in &batch.ops {
            apply(&tx, op)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Point read by id.
    pub fn fetch(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let conn = self.get()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ? AND id = ?",
                (collection, id),
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|raw| row_to_document(collection, id.to_string(), raw))
            .transpose()
    }

    pub fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let (sql, params) = query.to_sql()?;
        let conn = self.get()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, raw)| row_to_document(&query.collection, id, raw))
            .collect()
    }

    /// Every document of a collection in insertion order.
    pub fn stream(&self, collection: &str) -> StoreResult<Vec<Document>> {
        self.query(&Query::collection(collection))
    }
}
