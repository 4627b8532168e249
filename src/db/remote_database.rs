use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::base::{Database, DatabaseError, DatabaseKind};
use super::value::{Row, Value};

/// A `Database` that talks to a libSQL server (Turso, sqld) over the Hrana
/// HTTP pipeline protocol. Each call runs in its own short-lived stream.
pub struct RemoteDatabase {
    client: reqwest::Client,
    pipeline_url: String,
    auth_token: Option<String>,
}

/// Maps the connection URL onto the HTTP base URL the server accepts.
pub(crate) fn http_base_url(url: &str) -> Result<String, DatabaseError> {
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| DatabaseError::Connect(format!("malformed database URL '{}'", url)))?;
    let scheme = match scheme.to_lowercase().as_str() {
        "libsql" | "https" | "wss" => "https",
        "http" | "ws" => "http",
        other => {
            return Err(DatabaseError::Connect(format!(
                "unsupported database URL scheme '{}'",
                other
            )))
        }
    };
    Ok(format!("{}://{}", scheme, rest.trim_end_matches('/')))
}

// --- Hrana wire types

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
enum HranaValue {
    Null,
    // 64-bit integers travel as strings to survive JSON number precision.
    Integer { value: String },
    Float { value: f64 },
    Text { value: String },
    Blob { base64: String },
}

impl From<&Value> for HranaValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => HranaValue::Null,
            Value::Integer(i) => HranaValue::Integer {
                value: i.to_string(),
            },
            Value::Real(x) => HranaValue::Float { value: *x },
            Value::Text(s) => HranaValue::Text { value: s.clone() },
            Value::Blob(b) => HranaValue::Blob {
                base64: STANDARD_NO_PAD.encode(b),
            },
        }
    }
}

impl TryFrom<HranaValue> for Value {
    type Error = DatabaseError;

    fn try_from(value: HranaValue) -> Result<Self, Self::Error> {
        Ok(match value {
            HranaValue::Null => Value::Null,
            HranaValue::Integer { value } => Value::Integer(value.parse().map_err(|_| {
                DatabaseError::Decode(format!("invalid integer '{}'", value))
            })?),
            HranaValue::Float { value } => Value::Real(value),
            HranaValue::Text { value } => Value::Text(value),
            HranaValue::Blob { base64 } => Value::Blob(
                STANDARD_NO_PAD
                    .decode(base64.trim_end_matches('='))
                    .map_err(|e| DatabaseError::Decode(format!("invalid blob: {}", e)))?,
            ),
        })
    }
}

#[derive(Serialize, Debug)]
struct Statement<'a> {
    sql: &'a str,
    args: Vec<HranaValue>,
    want_rows: bool,
}

#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamRequest<'a> {
    Execute { stmt: Statement<'a> },
    Close,
}

#[derive(Serialize, Debug)]
struct PipelineRequest<'a> {
    baton: Option<String>,
    requests: Vec<StreamRequest<'a>>,
}

#[derive(Deserialize, Debug)]
struct PipelineResponse {
    results: Vec<StreamResult>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamResult {
    Ok { response: StreamResponse },
    Error { error: HranaError },
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamResponse {
    Execute { result: StmtResult },
    Close,
}

#[derive(Deserialize, Debug)]
struct HranaError {
    message: String,
    code: Option<String>,
}

#[derive(Deserialize, Debug)]
struct StmtResult {
    cols: Vec<HranaColumn>,
    rows: Vec<Vec<HranaValue>>,
    affected_row_count: u64,
}

#[derive(Deserialize, Debug)]
struct HranaColumn {
    name: Option<String>,
}

impl RemoteDatabase {
    pub fn new(url: &str, auth_token: Option<String>) -> Result<Self, DatabaseError> {
        let base = http_base_url(url)?;
        info!("Using remote libSQL server at {}", base);
        if auth_token.is_none() {
            info!("No DATABASE_AUTH_TOKEN set; connecting without authorization.");
        }
        Ok(RemoteDatabase {
            client: reqwest::Client::new(),
            pipeline_url: format!("{}/v2/pipeline", base),
            auth_token,
        })
    }

    /// Runs one statement in a fresh stream and closes it.
    async fn run(&self, sql: &str, params: &[Value]) -> Result<StmtResult, DatabaseError> {
        let body = PipelineRequest {
            baton: None,
            requests: vec![
                StreamRequest::Execute {
                    stmt: Statement {
                        sql,
                        args: params.iter().map(HranaValue::from).collect(),
                        want_rows: true,
                    },
                },
                StreamRequest::Close,
            ],
        };

        let mut request = self.client.post(&self.pipeline_url).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DatabaseError::Connect(format!("error sending request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DatabaseError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let pipeline: PipelineResponse = response
            .json()
            .await
            .map_err(|e| DatabaseError::Decode(format!("error parsing response: {}", e)))?;

        match pipeline.results.into_iter().next() {
            Some(StreamResult::Ok {
                response: StreamResponse::Execute { result },
            }) => Ok(result),
            Some(StreamResult::Error { error }) => Err(DatabaseError::Query(match error.code {
                Some(code) => format!("{} ({})", error.message, code),
                None => error.message,
            })),
            Some(StreamResult::Ok { .. }) | None => Err(DatabaseError::Decode(
                "pipeline response did not contain an execute result".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Database for RemoteDatabase {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Remote
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DatabaseError> {
        debug!("execute (remote): {}", sql);
        Ok(self.run(sql, params).await?.affected_row_count)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DatabaseError> {
        debug!("query (remote): {}", sql);
        let result = self.run(sql, params).await?;
        let columns: Vec<String> = result
            .cols
            .into_iter()
            .enumerate()
            .map(|(i, c)| c.name.unwrap_or_else(|| format!("column{}", i)))
            .collect();

        result
            .rows
            .into_iter()
            .map(|row| {
                let values = row
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Row::new(columns.clone(), values))
            })
            .collect()
    }
}
