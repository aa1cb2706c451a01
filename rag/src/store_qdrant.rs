use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{RagError, Result, Service};
use crate::http::{api_key_headers, HttpClient};
use crate::retrieve_courses::RetrievedDocument;

/// A course document ready to be stored: its embedding plus what retrieval returns.
#[derive(Clone, Debug, PartialEq)]
pub struct CoursePoint {
    /// Stable document id, `course::<course_code>`.
    pub doc_id: String,
    pub vector: Vec<f32>,
    pub title: String,
    pub url: String,
    pub document: String,
}

/// Persistent nearest-neighbour store of course documents.
pub trait VectorIndex: Send + Sync {
    /// Creates the collection if it does not exist yet.
    fn ensure_collection(&self, vector_size: usize) -> Result<()>;

    /// Inserts or replaces points by document id.
    fn upsert(&self, points: &[CoursePoint]) -> Result<()>;

    /// Closest documents first.
    fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<RetrievedDocument>>;

    fn count(&self) -> Result<usize>;
}

/// Qdrant point ids must be integers or UUIDs, so document ids are hashed into a UUID.
pub fn point_id(doc_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, doc_id.as_bytes()).to_string()
}

#[derive(Debug)]
pub struct QdrantIndex {
    http: HttpClient,
    base_url: String,
    collection: String,
    distance: String,
}

impl QdrantIndex {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = HttpClient::new(
            Service::VectorIndex,
            cfg.request_timeout,
            cfg.connect_timeout,
            api_key_headers(cfg.qdrant_api_key.as_deref())?,
        )?;
        Ok(Self {
            http,
            base_url: cfg.qdrant_url.trim_end_matches('/').to_string(),
            collection: cfg.collection.clone(),
            distance: cfg.distance.clone(),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }
}

#[derive(Serialize)]
struct CreateCollection<'a> {
    vectors: VectorParams<'a>,
}

#[derive(Serialize)]
struct VectorParams<'a> {
    size: usize,
    distance: &'a str,
}

#[derive(Serialize, Deserialize, Default)]
struct PointPayload {
    #[serde(default)]
    doc_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    document: Option<String>,
}

#[derive(Serialize)]
struct Point<'a> {
    id: String,
    vector: &'a [f32],
    payload: PointPayload,
}

#[derive(Serialize)]
struct UpsertPoints<'a> {
    points: Vec<Point<'a>>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: Option<T>,
}

#[derive(Deserialize)]
struct QueryResult {
    #[serde(default)]
    points: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(default)]
    payload: Option<PointPayload>,
}

#[derive(Serialize)]
struct CountRequest {
    exact: bool,
}

#[derive(Deserialize)]
struct CountResult {
    count: usize,
}

fn hit_to_document(hit: Hit) -> RetrievedDocument {
    let payload = hit.payload.unwrap_or_default();
    RetrievedDocument {
        text: payload.document.unwrap_or_default(),
        title: payload
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Unknown course".to_string()),
        url: payload.url.unwrap_or_default(),
    }
}

impl VectorIndex for QdrantIndex {
    fn ensure_collection(&self, vector_size: usize) -> Result<()> {
        let url = self.collection_url();
        match self.http.get_json::<Value>(&url) {
            Ok(_) => return Ok(()),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
        let body = CreateCollection {
            vectors: VectorParams {
                size: vector_size,
                distance: &self.distance,
            },
        };
        self.http.put_json::<Value, _>(&url, &body)?;
        tracing::info!(collection = %self.collection, vector_size, "created vector collection");
        Ok(())
    }

    fn upsert(&self, points: &[CoursePoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let url = format!("{}/points?wait=true", self.collection_url());
        let body = UpsertPoints {
            points: points
                .iter()
                .map(|p| Point {
                    id: point_id(&p.doc_id),
                    vector: &p.vector,
                    payload: PointPayload {
                        doc_id: p.doc_id.clone(),
                        title: Some(p.title.clone()),
                        url: Some(p.url.clone()),
                        document: Some(p.document.clone()),
                    },
                })
                .collect(),
        };
        self.http.put_json::<Value, _>(&url, &body)?;
        Ok(())
    }

    fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<RetrievedDocument>> {
        if vector.is_empty() || limit == 0 {
            return Ok(vec![]);
        }
        let url = format!("{}/points/query", self.collection_url());
        let req = QueryRequest {
            query: vector,
            limit,
            with_payload: true,
        };
        let res = self
            .http
            .post_json::<QdrantResponse<QueryResult>, _>(&url, &req)?;
        Ok(res
            .result
            .map(|r| r.points)
            .unwrap_or_default()
            .into_iter()
            .map(hit_to_document)
            .collect())
    }

    fn count(&self) -> Result<usize> {
        let url = format!("{}/points/count", self.collection_url());
        let res = self
            .http
            .post_json::<QdrantResponse<CountResult>, _>(&url, &CountRequest { exact: true })?;
        res.result.map(|r| r.count).ok_or(RagError::EmptyResponse {
            service: Service::VectorIndex,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn index(url: &str) -> QdrantIndex {
        let vars: HashMap<&str, String> = HashMap::from([("QDRANT_URL", url.to_string())]);
        QdrantIndex::new(&Config::from_vars(|k| vars.get(k).cloned())).unwrap()
    }

    #[test]
    fn point_ids_are_stable_uuids() {
        let a = point_id("course::INFOST 790");
        assert_eq!(a, point_id("course::INFOST 790"));
        assert_ne!(a, point_id("course::INFOST 791"));
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn query_keeps_index_order_and_defaults_missing_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/uwm_courses/points/query"))
            .and(body_partial_json(json!({"limit": 3, "with_payload": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"points": [
                    {"id": "a", "score": 0.9, "payload": {
                        "title": "COMPSCI 557: Database Systems",
                        "url": "https://example.edu/cs557",
                        "document": "Relational model."
                    }},
                    {"id": "b", "score": 0.5, "payload": {"document": "Orphan text."}}
                ]}
            })))
            .mount(&server)
            .await;

        let uri = server.uri();
        let docs = tokio::task::spawn_blocking(move || index(&uri).query(&[0.1, 0.2], 3))
            .await
            .unwrap()
            .expect("query");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title, "COMPSCI 557: Database Systems");
        assert_eq!(docs[0].text, "Relational model.");
        assert_eq!(docs[1].title, "Unknown course");
        assert_eq!(docs[1].url, "");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_collection_is_created() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/uwm_courses"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/collections/uwm_courses"))
            .and(body_partial_json(json!({"vectors": {"size": 4, "distance": "Cosine"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        tokio::task::spawn_blocking(move || index(&uri).ensure_collection(4))
            .await
            .unwrap()
            .expect("collection created");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn existing_collection_is_left_alone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let uri = server.uri();
        tokio::task::spawn_blocking(move || index(&uri).ensure_collection(4))
            .await
            .unwrap()
            .expect("no-op");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_sends_uuid_ids_and_payload() {
        let server = MockServer::start().await;
        let doc_id = "course::INFOST 790";
        Mock::given(method("PUT"))
            .and(path("/collections/uwm_courses/points"))
            .and(body_partial_json(json!({"points": [{
                "id": point_id(doc_id),
                "payload": {"doc_id": doc_id, "title": "INFOST 790: Info Architecture"}
            }]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let point = CoursePoint {
            doc_id: doc_id.to_string(),
            vector: vec![0.1, 0.2],
            title: "INFOST 790: Info Architecture".into(),
            url: "https://example.edu/infost790".into(),
            document: "INFOST 790: Info Architecture Intro to IA".into(),
        };
        tokio::task::spawn_blocking(move || index(&uri).upsert(&[point]))
            .await
            .unwrap()
            .expect("upsert");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn count_reads_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/uwm_courses/points/count"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"result": {"count": 42}})),
            )
            .mount(&server)
            .await;

        let uri = server.uri();
        let count = tokio::task::spawn_blocking(move || index(&uri).count())
            .await
            .unwrap()
            .expect("count");
        assert_eq!(count, 42);
    }
}
