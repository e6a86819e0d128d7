//! JSON-over-HTTP client for an external inference server.
//!
//! The server hosts the model and exposes two routes:
//!
//! - `GET {endpoint}/health` answers 2xx once the model is ready;
//! - `POST {endpoint}/translate` takes `{texts, src_lang, tgt_lang, max_length}`
//!   and returns `{translations}` in input order.
//!
//! Calls are blocking and run on the backend worker pool.

use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::backend::{BackendError, TranslationBackend};
use crate::cache::mutex_lock;
use crate::config::BackendSettings;

const SOURCE: &str = "infra::backend::remote";

#[derive(Debug, Clone)]
pub struct RemoteModelConfig {
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub max_length: u32,
}

impl From<&BackendSettings> for RemoteModelConfig {
    fn from(settings: &BackendSettings) -> Self {
        Self {
            model: settings.model.clone(),
            endpoint: settings.endpoint.clone(),
            timeout: settings.timeout,
            max_length: settings.max_length.get(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TranslatePayload<'a> {
    model: &'a str,
    texts: &'a [String],
    src_lang: &'a str,
    tgt_lang: &'a str,
    max_length: u32,
}

#[derive(Debug, Deserialize)]
struct TranslateReply {
    translations: Vec<String>,
}

pub struct RemoteModelBackend {
    config: RemoteModelConfig,
    client: Mutex<Option<Client>>,
}

impl RemoteModelBackend {
    pub fn new(config: RemoteModelConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.endpoint.trim_end_matches('/'))
    }

    fn client(&self) -> Result<Client, BackendError> {
        mutex_lock(&self.client, SOURCE, "client")
            .clone()
            .ok_or(BackendError::NotLoaded)
    }

    fn user_agent() -> &'static str {
        concat!("transgate/", env!("CARGO_PKG_VERSION"))
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_connect() || err.is_timeout() {
        BackendError::unavailable(err.to_string())
    } else {
        BackendError::inference(err.to_string())
    }
}

fn expect_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let detail = format!("inference server answered {status}: {}", body.trim());
    if status.is_server_error() {
        Err(BackendError::unavailable(detail))
    } else {
        Err(BackendError::inference(detail))
    }
}

impl TranslationBackend for RemoteModelBackend {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    fn load(&self) -> Result<(), BackendError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(self.config.timeout)
            .build()
            .map_err(|err| BackendError::unavailable(err.to_string()))?;

        let response = client
            .get(self.url("health"))
            .send()
            .map_err(transport_error)?;
        expect_success(response)?;

        debug!(
            target = "transgate::backend::remote",
            endpoint = %self.config.endpoint,
            model = %self.config.model,
            "inference server is healthy"
        );
        *mutex_lock(&self.client, SOURCE, "load") = Some(client);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        mutex_lock(&self.client, SOURCE, "is_loaded").is_some()
    }

    fn translate_one(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> Result<String, BackendError> {
        let texts = [text.to_string()];
        self.translate_batch(&texts, source_locale, target_locale)?
            .into_iter()
            .next()
            .ok_or(BackendError::OutputMismatch {
                expected: 1,
                actual: 0,
            })
    }

    fn translate_batch(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
    ) -> Result<Vec<String>, BackendError> {
        let client = self.client()?;
        let payload = TranslatePayload {
            model: &self.config.model,
            texts,
            src_lang: source_locale,
            tgt_lang: target_locale,
            max_length: self.config.max_length,
        };

        let response = client
            .post(self.url("translate"))
            .json(&payload)
            .send()
            .map_err(transport_error)?;
        let reply: TranslateReply = expect_success(response)?
            .json()
            .map_err(|err| BackendError::inference(format!("malformed reply: {err}")))?;

        if reply.translations.len() != texts.len() {
            warn!(
                target = "transgate::backend::remote",
                expected = texts.len(),
                actual = reply.translations.len(),
                "inference server returned a short batch"
            );
            return Err(BackendError::OutputMismatch {
                expected: texts.len(),
                actual: reply.translations.len(),
            });
        }
        Ok(reply.translations)
    }

    fn unload(&self) {
        mutex_lock(&self.client, SOURCE, "unload").take();
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{Json, Router, http::StatusCode, routing::get, routing::post};
    use serde_json::{Value, json};

    use super::*;

    async fn translate(Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
        let texts = body["texts"].as_array().ok_or(StatusCode::BAD_REQUEST)?;
        if body["tgt_lang"] != "spa_Latn" || body["max_length"] != 512 {
            return Err(StatusCode::UNPROCESSABLE_ENTITY);
        }
        if texts.iter().any(|text| text == "short") {
            return Ok(Json(json!({ "translations": [] })));
        }
        let translations: Vec<String> = texts
            .iter()
            .map(|text| format!("es:{}", text.as_str().unwrap_or_default()))
            .collect();
        Ok(Json(json!({ "translations": translations })))
    }

    /// Run a fake inference server on its own runtime; the blocking client
    /// must be driven from outside any async context.
    fn spawn_server() -> (tokio::runtime::Runtime, SocketAddr) {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/translate", post(translate));
        runtime.spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (runtime, addr)
    }

    fn backend(endpoint: String) -> RemoteModelBackend {
        RemoteModelBackend::new(RemoteModelConfig {
            model: "facebook/nllb-200-distilled-600M".to_string(),
            endpoint,
            timeout: Duration::from_secs(5),
            max_length: 512,
        })
    }

    #[test]
    fn loads_and_translates_against_inference_server() {
        let (_runtime, addr) = spawn_server();
        let backend = backend(format!("http://{addr}/"));

        assert!(!backend.is_loaded());
        backend.load().expect("load");
        assert!(backend.is_loaded());

        let texts = vec!["Hello".to_string(), "Bye".to_string()];
        let out = backend
            .translate_batch(&texts, "eng_Latn", "spa_Latn")
            .expect("translate");
        assert_eq!(out, vec!["es:Hello".to_string(), "es:Bye".to_string()]);

        let one = backend
            .translate_one("Welcome", "eng_Latn", "spa_Latn")
            .expect("translate one");
        assert_eq!(one, "es:Welcome");

        let err = backend
            .translate_batch(&["short".to_string()], "eng_Latn", "spa_Latn")
            .expect_err("short batch");
        assert_eq!(
            err,
            BackendError::OutputMismatch {
                expected: 1,
                actual: 0
            }
        );

        let err = backend
            .translate_batch(&texts, "eng_Latn", "fra_Latn")
            .expect_err("rejected");
        assert!(matches!(err, BackendError::Inference(_)));

        backend.unload();
        assert!(!backend.is_loaded());
    }

    #[test]
    fn unreachable_server_fails_to_load() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|listener| listener.local_addr())
            .expect("free port");
        let backend = backend(format!("http://{addr}"));

        let err = backend.load().expect_err("nothing listens");
        assert!(matches!(err, BackendError::Unavailable(_)));
        assert!(!backend.is_loaded());
        assert_eq!(
            backend.translate_batch(&[], "eng_Latn", "spa_Latn"),
            Err(BackendError::NotLoaded)
        );
    }
}
