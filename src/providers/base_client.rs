use crate::core::error::DochatError;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{Client, Response};
use serde::Serialize;
use std::collections::HashMap;

/// Thin reqwest wrapper shared by provider clients.
#[derive(Clone)]
pub struct HttpClient {
    endpoint: String,
    query_params: Vec<(String, String)>,
    extra_headers: HashMap<String, String>,
}

impl HttpClient {
    pub fn new(endpoint: String, extra_headers: Option<HashMap<String, String>>) -> Self {
        Self {
            endpoint,
            query_params: Vec::new(),
            extra_headers: extra_headers.unwrap_or_default(),
        }
    }

    pub fn add_query_param(&mut self, key: &str, value: String) {
        self.query_params.push((key.to_string(), value));
    }

    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<Response, DochatError> {
        let client = Client::builder().build()?;
        let url = format!("{}/{}", self.endpoint, path);

        let mut request = client
            .post(&url)
            .query(&self.query_params)
            .header("Content-Type", "application/json");

        for (key, value) in &self.extra_headers {
            request = request.header(key, value);
        }

        let response = request.json(payload).send().await?;
        if let Err(status_err) = response.error_for_status_ref() {
            return Err(status_err.into());
        }
        Ok(response)
    }

    /// Turn a chunked response body into a stream of parsed text deltas.
    ///
    /// `parser` maps one raw body chunk to `Ok(Some(text))` when it carried
    /// content, `Ok(None)` when it was noise (keep-alives, brackets), or an
    /// error. Chunks are consumed strictly in arrival order.
    pub async fn stream_response(
        &self,
        response: Response,
        parser: fn(String) -> Result<Option<String>, DochatError>,
    ) -> Result<BoxStream<'static, Result<String, DochatError>>, DochatError> {
        let stream = response
            .bytes_stream()
            .map(|item| {
                item.map_err(DochatError::from).and_then(|chunk| {
                    String::from_utf8(chunk.to_vec()).map_err(|e| {
                        DochatError::Serialization(format!("Invalid UTF-8 in stream: {}", e))
                    })
                })
            })
            .filter_map(move |res| async move {
                match res {
                    Ok(data) => parser(data).transpose(),
                    Err(e) => Some(Err(e)),
                }
            });

        Ok(stream.boxed())
    }
}
