use crate::conversation::{InlineData, Part};
use crate::core::error::DochatError;
use crate::providers::base_client::HttpClient;
use crate::providers::gemini::types::*;
use std::collections::HashMap;

/// Parser for Gemini streaming responses
pub fn gemini_stream_parser(data: String) -> Result<Option<String>, DochatError> {
    let mut content = String::new();

    // Gemini stream sends JSON chunks directly, sometimes multiple per response
    for line in data.lines().filter(|l| !l.trim().is_empty()) {
        let json_str = if let Some(rest) = line.strip_prefix("data: ") {
            rest.trim()
        } else {
            line.trim()
        };

        if json_str.is_empty() || json_str == "[" || json_str == "]" {
            continue;
        }

        let clean_json = json_str.strip_prefix(',').unwrap_or(json_str);
        if clean_json.is_empty() {
            continue;
        }

        let parsed: serde_json::Value = serde_json::from_str(clean_json).map_err(|e| {
            DochatError::Serialization(format!(
                "Failed to parse stream data: {}. Data: '{}'",
                e, clean_json
            ))
        })?;

        if let Some(text) = parsed
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .and_then(|p| p.first())
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
        {
            content.push_str(text);
        }
    }

    if content.is_empty() {
        Ok(None)
    } else {
        Ok(Some(content))
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: HttpClient,
}

impl GeminiClient {
    pub fn new(
        base_url: String,
        api_key: String,
        extra_headers: Option<HashMap<String, String>>,
    ) -> Self {
        let mut client = HttpClient::new(base_url, extra_headers);

        // Add API key to query params
        client.add_query_param("key", api_key);

        Self { client }
    }

    pub async fn generate_content(
        &self,
        parts: &[Part],
        model: &str,
    ) -> Result<String, DochatError> {
        let payload = build_payload(parts);
        let response = self
            .client
            .post(&format!("v1beta/models/{}:generateContent", model), &payload)
            .await?;

        let response_body: String = response.text().await?;
        let parsed: GeminiResponse = serde_json::from_str(&response_body).map_err(|e| {
            DochatError::Serialization(format!("Failed to parse Gemini response: {}", e))
        })?;

        if let Some(candidate) = parsed.candidates.first() {
            if let Some(GeminiPart::Text { text }) = candidate.content.parts.first() {
                return Ok(text.clone());
            }
        }

        Err(DochatError::Api("No valid response from Gemini".to_string()))
    }

    pub async fn generate_content_stream(
        &self,
        parts: &[Part],
        model: &str,
    ) -> Result<futures::stream::BoxStream<'static, Result<String, DochatError>>, DochatError>
    {
        let payload = build_payload(parts);
        let mut client = self.client.clone();
        client.add_query_param("alt", "sse".to_string());
        let response = client
            .post(
                &format!("v1beta/models/{}:streamGenerateContent", model),
                &payload,
            )
            .await?;

        let stream = client
            .stream_response(response, gemini_stream_parser)
            .await?;

        Ok(stream)
    }
}

/// The request carries the whole part list as a single user content; history
/// turns were already flattened into `parts` during request assembly.
fn build_payload(parts: &[Part]) -> GeminiRequest {
    let wire_parts = parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => GeminiPart::Text { text: text.clone() },
            Part::Attachment {
                media_type,
                data: InlineData::Base64(data),
            } => GeminiPart::Inline {
                inline_data: GeminiInlineData {
                    mime_type: media_type.clone(),
                    data: data.clone(),
                },
            },
            Part::Attachment {
                data: InlineData::PlainText(text),
                ..
            } => GeminiPart::Text { text: text.clone() },
        })
        .collect();

    GeminiRequest {
        contents: vec![GeminiContentPart {
            role: "user".to_string(),
            parts: wire_parts,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_parser_extracts_candidate_text() {
        let data = r#"data: {"candidates":[{"content":{"parts":[{"text":"Hel"}]}}]}"#.to_string();
        assert_eq!(gemini_stream_parser(data).unwrap(), Some("Hel".to_string()));
    }

    #[test]
    fn stream_parser_skips_array_brackets_and_blanks() {
        assert_eq!(gemini_stream_parser("[\n".to_string()).unwrap(), None);
        assert_eq!(gemini_stream_parser("]\n".to_string()).unwrap(), None);
        assert_eq!(gemini_stream_parser("\n\n".to_string()).unwrap(), None);
    }

    #[test]
    fn stream_parser_concatenates_multiple_chunks() {
        let data = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]}}]}\n",
        )
        .to_string();
        assert_eq!(gemini_stream_parser(data).unwrap(), Some("Hello".to_string()));
    }

    #[test]
    fn stream_parser_rejects_malformed_json() {
        let result = gemini_stream_parser("data: {not json}".to_string());
        assert!(matches!(result, Err(DochatError::Serialization(_))));
    }

    #[test]
    fn payload_maps_parts_to_wire_format() {
        let parts = vec![
            Part::Attachment {
                media_type: "application/pdf".to_string(),
                data: InlineData::Base64("QUJD".to_string()),
            },
            Part::Text("What is this?".to_string()),
        ];
        let payload = build_payload(&parts);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json["contents"][0]["parts"][0]["inlineData"]["mimeType"],
            "application/pdf"
        );
        assert_eq!(json["contents"][0]["parts"][1]["text"], "What is this?");
        assert_eq!(json["contents"][0]["role"], "user");
    }
}
