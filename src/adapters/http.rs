use crate::domain::model::{
    ApplicationStatus, AttributeValue, CategorizationResult, Document, DocumentPurpose,
    ExtractedDocument, FeedbackReceipt, IntakeSnapshot, Locale, MatchExplanation, MatchQuery,
    RemoteOutcome, SubmissionReceipt, VendorCandidate, VendorFeedback, VendorLocation,
};
use crate::domain::ports::{ApplicationSubmitter, Categorizer, DocumentExtractor, VendorMatcher};
use crate::utils::error::{IntakeError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

const CATEGORIZE_PATH: &str = "api/v1/categorize/product";
const MATCH_PATH: &str = "api/v1/match/recommend-snps";
const UPLOAD_PATH: &str = "api/v1/documents/upload";
const FEEDBACK_PATH: &str = "api/v1/match/feedback";
const SUBMIT_PATH: &str = "api/v1/applications/create";
const APPLICATIONS_PATH: &str = "api/v1/applications/";

/// All four collaborators backed by the intake REST service.
#[derive(Debug, Clone)]
pub struct HttpCollaborators {
    client: Client,
    base_url: Url,
    include_attributes: bool,
}

impl HttpCollaborators {
    pub fn new(base_url: &str, timeout: Duration, include_attributes: bool) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| IntakeError::InvalidConfigValueError {
            field: "service.base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;
        // join() drops the last path segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            include_attributes,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, String> {
        self.base_url
            .join(path)
            .map_err(|e| format!("invalid endpoint {}: {}", path, e))
    }

    /// Send the request and return the JSON body of a successful response.
    async fn send_json(&self, request: RequestBuilder) -> std::result::Result<Value, String> {
        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        tracing::debug!("📡 API response status: {}", status);

        if !status.is_success() {
            let detail = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| text(&body, "detail"));
            return Err(match detail {
                Some(detail) => format!("API request failed with status: {} ({})", status, detail),
                None => format!("API request failed with status: {}", status),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| format!("unreadable response body: {}", e))?;
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let detail = body
                .get("error")
                .or_else(|| body.get("detail"))
                .and_then(Value::as_str)
                .unwrap_or("service reported failure");
            return Err(detail.to_string());
        }
        Ok(body)
    }
}

fn outcome<T>(result: std::result::Result<T, String>) -> RemoteOutcome<T> {
    match result {
        Ok(value) => RemoteOutcome::Ok(value),
        Err(reason) => RemoteOutcome::Failed(reason),
    }
}

fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Finite number inside `[min, max]`; anything else counts as absent.
fn bounded(value: Option<f64>, min: f64, max: f64) -> Option<f64> {
    value.filter(|v| v.is_finite() && (min..=max).contains(v))
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn parse_categorization(body: &Value) -> std::result::Result<CategorizationResult, String> {
    let mut categories = body.get("categories").unwrap_or(&Value::Null);
    // some responses wrap the levels in a second "categories" object
    if let Some(inner) = categories.get("categories") {
        categories = inner;
    }

    let levels: Vec<String> = ["level_1", "level_2", "level_3"]
        .iter()
        .filter_map(|key| text(categories, key))
        .collect();
    if levels.is_empty() {
        return Err("response contained no category levels".to_string());
    }

    let confidence = number(body.get("confidence"))
        .or_else(|| number(categories.get("confidence")))
        .unwrap_or(0.0);

    let attributes = body
        .get("attributes")
        .and_then(Value::as_object)
        .map(parse_attributes)
        .unwrap_or_default();

    Ok(CategorizationResult {
        levels,
        confidence,
        attributes,
    })
}

fn parse_attributes(raw: &Map<String, Value>) -> BTreeMap<String, AttributeValue> {
    raw.iter()
        .filter_map(|(key, value)| {
            let parsed = match value {
                Value::Null => return None,
                Value::String(s) => AttributeValue::Single(s.clone()),
                Value::Array(items) => AttributeValue::Many(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect(),
                ),
                other => AttributeValue::Single(other.to_string()),
            };
            Some((key.clone(), parsed))
        })
        .collect()
}

pub(crate) fn parse_recommendations(body: &Value) -> std::result::Result<Vec<VendorCandidate>, String> {
    let items = body
        .get("recommendations")
        .and_then(Value::as_array)
        .ok_or_else(|| "response contained no recommendations list".to_string())?;

    let mut candidates = Vec::with_capacity(items.len());
    for item in items {
        let snp = item.get("snp").unwrap_or(item);
        let Some(name) = text(snp, "name") else {
            tracing::warn!("⚠️ skipping recommendation without a name: {}", item);
            continue;
        };
        let location = snp.get("location").unwrap_or(&Value::Null);

        let raw_score = item.get("match_score").or_else(|| item.get("matchScore"));
        let match_score = match raw_score {
            Some(Value::Object(score)) => number(score.get("overall_score")),
            other => number(other),
        };
        // the service reports the rating next to the vendor record, older
        // builds nest it inside
        let rating = number(item.get("rating")).or_else(|| number(snp.get("rating")));

        candidates.push(VendorCandidate {
            identity: text(snp, "id").unwrap_or_else(|| name.clone()),
            display_name: name,
            description: text(snp, "description").unwrap_or_default(),
            location: VendorLocation {
                region: text(location, "state").unwrap_or_default(),
                address: text(location, "address")
                    .or_else(|| text(snp, "address"))
                    .unwrap_or_default(),
                city: text(location, "city"),
                pincode: text(location, "pincode").or_else(|| text(snp, "pincode")),
            },
            rating: bounded(rating, 0.0, 5.0),
            contact_phone: text(snp, "phone"),
            match_score: bounded(match_score, 0.0, 1.0),
            explanation: item
                .get("explanation")
                .map(|e| MatchExplanation {
                    main_reasons: strings(e.get("main_reasons")),
                    strengths: strings(e.get("strengths")),
                })
                .unwrap_or_default(),
        });
    }
    Ok(candidates)
}

pub(crate) fn parse_extraction(body: &Value) -> std::result::Result<ExtractedDocument, String> {
    let data = body
        .get("extracted_data")
        .filter(|d| d.is_object())
        .ok_or_else(|| "response contained no extracted_data".to_string())?;

    let fields = data
        .get("fields")
        .and_then(Value::as_object)
        .map(|raw| {
            raw.iter()
                .filter_map(|(key, value)| match value {
                    Value::String(s) => Some((key.clone(), s.clone())),
                    Value::Number(n) => Some((key.clone(), n.to_string())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ExtractedDocument {
        requirement: text(data, "requirement"),
        text: text(data, "text").or_else(|| text(data, "extracted_text")),
        fields,
    })
}

fn parse_receipt(body: &Value) -> std::result::Result<SubmissionReceipt, String> {
    let application_id =
        text(body, "application_id").ok_or_else(|| "response contained no application_id".to_string())?;
    Ok(SubmissionReceipt {
        application_id,
        status: text(body, "status").unwrap_or_else(|| "submitted".to_string()),
    })
}

fn parse_feedback(body: &Value) -> std::result::Result<FeedbackReceipt, String> {
    let feedback_id =
        text(body, "feedback_id").ok_or_else(|| "response contained no feedback_id".to_string())?;
    Ok(FeedbackReceipt {
        feedback_id,
        message: text(body, "message").unwrap_or_default(),
    })
}

pub(crate) fn parse_application(body: &Value) -> std::result::Result<ApplicationStatus, String> {
    let application = body
        .get("application")
        .filter(|a| a.is_object())
        .ok_or_else(|| "response contained no application".to_string())?;
    let application_id = text(application, "application_id")
        .or_else(|| text(application, "id"))
        .ok_or_else(|| "application has no identifier".to_string())?;

    Ok(ApplicationStatus {
        application_id,
        status: text(application, "status").unwrap_or_else(|| "submitted".to_string()),
        selected_vendor: text(application, "selected_snp_id")
            .or_else(|| text(application, "selected_vendor")),
        documents: strings(application.get("documents")),
        created_at: text(application, "created_at"),
    })
}

impl HttpCollaborators {
    async fn try_categorize(
        &self,
        description: &str,
        locale: &Locale,
    ) -> std::result::Result<CategorizationResult, String> {
        let url = self.endpoint(CATEGORIZE_PATH)?;
        let include = if self.include_attributes { "true" } else { "false" };
        let request = self.client.post(url).query(&[
            ("description", description),
            ("language", locale.code()),
            ("include_attributes", include),
        ]);
        let body = self.send_json(request).await?;
        parse_categorization(&body)
    }

    async fn try_recommend(&self, query: &MatchQuery) -> std::result::Result<Vec<VendorCandidate>, String> {
        let url = self.endpoint(MATCH_PATH)?;
        let payload = json!({
            "requirement": query.requirement,
            "state": query.region,
            "products": query.product_descriptions,
            "business_info": { "state": query.region },
        });
        let request = self
            .client
            .post(url)
            .query(&[("top_k", query.top_k.to_string())])
            .json(&payload);
        let body = self.send_json(request).await?;
        parse_recommendations(&body)
    }

    async fn try_extract(
        &self,
        document: &Document,
        purpose: DocumentPurpose,
    ) -> std::result::Result<ExtractedDocument, String> {
        let url = self.endpoint(UPLOAD_PATH)?;
        let mut part = Part::bytes(document.bytes.clone()).file_name(document.filename.clone());
        if !document.content_type.is_empty() {
            part = part
                .mime_str(&document.content_type)
                .map_err(|e| format!("invalid content type: {}", e))?;
        }
        let request = self
            .client
            .post(url)
            .query(&[("document_type", purpose.as_str())])
            .multipart(Form::new().part("file", part));
        let body = self.send_json(request).await?;
        parse_extraction(&body)
    }

    async fn try_submit(&self, snapshot: &IntakeSnapshot) -> std::result::Result<SubmissionReceipt, String> {
        let url = self.endpoint(SUBMIT_PATH)?;
        let body = self.send_json(self.client.post(url).json(snapshot)).await?;
        parse_receipt(&body)
    }

    async fn try_feedback(&self, feedback: &VendorFeedback) -> std::result::Result<FeedbackReceipt, String> {
        let url = self.endpoint(FEEDBACK_PATH)?;
        let mut params = vec![
            ("mse_id", feedback.mse_id.clone()),
            ("snp_id", feedback.snp_id.clone()),
            ("accepted", feedback.accepted.to_string()),
        ];
        if let Some(rating) = feedback.rating {
            params.push(("rating", rating.to_string()));
        }
        if let Some(comments) = feedback.comments.as_ref().filter(|c| !c.trim().is_empty()) {
            params.push(("comments", comments.clone()));
        }
        let body = self.send_json(self.client.post(url).query(&params)).await?;
        parse_feedback(&body)
    }

    async fn try_status(&self, application_id: &str) -> std::result::Result<ApplicationStatus, String> {
        let mut url = self.endpoint(APPLICATIONS_PATH)?;
        url.path_segments_mut()
            .map_err(|_| format!("cannot build a path under {}", self.base_url))?
            .pop_if_empty()
            .push(application_id);
        let body = self.send_json(self.client.get(url)).await?;
        parse_application(&body)
    }
}

#[async_trait]
impl Categorizer for HttpCollaborators {
    async fn categorize(&self, description: &str, locale: &Locale) -> RemoteOutcome<CategorizationResult> {
        outcome(self.try_categorize(description, locale).await)
    }
}

#[async_trait]
impl VendorMatcher for HttpCollaborators {
    async fn recommend(&self, query: &MatchQuery) -> RemoteOutcome<Vec<VendorCandidate>> {
        outcome(self.try_recommend(query).await)
    }

    async fn feedback(&self, feedback: &VendorFeedback) -> RemoteOutcome<FeedbackReceipt> {
        outcome(self.try_feedback(feedback).await)
    }
}

#[async_trait]
impl DocumentExtractor for HttpCollaborators {
    async fn extract(&self, document: &Document, purpose: DocumentPurpose) -> RemoteOutcome<ExtractedDocument> {
        let result = self.try_extract(document, purpose).await;
        if let Err(reason) = &result {
            tracing::debug!(filename = %document.filename, %reason, "upload rejected");
        }
        outcome(result)
    }
}

#[async_trait]
impl ApplicationSubmitter for HttpCollaborators {
    async fn submit(&self, snapshot: &IntakeSnapshot) -> RemoteOutcome<SubmissionReceipt> {
        outcome(self.try_submit(snapshot).await)
    }

    async fn status(&self, application_id: &str) -> RemoteOutcome<ApplicationStatus> {
        outcome(self.try_status(application_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_categories_are_unwrapped() {
        let body = json!({
            "success": true,
            "categories": {
                "categories": {"level_1": "Toys & Games", "level_2": "Wooden Toys", "level_3": ""},
                "confidence": 0.72
            },
            "attributes": {"material": "wood", "age_group": ["3-5", "6-8"]}
        });
        let parsed = parse_categorization(&body).unwrap();
        assert_eq!(parsed.levels, vec!["Toys & Games", "Wooden Toys"]);
        assert_eq!(parsed.confidence, 0.72);
        assert_eq!(
            parsed.attributes.get("age_group"),
            Some(&AttributeValue::Many(vec!["3-5".to_string(), "6-8".to_string()]))
        );
    }

    #[test]
    fn categorization_without_levels_is_an_error() {
        assert!(parse_categorization(&json!({"success": true, "categories": {}})).is_err());
    }

    #[test]
    fn recommendation_scores_accept_number_or_object() {
        let body = json!({
            "recommendations": [
                {"rank": 1, "snp": {"name": "Craft Hub", "rating": "4.1", "location": {"state": "Gujarat", "city": "Surat"}},
                 "match_score": {"overall_score": 0.81}},
                {"rank": 2, "snp": {"id": "snp-7", "name": "Toy Works"}, "match_score": 0.5},
                {"rank": 3, "snp": {"description": "no name"}}
            ]
        });
        let parsed = parse_recommendations(&body).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].identity, "Craft Hub");
        assert_eq!(parsed[0].rating, Some(4.1));
        assert_eq!(parsed[0].match_score, Some(0.81));
        assert_eq!(parsed[0].location.city.as_deref(), Some("Surat"));
        assert_eq!(parsed[1].identity, "snp-7");
        assert_eq!(parsed[1].rating, None);
        assert_eq!(parsed[1].match_score, Some(0.5));
    }

    #[test]
    fn item_level_rating_drives_ranking() {
        let body = json!({
            "recommendations": [
                {"snp": {"name": "Low"}, "rating": 3.0},
                {"snp": {"name": "High"}, "rating": 4.8, "matchScore": 0.9}
            ]
        });
        let parsed = parse_recommendations(&body).unwrap();
        assert_eq!(parsed[0].rating, Some(3.0));
        assert_eq!(parsed[1].rating, Some(4.8));
        assert_eq!(parsed[1].match_score, Some(0.9));

        let ranked = crate::core::RecommendationRanker.rank(parsed);
        assert_eq!(ranked[0].candidate.identity, "High");
        assert_eq!(ranked[1].candidate.identity, "Low");
    }

    #[test]
    fn out_of_range_scores_are_dropped() {
        let body = json!({
            "recommendations": [
                {"snp": {"name": "Inflated", "rating": 4.0}, "rating": 7.5, "match_score": 1.4},
                {"snp": {"name": "Negative"}, "rating": -1, "match_score": {"overall_score": -0.2}},
                {"snp": {"name": "Garbled"}, "rating": "NaN"}
            ]
        });
        let parsed = parse_recommendations(&body).unwrap();
        assert!(parsed.iter().all(|c| c.rating.is_none() && c.match_score.is_none()));
    }

    #[test]
    fn extraction_reads_original_text_key() {
        let body = json!({
            "success": true,
            "extracted_data": {
                "extracted_text": "Sample Extracted Text",
                "requirement": null,
                "fields": {"legal_name": "Raj Handicrafts", "gst_number": "29ABCDE1234F1Z5"}
            }
        });
        let parsed = parse_extraction(&body).unwrap();
        assert_eq!(parsed.requirement, None);
        assert_eq!(parsed.text.as_deref(), Some("Sample Extracted Text"));
        assert_eq!(parsed.fields.get("legal_name").map(String::as_str), Some("Raj Handicrafts"));
    }

    #[test]
    fn application_accepts_stored_id_alias() {
        let body = json!({
            "success": true,
            "application": {
                "id": "APP-2024-0042",
                "status": "verified",
                "selected_snp_id": "snp-7",
                "documents": ["gst.png"]
            }
        });
        let parsed = parse_application(&body).unwrap();
        assert_eq!(parsed.application_id, "APP-2024-0042");
        assert_eq!(parsed.status, "verified");
        assert_eq!(parsed.selected_vendor.as_deref(), Some("snp-7"));
        assert_eq!(parsed.documents, vec!["gst.png"]);
        assert!(parse_application(&json!({"success": true})).is_err());
    }

    #[test]
    fn base_url_keeps_its_path_prefix() {
        let http = HttpCollaborators::new("http://localhost:8000/intake", Duration::from_secs(1), true).unwrap();
        assert_eq!(
            http.endpoint(MATCH_PATH).unwrap().as_str(),
            "http://localhost:8000/intake/api/v1/match/recommend-snps"
        );
        assert!(HttpCollaborators::new("not a url", Duration::from_secs(1), true).is_err());
    }
}
