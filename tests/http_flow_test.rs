use anyhow::Result;
use httpmock::prelude::*;
use msme_intake::domain::model::{Document, DocumentPurpose, IntakeField};
use msme_intake::{Collaborators, HttpCollaborators, IntakeConfig, IntakeError, IntakeWizard};
use std::sync::Arc;
use std::time::Duration;

fn wizard_for(server: &MockServer) -> Result<IntakeWizard> {
    let mut config = IntakeConfig::default();
    config.service.base_url = server.base_url();
    config.service.timeout_seconds = 5;

    let http = HttpCollaborators::new(&config.service.base_url, Duration::from_secs(5), true)?;
    Ok(IntakeWizard::new(
        &config,
        Collaborators::from_shared(Arc::new(http)),
        None,
    )?)
}

fn snp(name: &str, rating: f64) -> serde_json::Value {
    serde_json::json!({
        "snp": {
            "name": name,
            "description": format!("{} supplies handicrafts", name),
            "location": {"state": "Gujarat", "city": "Ahmedabad", "address": "GIDC", "pincode": "380001"},
            "phone": "+91-9800000000",
            "rating": rating
        },
        "match_score": {"overall_score": 0.7},
        "explanation": {"main_reasons": ["Located in Gujarat"], "strengths": ["Fast onboarding"]}
    })
}

#[tokio::test]
async fn test_wooden_toys_match_end_to_end() -> Result<()> {
    let server = MockServer::start();
    let match_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/match/recommend-snps")
            .query_param("top_k", "3")
            .json_body_partial(r#"{"requirement": "wooden toys for children", "state": "Gujarat"}"#);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(serde_json::json!({
                "success": true,
                "recommendations": [snp("X", 4.2), snp("Y", 4.2), snp("Z", 3.0)]
            }));
    });

    let mut wizard = wizard_for(&server)?;
    wizard.advance();
    wizard.set_field(IntakeField::StateRegion, "Gujarat");
    wizard.advance();
    wizard.set_field(IntakeField::RequirementText, "wooden toys for children");
    wizard.advance();
    wizard.settle().await;

    match_mock.assert();
    let ranked: Vec<(String, usize)> = wizard
        .recommendations()
        .expect("recommendations applied")
        .iter()
        .map(|r| (r.candidate.identity.clone(), r.rank))
        .collect();
    assert_eq!(
        ranked,
        vec![("X".to_string(), 1), ("Y".to_string(), 2), ("Z".to_string(), 3)]
    );
    assert_eq!(
        wizard.top_pick().unwrap().justification(),
        "#1 X (rated 4.2/5): Located in Gujarat"
    );
    Ok(())
}

#[tokio::test]
async fn test_short_description_is_never_sent() -> Result<()> {
    let server = MockServer::start();
    let categorize_mock = server.mock(|when, then| {
        when.method(POST).path("/api/v1/categorize/product");
        then.status(200).json_body(serde_json::json!({"success": true}));
    });

    let mut wizard = wizard_for(&server)?;
    wizard.set_field(IntakeField::ProductDescription, "wooden toy");
    wizard.settle().await;

    categorize_mock.assert_hits(0);
    assert!(wizard.categorization().is_none());
    assert!(wizard.take_notices().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_categorization_passes_language_and_reads_nested_levels() -> Result<()> {
    let server = MockServer::start();
    let categorize_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/categorize/product")
            .query_param("description", "hand carved wooden toys")
            .query_param("language", "hi")
            .query_param("include_attributes", "true");
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "categories": {
                "categories": {"level_1": "Toys & Games", "level_2": "Wooden Toys", "level_3": "Pull Toys"},
                "confidence": 0.9
            },
            "attributes": {"material": "sheesham wood"}
        }));
    });

    let mut wizard = wizard_for(&server)?;
    wizard.set_language(msme_intake::domain::model::Locale::new("hi"));
    wizard.set_field(IntakeField::ProductDescription, "hand carved wooden toys");
    wizard.settle().await;

    categorize_mock.assert();
    let result = wizard.categorization().expect("categorization applied");
    assert_eq!(result.levels, vec!["Toys & Games", "Wooden Toys", "Pull Toys"]);
    Ok(())
}

#[tokio::test]
async fn test_failed_requirement_upload_uses_filename() -> Result<()> {
    let server = MockServer::start();
    let upload_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/documents/upload")
            .query_param("document_type", "requirement");
        then.status(500).body("Document processing failed");
    });

    let mut wizard = wizard_for(&server)?;
    wizard.upload_document(
        Document::new("specs_v2.pdf", "application/pdf", b"%PDF-1.4".to_vec()),
        DocumentPurpose::Requirement,
    );
    wizard.settle().await;

    upload_mock.assert();
    assert_eq!(wizard.form().get(IntakeField::RequirementText), "specs_v2");
    let notices = wizard.take_notices();
    assert!(matches!(notices.as_slice(), [IntakeError::ExtractionUnavailable { .. }]));
    Ok(())
}

#[tokio::test]
async fn test_general_upload_fills_company_name() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/documents/upload")
            .query_param("document_type", "general");
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "document_type": "general",
            "extracted_data": {
                "extracted_text": "Sample Extracted Text",
                "fields": {"gst_number": "29ABCDE1234F1Z5", "legal_name": "Raj Handicrafts"}
            },
            "filename": "gst.png"
        }));
    });

    let mut wizard = wizard_for(&server)?;
    wizard.upload_document(
        Document::new("gst.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47]),
        DocumentPurpose::General,
    );
    wizard.settle().await;

    assert_eq!(wizard.form().get(IntakeField::CompanyName), "Raj Handicrafts");
    assert_eq!(wizard.form().get(IntakeField::RequirementText), "");
    Ok(())
}

#[tokio::test]
async fn test_matching_failure_keeps_previous_list() -> Result<()> {
    let server = MockServer::start();
    let mut ok_mock = server.mock(|when, then| {
        when.method(POST).path("/api/v1/match/recommend-snps");
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "recommendations": [snp("Craft Hub", 4.0)]
        }));
    });

    let mut wizard = wizard_for(&server)?;
    wizard.search();
    wizard.settle().await;
    assert_eq!(wizard.recommendations().unwrap().len(), 1);

    ok_mock.delete();
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/match/recommend-snps");
        then.status(503);
    });
    wizard.search();
    wizard.settle().await;

    assert_eq!(wizard.recommendations().unwrap()[0].candidate.identity, "Craft Hub");
    let notices = wizard.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_retryable());
    Ok(())
}

#[tokio::test]
async fn test_submit_posts_snapshot() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/match/recommend-snps");
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "recommendations": [snp("Craft Hub", 4.0)]
        }));
    });
    let submit_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/applications/create")
            .json_body_partial(r#"{"record": {"company_name": "Raj Handicrafts"}, "selected_vendor": "Craft Hub"}"#);
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "application_id": "APP-2024-0042",
            "status": "pending_review"
        }));
    });

    let mut wizard = wizard_for(&server)?;
    wizard.set_field(IntakeField::CompanyName, "Raj Handicrafts");
    while !wizard.is_terminal() {
        wizard.advance();
    }
    wizard.settle().await;

    let receipt = wizard.submit().await?;
    submit_mock.assert();
    assert_eq!(receipt.application_id, "APP-2024-0042");
    assert_eq!(receipt.status, "pending_review");
    Ok(())
}

async fn submitted_wizard(server: &MockServer) -> Result<IntakeWizard> {
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/match/recommend-snps");
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "recommendations": [{"snp": {"id": "snp-7", "name": "Craft Hub"}, "rating": 4.4}]
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/applications/create");
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "application_id": "APP-2024-0042",
            "status": "submitted"
        }));
    });

    let mut wizard = wizard_for(server)?;
    while !wizard.is_terminal() {
        wizard.advance();
    }
    wizard.settle().await;
    wizard.submit().await?;
    Ok(wizard)
}

#[tokio::test]
async fn test_vendor_feedback_is_sent_as_query_params() -> Result<()> {
    let server = MockServer::start();
    let feedback_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/match/feedback")
            .query_param("mse_id", "APP-2024-0042")
            .query_param("snp_id", "snp-7")
            .query_param("accepted", "true")
            .query_param("rating", "4")
            .query_param("comments", "Quick response");
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "feedback_id": "FB-19",
            "message": "Feedback recorded for model improvement"
        }));
    });

    let wizard = submitted_wizard(&server).await?;
    let receipt = wizard
        .send_vendor_feedback(true, Some(4), Some("Quick response".to_string()))
        .await?;

    feedback_mock.assert();
    assert_eq!(receipt.feedback_id, "FB-19");
    assert_eq!(receipt.message, "Feedback recorded for model improvement");
    Ok(())
}

#[tokio::test]
async fn test_application_status_lookup() -> Result<()> {
    let server = MockServer::start();
    let status_mock = server.mock(|when, then| {
        when.method(GET).path("/api/v1/applications/APP-2024-0042");
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "application": {
                "id": "APP-2024-0042",
                "status": "verified",
                "selected_snp_id": "snp-7",
                "documents": []
            }
        }));
    });

    let wizard = submitted_wizard(&server).await?;
    let status = wizard.application_status().await?;

    status_mock.assert();
    assert_eq!(status.application_id, "APP-2024-0042");
    assert_eq!(status.status, "verified");
    assert_eq!(status.selected_vendor.as_deref(), Some("snp-7"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_application_reports_not_found() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/applications/APP-2024-0042");
        then.status(404).json_body(serde_json::json!({"detail": "Application not found"}));
    });

    let wizard = submitted_wizard(&server).await?;
    let err = wizard.application_status().await.unwrap_err();

    assert!(matches!(
        &err,
        IntakeError::StatusUnavailable { reason } if reason.contains("404") && reason.contains("Application not found")
    ));
    Ok(())
}
