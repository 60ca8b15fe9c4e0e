use anyhow::Context;
use clap::Parser;
use msme_intake::domain::model::{Document, DocumentPurpose, IntakeField, Locale};
use msme_intake::domain::ports::SpeechBackend;
use msme_intake::utils::error::{ErrorSeverity, IntakeError};
use msme_intake::utils::logger::{self, LogFormat};
use msme_intake::{
    CliConfig, Collaborators, HttpCollaborators, IntakeWizard, ScriptedSpeechBackend,
    UnavailableSpeechBackend,
};
use std::path::Path;
use std::sync::Arc;

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: &IntakeError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()).max(1));
}

fn report_notices(wizard: &mut IntakeWizard) {
    for notice in wizard.take_notices() {
        tracing::warn!("⚠️ {}", notice);
        eprintln!("⚠️ {}", notice.user_friendly_message());
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("txt") => "text/plain",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if let Err(e) = logger::init_logger(LogFormat::from_flag(cli.log_json), cli.verbose) {
        eprintln!("⚠️ {}", e);
    }
    tracing::info!("Starting msme-intake");

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    if cli.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    let service = HttpCollaborators::new(
        &config.service.base_url,
        std::time::Duration::from_secs(config.service.timeout_seconds),
        config.categorization.include_attributes,
    )
    .context("failed to build HTTP client")?;
    let speech: Box<dyn SpeechBackend> = match &cli.dictate {
        Some(transcript) => Box::new(ScriptedSpeechBackend::new(
            transcript.clone(),
            config.voice_interval(),
        )),
        None => Box::new(UnavailableSpeechBackend),
    };

    let mut wizard = IntakeWizard::new(
        &config,
        Collaborators::from_shared(Arc::new(service)),
        Some(speech),
    )?;

    // language
    wizard.set_language(Locale::new(&cli.language));
    wizard.advance();

    // business info
    if let Some(company) = &cli.company {
        wizard.set_field(IntakeField::CompanyName, company.as_str());
    }
    if let Some(region) = &cli.region {
        wizard.set_field(IntakeField::StateRegion, region.as_str());
    }
    if let Some(city) = &cli.city {
        wizard.set_field(IntakeField::City, city.as_str());
    }
    wizard.advance();

    // product mapping
    for (i, product) in cli.products.iter().enumerate() {
        if i > 0 {
            wizard.add_product();
        }
        wizard.set_field(IntakeField::ProductDescription, product.as_str());
    }
    if cli.dictate.is_some() {
        if !cli.products.is_empty() {
            wizard.add_product();
        }
        if let Err(e) = wizard.start_dictation() {
            tracing::warn!("⚠️ {}", e);
            eprintln!("⚠️ {}", e.user_friendly_message());
        }
    }
    if let Some(path) = &cli.document {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read document {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        wizard.upload_document(
            Document::new(filename, content_type_for(path), bytes),
            DocumentPurpose::Requirement,
        );
    }
    wizard.settle().await;
    report_notices(&mut wizard);

    if let Some(categories) = wizard.categorization() {
        println!(
            "🏷️  Category: {} (confidence {:.0}%)",
            categories.levels.join(" > "),
            categories.confidence * 100.0
        );
    }

    if let Some(requirement) = &cli.requirement {
        wizard.set_field(IntakeField::RequirementText, requirement.as_str());
    }

    // leaving product mapping asks for recommendations
    wizard.advance();
    wizard.settle().await;
    report_notices(&mut wizard);

    match wizard.recommendations() {
        Some([]) => println!("No matching partners found."),
        Some(list) => {
            println!("🤝 Recommended partners:");
            for ranked in list {
                println!("  {}", ranked.justification());
            }
        }
        None => println!("No recommendations available."),
    }

    wizard.advance();
    if cli.submit {
        match wizard.submit().await {
            Ok(receipt) => {
                println!(
                    "✅ Application {} submitted ({})",
                    receipt.application_id, receipt.status
                );
            }
            Err(e) => fail(&e),
        }

        if let Some(rating) = cli.rate_vendor {
            match wizard.send_vendor_feedback(true, Some(rating), None).await {
                Ok(done) => println!("📝 Feedback {} recorded", done.feedback_id),
                Err(e) => {
                    tracing::warn!("⚠️ {}", e);
                    eprintln!("⚠️ {}", e.user_friendly_message());
                }
            }
        }

        match wizard.application_status().await {
            Ok(status) => println!("📋 Status: {}", status.status),
            Err(e) => tracing::debug!("status lookup skipped: {}", e),
        }
    }

    Ok(())
}
