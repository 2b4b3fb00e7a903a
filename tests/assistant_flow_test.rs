#![cfg(feature = "cli")]

use httpmock::prelude::*;
use mortgage_assistant::adapters::gemini::GenerativeChatBackend;
use mortgage_assistant::app::commands::run_chat;
use mortgage_assistant::domain::model::{Intent, Verdict};
use mortgage_assistant::{AssistantSession, MortgageError, RatesConfig, WizardStep};
use std::time::Duration;

fn gemini_reply(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
    })
}

const FULL_REPLY: &str = "Rozumím, kupujete byt za 6 milionů a máte 1,5 milionu vlastních zdrojů. \
Při příjmu 110 tisíc to vypadá dobře.\n\
<params>{\"intent\": \"purchase\", \"property_value\": \"6 mil\", \"own_resources\": \"1,5 mil\", \
\"monthly_income\": 110000, \"monthly_liabilities\": \"3 000 Kč\", \"fixation_years\": 5}</params>";

fn backend(server: &MockServer) -> GenerativeChatBackend {
    GenerativeChatBackend::direct(
        &server.base_url(),
        "test-model",
        "test-key".to_string(),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_single_turn_fills_parameters_and_wizard() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/models/test-model:generateContent")
            .body_contains("Still missing: intent, property_value");
        then.status(200).json_body(gemini_reply(FULL_REPLY));
    });

    let rates = RatesConfig::embedded().unwrap();
    let mut session = AssistantSession::new(backend(&server), &rates);

    let reply = session
        .send("Chci koupit byt za 6 mil, mám 1,5 mil, beru 110 tisíc a splácím 3 tisíce")
        .await
        .unwrap();

    api_mock.assert();
    assert!(!reply.text.contains("<params>"));
    assert_eq!(reply.updated.len(), 6);

    let params = session.params();
    assert_eq!(params.intent, Some(Intent::Purchase));
    assert_eq!(params.own_resources, Some(1_500_000.0));
    assert_eq!(params.monthly_liabilities, Some(3_000.0));

    let estimate = reply.estimate.unwrap();
    assert_eq!(estimate.loan_amount, 4_500_000.0);
    assert_eq!(estimate.verdict, Verdict::Approvable);

    let wizard = session.into_wizard();
    assert_eq!(wizard.step(), WizardStep::Summary);
    let summary = wizard.summary(&rates).unwrap();
    assert_eq!(summary.offers.len(), rates.offer_limit);
    assert!(summary.offers.windows(2).all(|w| w[0].rate <= w[1].rate));
}

#[tokio::test]
async fn test_upstream_failure_surfaces_as_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/models/test-model:generateContent");
        then.status(403)
            .json_body(serde_json::json!({"error": {"message": "API key not valid"}}));
    });

    let rates = RatesConfig::embedded().unwrap();
    let mut session = AssistantSession::new(backend(&server), &rates);

    let err = session.send("Dobrý den").await.unwrap_err();
    assert!(matches!(err, MortgageError::UpstreamError { status: 403, .. }));
    assert_eq!(session.history().len(), 1);
    assert!(session.params().intent.is_none());
}

#[tokio::test]
async fn test_chat_loop_prints_reply_and_summary() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/models/test-model:generateContent");
        then.status(200).json_body(gemini_reply(FULL_REPLY));
    });

    let rates = RatesConfig::embedded().unwrap();
    let session = AssistantSession::new(backend(&server), &rates);

    let input = tokio::io::BufReader::new(&b"Chci koupit byt\n\n/quit\n"[..]);
    let mut output: Vec<u8> = Vec::new();
    run_chat(session, &rates, input, &mut output).await.unwrap();

    let printed = String::from_utf8(output).unwrap();
    assert!(printed.contains("Rozumím, kupujete byt"));
    assert!(printed.contains("Monthly payment:"));
    assert!(printed.contains("Verdict:"));
    assert!(!printed.contains("<params>"));
}

#[tokio::test]
async fn test_chat_loop_reports_errors_and_continues() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/models/test-model:generateContent");
        then.status(500);
    });

    let rates = RatesConfig::embedded().unwrap();
    let session = AssistantSession::new(backend(&server), &rates);

    let input = tokio::io::BufReader::new(&b"ahoj\n/reset\n"[..]);
    let mut output: Vec<u8> = Vec::new();
    run_chat(session, &rates, input, &mut output).await.unwrap();

    let printed = String::from_utf8(output).unwrap();
    assert!(printed.contains("❌ The remote service answered with status 500"));
    assert!(printed.contains("Conversation cleared."));
    assert!(printed.contains("step 1 of 5"));
}
