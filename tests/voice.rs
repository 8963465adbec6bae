//! Gateway client integration tests
//!
//! Runs the Azure speech and Gemini clients against local stub servers so
//! request shape and response mapping are checked without network access.

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header},
    response::IntoResponse,
};
use jamie_voicebot::agent::GeminiGenerator;
use jamie_voicebot::config::file::JamieConfigFile;
use jamie_voicebot::voice::{
    AzureSpeechToText, AzureTextToSpeech, SAMPLE_RATE, inspect_wav, samples_to_wav,
};
use jamie_voicebot::{
    Config, ContextEntry, ContextRole, Error, Gateways, GenerationGateway, SynthesisGateway,
    Transcription, TranscriptionGateway, TurnController, TurnOutcome,
};
use secrecy::SecretString;

mod common;

/// One request seen by a stub
#[derive(Clone)]
struct Recorded {
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    content_type: &'static str,
    body: Vec<u8>,
    seen: Arc<Mutex<Vec<Recorded>>>,
}

impl Stub {
    fn requests(&self) -> Vec<Recorded> {
        self.seen.lock().unwrap().clone()
    }
}

async fn answer(State(stub): State<Stub>, uri: Uri, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    stub.seen.lock().unwrap().push(Recorded { uri, headers, body });
    (stub.status, [(header::CONTENT_TYPE, stub.content_type)], stub.body.clone())
}

/// Serve a canned response on a random local port
async fn spawn_stub(status: StatusCode, content_type: &'static str, body: impl Into<Vec<u8>>) -> (String, Stub) {
    let stub = Stub {
        status,
        content_type,
        body: body.into(),
        seen: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new().fallback(answer).with_state(stub.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), stub)
}

/// Generate a short sine tone as 16 kHz WAV
fn tone_wav() -> Vec<u8> {
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..SAMPLE_RATE / 4)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
        })
        .collect();
    samples_to_wav(&samples, SAMPLE_RATE).unwrap()
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

fn stt(base_url: &str) -> AzureSpeechToText {
    AzureSpeechToText::new(secret("speech-key"), "eastus", "en-US".to_string())
        .unwrap()
        .with_base_url(Some(base_url.to_string()))
}

fn tts(base_url: &str) -> AzureTextToSpeech {
    AzureTextToSpeech::new(
        secret("speech-key"),
        "eastus",
        "en-US-JennyNeural".to_string(),
        "en-US".to_string(),
    )
    .unwrap()
    .with_base_url(Some(base_url.to_string()))
}

fn gemini(base_url: &str) -> GeminiGenerator {
    GeminiGenerator::new(secret("google-key"), "gemini-test".to_string())
        .unwrap()
        .with_base_url(Some(base_url.to_string()))
}

#[test]
fn test_tone_wav_is_valid_capture() {
    let info = inspect_wav(&tone_wav()).unwrap();

    assert_eq!(info.sample_rate, SAMPLE_RATE);
    assert_eq!(info.channels, 1);
    assert_eq!(info.duration_ms, 250);
}

#[tokio::test]
async fn test_stt_recognized_speech() {
    let (url, stub) = spawn_stub(
        StatusCode::OK,
        "application/json",
        r#"{"RecognitionStatus":"Success","DisplayText":"Hello there.","Offset":0,"Duration":1000}"#,
    )
    .await;

    let result = stt(&url).transcribe(&tone_wav(), jamie_voicebot::AudioFormat::WavPcm16).await;

    assert_eq!(result.unwrap(), Transcription::Recognized("Hello there.".to_string()));

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(
        request.uri.path(),
        "/speech/recognition/conversation/cognitiveservices/v1"
    );
    let query = request.uri.query().unwrap();
    assert!(query.contains("language=en-US"));
    assert!(query.contains("format=simple"));
    assert_eq!(request.headers["ocp-apim-subscription-key"], "speech-key");
    let content_type = request.headers[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("audio/wav"));
    assert!(content_type.contains("samplerate=16000"));
    assert_eq!(request.body.as_ref(), tone_wav().as_slice());
}

#[tokio::test]
async fn test_stt_no_match_is_no_speech() {
    let (url, _stub) = spawn_stub(
        StatusCode::OK,
        "application/json",
        r#"{"RecognitionStatus":"NoMatch"}"#,
    )
    .await;

    let result = stt(&url).recognize(&tone_wav()).await.unwrap();

    assert_eq!(result, Transcription::NoSpeech);
}

#[tokio::test]
async fn test_stt_auth_failure_is_error() {
    let (url, _stub) = spawn_stub(StatusCode::UNAUTHORIZED, "text/plain", "invalid key").await;

    let err = stt(&url).recognize(&tone_wav()).await.unwrap_err();

    assert!(matches!(err, Error::Stt(ref msg) if msg.contains("401")));
    assert!(err.is_gateway());
}

#[tokio::test]
async fn test_stt_rejects_non_wav_before_sending() {
    let (url, stub) = spawn_stub(StatusCode::OK, "application/json", "{}").await;

    let err = stt(&url).recognize(b"definitely not a wav").await.unwrap_err();

    assert!(matches!(err, Error::Audio(_)));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn test_tts_sends_escaped_ssml() {
    let (url, stub) = spawn_stub(StatusCode::OK, "audio/mpeg", b"ID3-mp3-bytes".to_vec()).await;

    let artifact = tts(&url).synthesize("Tom & Jerry <3").await.unwrap();

    assert_eq!(artifact.bytes, b"ID3-mp3-bytes");
    assert_eq!(artifact.mime_type, "audio/mpeg");

    let requests = stub.requests();
    let request = &requests[0];
    assert_eq!(request.uri.path(), "/cognitiveservices/v1");
    assert_eq!(request.headers["ocp-apim-subscription-key"], "speech-key");
    assert_eq!(
        request.headers["x-microsoft-outputformat"],
        "audio-24khz-48kbitrate-mono-mp3"
    );
    assert_eq!(request.headers[header::CONTENT_TYPE], "application/ssml+xml");

    let ssml = String::from_utf8(request.body.to_vec()).unwrap();
    assert!(ssml.contains("en-US-JennyNeural"));
    assert!(ssml.contains("Tom &amp; Jerry &lt;3"));
}

#[tokio::test]
async fn test_tts_error_status_is_error() {
    let (url, _stub) = spawn_stub(StatusCode::BAD_REQUEST, "text/plain", "bad voice").await;

    let err = tts(&url).synthesize("Hi").await.unwrap_err();

    assert!(matches!(err, Error::Tts(_)));
}

#[tokio::test]
async fn test_tts_empty_body_is_error() {
    let (url, _stub) = spawn_stub(StatusCode::OK, "audio/mpeg", Vec::new()).await;

    let err = tts(&url).speak("Hi").await.unwrap_err();

    assert!(matches!(err, Error::Tts(_)));
}

#[tokio::test]
async fn test_gemini_request_and_reply() {
    let (url, stub) = spawn_stub(
        StatusCode::OK,
        "application/json",
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hey! "},{"text":"What's new?"}]},"finishReason":"STOP"}]}"#,
    )
    .await;

    let context = vec![
        ContextEntry::instruction("You are Jamie."),
        ContextEntry {
            role: ContextRole::User,
            text: "Hello".to_string(),
        },
    ];
    let reply = gemini(&url).generate(&context).await.unwrap();

    assert_eq!(reply, "Hey! What's new?");

    let requests = stub.requests();
    let request = &requests[0];
    assert_eq!(request.uri.path(), "/models/gemini-test:generateContent");
    assert_eq!(request.headers["x-goog-api-key"], "google-key");

    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "You are Jamie.");
    assert_eq!(body["contents"][1]["parts"][0]["text"], "Hello");
}

#[tokio::test]
async fn test_gemini_error_message_surfaces() {
    let (url, _stub) = spawn_stub(
        StatusCode::BAD_REQUEST,
        "application/json",
        r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#,
    )
    .await;

    let err = gemini(&url).generate(&[ContextEntry::instruction("hi")]).await.unwrap_err();

    assert!(matches!(err, Error::Generation(ref msg) if msg.contains("API key not valid")));
}

#[tokio::test]
async fn test_configured_gateways_complete_a_spoken_turn() {
    let (stt_url, _stt) = spawn_stub(
        StatusCode::OK,
        "application/json",
        r#"{"RecognitionStatus":"Success","DisplayText":"What's up"}"#,
    )
    .await;
    let (llm_url, llm) = spawn_stub(
        StatusCode::OK,
        "application/json",
        r#"{"candidates":[{"content":{"parts":[{"text":"Not much!"}]}}]}"#,
    )
    .await;
    let (tts_url, _tts) = spawn_stub(StatusCode::OK, "audio/mpeg", b"mp3".to_vec()).await;

    let env: std::collections::HashMap<&str, String> = [
        ("GOOGLE_API_KEY", "google-key".to_string()),
        ("AZURE_TTS_KEY", "speech-key".to_string()),
        ("AZURE_TTS_REGION", "eastus".to_string()),
        ("JAMIE_STT_BASE_URL", stt_url),
        ("JAMIE_LLM_BASE_URL", llm_url),
        ("JAMIE_TTS_BASE_URL", tts_url),
    ]
    .into_iter()
    .collect();
    let config = Config::from_sources(|key| env.get(key).cloned(), JamieConfigFile::default()).unwrap();

    let gateways = Gateways::from_config(&config).unwrap();
    let mut controller = TurnController::new(gateways, Arc::new(config.persona.clone()));

    let outcome = controller.on_audio_captured(&tone_wav()).await.unwrap();

    let TurnOutcome::Replied { user, assistant, audio } = outcome else {
        panic!("expected a reply, got {outcome:?}");
    };
    assert_eq!(user.text(), "What's up");
    assert_eq!(assistant.text(), "Not much!");
    assert_eq!(audio.bytes, b"mp3");

    let body: serde_json::Value = serde_json::from_slice(&llm.requests()[0].body).unwrap();
    assert_eq!(body["contents"][0]["parts"][0]["text"], config.persona.instruction());
    assert!(llm.requests()[0].uri.path().ends_with("gemini-1.5-flash:generateContent"));
}
