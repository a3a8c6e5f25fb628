//! Tests for recognition and candidate selection

use super::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

type Responder = Box<dyn Fn() -> Result<Vec<RawMatch>, LookupError> + Send + Sync>;

/// Lookup double that counts calls and records what it was asked to identify
struct StubLookup {
    respond: Responder,
    calls: AtomicUsize,
    /// (path, existed at call time)
    seen: Mutex<Vec<(PathBuf, bool)>>,
    keys: Mutex<Vec<String>>,
}

impl StubLookup {
    fn new(respond: impl Fn() -> Result<Vec<RawMatch>, LookupError> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            keys: Mutex::new(Vec::new()),
        }
    }

    fn returning(matches: Vec<RawMatch>) -> Self {
        Self::new(move || Ok(matches.clone()))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MatchLookup for StubLookup {
    fn lookup(&self, audio_path: &Path, api_key: &str) -> Result<Vec<RawMatch>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((audio_path.to_path_buf(), audio_path.exists()));
        self.keys.lock().unwrap().push(api_key.to_string());
        (self.respond)()
    }
}

fn raw_matches(n: usize) -> Vec<RawMatch> {
    (0..n)
        .map(|i| {
            RawMatch::new(
                1.0 - i as f64 * 0.01,
                &format!("rec-{}", i),
                &format!("Song {}", i),
                &format!("Artist {}", i),
            )
        })
        .collect()
}

fn recognizer(lookup: StubLookup) -> Recognizer<StubLookup> {
    Recognizer::with_lookup("test-key", RecognizerConfig::default(), lookup)
}

fn denoising_recognizer(lookup: StubLookup) -> Recognizer<StubLookup> {
    let config = RecognizerConfig {
        denoise: true,
        ..RecognizerConfig::default()
    };
    Recognizer::with_lookup("test-key", config, lookup)
}

/// Any existing file will do for a stubbed lookup
fn dummy_file(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("query.mp3");
    std::fs::write(&path, b"not really audio").unwrap();
    path
}

fn write_tone_wav(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("tone.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..22050 {
        let t = i as f32 / 22050.0;
        let s = 0.4 * (2.0 * std::f32::consts::PI * 330.0 * t).sin();
        writer.write_sample((s * 32767.0) as i16).unwrap();
    }
    writer.finalize().unwrap();
    path
}

#[test]
fn test_clamp_max_results() {
    assert_eq!(clamp_max_results(-5), 1);
    assert_eq!(clamp_max_results(0), 1);
    assert_eq!(clamp_max_results(1), 1);
    assert_eq!(clamp_max_results(3), 3);
    assert_eq!(clamp_max_results(10), 10);
    assert_eq!(clamp_max_results(50), MAX_RESULTS_LIMIT);
}

#[test]
fn test_select_candidates_bound() {
    let k = 3;
    for n in [0, 1, k, 2 * k] {
        let selected = select_candidates(raw_matches(n), k);
        assert_eq!(selected.len(), n.min(k), "n = {}", n);
    }
}

#[test]
fn test_select_candidates_keeps_lookup_order() {
    let raw = vec![
        RawMatch::new(0.2, "low", "Low", "A"),
        RawMatch::new(0.9, "high", "High", "B"),
    ];
    let selected = select_candidates(raw, 5);
    assert_eq!(selected[0].recording_id, "low");
    assert_eq!(selected[1].recording_id, "high");
}

#[test]
fn test_select_candidates_filters_incomplete() {
    let raw = vec![
        RawMatch::new(0.9, "", "No Id", "A"),
        RawMatch::new(0.8, "rec-1", "", "A"),
        RawMatch {
            score: 0.7,
            recording_id: "rec-2".to_string(),
            title: None,
            artist: Some("A".to_string()),
        },
        RawMatch::new(0.6, "rec-3", "Kept", ""),
    ];

    let selected = select_candidates(raw, 10);
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].recording_id, "rec-3");
    assert_eq!(selected[0].title, "Kept");
    assert_eq!(selected[0].artist, "");
}

#[test]
fn test_filtering_happens_before_truncation() {
    let mut raw = vec![RawMatch::new(0.99, "", "Broken", "X")];
    raw.extend(raw_matches(2));

    let selected = select_candidates(raw, 2);
    assert_eq!(selected.len(), 2);
    assert_eq!(selected[0].recording_id, "rec-0");
}

#[test]
fn test_missing_file_skips_lookup() {
    let recognizer = recognizer(StubLookup::returning(raw_matches(3)));
    let result = recognizer.recognize("/definitely/not/here.mp3", 3);

    assert_eq!(result.status, RecognitionStatus::NotFound);
    assert!(result.candidates.is_empty());
    assert!(result.is_error());
    assert_eq!(recognizer.lookup.calls(), 0);
}

#[test]
fn test_recognize_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = dummy_file(&dir);

    let lookup = StubLookup::returning(vec![
        RawMatch::new(0.95, "id1", "Song A", "Artist A"),
        RawMatch::new(0.90, "", "Ignored", "X"),
        RawMatch::new(0.80, "id3", "Song B", "Artist B"),
        RawMatch::new(0.70, "id4", "Song C", "Artist C"),
    ]);
    let recognizer = recognizer(lookup);
    let result = recognizer.recognize(&path, 2);

    assert!(result.is_match());
    assert!(!result.denoised);
    assert_eq!(
        result.candidates,
        vec![
            MatchCandidate {
                score: 0.95,
                recording_id: "id1".to_string(),
                title: "Song A".to_string(),
                artist: "Artist A".to_string(),
            },
            MatchCandidate {
                score: 0.80,
                recording_id: "id3".to_string(),
                title: "Song B".to_string(),
                artist: "Artist B".to_string(),
            },
        ]
    );

    assert_eq!(recognizer.lookup.calls(), 1);
    assert_eq!(recognizer.lookup.keys.lock().unwrap()[0], "test-key");
    assert_eq!(recognizer.lookup.seen.lock().unwrap()[0].0, path);
}

#[test]
fn test_empty_lookup_is_no_match() {
    let dir = TempDir::new().unwrap();
    let path = dummy_file(&dir);

    let result = recognizer(StubLookup::returning(Vec::new())).recognize(&path, 3);
    assert_eq!(result.status, RecognitionStatus::NoMatch);
    assert!(!result.is_error());
}

#[test]
fn test_only_incomplete_matches_is_no_match() {
    let dir = TempDir::new().unwrap();
    let path = dummy_file(&dir);

    let lookup = StubLookup::returning(vec![RawMatch::new(0.9, "id", "", "A")]);
    let result = recognizer(lookup).recognize(&path, 3);
    assert_eq!(result.status, RecognitionStatus::NoMatch);
}

#[test]
fn test_authentication_failure_is_distinguished() {
    let dir = TempDir::new().unwrap();
    let path = dummy_file(&dir);

    let lookup =
        StubLookup::new(|| Err(LookupError::Authentication("invalid API key".to_string())));
    let result = recognizer(lookup).recognize(&path, 3);

    match &result.status {
        RecognitionStatus::AuthenticationFailed { message } => {
            assert!(message.contains("invalid API key"))
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert!(result.candidates.is_empty());
}

#[test]
fn test_network_failure_is_lookup_failed() {
    let dir = TempDir::new().unwrap();
    let path = dummy_file(&dir);

    let lookup = StubLookup::new(|| Err(LookupError::Network("connection refused".to_string())));
    let result = recognizer(lookup).recognize(&path, 3);

    assert!(matches!(
        result.status,
        RecognitionStatus::LookupFailed { .. }
    ));
    assert!(result.is_error());
}

#[test]
fn test_denoise_fallback_uses_original_file() {
    let dir = TempDir::new().unwrap();
    let path = dummy_file(&dir);

    let recognizer = denoising_recognizer(StubLookup::returning(raw_matches(1)));
    let result = recognizer.recognize(&path, 3);

    assert!(result.is_match());
    assert!(!result.denoised);
    assert_eq!(recognizer.lookup.seen.lock().unwrap()[0].0, path);
}

#[test]
fn test_denoised_scratch_file_lives_through_lookup() {
    let dir = TempDir::new().unwrap();
    let path = write_tone_wav(&dir);

    let recognizer = denoising_recognizer(StubLookup::returning(raw_matches(1)));
    let result = recognizer.recognize(&path, 3);
    assert!(result.denoised);

    let seen = recognizer.lookup.seen.lock().unwrap();
    let (scratch, existed) = &seen[0];
    assert_ne!(scratch, &path);
    assert!(*existed);
    // removed once recognition returns
    assert!(!scratch.exists());
}

#[test]
fn test_recognize_batch_preserves_order() {
    let dir = TempDir::new().unwrap();
    let present = dummy_file(&dir);
    let paths = vec![
        present.clone(),
        PathBuf::from("/missing/one.wav"),
        present,
    ];

    let recognizer = recognizer(StubLookup::returning(raw_matches(2)));
    let results = recognizer.recognize_batch(&paths, 1);

    assert_eq!(results.len(), 3);
    assert!(results[0].is_match());
    assert_eq!(results[1].status, RecognitionStatus::NotFound);
    assert_eq!(results[1].query_path, "/missing/one.wav");
    assert_eq!(results[2].candidates.len(), 1);
    assert_eq!(recognizer.lookup.calls(), 2);
}

#[test]
fn test_recognition_json_shape() {
    let recognition = Recognition {
        query_path: "clip.mp3".to_string(),
        status: RecognitionStatus::AuthenticationFailed {
            message: "bad key".to_string(),
        },
        denoised: false,
        candidates: Vec::new(),
    };

    let value = serde_json::to_value(&recognition).unwrap();
    assert_eq!(value["status"], "authentication_failed");
    assert_eq!(value["message"], "bad key");
    assert_eq!(value["query_path"], "clip.mp3");
    assert!(value["candidates"].as_array().unwrap().is_empty());
}
