//! End-to-end tests driving a shell against the in-memory engine.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use ffterm::{
    Command, EngineError, EngineState, GeneratedFile, KeyCode, KeyEvent, KeyOutcome, LogLine,
    MemoryEngine, Phase, Shell, ShellConfig, ShellError, StagedFile, StagingPolicy, Transcript,
};

/// Engine whose runs write `converted` to the last argument, like a
/// transcode to an output file.
fn transcoding_engine() -> Arc<MemoryEngine> {
    Arc::new(MemoryEngine::new().with_runner(|args, fs| {
        if let Some(output) = args.last() {
            fs.write(output.clone(), b"converted".to_vec());
        }
        Ok(vec![
            LogLine::new("fferr", "Input #0, mov,mp4"),
            LogLine::new("fferr", "frame=  25"),
        ])
    }))
}

type Collected = Arc<Mutex<Vec<Vec<GeneratedFile>>>>;

struct Harness {
    shell: Shell,
    transcript: Transcript,
    engine: Arc<MemoryEngine>,
    collected: Collected,
}

async fn ready_shell(engine: Arc<MemoryEngine>, staged: Vec<StagedFile>) -> Harness {
    ready_shell_with(engine, staged, ShellConfig::default()).await
}

async fn ready_shell_with(
    engine: Arc<MemoryEngine>,
    staged: Vec<StagedFile>,
    config: ShellConfig,
) -> Harness {
    let collected: Collected = Arc::default();
    let sink = Arc::clone(&collected);
    let transcript = Transcript::new();

    let mut shell = Shell::builder()
        .config(config)
        .engine_arc(engine.clone())
        .staged_files(staged)
        .on_generated_files(move |files: &[GeneratedFile]| {
            sink.lock().unwrap().push(files.to_vec());
        })
        .build();
    assert!(shell.mount(transcript.clone()));
    assert!(shell.setup().await);
    transcript.clear();

    Harness {
        shell,
        transcript,
        engine,
        collected,
    }
}

async fn type_and_enter(shell: &mut Shell, line: &str) {
    for ch in line.chars() {
        shell.handle_data(&ch.to_string());
    }
    let outcome = shell
        .handle_key(KeyEvent::down(KeyCode::Enter))
        .await
        .unwrap();
    assert_eq!(outcome, KeyOutcome::Handled);
}

#[tokio::test]
async fn test_setup_renders_help_then_loads() {
    let transcript = Transcript::new();
    let mut shell = Shell::builder().engine(MemoryEngine::new()).build();
    shell.mount(transcript.clone());

    assert!(shell.setup().await);
    assert_eq!(shell.session().engine_state(), EngineState::Ready);
    assert!(!shell.session().is_blocked());
    assert_eq!(
        transcript.text(),
        "Available commands.\r\n\
         \r\n\
         \x20 clear           Clears the screen\r\n\
         \x20 help            Prints command list\r\n\
         \x20 ffmpeg          Hyper fast Audio and Video encoder\r\n\
         \r\n$ loading ffmpeg wasm...\r\n\
         \r$ "
    );
}

#[tokio::test]
async fn test_help_lists_commands_in_registration_order() {
    let mut h = ready_shell(transcoding_engine(), Vec::new()).await;
    h.shell.submit("help").await.unwrap();

    let text = h.transcript.text();
    let clear = text.find("  clear").unwrap();
    let help = text.find("  help").unwrap();
    let ffmpeg = text.find("  ffmpeg").unwrap();
    assert!(clear < help && help < ffmpeg);
    assert!(text.ends_with("\r\n$ "));
}

#[tokio::test]
async fn test_custom_commands_appear_in_help() {
    let transcript = Transcript::new();
    let mut shell = Shell::builder()
        .command(Command::from_fn("version", "Prints the version", |session| {
            session.write_line("0.1.0");
            session.prompt_again(true);
            Ok(())
        }))
        .build();
    shell.mount(transcript.clone());

    shell.run_help();
    assert!(transcript.text().contains("  version         Prints the version"));

    transcript.clear();
    shell.submit("version").await.unwrap();
    assert_eq!(transcript.text(), "\r\n0.1.0\r\n\r\n$ ");
}

#[tokio::test]
async fn test_clear_resets_surface() {
    let mut h = ready_shell(transcoding_engine(), Vec::new()).await;
    type_and_enter(&mut h.shell, "clear").await;

    assert_eq!(h.transcript.resets(), 1);
    assert_eq!(h.transcript.text(), "\r$ ");
    assert_eq!(h.shell.session().active_command(), "");
}

#[tokio::test]
async fn test_backspace_never_erases_prompt() {
    let mut h = ready_shell(transcoding_engine(), Vec::new()).await;
    h.shell.handle_data("x");
    assert!(h.shell.on_backspace());
    assert!(!h.shell.on_backspace());
    assert!(!h.shell.on_backspace());

    assert_eq!(h.transcript.text(), "x\u{8} \u{8}");
    assert_eq!(h.shell.session().active_command(), "");
}

#[tokio::test]
async fn test_transcode_stages_input_and_collects_output() {
    let staged = vec![StagedFile::from_bytes("in.mp4", b"source".to_vec())];
    let mut h = ready_shell(transcoding_engine(), staged).await;

    type_and_enter(&mut h.shell, "ffmpeg -i in.mp4 out.mp4").await;

    assert_eq!(h.engine.runs(), vec![vec!["-i", "in.mp4", "out.mp4"]]);
    assert_eq!(h.engine.file("in.mp4").unwrap(), b"source");

    let expected = vec![GeneratedFile {
        name: "out.mp4".to_string(),
        data: b"converted".to_vec(),
        mime_type: "video/mp4".to_string(),
    }];
    assert_eq!(h.shell.session().generated_files(), expected.as_slice());
    assert_eq!(*h.collected.lock().unwrap(), vec![expected]);

    assert_eq!(
        h.transcript.text(),
        "ffmpeg -i in.mp4 out.mp4\r\n\
         Input #0, mov,mp4\r\n\
         frame=  25\r\n\
         \r$ "
    );
    assert_eq!(h.shell.session().phase(), Phase::Prompting);
}

#[tokio::test]
async fn test_end_marker_is_never_shown() {
    let mut h = ready_shell(transcoding_engine(), Vec::new()).await;
    h.shell.submit("ffmpeg -version").await.unwrap();
    assert!(!h.transcript.text().contains("FFMPEG_END"));
}

#[tokio::test]
async fn test_custom_suppressed_messages_are_hidden() {
    let config = ShellConfig {
        suppressed_log_messages: vec!["FFMPEG_END".to_string(), "frame=  25".to_string()],
        ..ShellConfig::default()
    };
    let mut h = ready_shell_with(transcoding_engine(), Vec::new(), config).await;
    h.shell.submit("ffmpeg -version").await.unwrap();

    let text = h.transcript.text();
    assert!(text.contains("Input #0"));
    assert!(!text.contains("frame="));
}

#[tokio::test]
async fn test_run_without_staged_reference_skips_collection() {
    let staged = vec![StagedFile::from_bytes("in.mp4", b"source".to_vec())];
    let mut h = ready_shell(transcoding_engine(), staged).await;

    h.shell.submit("ffmpeg -version").await.unwrap();

    assert_eq!(h.engine.runs(), vec![vec!["-version"]]);
    assert!(h.engine.file("in.mp4").is_none());
    assert!(h.collected.lock().unwrap().is_empty());
    assert!(h.shell.session().generated_files().is_empty());
}

#[tokio::test]
async fn test_repeated_run_reports_same_output() {
    let staged = vec![StagedFile::from_bytes("in.mp4", b"source".to_vec())];
    let mut h = ready_shell(transcoding_engine(), staged).await;

    h.shell.submit("ffmpeg -i in.mp4 out.mp4").await.unwrap();
    h.shell.submit("ffmpeg -i in.mp4 out.mp4").await.unwrap();

    let collected = h.collected.lock().unwrap();
    assert_eq!(collected.len(), 2);
    assert_eq!(collected[0], collected[1]);
    assert_eq!(collected[1].len(), 1);
}

#[tokio::test]
async fn test_outputs_of_earlier_runs_are_reported_again() {
    let staged = vec![StagedFile::from_bytes("in.mp4", b"source".to_vec())];
    let mut h = ready_shell(transcoding_engine(), staged).await;

    h.shell.submit("ffmpeg -i in.mp4 a.gif").await.unwrap();
    h.shell.submit("ffmpeg -i in.mp4 b.webm").await.unwrap();

    let names: Vec<_> = h
        .shell
        .session()
        .generated_files()
        .iter()
        .map(|f| (f.name.as_str(), f.mime_type.as_str()))
        .collect();
    assert_eq!(names, vec![("a.gif", "image/gif"), ("b.webm", "video/webm")]);
}

#[tokio::test]
async fn test_updated_staged_files_change_ignore_set() {
    let mut h = ready_shell(transcoding_engine(), Vec::new()).await;
    h.shell
        .update_staged_files(vec![StagedFile::from_bytes("clip.mov", b"mov".to_vec())]);

    h.shell.submit("ffmpeg -i clip.mov clip.mp4").await.unwrap();

    let names: Vec<_> = h
        .shell
        .session()
        .generated_files()
        .iter()
        .map(|f| f.name.clone())
        .collect();
    assert_eq!(names, vec!["clip.mp4"]);
}

#[tokio::test]
async fn test_substring_policy_stages_partial_matches() {
    let config = ShellConfig {
        staging_policy: StagingPolicy::Substring,
        ..ShellConfig::default()
    };
    let staged = vec![StagedFile::from_bytes("in.mp4", b"source".to_vec())];
    let mut h = ready_shell_with(transcoding_engine(), staged.clone(), config).await;
    h.shell.submit("ffmpeg -i old_in.mp4 x.gif").await.unwrap();
    assert!(h.engine.file("in.mp4").is_some());

    let mut h = ready_shell(transcoding_engine(), staged).await;
    h.shell.submit("ffmpeg -i old_in.mp4 x.gif").await.unwrap();
    assert!(h.engine.file("in.mp4").is_none());
}

#[tokio::test]
async fn test_keyword_is_stripped_case_insensitively() {
    let config = ShellConfig {
        engine_keyword: "FFmpeg".to_string(),
        ..ShellConfig::default()
    };
    let mut h = ready_shell_with(transcoding_engine(), Vec::new(), config).await;
    h.shell.submit("FFmpeg -hide_banner -version").await.unwrap();
    assert_eq!(h.engine.runs(), vec![vec!["-hide_banner", "-version"]]);
}

#[tokio::test]
async fn test_run_failure_is_printed_and_skips_collection() {
    let engine = Arc::new(
        MemoryEngine::new()
            .with_runner(|_, _| Err(EngineError::Run("Invalid data found".to_string()))),
    );
    let staged = vec![StagedFile::from_bytes("in.mp4", b"source".to_vec())];
    let mut h = ready_shell(engine, staged).await;

    h.shell.submit("ffmpeg -i in.mp4 out.mp4").await.unwrap();

    assert_eq!(
        h.transcript.text(),
        "\r\nffmpeg: run failed: Invalid data found\r\n\r$ "
    );
    assert!(h.collected.lock().unwrap().is_empty());
    assert_eq!(h.shell.session().active_command(), "");
}

#[tokio::test]
async fn test_staging_failure_still_runs_without_collection() {
    let staged = vec![StagedFile::from_path("in.mp4", "/no/such/dir/in.mp4")];
    let mut h = ready_shell(transcoding_engine(), staged).await;

    h.shell.submit("ffmpeg -i in.mp4 out.mp4").await.unwrap();

    let text = h.transcript.text();
    assert!(text.starts_with("\r\nffmpeg: cannot read in.mp4: "));
    assert!(text.ends_with("frame=  25\r\n\r$ "));
    assert_eq!(h.engine.runs().len(), 1);
    assert!(h.collected.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_load_failure_reports_false_and_rejects_runs() {
    let engine = Arc::new(MemoryEngine::new().with_load_failure("wasm unavailable"));
    let transcript = Transcript::new();
    let mut shell = Shell::builder().engine_arc(engine.clone()).build();
    shell.mount(transcript.clone());

    assert!(!shell.setup().await);
    assert_eq!(shell.session().engine_state(), EngineState::LoadFailed);

    transcript.clear();
    shell.submit("ffmpeg -version").await.unwrap();
    assert_eq!(
        transcript.text(),
        "\r\nffmpeg: engine not loaded\r\n\r$ "
    );
    assert!(engine.runs().is_empty());

    // Other commands keep working.
    transcript.clear();
    shell.submit("nope").await.unwrap();
    assert!(transcript.text().contains("nope: command not found"));
}

#[tokio::test]
async fn test_disposed_shell_discards_output_but_keeps_running() {
    let mut h = ready_shell(transcoding_engine(), Vec::new()).await;
    h.shell.dispose();
    assert!(!h.shell.is_mounted());

    h.shell.submit("help").await.unwrap();
    assert_eq!(h.transcript.text(), "");

    let fresh = Transcript::new();
    assert!(h.shell.mount(fresh.clone()));
    h.shell.prompt_again(true);
    assert_eq!(fresh.text(), "\r\n$ ");
}

#[tokio::test]
async fn test_handler_error_does_not_end_session() {
    let transcript = Transcript::new();
    let mut shell = Shell::builder()
        .command(Command::from_fn("fail", "Always fails", |_| {
            Err(ShellError::Handler("nope".to_string()))
        }))
        .build();
    shell.mount(transcript.clone());

    shell.submit("fail").await.unwrap();
    shell.submit("help").await.unwrap();
    assert!(transcript.text().contains("fail: nope"));
    assert!(transcript.text().contains("Available commands."));
}
