use std::process::Command;

#[test]
fn missing_selector_prints_help_to_stderr_and_exits_one() {
    let output = Command::new(env!("CARGO_BIN_EXE_scanstore"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("--implementation"));
    assert!(stderr.contains("(4) concurrent batch recording with shuffled inputs"));
}
