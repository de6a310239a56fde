//! End-to-end tests for the `compscore compound` command.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

use crate::helpers::{
    SyntheticVcf, assert_failures_last, data_lines, failed_lines, header_lines, info_value,
};

fn compscore(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_compscore"))
        .arg("compound")
        .args(args)
        .output()
        .expect("Failed to run compscore")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("UTF-8 path")
}

#[test]
fn test_scores_file_to_outfile() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.vcf");
    let output = dir.path().join("output.vcf");
    SyntheticVcf::new(100).write(&input);

    let result = compscore(&[path_str(&input), "-o", path_str(&output), "-p", "3"]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let text = std::fs::read_to_string(&output).unwrap();
    let data = data_lines(&text);
    assert_eq!(data.len(), 100);
    assert!(data.iter().all(|line| info_value(line, "CorrectedRankScore").is_some()));
    assert!(failed_lines(&text).is_empty());
}

#[test]
fn test_header_only_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.vcf");
    let output = dir.path().join("output.vcf");
    let vcf = SyntheticVcf::new(0);
    vcf.write(&input);

    let result = compscore(&[path_str(&input), "-o", path_str(&output)]);
    assert!(result.status.success());

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(data_lines(&text).is_empty());
    assert_eq!(header_lines(&text).len(), header_lines(&vcf.header()).len() + 1);
    assert_eq!(text.matches("##INFO=<ID=CorrectedRankScore,").count(), 1);
}

#[test]
fn test_one_malformed_line_among_ten() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.vcf");
    let output = dir.path().join("output.vcf");

    let vcf = SyntheticVcf::new(10);
    let mut text = vcf.header();
    for i in 0..10 {
        text.push_str(&vcf.record_line(i));
        text.push('\n');
        if i == 4 {
            text.push_str("1\tbroken\n");
        }
    }
    std::fs::write(&input, text).unwrap();

    let result = compscore(&[path_str(&input), "-o", path_str(&output), "-p", "4"]);
    assert!(result.status.success());

    let out = std::fs::read_to_string(&output).unwrap();
    assert_eq!(data_lines(&out).len(), 10);
    let failures = failed_lines(&out);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].ends_with("\t1\tbroken"), "{}", failures[0]);
    assert_failures_last(&out);
}

#[test]
fn test_existing_corrected_rank_score_definition_is_not_duplicated() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.vcf");
    let output = dir.path().join("output.vcf");
    let rendered = SyntheticVcf::new(20).render().replacen(
        "##FORMAT",
        "##INFO=<ID=CorrectedRankScore,Number=.,Type=String,Description=\"old\">\n##FORMAT",
        1,
    );
    std::fs::write(&input, rendered).unwrap();

    assert!(compscore(&[path_str(&input), "-o", path_str(&output)]).status.success());
    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(text.matches("ID=CorrectedRankScore").count(), 1);
    assert!(text.contains("ID=CorrectedRankScore,Number=1,Type=Integer"));
}

#[test]
fn test_reads_stdin_and_writes_stdout() {
    let vcf = SyntheticVcf::new(50);
    let mut child = Command::new(env!("CARGO_BIN_EXE_compscore"))
        .args(["compound", "-", "-p", "2"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn compscore");

    let mut stdin = child.stdin.take().unwrap();
    let text = vcf.render();
    let writer = std::thread::spawn(move || stdin.write_all(text.as_bytes()).unwrap());
    let output = child.wait_with_output().unwrap();
    writer.join().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(data_lines(&stdout).len(), 50);
    assert!(stdout.starts_with("##fileformat=VCFv4.2"));
}

#[test]
fn test_silent_prints_nothing() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.vcf");
    SyntheticVcf::new(30).write(&input);

    let result = compscore(&[path_str(&input), "--silent"]);
    assert!(result.status.success());
    assert!(result.stdout.is_empty());
}

#[test]
fn test_vep_annotations() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.vcf");
    let output = dir.path().join("output.vcf");
    SyntheticVcf::new(60).vep().write(&input);

    let result = compscore(&[path_str(&input), "--vep", "-o", path_str(&output)]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(data_lines(&text).len(), 60);
}

#[test]
fn test_vep_without_csq_definition_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.vcf");
    SyntheticVcf::new(10).write(&input);

    let result = compscore(&[path_str(&input), "--vep", "-s"]);
    assert!(!result.status.success());
}

#[test]
fn test_missing_input_fails() {
    let result = compscore(&["/definitely/not/here.vcf", "-s"]);
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("does not exist"));
}

#[test]
fn test_zero_processes_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.vcf");
    SyntheticVcf::new(10).write(&input);

    let result = compscore(&[path_str(&input), "-p", "0", "-s"]);
    assert!(!result.status.success());
}

#[test]
fn test_scratch_files_are_removed() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.vcf");
    let output = dir.path().join("output.vcf");
    let tmp = dir.path().join("tmp");
    SyntheticVcf::new(200).write(&input);

    let result = compscore(&[
        path_str(&input),
        "-o",
        path_str(&output),
        "--tmp-dir",
        path_str(&tmp),
        "--max-memory",
        "4K",
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    assert_eq!(std::fs::read_dir(&tmp).unwrap().count(), 0);
}
